use bson::doc;
use rocket::serde::json::Json;
use rocket::State;

use crate::data::class::db::ClassDbExt;
use crate::data::class::{Class, ClassStatus};
use crate::data::store::Store;
use crate::resp::problem::Problem;

/// List every class regardless of status
#[utoipa::path(
    responses(
        (status = 200, description = "All classes", body = Vec<Class>),
        (status = 500, description = "Document store failure", body = Problem),
    )
)]
#[get("/classes")]
#[tracing::instrument(skip(store))]
pub async fn all_classes(store: &State<Store>) -> Result<Json<Vec<Class>>, Problem> {
    Ok(Json(store.list_classes(doc! {}).await?))
}

/// List approved classes
#[utoipa::path(
    responses(
        (status = 200, description = "Approved classes", body = Vec<Class>),
        (status = 500, description = "Document store failure", body = Problem),
    )
)]
#[get("/classes/approved")]
#[tracing::instrument(skip(store))]
pub async fn approved_classes(store: &State<Store>) -> Result<Json<Vec<Class>>, Problem> {
    let classes = store
        .list_classes(doc! { "status": ClassStatus::Approved.to_string() })
        .await?;
    Ok(Json(classes))
}
