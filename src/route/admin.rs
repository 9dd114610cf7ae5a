use rocket::serde::json::Json;
use rocket::State;

use crate::data::class::db::{ClassDbExt, Decision};
use crate::data::class::ClassId;
use crate::data::store::Store;
use crate::resp::problem::Problem;

/// Approve or reject a class
///
/// `approved` marks the class approved. Any other status deletes the class.
#[utoipa::path(
    params(
        ("id", description = "class ID"),
        ("status", description = "`approved`, anything else removes the class")
    ),
    responses(
        (status = 200, description = "Update result on approval, delete result otherwise"),
        (status = 500, description = "Document store failure", body = Problem),
    )
)]
#[patch("/admin/class/<id>/status?<status>")]
#[tracing::instrument(skip(store))]
pub async fn class_status(
    id: &str,
    status: &str,
    store: &State<Store>,
) -> Result<Json<Decision>, Problem> {
    let decision = store.decide_class(&ClassId::from(id), status).await?;
    Ok(Json(decision))
}
