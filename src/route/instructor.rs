use bson::doc;
use rocket::serde::json::Json;
use rocket::State;

use crate::data::class::db::{ClassDbExt, ClassSubmission};
use crate::data::class::Class;
use crate::data::store::{InsertOutcome, Store};
use crate::resp::problem::Problem;

/// Submit a class for approval
#[utoipa::path(
    request_body = ClassSubmission,
    responses(
        (status = 200, description = "Insert result", body = InsertOutcome),
        (status = 500, description = "Document store failure", body = Problem),
    )
)]
#[post("/instructor/class", format = "application/json", data = "<class>")]
#[tracing::instrument(skip(store))]
pub async fn class_submit(
    class: Json<ClassSubmission>,
    store: &State<Store>,
) -> Result<Json<InsertOutcome>, Problem> {
    Ok(Json(store.submit_class(class.into_inner()).await?))
}

/// List classes of an instructor
#[utoipa::path(
    params(("email", description = "instructor e-mail")),
    responses(
        (status = 200, description = "Classes submitted by the instructor", body = Vec<Class>),
        (status = 500, description = "Document store failure", body = Problem),
    )
)]
#[get("/instructor/classes?<email>")]
#[tracing::instrument(skip(store))]
pub async fn instructor_classes(
    email: &str,
    store: &State<Store>,
) -> Result<Json<Vec<Class>>, Problem> {
    let classes = store
        .list_classes(doc! { "instructor_email": email })
        .await?;
    Ok(Json(classes))
}
