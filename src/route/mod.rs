use rocket::{Build, Rocket, Route};

pub mod admin;
pub mod class;
pub mod instructor;
pub mod student;
pub mod users;

use admin::*;
use class::*;
use instructor::*;
use student::*;
use users::*;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    data::{
        class::{db::ClassSubmission, Class, ClassStatus, ClassSummary},
        store::{DeleteOutcome, InsertOutcome, UpdateOutcome},
        user::db::UserSignupData,
    },
    resp::problem::Problem,
    role::Role,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        class_select,
        class_remove,
        class_enroll,
        selected_classes,
        enrolled_classes,
        class_status,
        all_classes,
        approved_classes,
        class_submit,
        instructor_classes,
        user_create,
        user_role
    ),
    components(schemas(
        Role,
        Class,
        ClassStatus,
        ClassSummary,
        ClassSubmission,
        UpdateOutcome,
        DeleteOutcome,
        InsertOutcome,
        UserSignupData,
        RoleResponse,
        Problem
    ))
)]
pub struct ApiDoc;

#[get("/")]
pub fn index() -> &'static str {
    "Welcome to Wild Life Camp"
}

pub fn api() -> Vec<Route> {
    routes![
        index,
        class_select,
        class_remove,
        class_enroll,
        selected_classes,
        enrolled_classes,
        class_status,
        all_classes,
        approved_classes,
        class_submit,
        instructor_classes,
        user_create,
        user_role
    ]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/", api()).mount(
        "/",
        SwaggerUi::new("/swagger/<_..>").url("/openapi.json", ApiDoc::openapi()),
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use bson::doc;
    use rocket::local::asynchronous::Client;

    use crate::config::Config;
    use crate::data::class::db::{ClassDbExt, ClassSubmission};
    use crate::data::class::ClassId;
    use crate::data::store::{DocumentStore, MemoryStore, Store};
    use crate::data::user::{ENROLLED_CLASSES, SELECTED_CLASSES, USER_COLLECTION_NAME};
    use crate::enrollment::EnrollPolicy;

    pub async fn client(policy: EnrollPolicy) -> Client {
        let mut config = Config::default();
        config.enroll_policy = policy;

        let rocket = crate::build(config, Store::from(MemoryStore::new())).expect("invalid backend");
        Client::tracked(rocket).await.expect("invalid backend")
    }

    pub fn memory(client: &Client) -> &MemoryStore {
        client
            .rocket()
            .state::<Store>()
            .and_then(Store::as_memory)
            .expect("tests run on the in-memory store")
    }

    pub async fn seed_student(client: &Client, email: &str, selected: &[&str], enrolled: &[&str]) {
        memory(client)
            .insert_one(
                USER_COLLECTION_NAME,
                doc! {
                    "email": email,
                    "role": "student",
                    SELECTED_CLASSES: selected.to_vec(),
                    ENROLLED_CLASSES: enrolled.to_vec()
                },
            )
            .await
            .expect("unable to seed student");
    }

    pub async fn seed_class(client: &Client, name: &str, seats: i64) -> ClassId {
        let outcome = memory(client)
            .submit_class(ClassSubmission {
                name: name.to_string(),
                price: 30.0,
                img: format!("https://img.example.com/{}.png", name),
                seats,
                instructor_email: "guide@x.com".to_string(),
                instructor_name: Some("Guide".to_string()),
            })
            .await
            .expect("unable to seed class");
        ClassId::new(outcome.inserted_id)
    }
}
