use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;

use crate::config::Config;
use crate::data::class::db::ClassDbExt;
use crate::data::class::{projection, ClassId, ClassSummary};
use crate::data::store::{Store, UpdateOutcome};
use crate::data::user::db::UserDbExt;
use crate::data::user::ClassList;
use crate::enrollment::Enrollment;
use crate::error::ResolveError;
use crate::resp::problem::Problem;

pub static NO_DATA_MESSAGE: &str = "No data found.";

/// Classes referenced by a student's list, `null` for ids whose class is gone.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ClassListing {
    Classes(Vec<Option<ClassSummary>>),
    NoData { message: &'static str },
}

async fn list_classes(
    store: &Store,
    config: &Config,
    list: ClassList,
    email: &str,
) -> Result<Json<ClassListing>, Problem> {
    let ids = match store.resolve_class_ids(list, email).await {
        Ok(ids) => ids,
        Err(ResolveError::NotFound(_)) => {
            return Ok(Json(ClassListing::NoData {
                message: NO_DATA_MESSAGE,
            }))
        }
        Err(e) => return Err(e.into()),
    };

    let classes = store
        .resolve_classes(&ids, Some(projection(&config.listing_fields)))
        .await?;

    Ok(Json(ClassListing::Classes(classes)))
}

/// Add a class to the student's selection
#[utoipa::path(
    params(
        ("id", description = "class ID"),
        ("email", description = "student e-mail")
    ),
    responses(
        (status = 200, description = "Result of the user update", body = UpdateOutcome),
        (status = 500, description = "Document store failure", body = Problem),
    )
)]
#[patch("/student/class/select/<id>?<email>")]
#[tracing::instrument(skip(store, c))]
pub async fn class_select(
    id: &str,
    email: &str,
    store: &State<Store>,
    c: &State<Config>,
) -> Result<Json<UpdateOutcome>, Problem> {
    let outcome = Enrollment::new(store.inner(), c.enroll_policy)
        .select(&ClassId::from(id), email)
        .await?;

    Ok(Json(outcome))
}

/// Remove a class from the student's selection
#[utoipa::path(
    params(
        ("id", description = "class ID"),
        ("email", description = "student e-mail")
    ),
    responses(
        (status = 200, description = "Result of the user update", body = UpdateOutcome),
        (status = 500, description = "Document store failure", body = Problem),
    )
)]
#[patch("/student/classes/selected/remove/<id>?<email>")]
#[tracing::instrument(skip(store, c))]
pub async fn class_remove(
    id: &str,
    email: &str,
    store: &State<Store>,
    c: &State<Config>,
) -> Result<Json<UpdateOutcome>, Problem> {
    let outcome = Enrollment::new(store.inner(), c.enroll_policy)
        .remove(&ClassId::from(id), email)
        .await?;

    Ok(Json(outcome))
}

/// Enroll the student in a class
#[utoipa::path(
    params(
        ("id", description = "class ID"),
        ("email", description = "student e-mail")
    ),
    responses(
        (status = 200, description = "Result of the user update", body = UpdateOutcome),
        (status = 409, description = "Transactional enrollment rolled back", body = Problem),
        (status = 500, description = "Document store failure", body = Problem),
    )
)]
#[patch("/student/class/enroll/<id>?<email>")]
#[tracing::instrument(skip(store, c))]
pub async fn class_enroll(
    id: &str,
    email: &str,
    store: &State<Store>,
    c: &State<Config>,
) -> Result<Json<UpdateOutcome>, Problem> {
    let outcome = Enrollment::new(store.inner(), c.enroll_policy)
        .enroll(&ClassId::from(id), email)
        .await?;

    Ok(Json(outcome))
}

/// List the student's selected classes
#[utoipa::path(
    params(("email", description = "student e-mail")),
    responses(
        (status = 200, description = "Selected classes, or a message when the student doesn't exist", body = Vec<ClassSummary>),
        (status = 500, description = "Document store failure", body = Problem),
    )
)]
#[get("/student/classes/selected?<email>")]
#[tracing::instrument(skip(store, c))]
pub async fn selected_classes(
    email: &str,
    store: &State<Store>,
    c: &State<Config>,
) -> Result<Json<ClassListing>, Problem> {
    list_classes(store, c, ClassList::Selected, email).await
}

/// List the student's enrolled classes
#[utoipa::path(
    params(("email", description = "student e-mail")),
    responses(
        (status = 200, description = "Enrolled classes, or a message when the student doesn't exist", body = Vec<ClassSummary>),
        (status = 500, description = "Document store failure", body = Problem),
    )
)]
#[get("/student/classes/enrolled?<email>")]
#[tracing::instrument(skip(store, c))]
pub async fn enrolled_classes(
    email: &str,
    store: &State<Store>,
    c: &State<Config>,
) -> Result<Json<ClassListing>, Problem> {
    list_classes(store, c, ClassList::Enrolled, email).await
}

///////////////////////
//       TESTS
///////////////////////

#[cfg(test)]
mod student_endpoints {
    use rocket::http::{ContentType, Status};
    use serde_json::{json, Value};

    use crate::data::class::db::ClassDbExt;
    use crate::data::class::{ClassId, CLASS_COLLECTION_NAME};
    use crate::data::store::DocumentStore;
    use crate::data::user::db::UserDbExt;
    use crate::data::user::USER_COLLECTION_NAME;
    use crate::enrollment::EnrollPolicy;
    use crate::route::testing::{client, memory, seed_class, seed_student};

    #[rocket::async_test]
    async fn enroll_updates_student_and_class() {
        let client = client(EnrollPolicy::Sequential).await;
        let c1 = seed_class(&client, "c1", 5).await;
        memory(&client)
            .update_one(
                CLASS_COLLECTION_NAME,
                c1.filter(),
                bson::doc! { "$set": { "attended": 2_i64 } },
            )
            .await
            .unwrap();
        seed_student(&client, "s@x.com", &[c1.as_str()], &[]).await;

        let response = client
            .patch(format!("/student/class/enroll/{}?email=s@x.com", c1))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.expect("invalid response json");
        assert_eq!(body["matchedCount"], 1);
        assert_eq!(body["modifiedCount"], 1);

        let store = memory(&client);
        let student = store.find_user_by_email("s@x.com").await.unwrap().unwrap();
        assert!(student.selected_classes.is_empty());
        assert_eq!(student.enrolled_classes, vec![c1.to_string()]);
        let class = store.get_class(&c1).await.unwrap().unwrap();
        assert_eq!((class.seats, class.attended), (4, 3));
    }

    #[rocket::async_test]
    async fn enroll_reports_success_when_counters_fail() {
        let client = client(EnrollPolicy::Sequential).await;
        let c1 = seed_class(&client, "c1", 5).await;
        seed_student(&client, "s@x.com", &[c1.as_str()], &[]).await;
        memory(&client).reject_writes(CLASS_COLLECTION_NAME);

        let response = client
            .patch(format!("/student/class/enroll/{}?email=s@x.com", c1))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.expect("invalid response json");
        assert_eq!(body["modifiedCount"], 1);

        let store = memory(&client);
        let student = store.find_user_by_email("s@x.com").await.unwrap().unwrap();
        assert_eq!(student.enrolled_classes, vec![c1.to_string()]);
        let class = store.get_class(&c1).await.unwrap().unwrap();
        assert_eq!((class.seats, class.attended), (5, 0));
    }

    #[rocket::async_test]
    async fn transactional_enroll_conflicts_when_counters_fail() {
        let client = client(EnrollPolicy::Transactional).await;
        seed_student(&client, "s@x.com", &["missing"], &[]).await;

        let response = client
            .patch("/student/class/enroll/missing?email=s@x.com")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);

        let student = memory(&client)
            .find_user_by_email("s@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(student.selected_classes, vec!["missing".to_string()]);
        assert!(student.enrolled_classes.is_empty());
    }

    #[rocket::async_test]
    async fn select_twice_and_remove() {
        let client = client(EnrollPolicy::Sequential).await;
        seed_student(&client, "s@x.com", &[], &[]).await;

        for _ in 0..2 {
            let response = client
                .patch("/student/class/select/c1?email=s@x.com")
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::Ok);
        }
        let student = memory(&client).find_user_by_email("s@x.com").await.unwrap().unwrap();
        assert_eq!(student.selected_classes, vec!["c1".to_string(), "c1".to_string()]);

        let response = client
            .patch("/student/classes/selected/remove/c1?email=s@x.com")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let student = memory(&client).find_user_by_email("s@x.com").await.unwrap().unwrap();
        assert!(student.selected_classes.is_empty());

        let response = client
            .patch("/student/classes/selected/remove/c1?email=s@x.com")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok, "removal is idempotent");
        let body: Value = response.into_json().await.expect("invalid response json");
        assert_eq!(body["matchedCount"], 1);
        assert_eq!(body["modifiedCount"], 0);
    }

    #[rocket::async_test]
    async fn select_surfaces_store_failure() {
        let client = client(EnrollPolicy::Sequential).await;
        seed_student(&client, "s@x.com", &[], &[]).await;
        memory(&client).reject_writes(USER_COLLECTION_NAME);

        let response = client
            .patch("/student/class/select/c1?email=s@x.com")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::InternalServerError);
        assert_eq!(
            response.content_type(),
            Some(ContentType::new("application", "problem+json"))
        );
        let body: Value = response.into_json().await.expect("invalid problem json");
        assert_eq!(body["error"], "write to 'users' rejected");
    }

    #[rocket::async_test]
    async fn remove_surfaces_store_failure() {
        let client = client(EnrollPolicy::Sequential).await;
        seed_student(&client, "s@x.com", &["c1"], &[]).await;
        memory(&client).reject_writes(USER_COLLECTION_NAME);

        let response = client
            .patch("/student/classes/selected/remove/c1?email=s@x.com")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::InternalServerError);
        let body: Value = response.into_json().await.expect("invalid problem json");
        assert_eq!(body["error"], "write to 'users' rejected");

        memory(&client).accept_writes(USER_COLLECTION_NAME);
        let student = memory(&client).find_user_by_email("s@x.com").await.unwrap().unwrap();
        assert_eq!(student.selected_classes, vec!["c1".to_string()]);
    }

    #[rocket::async_test]
    async fn listing_surfaces_failed_user_lookup() {
        let client = client(EnrollPolicy::Sequential).await;
        seed_student(&client, "s@x.com", &["c1"], &["c2"]).await;
        memory(&client).reject_reads(USER_COLLECTION_NAME);

        for list in ["selected", "enrolled"] {
            let response = client
                .get(format!("/student/classes/{}?email=s@x.com", list))
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::InternalServerError);
            let body: Value = response.into_json().await.expect("invalid problem json");
            assert_eq!(body["error"], "read from 'users' rejected");
            assert!(body.get("message").is_none());
        }
    }

    #[rocket::async_test]
    async fn listing_surfaces_failed_class_lookup() {
        let client = client(EnrollPolicy::Sequential).await;
        let c1 = seed_class(&client, "c1", 3).await;
        seed_student(&client, "s@x.com", &[c1.as_str()], &[]).await;
        memory(&client).reject_reads(CLASS_COLLECTION_NAME);

        let response = client
            .get("/student/classes/selected?email=s@x.com")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::InternalServerError);
        let body: Value = response.into_json().await.expect("invalid problem json");
        assert_eq!(body["error"], "read from 'classes' rejected");
    }

    #[rocket::async_test]
    async fn listing_keeps_slots_for_hand_written_classes() {
        let client = client(EnrollPolicy::Sequential).await;
        let store = memory(&client);
        let float_seats = store
            .insert_one(CLASS_COLLECTION_NAME, bson::doc! { "name": "float seats", "seats": 5.0 })
            .await
            .unwrap();
        let no_instructor = store
            .insert_one(CLASS_COLLECTION_NAME, bson::doc! { "name": "no instructor", "price": 20 })
            .await
            .unwrap();
        seed_student(
            &client,
            "s@x.com",
            &[float_seats.inserted_id.as_str(), no_instructor.inserted_id.as_str()],
            &[],
        )
        .await;

        let response = client
            .get("/student/classes/selected?email=s@x.com")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.expect("invalid response json");
        let classes = body.as_array().expect("a list of classes");

        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0]["seats"], 5);
        assert_eq!(classes[1]["name"], "no instructor");
        assert_eq!(classes[1]["price"], 20.0);
        assert!(classes[1].get("instructor_email").is_none());
    }

    #[rocket::async_test]
    async fn unknown_student_has_no_data() {
        let client = client(EnrollPolicy::Sequential).await;

        for list in ["selected", "enrolled"] {
            let response = client
                .get(format!("/student/classes/{}?email=unknown@x.com", list))
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::Ok);
            let body: Value = response.into_json().await.expect("invalid response json");
            assert_eq!(body, json!({ "message": "No data found." }));
        }
    }

    #[rocket::async_test]
    async fn selected_listing_keeps_slots_for_deleted_classes() {
        let client = client(EnrollPolicy::Sequential).await;
        let a = seed_class(&client, "a", 3).await;
        let b = seed_class(&client, "b", 3).await;
        let c = seed_class(&client, "c", 3).await;
        seed_student(&client, "s@x.com", &[a.as_str(), b.as_str(), c.as_str()], &[]).await;
        memory(&client).decide_class(&b, "denied").await.unwrap();

        let response = client
            .get("/student/classes/selected?email=s@x.com")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.expect("invalid response json");
        let classes = body.as_array().expect("a list of classes");

        assert_eq!(classes.len(), 3);
        assert_eq!(classes[0]["_id"], a.to_string());
        assert_eq!(classes[0]["name"], "a");
        assert_eq!(classes[0]["instructor_email"], "guide@x.com");
        assert!(classes[0].get("status").is_none(), "status is not in the listing");
        assert!(classes[1].is_null());
        assert_eq!(classes[2]["name"], "c");
    }

    #[rocket::async_test]
    async fn enrolled_listing_reads_enrolled_classes() {
        let client = client(EnrollPolicy::Sequential).await;
        let selected = seed_class(&client, "selected", 3).await;
        let enrolled = seed_class(&client, "enrolled", 3).await;
        seed_student(&client, "s@x.com", &[selected.as_str()], &[enrolled.as_str()]).await;

        let response = client
            .get("/student/classes/enrolled?email=s@x.com")
            .dispatch()
            .await;
        let body: Value = response.into_json().await.expect("invalid response json");
        let classes = body.as_array().expect("a list of classes");

        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0]["name"], "enrolled");
    }

    #[rocket::async_test]
    async fn student_without_classes_gets_empty_listing() {
        let client = client(EnrollPolicy::Sequential).await;
        seed_student(&client, "s@x.com", &[], &[]).await;

        let response = client
            .get("/student/classes/selected?email=s@x.com")
            .dispatch()
            .await;
        let body: Value = response.into_json().await.expect("invalid response json");
        assert_eq!(body, json!([]));
    }

    #[rocket::async_test]
    async fn enroll_of_unknown_class_is_stored() {
        let client = client(EnrollPolicy::Sequential).await;
        seed_student(&client, "s@x.com", &[], &[]).await;
        let unknown = ClassId::from(bson::oid::ObjectId::new());

        let response = client
            .patch(format!("/student/class/enroll/{}?email=s@x.com", unknown))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let student = memory(&client).find_user_by_email("s@x.com").await.unwrap().unwrap();
        assert_eq!(student.enrolled_classes, vec![unknown.to_string()]);
    }
}
