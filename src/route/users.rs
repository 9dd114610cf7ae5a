use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::data::store::{InsertOutcome, Store};
use crate::data::user::db::problem as user_problem;
use crate::data::user::db::{UserDbExt, UserSignupData};
use crate::resp::problem::Problem;
use crate::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub role: Role,
}

/// Create a user document
#[utoipa::path(
    request_body = UserSignupData,
    responses(
        (status = 200, description = "Insert result", body = InsertOutcome),
        (status = 500, description = "Document store failure", body = Problem),
    )
)]
#[post("/users", format = "application/json", data = "<user>")]
#[tracing::instrument(skip(store))]
pub async fn user_create(
    user: Json<UserSignupData>,
    store: &State<Store>,
) -> Result<Json<InsertOutcome>, Problem> {
    Ok(Json(store.create_user(user.into_inner()).await?))
}

/// Get the role of a user
#[utoipa::path(
    params(("email", description = "user e-mail")),
    responses(
        (status = 200, description = "Role of the user", body = RoleResponse),
        (status = 404, description = "No user with that e-mail", body = Problem),
    )
)]
#[get("/users/role?<email>")]
#[tracing::instrument(skip(store))]
pub async fn user_role(email: &str, store: &State<Store>) -> Result<Json<RoleResponse>, Problem> {
    let user = store
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| user_problem::not_found(email))?;

    Ok(Json(RoleResponse { role: user.role }))
}

#[cfg(test)]
mod user_endpoints {
    use rocket::http::{ContentType, Status};
    use serde_json::json;

    use super::RoleResponse;
    use crate::enrollment::EnrollPolicy;
    use crate::role::Role;
    use crate::route::testing::client;

    #[rocket::async_test]
    async fn created_user_role_can_be_read() {
        let client = client(EnrollPolicy::Sequential).await;

        let response = client
            .post("/users")
            .header(ContentType::JSON)
            .body(json!({ "email": "teach@x.com", "role": "instructor" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client.get("/users/role?email=teach@x.com").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let role: RoleResponse = response.into_json().await.expect("invalid response json");
        assert_eq!(role.role, Role::Instructor);
    }

    #[rocket::async_test]
    async fn unknown_user_role_is_not_found() {
        let client = client(EnrollPolicy::Sequential).await;

        let response = client.get("/users/role?email=nobody@x.com").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
