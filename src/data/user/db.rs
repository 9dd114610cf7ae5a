use bson::{doc, Bson};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{by_email, ClassList, User, USER_COLLECTION_NAME};
use crate::data::class::ClassId;
use crate::data::store::{DocumentStore, InsertOutcome};
use crate::error::{ResolveError, StoreError};
use crate::role::Role;

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn not_found(email: impl ToString) -> Problem {
        Problem::new_untyped(Status::NotFound, "User doesn't exist.")
            .insert_str("email", email)
            .clone()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserSignupData {
    #[schema(format = "email")]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl From<UserSignupData> for User {
    fn from(data: UserSignupData) -> Self {
        User::new(data.email, data.name, data.role)
    }
}

#[rocket::async_trait]
pub trait UserDbExt {
    /// Class ids stored under `list` on the user with `email`, in stored order. A missing
    /// or empty list resolves to no ids; a missing user is [`ResolveError::NotFound`].
    async fn resolve_class_ids(
        &self,
        list: ClassList,
        email: &str,
    ) -> Result<Vec<ClassId>, ResolveError>;

    async fn create_user(&self, user: UserSignupData) -> Result<InsertOutcome, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

#[rocket::async_trait]
impl<S: DocumentStore + ?Sized> UserDbExt for S {
    async fn resolve_class_ids(
        &self,
        list: ClassList,
        email: &str,
    ) -> Result<Vec<ClassId>, ResolveError> {
        let field = list.field();
        let document = self
            .find_one(
                USER_COLLECTION_NAME,
                by_email(email),
                Some(doc! { field: 1, "_id": 0 }),
            )
            .await?
            .ok_or_else(|| ResolveError::NotFound(email.to_string()))?;

        let ids = match document.get(field) {
            Some(Bson::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Bson::String(id) => Some(ClassId::new(id.as_str())),
                    Bson::ObjectId(oid) => Some(ClassId::from(*oid)),
                    other => {
                        tracing::warn!("Ignoring non-id entry in {}: {}", field, other);
                        None
                    }
                })
                .collect(),
            _ => vec![],
        };

        Ok(ids)
    }

    async fn create_user(&self, user: UserSignupData) -> Result<InsertOutcome, StoreError> {
        let user = User::from(user);
        tracing::info!("Creating {} user {}", user.role, user.email);

        self.insert_one(USER_COLLECTION_NAME, bson::to_document(&user)?)
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let document = self.find_one(USER_COLLECTION_NAME, by_email(email), None).await?;

        Ok(match document {
            Some(document) => Some(bson::from_document(document)?),
            None => None,
        })
    }
}
