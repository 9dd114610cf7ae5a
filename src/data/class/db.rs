use bson::{doc, Document};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Class, ClassId, ClassStatus, CLASS_COLLECTION_NAME};
use crate::data::store::{DeleteOutcome, DocumentStore, InsertOutcome, UpdateOutcome};
use crate::error::StoreError;

/// Class as submitted by an instructor.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClassSubmission {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub img: String,
    pub seats: i64,
    pub instructor_email: String,
    #[serde(default)]
    pub instructor_name: Option<String>,
}

impl ClassSubmission {
    pub fn into_document(self) -> Document {
        let mut document = doc! {
            "name": self.name,
            "price": self.price,
            "img": self.img,
            "status": ClassStatus::Pending.to_string(),
            "seats": self.seats,
            "attended": 0_i64,
            "instructor_email": self.instructor_email,
        };
        if let Some(name) = self.instructor_name {
            document.insert("instructor_name", name);
        }
        document
    }
}

/// Reads a class document. Documents that still don't fit `T` are logged and treated
/// like missing classes, so one bad document never fails a whole listing.
fn decode<T: DeserializeOwned>(document: Document) -> Option<T> {
    match bson::from_document(document) {
        Ok(class) => Some(class),
        Err(e) => {
            tracing::warn!("Unable to deserialize Class document: {}", e);
            None
        }
    }
}

/// Outcome of an admin decision: approval updates the class, anything else deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Decision {
    Approved(UpdateOutcome),
    Removed(DeleteOutcome),
}

#[rocket::async_trait]
pub trait ClassDbExt {
    /// Looks up each id in order. The result has one slot per id, `None` where the class
    /// doesn't exist or can't be read, so it can be zipped against `ids`.
    async fn resolve_classes<T>(
        &self,
        ids: &[ClassId],
        projection: Option<Document>,
    ) -> Result<Vec<Option<T>>, StoreError>
    where
        T: DeserializeOwned + Send;

    async fn get_class(&self, id: &ClassId) -> Result<Option<Class>, StoreError>;

    async fn list_classes(&self, filter: Document) -> Result<Vec<Class>, StoreError>;

    async fn submit_class(&self, class: ClassSubmission) -> Result<InsertOutcome, StoreError>;

    async fn decide_class(&self, id: &ClassId, status: &str) -> Result<Decision, StoreError>;
}

#[rocket::async_trait]
impl<S: DocumentStore + ?Sized> ClassDbExt for S {
    async fn resolve_classes<T>(
        &self,
        ids: &[ClassId],
        projection: Option<Document>,
    ) -> Result<Vec<Option<T>>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let mut classes = Vec::with_capacity(ids.len());

        for id in ids {
            let document = self
                .find_one(CLASS_COLLECTION_NAME, id.filter(), projection.clone())
                .await?;

            classes.push(match document {
                Some(document) => decode(document),
                None => {
                    tracing::debug!("Class {} no longer exists.", id);
                    None
                }
            });
        }

        Ok(classes)
    }

    async fn get_class(&self, id: &ClassId) -> Result<Option<Class>, StoreError> {
        let document = self.find_one(CLASS_COLLECTION_NAME, id.filter(), None).await?;

        Ok(match document {
            Some(document) => Some(bson::from_document(document)?),
            None => None,
        })
    }

    async fn list_classes(&self, filter: Document) -> Result<Vec<Class>, StoreError> {
        let documents = self.find(CLASS_COLLECTION_NAME, filter, None).await?;

        Ok(documents.into_iter().filter_map(decode).collect())
    }

    async fn submit_class(&self, class: ClassSubmission) -> Result<InsertOutcome, StoreError> {
        tracing::info!(
            "Instructor {} submitted class '{}'",
            class.instructor_email,
            class.name
        );
        self.insert_one(CLASS_COLLECTION_NAME, class.into_document())
            .await
    }

    async fn decide_class(&self, id: &ClassId, status: &str) -> Result<Decision, StoreError> {
        if status == ClassStatus::Approved.to_string() {
            let update = doc! { "$set": { "status": ClassStatus::Approved.to_string() } };
            let outcome = self.update_one(CLASS_COLLECTION_NAME, id.filter(), update).await?;
            return Ok(Decision::Approved(outcome));
        }

        tracing::info!("Class {} got status '{}'; deleting it.", id, status);
        let outcome = self.delete_one(CLASS_COLLECTION_NAME, id.filter()).await?;
        Ok(Decision::Removed(outcome))
    }
}
