use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::StoreError;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

fn id_string(id: Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s,
        other => other.to_string(),
    }
}

/// Result of an update, shaped like the driver's update result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<String>,
}

impl From<mongodb::results::UpdateResult> for UpdateOutcome {
    fn from(result: mongodb::results::UpdateResult) -> Self {
        UpdateOutcome {
            acknowledged: true,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.map(id_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl From<mongodb::results::DeleteResult> for DeleteOutcome {
    fn from(result: mongodb::results::DeleteResult) -> Self {
        DeleteOutcome {
            acknowledged: true,
            deleted_count: result.deleted_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    pub inserted_id: String,
}

impl From<mongodb::results::InsertOneResult> for InsertOutcome {
    fn from(result: mongodb::results::InsertOneResult) -> Self {
        InsertOutcome {
            acknowledged: true,
            inserted_id: id_string(result.inserted_id),
        }
    }
}

/// A single `update_one` call, used to group writes into one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateWrite {
    pub collection: String,
    pub filter: Document,
    pub update: Document,
}

impl UpdateWrite {
    pub fn new(collection: impl ToString, filter: Document, update: Document) -> UpdateWrite {
        UpdateWrite {
            collection: collection.to_string(),
            filter,
            update,
        }
    }
}

#[rocket::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Option<Document>, StoreError>;

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Vec<Document>, StoreError>;

    async fn insert_one(&self, collection: &str, document: Document)
        -> Result<InsertOutcome, StoreError>;

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_one(&self, collection: &str, filter: Document)
        -> Result<DeleteOutcome, StoreError>;

    /// Applies `writes` in order as one transaction. Every write must match a document,
    /// otherwise nothing is committed and [`StoreError::Unmatched`] is returned.
    async fn update_all_or_none(
        &self,
        writes: Vec<UpdateWrite>,
    ) -> Result<Vec<UpdateOutcome>, StoreError>;
}

/// Document store managed by Rocket.
#[derive(Debug)]
pub enum Store {
    MongoDb(MongoStore),
    Memory(MemoryStore),
}

impl Store {
    #[cfg(test)]
    pub(crate) fn as_memory(&self) -> Option<&MemoryStore> {
        match self {
            Store::Memory(it) => Some(it),
            Store::MongoDb(_) => None,
        }
    }
}

impl From<MongoStore> for Store {
    fn from(store: MongoStore) -> Self {
        Store::MongoDb(store)
    }
}

impl From<MemoryStore> for Store {
    fn from(store: MemoryStore) -> Self {
        Store::Memory(store)
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Store::MongoDb($store) => $call,
            Store::Memory($store) => $call,
        }
    };
}

#[rocket::async_trait]
impl DocumentStore for Store {
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Option<Document>, StoreError> {
        dispatch!(self, s => s.find_one(collection, filter, projection).await)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        dispatch!(self, s => s.find(collection, filter, projection).await)
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOutcome, StoreError> {
        dispatch!(self, s => s.insert_one(collection, document).await)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        dispatch!(self, s => s.update_one(collection, filter, update).await)
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteOutcome, StoreError> {
        dispatch!(self, s => s.delete_one(collection, filter).await)
    }

    async fn update_all_or_none(
        &self,
        writes: Vec<UpdateWrite>,
    ) -> Result<Vec<UpdateOutcome>, StoreError> {
        dispatch!(self, s => s.update_all_or_none(writes).await)
    }
}
