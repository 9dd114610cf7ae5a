use bson::{doc, Document};
use mongodb::options::{FindOneOptions, FindOptions};
use mongodb::{Client, Collection, Database};
use rocket::futures::TryStreamExt;

use super::{DeleteOutcome, DocumentStore, InsertOutcome, UpdateOutcome, UpdateWrite};
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Connects and pings the deployment so a bad URI fails at startup instead of on the
    /// first request.
    pub async fn connect(
        uri: impl AsRef<str>,
        db_name: impl AsRef<str>,
    ) -> Result<MongoStore, mongodb::error::Error> {
        let client = Client::with_uri_str(uri.as_ref()).await?;

        tracing::info!("Using MongoDB database: {}", db_name.as_ref());
        let db = client.database(db_name.as_ref());
        db.run_command(doc! { "ping": 1 }, None).await?;
        tracing::info!("Pinged MongoDB deployment.");

        Ok(MongoStore { client, db })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

#[rocket::async_trait]
impl DocumentStore for MongoStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Option<Document>, StoreError> {
        let options = FindOneOptions::builder().projection(projection).build();

        Ok(self.collection(collection).find_one(filter, options).await?)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let options = FindOptions::builder().projection(projection).build();
        let cursor = self.collection(collection).find(filter, options).await?;

        Ok(cursor.try_collect().await?)
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOutcome, StoreError> {
        let result = self.collection(collection).insert_one(document, None).await?;
        Ok(result.into())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .collection(collection)
            .update_one(filter, update, None)
            .await?;
        Ok(result.into())
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteOutcome, StoreError> {
        let result = self.collection(collection).delete_one(filter, None).await?;
        Ok(result.into())
    }

    async fn update_all_or_none(
        &self,
        writes: Vec<UpdateWrite>,
    ) -> Result<Vec<UpdateOutcome>, StoreError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let mut outcomes = Vec::with_capacity(writes.len());
        for write in writes {
            let result = self
                .collection(&write.collection)
                .update_one_with_session(write.filter, write.update, None, &mut session)
                .await;

            let failure = match result {
                Ok(result) if result.matched_count > 0 => {
                    outcomes.push(result.into());
                    continue;
                }
                Ok(_) => StoreError::Unmatched(write.collection),
                Err(e) => StoreError::from(e),
            };

            if let Err(e) = session.abort_transaction().await {
                tracing::warn!("Unable to abort MongoDB transaction: {}", e);
            }
            return Err(failure);
        }

        session.commit_transaction().await?;
        Ok(outcomes)
    }
}
