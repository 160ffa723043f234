//! MongoDB implementation of the metadata store

use async_trait::async_trait;
use bson::doc;
use depot_core::MongoConfig;
use futures::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::{debug, error};

use crate::{FileRecord, MetadataError, MetadataStore};

/// Metadata store over a MongoDB collection
pub struct MongoMetadataStore {
    collection: Collection<FileRecord>,
}

impl MongoMetadataStore {
    /// Connect to MongoDB and bind the configured collection.
    ///
    /// The connection is verified with a ping so a bad URL fails at
    /// startup instead of on the first request.
    pub async fn new(config: &MongoConfig) -> Result<Self, MetadataError> {
        debug!("creating MongoDB metadata store for {}", config.url);

        let client_options = ClientOptions::parse(&config.url).await.map_err(|e| {
            error!("failed to parse MongoDB URL: {}", e);
            MetadataError::ConnectionFailed(format!("failed to parse MongoDB URL: {}", e))
        })?;

        let client = Client::with_options(client_options).map_err(|e| {
            error!("failed to create MongoDB client: {}", e);
            MetadataError::ConnectionFailed(format!("failed to create MongoDB client: {}", e))
        })?;

        let database = client.database(&config.database);

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| {
                error!("failed to connect to MongoDB: {}", e);
                MetadataError::ConnectionFailed(format!("failed to connect to MongoDB: {}", e))
            })?;

        debug!(
            "MongoDB metadata store ready ({}.{})",
            config.database, config.collection
        );

        Ok(Self {
            collection: database.collection(&config.collection),
        })
    }
}

#[async_trait]
impl MetadataStore for MongoMetadataStore {
    async fn insert(&self, records: Vec<FileRecord>) -> Result<(), MetadataError> {
        if records.is_empty() {
            return Ok(());
        }

        debug!("inserting {} file records", records.len());

        self.collection.insert_many(records).await.map_err(|e| {
            error!("failed to insert file records: {}", e);
            MetadataError::QueryFailed(format!("failed to insert file records: {}", e))
        })?;

        Ok(())
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<FileRecord>, MetadataError> {
        debug!("fetching records for {} ids", ids.len());

        let cursor = self
            .collection
            .find(doc! { "file_id": { "$in": ids } })
            .await
            .map_err(|e| MetadataError::QueryFailed(format!("failed to query records: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| MetadataError::QueryFailed(format!("failed to read records: {}", e)))
    }

    async fn get_all(&self) -> Result<Vec<FileRecord>, MetadataError> {
        debug!("fetching all file records");

        let cursor = self
            .collection
            .find(doc! {})
            .await
            .map_err(|e| MetadataError::QueryFailed(format!("failed to query records: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| MetadataError::QueryFailed(format!("failed to read records: {}", e)))
    }

    async fn soft_delete(&self, ids: &[String]) -> Result<(), MetadataError> {
        for file_id in ids {
            debug!("marking file {} deleted", file_id);

            self.collection
                .update_one(
                    doc! { "file_id": file_id },
                    doc! { "$set": { "deleted": true } },
                )
                .await
                .map_err(|e| {
                    error!("failed to mark {} deleted: {}", file_id, e);
                    MetadataError::QueryFailed(format!("failed to mark {} deleted: {}", file_id, e))
                })?;
        }

        Ok(())
    }

    async fn count(&self) -> Result<u64, MetadataError> {
        debug!("counting non-deleted file records");

        self.collection
            .count_documents(doc! { "deleted": false })
            .await
            .map_err(|e| MetadataError::QueryFailed(format!("failed to count records: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MongoConfig {
        MongoConfig {
            url: std::env::var("DEPOT_TEST_MONGO_URL")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database: "depot_test".to_string(),
            collection: format!("file_records_{}", depot_core::new_file_id()),
        }
    }

    // Needs a running MongoDB at DEPOT_TEST_MONGO_URL.
    #[tokio::test]
    #[ignore]
    async fn full_lifecycle_against_mongo() {
        let store = MongoMetadataStore::new(&test_config()).await.unwrap();

        let a = FileRecord::new("a".into(), "a.txt".into(), "text/plain".into());
        let b = FileRecord::new("b".into(), "b.txt".into(), "text/plain".into());
        store.insert(vec![a, b]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(
            store.get_by_ids(&["a".to_string()]).await.unwrap().len(),
            1
        );

        store.soft_delete(&["a".to_string()]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        // get_all still surfaces the flagged record
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|r| r.file_id == "a" && r.deleted));

        // Soft-deleting an unknown id is not an error
        store.soft_delete(&["ghost".to_string()]).await.unwrap();
    }
}
