//! MongoDB client wrapper.
//!
//! The driver pools connections internally; this wraps its `Client` with
//! configuration handling and the Aqueduct-side conveniences.

use std::sync::Arc;

use bson::{Document, doc};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::error::{MongoError, MongoResult};
use crate::runner::AggregationRunner;

/// A MongoDB client bound to one database.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
}

impl MongoClient {
    /// Create a client from configuration.
    pub async fn new(config: MongoConfig) -> MongoResult<Self> {
        let options = config.to_client_options().await?;

        let client = Client::with_options(options)
            .map_err(|e| MongoError::connection(format!("failed to create client: {e}")))?;
        let database = client.database(&config.database);

        info!(
            database = %config.database,
            app_name = config.app_name.as_deref().unwrap_or(""),
            "MongoDB client created"
        );

        Ok(Self {
            client,
            database,
            config: Arc::new(config),
        })
    }

    /// Create a builder.
    pub fn builder() -> MongoClientBuilder {
        MongoClientBuilder::default()
    }

    /// Get a typed collection.
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.database.collection(name)
    }

    /// Get a collection of raw BSON documents.
    pub fn collection_doc(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// An aggregation runner over this client.
    pub fn runner(&self) -> AggregationRunner {
        AggregationRunner::new(self.clone())
    }

    /// The bound database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// The underlying driver client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// The configuration this client was created with.
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Ping the server.
    pub async fn is_healthy(&self) -> bool {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }

    /// Run a database command.
    pub async fn run_command(&self, command: Document) -> MongoResult<Document> {
        let result = self
            .database
            .run_command(command, None)
            .await
            .map_err(MongoError::from)?;
        Ok(result)
    }

    /// List all collection names in the database.
    pub async fn list_collections(&self) -> MongoResult<Vec<String>> {
        let names = self
            .database
            .list_collection_names(None)
            .await
            .map_err(MongoError::from)?;
        Ok(names)
    }

    /// Drop a collection.
    pub async fn drop_collection(&self, name: &str) -> MongoResult<()> {
        debug!(collection = %name, "dropping collection");
        self.database
            .collection::<Document>(name)
            .drop(None)
            .await
            .map_err(MongoError::from)?;
        Ok(())
    }

    /// Create an index and return its name.
    pub async fn create_index(
        &self,
        collection: &str,
        keys: Document,
        unique: bool,
    ) -> MongoResult<String> {
        use mongodb::IndexModel;
        use mongodb::options::IndexOptions;

        debug!(collection = %collection, keys = %keys, "creating index");

        let options = IndexOptions::builder().unique(unique).build();
        let model = IndexModel::builder().keys(keys).options(options).build();

        let result = self
            .database
            .collection::<Document>(collection)
            .create_index(model, None)
            .await
            .map_err(MongoError::from)?;

        Ok(result.index_name)
    }
}

/// Builder for [`MongoClient`].
#[derive(Debug, Default)]
pub struct MongoClientBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
}

impl MongoClientBuilder {
    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the database name (required).
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Build and connect the client.
    pub async fn build(self) -> MongoResult<MongoClient> {
        let mut config = MongoConfig::builder();
        if let Some(uri) = self.uri {
            config = config.uri(uri);
        }
        if let Some(database) = self.database {
            config = config.database(database);
        }
        if let Some(app_name) = self.app_name {
            config = config.app_name(app_name);
        }
        if let Some(max_pool_size) = self.max_pool_size {
            config = config.max_pool_size(max_pool_size);
        }
        MongoClient::new(config.build()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_without_database_fails() {
        let result = tokio_test::block_on(
            MongoClientBuilder::default()
                .uri("mongodb://localhost:27017")
                .build(),
        );
        assert!(result.is_err());
    }
}
