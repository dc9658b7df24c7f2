//! Executing compiled pipelines against the driver.

use std::time::Duration;

use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::Cursor;
use mongodb::options::{AggregateOptions, Collation, Hint};
use serde::de::DeserializeOwned;
use tracing::debug;

use aqueduct_aggregation::Pipeline;

use crate::client::MongoClient;
use crate::error::MongoResult;

/// Execution options for an aggregation.
#[derive(Debug, Clone, Default)]
pub struct AggregationOptions {
    /// Allow writing temporary files for large sorts and groups.
    pub allow_disk_use: Option<bool>,
    /// Cursor batch size.
    pub batch_size: Option<u32>,
    /// Collation for string comparisons.
    pub collation: Option<Collation>,
    /// Index hint.
    pub hint: Option<Hint>,
    /// Server-side time limit.
    pub max_time: Option<Duration>,
}

impl AggregationOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow writing temporary files for large sorts and groups.
    pub fn allow_disk_use(mut self) -> Self {
        self.allow_disk_use = Some(true);
        self
    }

    /// Set the cursor batch size.
    pub fn batch_size(mut self, size: u32) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Set the collation.
    pub fn collation(mut self, collation: Collation) -> Self {
        self.collation = Some(collation);
        self
    }

    /// Set an index hint.
    pub fn hint(mut self, hint: Hint) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Set the server-side time limit.
    pub fn max_time(mut self, duration: Duration) -> Self {
        self.max_time = Some(duration);
        self
    }

    fn to_driver_options(&self) -> AggregateOptions {
        let mut options = AggregateOptions::default();
        options.allow_disk_use = self.allow_disk_use;
        options.batch_size = self.batch_size;
        options.collation = self.collation.clone();
        options.hint = self.hint.clone();
        options.max_time = self.max_time;
        options
    }
}

/// Runs compiled pipelines against collections of a [`MongoClient`].
///
/// # Example
///
/// ```rust,ignore
/// let runner = client.runner();
/// let totals: Vec<RegionTotal> = runner
///     .run("orders", &pipeline, None)
///     .await?;
/// ```
#[derive(Clone)]
pub struct AggregationRunner {
    client: MongoClient,
}

impl AggregationRunner {
    /// Create a runner over the given client.
    pub fn new(client: MongoClient) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    /// Run a pipeline and deserialize every result document.
    pub async fn run<T: DeserializeOwned>(
        &self,
        collection: &str,
        pipeline: &Pipeline,
        options: Option<AggregationOptions>,
    ) -> MongoResult<Vec<T>> {
        let documents = self.run_documents(collection, pipeline, options).await?;
        let mut results = Vec::with_capacity(documents.len());
        for document in documents {
            results.push(bson::from_document(document)?);
        }
        Ok(results)
    }

    /// Run a pipeline and collect raw result documents.
    pub async fn run_documents(
        &self,
        collection: &str,
        pipeline: &Pipeline,
        options: Option<AggregationOptions>,
    ) -> MongoResult<Vec<Document>> {
        let cursor = self.stream(collection, pipeline, options).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    /// Run a pipeline and return the first result, if any.
    pub async fn run_one<T: DeserializeOwned>(
        &self,
        collection: &str,
        pipeline: &Pipeline,
        options: Option<AggregationOptions>,
    ) -> MongoResult<Option<T>> {
        let mut cursor = self.stream(collection, pipeline, options).await?;
        match cursor.try_next().await? {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Run a pipeline and return the raw cursor.
    pub async fn stream(
        &self,
        collection: &str,
        pipeline: &Pipeline,
        options: Option<AggregationOptions>,
    ) -> MongoResult<Cursor<Document>> {
        let stages = pipeline.to_documents()?;
        debug!(
            collection = %collection,
            stages = stages.len(),
            "executing aggregation"
        );

        let driver_options = options.map(|o| o.to_driver_options());
        let cursor = self
            .client
            .collection_doc(collection)
            .aggregate(stages, driver_options)
            .await?;
        Ok(cursor)
    }

    /// Ask the server for the execution plan of a pipeline.
    pub async fn explain(&self, collection: &str, pipeline: &Pipeline) -> MongoResult<Document> {
        let stages = pipeline.to_documents()?;
        let stages: Vec<Bson> = stages.into_iter().map(Bson::Document).collect();

        self.client
            .run_command(doc! {
                "explain": {
                    "aggregate": collection,
                    "pipeline": stages,
                    "cursor": {},
                },
                "verbosity": "queryPlanner",
            })
            .await
    }
}
