//! Aggregation-backed views.
//!
//! MongoDB views are read-only collections defined by an aggregation
//! pipeline; materialized views persist a pipeline's output through a
//! terminal `$out` or `$merge` stage and are refreshed by re-running it.
//!
//! # Example
//!
//! ```rust,ignore
//! use aqueduct_aggregation::prelude::*;
//! use aqueduct_mongodb::view::AggregationView;
//!
//! let pipeline = Pipeline::new()
//!     .match_filter(FilterBuilder::new().eq("status", "active"))
//!     .project(ProjectStage::include(["name", "email"]));
//!
//! let view = AggregationView::from_pipeline("active_users", "users", &pipeline)?;
//! client.create_view(&view).await?;
//! ```

use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use aqueduct_aggregation::Pipeline;
use aqueduct_aggregation::context::RootContext;
use aqueduct_aggregation::stage::{AggregationStage, MergeStage, OutStage};

use crate::client::MongoClient;
use crate::error::{MongoError, MongoResult};

/// A view definition: a name, a source collection and a compiled pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationView {
    /// The view name.
    pub name: String,
    /// The collection the view reads from.
    pub source_collection: String,
    /// The compiled pipeline defining the view.
    pub pipeline: Vec<Document>,
    /// Optional collation for string comparisons.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<Document>,
}

impl AggregationView {
    /// Create a view definition from compiled stages.
    pub fn new(
        name: impl Into<String>,
        source_collection: impl Into<String>,
        pipeline: Vec<Document>,
    ) -> Self {
        Self {
            name: name.into(),
            source_collection: source_collection.into(),
            pipeline,
            collation: None,
        }
    }

    /// Create a view definition by compiling a [`Pipeline`].
    pub fn from_pipeline(
        name: impl Into<String>,
        source_collection: impl Into<String>,
        pipeline: &Pipeline,
    ) -> MongoResult<Self> {
        Ok(Self::new(name, source_collection, pipeline.to_documents()?))
    }

    /// Set the collation.
    pub fn with_collation(mut self, collation: Document) -> Self {
        self.collation = Some(collation);
        self
    }

    /// The `create` command for this view.
    pub fn to_create_command(&self) -> Document {
        let mut command = doc! {
            "create": &self.name,
            "viewOn": &self.source_collection,
            "pipeline": self.pipeline.iter().cloned().map(Bson::Document).collect::<Vec<_>>(),
        };
        if let Some(ref collation) = self.collation {
            command.insert("collation", collation.clone());
        }
        command
    }
}

/// A materialized view: a pipeline ending in `$out` or `$merge`.
///
/// Unlike regular views the output is persisted; re-running the pipeline
/// refreshes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedView {
    /// The target collection.
    pub name: String,
    /// The collection the pipeline reads from.
    pub source_collection: String,
    /// The compiled pipeline, terminal stage included.
    pub pipeline: Vec<Document>,
}

impl MaterializedView {
    /// Materialize through `$out` (full replacement of the target).
    pub fn with_out(
        name: impl Into<String>,
        source_collection: impl Into<String>,
        pipeline: &Pipeline,
    ) -> MongoResult<Self> {
        let name = name.into();
        let mut stages = pipeline.to_documents()?;
        stages.extend(OutStage::collection(name.as_str()).to_documents(&RootContext)?);
        Ok(Self {
            name,
            source_collection: source_collection.into(),
            pipeline: stages,
        })
    }

    /// Materialize through `$merge` (incremental upsert into the target).
    pub fn with_merge(
        name: impl Into<String>,
        source_collection: impl Into<String>,
        pipeline: &Pipeline,
        merge: MergeStage,
    ) -> MongoResult<Self> {
        let mut stages = pipeline.to_documents()?;
        stages.extend(merge.to_documents(&RootContext)?);
        Ok(Self {
            name: name.into(),
            source_collection: source_collection.into(),
            pipeline: stages,
        })
    }
}

impl MongoClient {
    /// Create a view in the database.
    pub async fn create_view(&self, view: &AggregationView) -> MongoResult<()> {
        debug!(view = %view.name, source = %view.source_collection, "creating view");
        self.run_command(view.to_create_command()).await?;
        Ok(())
    }

    /// Drop a view.
    pub async fn drop_view(&self, name: &str) -> MongoResult<()> {
        self.drop_collection(name).await
    }

    /// List all view names in the database.
    pub async fn list_views(&self) -> MongoResult<Vec<String>> {
        let result = self
            .run_command(doc! {
                "listCollections": 1,
                "filter": { "type": "view" }
            })
            .await?;

        let cursor = result
            .get_document("cursor")
            .map_err(|e| MongoError::query(format!("invalid response: {e}")))?;
        let first_batch = cursor
            .get_array("firstBatch")
            .map_err(|e| MongoError::query(format!("invalid response: {e}")))?;

        let views = first_batch
            .iter()
            .filter_map(|entry| {
                entry
                    .as_document()
                    .and_then(|d| d.get_str("name").ok())
                    .map(String::from)
            })
            .collect();
        Ok(views)
    }

    /// Read a view's definition back from the server.
    pub async fn get_view_definition(&self, name: &str) -> MongoResult<Option<AggregationView>> {
        let result = self
            .run_command(doc! {
                "listCollections": 1,
                "filter": { "name": name, "type": "view" }
            })
            .await?;

        let cursor = result
            .get_document("cursor")
            .map_err(|e| MongoError::query(format!("invalid response: {e}")))?;
        let first_batch = cursor
            .get_array("firstBatch")
            .map_err(|e| MongoError::query(format!("invalid response: {e}")))?;

        let Some(entry) = first_batch.first() else {
            return Ok(None);
        };
        let entry = entry
            .as_document()
            .ok_or_else(|| MongoError::query("invalid view definition"))?;
        let options = entry
            .get_document("options")
            .map_err(|e| MongoError::query(format!("missing options: {e}")))?;
        let view_on = options
            .get_str("viewOn")
            .map_err(|e| MongoError::query(format!("missing viewOn: {e}")))?;
        let pipeline = options
            .get_array("pipeline")
            .map_err(|e| MongoError::query(format!("missing pipeline: {e}")))?
            .iter()
            .filter_map(|b| b.as_document().cloned())
            .collect();

        Ok(Some(AggregationView {
            name: name.to_string(),
            source_collection: view_on.to_string(),
            pipeline,
            collation: options.get_document("collation").ok().cloned(),
        }))
    }

    /// Refresh a materialized view by re-running its pipeline.
    pub async fn refresh_materialized_view(&self, view: &MaterializedView) -> MongoResult<()> {
        debug!(view = %view.name, source = %view.source_collection, "refreshing materialized view");

        let cursor = self
            .collection_doc(&view.source_collection)
            .aggregate(view.pipeline.clone(), None)
            .await?;

        // $out/$merge aggregations return an empty cursor; draining it
        // drives the pipeline to completion.
        let _: Vec<Document> = cursor.try_collect().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqueduct_aggregation::prelude::*;
    use pretty_assertions::assert_eq;

    fn sample_pipeline() -> Pipeline {
        Pipeline::new()
            .match_filter(FilterBuilder::new().eq("status", "active"))
            .group(GroupStage::by(Expr::field("region")).count("n"))
    }

    #[test]
    fn test_view_from_pipeline() {
        let view =
            AggregationView::from_pipeline("active_by_region", "users", &sample_pipeline()).unwrap();
        assert_eq!(view.name, "active_by_region");
        assert_eq!(view.source_collection, "users");
        assert_eq!(view.pipeline.len(), 2);
    }

    #[test]
    fn test_view_create_command() {
        let view = AggregationView::new(
            "test_view",
            "source",
            vec![doc! { "$match": { "active": true } }],
        );
        let command = view.to_create_command();
        assert_eq!(command.get_str("create").unwrap(), "test_view");
        assert_eq!(command.get_str("viewOn").unwrap(), "source");
    }

    #[test]
    fn test_materialized_view_out_appends_terminal_stage() {
        let view = MaterializedView::with_out("region_counts", "users", &sample_pipeline()).unwrap();
        assert_eq!(view.pipeline.len(), 3);
        assert_eq!(view.pipeline.last().unwrap(), &doc! { "$out": "region_counts" });
    }

    #[test]
    fn test_materialized_view_merge() {
        let merge = MergeStage::into_collection("region_counts")
            .on(["_id"])
            .when_matched(WhenMatched::Replace)
            .when_not_matched(WhenNotMatched::Insert);
        let view =
            MaterializedView::with_merge("region_counts", "users", &sample_pipeline(), merge)
                .unwrap();

        let last = view.pipeline.last().unwrap();
        assert!(last.contains_key("$merge"));
        assert_eq!(
            last.get_document("$merge").unwrap().get_str("on").unwrap(),
            "_id"
        );
    }

    #[test]
    fn test_view_serialization_round_trip() {
        let view = AggregationView::new("v", "s", vec![doc! { "$match": { "active": true } }]);
        let json = serde_json::to_string(&view).unwrap();
        let back: AggregationView = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, view.name);
        assert_eq!(back.source_collection, view.source_collection);
        assert_eq!(back.pipeline, view.pipeline);
    }
}
