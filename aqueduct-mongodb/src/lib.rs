//! # aqueduct-mongodb
//!
//! MongoDB driver integration for the Aqueduct ODM.
//!
//! This crate executes pipelines compiled by `aqueduct-aggregation` through
//! the official MongoDB driver:
//! - Connection configuration and a pooled client wrapper
//! - Typed aggregation execution ([`AggregationRunner`])
//! - Aggregation-backed views, regular and materialized
//! - Document conversion helpers
//!
//! ## Example
//!
//! ```rust,ignore
//! use aqueduct_aggregation::prelude::*;
//! use aqueduct_mongodb::MongoClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MongoClient::builder()
//!         .uri("mongodb://localhost:27017")
//!         .database("analytics")
//!         .build()
//!         .await?;
//!
//!     let pipeline = Pipeline::new()
//!         .match_filter(FilterBuilder::new().eq("status", "complete"))
//!         .group(GroupStage::by(Expr::field("region")).sum("total", Expr::field("amount")))
//!         .sort(SortStage::new().desc("total"));
//!
//!     let totals: Vec<bson::Document> = client
//!         .runner()
//!         .run_documents("orders", &pipeline, None)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod runner;
pub mod view;

pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use client::{MongoClient, MongoClientBuilder};
pub use config::{MongoConfig, MongoConfigBuilder, ReadPreference, WriteConcern};
pub use document::DocumentExt;
pub use error::{MongoError, MongoResult};
pub use mongodb::options::{Collation, Hint};
pub use runner::{AggregationOptions, AggregationRunner};
pub use view::{AggregationView, MaterializedView};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{MongoClient, MongoClientBuilder};
    pub use crate::config::{MongoConfig, MongoConfigBuilder, ReadPreference, WriteConcern};
    pub use crate::document::DocumentExt;
    pub use crate::error::{MongoError, MongoResult};
    pub use crate::runner::{AggregationOptions, AggregationRunner};
    pub use crate::view::{AggregationView, MaterializedView};
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
}
