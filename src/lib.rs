//! # Aqueduct
//!
//! A type-safe MongoDB aggregation pipeline compiler and ODM layer for Rust.
//!
//! Aqueduct provides:
//! - Typed stage and expression builders that compile to wire documents
//! - Field-visibility tracking across pipeline stages, with strict-mode
//!   compile-time checking of symbolic references
//! - A small embedded expression language for arithmetic, logic and
//!   property-path expressions
//! - Async execution, views and materialized views over the official
//!   MongoDB driver
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aqueduct_odm::prelude::*;
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
//!         .group(
//!             GroupStage::by(Expr::field("region"))
//!                 .sum("total", expression("amount * rate")?),
//!         )
//!         .sort(SortStage::new().desc("total"))
//!         .limit(10);
//!
//!     let totals: Vec<Document> = client
//!         .runner()
//!         .run_documents("orders", &pipeline, None)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod logging;

/// Pipeline compilation: stages, expressions, contexts, the expression
/// language.
pub mod aggregation {
    pub use aqueduct_aggregation::*;
}

/// Driver integration: client, execution, views.
pub mod mongodb {
    pub use aqueduct_mongodb::*;
}

pub use aqueduct_aggregation::{
    AggregationError, AggregationResult, Expr, FilterBuilder, Pipeline, expression,
};
pub use aqueduct_mongodb::{
    AggregationOptions, AggregationRunner, MongoClient, MongoConfig, MongoError, MongoResult,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use aqueduct_aggregation::prelude::*;
    pub use aqueduct_mongodb::prelude::*;
}
