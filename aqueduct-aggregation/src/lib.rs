//! # aqueduct-aggregation
//!
//! MongoDB aggregation pipeline compiler for the Aqueduct ODM.
//!
//! This crate lowers typed stage and expression builders - and a small
//! embedded expression language - into the wire-format documents the server
//! consumes. It performs no I/O: execution lives in `aqueduct-mongodb`.
//!
//! The compiler tracks which symbolic names are visible at every point of a
//! pipeline. Stages that reshape documents ($project, $group) replace the
//! visible set; stages that add fields ($addFields, $lookup) extend it; the
//! rest pass it through. Field references resolve against that visibility,
//! so renames propagate and - in strict mode - dangling references fail at
//! compile time rather than silently matching nothing on the server.
//!
//! ## Building a pipeline
//!
//! ```rust
//! use aqueduct_aggregation::prelude::*;
//!
//! let pipeline = Pipeline::new()
//!     .match_filter(FilterBuilder::new().eq("status", "complete"))
//!     .group(
//!         GroupStage::by(Expr::field("region"))
//!             .sum("total", Expr::field("amount"))
//!             .count("orders"),
//!     )
//!     .sort(SortStage::new().desc("total"))
//!     .limit(5);
//!
//! let documents = pipeline.to_documents().unwrap();
//! assert_eq!(documents.len(), 4);
//! ```
//!
//! ## The expression language
//!
//! ```rust
//! use aqueduct_aggregation::expression;
//! use aqueduct_aggregation::context::RootContext;
//!
//! let expr = expression("netPrice + discount * 2").unwrap();
//! let bson = expr.to_bson(&RootContext).unwrap();
//! // { "$add": ["$netPrice", { "$multiply": ["$discount", 2] }] }
//! ```
//!
//! ## Operator gateways
//!
//! Operator constructors are grouped the way the server groups them:
//! [`expr::SetOperators`], [`expr::DateOperators`], [`expr::ConvertOperators`],
//! [`expr::ObjectOperators`], [`expr::ArithmeticOperators`] and friends all
//! produce [`expr::Expr`] values that compose freely.

pub mod context;
pub mod error;
pub mod expr;
pub mod field;
pub mod filter;
pub mod parser;
pub mod pipeline;
pub mod stage;

pub use context::{AggregationContext, ContextRef, ExposedFieldsContext, LookupPolicy, NestedExprContext, RootContext};
pub use error::{AggregationError, AggregationResult};
pub use expr::{AggregationExpr, Expr};
pub use field::{ExposedField, ExposedFields, Field, FieldReference, Fields, ReferenceKind, aliased, field};
pub use filter::FilterBuilder;
pub use pipeline::Pipeline;

/// Compile expression-language input into an expression tree.
///
/// Shorthand for [`parser::transform`].
pub fn expression(input: &str) -> AggregationResult<Expr> {
    parser::transform(input)
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::context::{AggregationContext, LookupPolicy, RootContext};
    pub use crate::error::{AggregationError, AggregationResult};
    pub use crate::expr::{
        AccumulatorOperators, AggregationExpr, ArithmeticOperators, ArrayOperators,
        BooleanOperators, ComparisonOperators, ConditionalOperators, ConvertOperators,
        DateOperators, Expr, ObjectOperators, SetOperators, StringOperators, TimeUnit, Timezone,
        lit,
    };
    pub use crate::expression;
    pub use crate::field::{ExposedFields, Field, aliased, field};
    pub use crate::filter::FilterBuilder;
    pub use crate::pipeline::Pipeline;
    pub use crate::stage::{
        AddFieldsStage, AggregationStage, BucketAutoStage, BucketStage, CountStage, FacetStage,
        GroupStage, LookupStage, MatchStage, MergeStage, OutStage, ProjectStage,
        ReplaceRootStage, SetWindowFieldsStage, SortStage, UnionWithStage, UnwindStage,
        VectorSearchStage, WhenMatched, WhenNotMatched, Window, WindowBound, WindowOperators,
        WindowOutput,
    };
}
