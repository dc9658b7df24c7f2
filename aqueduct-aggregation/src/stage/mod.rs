//! Pipeline stages: typed builders lowering to wire-format documents.
//!
//! Every stage implements [`AggregationStage`]: given an operation context
//! it renders one or more wire documents, and reports how it changes field
//! visibility for the stages after it. The pipeline assembler threads the
//! context chain and flattens multi-document stages in order.

mod add_fields;
mod facet;
mod group;
mod lookup;
mod out;
mod project;
mod unwind;
mod vector_search;
mod window;

pub use add_fields::{AddFieldsStage, ReplaceRootStage};
pub use facet::{BucketAutoStage, BucketStage, FacetStage};
pub use group::{GroupId, GroupStage};
pub use lookup::LookupStage;
pub use out::{MergeStage, OutStage, WhenMatched, WhenNotMatched};
pub use project::ProjectStage;
pub use unwind::UnwindStage;
pub use vector_search::VectorSearchStage;
pub use window::{
    SetWindowFieldsStage, Window, WindowBound, WindowOperators, WindowOutput,
};

use std::fmt;

use bson::{Bson, Document, doc};
use smol_str::SmolStr;

use crate::context::AggregationContext;
use crate::error::AggregationResult;
use crate::expr::Expr;
use crate::field::{ExposedFields, Field, field};
use crate::filter::FilterBuilder;

/// How a stage changes field visibility for its successors.
#[derive(Debug, Clone)]
pub enum FieldExposure {
    /// Visibility is unchanged.
    Keep,
    /// Only the given fields are visible afterwards.
    Replace(ExposedFields),
    /// The given fields become visible in addition to everything before.
    Extend(ExposedFields),
    /// Visibility resets to root semantics (any name resolves).
    Reset,
}

/// Placement constraints enforced by the pipeline assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageConstraint {
    /// No placement constraint.
    None,
    /// Must be the first stage ($vectorSearch).
    First,
    /// Must be the last stage ($out, $merge).
    Terminal,
}

/// A pipeline stage: renders wire documents given an operation context.
pub trait AggregationStage: fmt::Debug + Send + Sync {
    /// The wire-format stage name, e.g. `$match`.
    fn name(&self) -> &'static str;

    /// Render the stage, resolving symbolic references through `ctx`.
    ///
    /// Most stages emit exactly one document; convenience stages may emit
    /// several, which the assembler flattens in order.
    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>>;

    /// How this stage changes field visibility for its successors.
    fn exposure(&self) -> FieldExposure {
        FieldExposure::Keep
    }

    /// Placement constraint for [`Pipeline::verify`](crate::pipeline::Pipeline::verify).
    fn constraint(&self) -> StageConstraint {
        StageConstraint::None
    }
}

/// `$match` with a query filter or an `$expr` expression.
#[derive(Debug, Clone)]
pub struct MatchStage {
    source: MatchSource,
}

#[derive(Debug, Clone)]
enum MatchSource {
    /// A query document, passed through verbatim.
    Query(Document),
    /// An aggregation expression, wrapped in `$expr`.
    Expr(Expr),
}

impl MatchStage {
    /// Match with a prebuilt query document.
    pub fn query(filter: Document) -> Self {
        Self {
            source: MatchSource::Query(filter),
        }
    }

    /// Match with a [`FilterBuilder`].
    pub fn filter(builder: FilterBuilder) -> Self {
        Self::query(builder.build())
    }

    /// Match with an aggregation expression (`{ "$match": { "$expr": ... } }`).
    pub fn expr(expr: impl Into<Expr>) -> Self {
        Self {
            source: MatchSource::Expr(expr.into()),
        }
    }
}

impl AggregationStage for MatchStage {
    fn name(&self) -> &'static str {
        "$match"
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let stage = match &self.source {
            MatchSource::Query(filter) => doc! { "$match": filter.clone() },
            MatchSource::Expr(expr) => doc! { "$match": { "$expr": expr.to_bson(ctx)? } },
        };
        Ok(vec![stage])
    }
}

/// Sort direction for `$sort` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortDirection {
    /// Ascending (1).
    Asc,
    /// Descending (-1).
    Desc,
}

#[derive(Debug, Clone)]
enum SortKey {
    Direction(SortDirection),
    TextScore,
}

/// `$sort` over one or more keys.
#[derive(Debug, Clone, Default)]
pub struct SortStage {
    keys: Vec<(Field, SortKey)>,
}

impl SortStage {
    /// Create an empty sort.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort ascending by `name`.
    pub fn asc(mut self, name: impl Into<SmolStr>) -> Self {
        self.keys
            .push((field(name), SortKey::Direction(SortDirection::Asc)));
        self
    }

    /// Sort descending by `name`.
    pub fn desc(mut self, name: impl Into<SmolStr>) -> Self {
        self.keys
            .push((field(name), SortKey::Direction(SortDirection::Desc)));
        self
    }

    /// Sort by text-search relevance (`{ "$meta": "textScore" }`).
    pub fn meta_text_score(mut self, name: impl Into<SmolStr>) -> Self {
        self.keys.push((field(name), SortKey::TextScore));
        self
    }
}

impl AggregationStage for SortStage {
    fn name(&self) -> &'static str {
        "$sort"
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let mut sort = Document::new();
        for (field, key) in &self.keys {
            let reference = ctx.reference_for(field)?;
            let value = match key {
                SortKey::Direction(SortDirection::Asc) => Bson::Int32(1),
                SortKey::Direction(SortDirection::Desc) => Bson::Int32(-1),
                SortKey::TextScore => Bson::Document(doc! { "$meta": "textScore" }),
            };
            sort.insert(reference.raw(), value);
        }
        Ok(vec![doc! { "$sort": sort }])
    }
}

/// `$limit`.
#[derive(Debug, Clone, Copy)]
pub struct LimitStage(pub i64);

impl AggregationStage for LimitStage {
    fn name(&self) -> &'static str {
        "$limit"
    }

    fn to_documents(&self, _ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        Ok(vec![doc! { "$limit": self.0 }])
    }
}

/// `$skip`.
#[derive(Debug, Clone, Copy)]
pub struct SkipStage(pub u64);

impl AggregationStage for SkipStage {
    fn name(&self) -> &'static str {
        "$skip"
    }

    fn to_documents(&self, _ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        Ok(vec![doc! { "$skip": self.0 as i64 }])
    }
}

/// `$skip` + `$limit` as one convenience stage.
#[derive(Debug, Clone, Copy)]
pub struct PaginateStage {
    /// Documents to skip.
    pub skip: u64,
    /// Page size.
    pub limit: i64,
}

impl PaginateStage {
    /// Page `page` (0-based) of `size` documents.
    pub fn page(page: u64, size: i64) -> Self {
        Self {
            skip: page * size as u64,
            limit: size,
        }
    }
}

impl AggregationStage for PaginateStage {
    fn name(&self) -> &'static str {
        "$skip"
    }

    fn to_documents(&self, _ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        Ok(vec![
            doc! { "$skip": self.skip as i64 },
            doc! { "$limit": self.limit },
        ])
    }
}

/// `$count`: collapse the stream into a single document with one field.
#[derive(Debug, Clone)]
pub struct CountStage {
    field: SmolStr,
}

impl CountStage {
    /// Count into the given output field.
    pub fn into_field(name: impl Into<SmolStr>) -> Self {
        Self { field: name.into() }
    }
}

impl AggregationStage for CountStage {
    fn name(&self) -> &'static str {
        "$count"
    }

    fn to_documents(&self, _ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        Ok(vec![doc! { "$count": self.field.as_str() }])
    }

    fn exposure(&self) -> FieldExposure {
        FieldExposure::Replace(ExposedFields::none().and_synthetic(field(self.field.clone())))
    }
}

/// `$sample`.
#[derive(Debug, Clone, Copy)]
pub struct SampleStage(pub i64);

impl AggregationStage for SampleStage {
    fn name(&self) -> &'static str {
        "$sample"
    }

    fn to_documents(&self, _ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        Ok(vec![doc! { "$sample": { "size": self.0 } }])
    }
}

/// `$unset`: remove fields.
#[derive(Debug, Clone)]
pub struct UnsetStage {
    fields: Vec<Field>,
}

impl UnsetStage {
    /// Remove the given fields.
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            fields: names.into_iter().map(field).collect(),
        }
    }
}

impl AggregationStage for UnsetStage {
    fn name(&self) -> &'static str {
        "$unset"
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let mut paths = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            paths.push(ctx.reference_for(field)?.raw().to_string());
        }
        let stage = if paths.len() == 1 {
            doc! { "$unset": paths.remove(0) }
        } else {
            doc! { "$unset": paths }
        };
        Ok(vec![stage])
    }
}

/// `$sortByCount`: group by an expression and sort by descending count.
#[derive(Debug, Clone)]
pub struct SortByCountStage {
    expr: Expr,
}

impl SortByCountStage {
    /// Group and count by the given expression.
    pub fn by(expr: impl Into<Expr>) -> Self {
        Self { expr: expr.into() }
    }
}

impl AggregationStage for SortByCountStage {
    fn name(&self) -> &'static str {
        "$sortByCount"
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        Ok(vec![doc! { "$sortByCount": self.expr.to_bson(ctx)? }])
    }

    fn exposure(&self) -> FieldExposure {
        FieldExposure::Replace(
            ExposedFields::none()
                .and_synthetic(field("_id"))
                .and_synthetic(field("count")),
        )
    }
}

/// `$unionWith`: append documents from another collection.
#[derive(Debug)]
pub struct UnionWithStage {
    collection: SmolStr,
    pipeline: Option<crate::pipeline::Pipeline>,
}

impl UnionWithStage {
    /// Union with an entire collection.
    pub fn collection(name: impl Into<SmolStr>) -> Self {
        Self {
            collection: name.into(),
            pipeline: None,
        }
    }

    /// Apply a pipeline to the unioned collection first.
    pub fn with_pipeline(mut self, pipeline: crate::pipeline::Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }
}

impl AggregationStage for UnionWithStage {
    fn name(&self) -> &'static str {
        "$unionWith"
    }

    fn to_documents(&self, _ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let stage = match &self.pipeline {
            None => doc! { "$unionWith": self.collection.as_str() },
            Some(pipeline) => {
                // The unioned collection has its own root scope.
                let docs = pipeline.to_documents()?;
                doc! {
                    "$unionWith": {
                        "coll": self.collection.as_str(),
                        "pipeline": docs,
                    }
                }
            }
        };
        Ok(vec![stage])
    }
}

/// A prebuilt stage document, passed through verbatim.
#[derive(Debug, Clone)]
pub struct RawStage(pub Document);

impl AggregationStage for RawStage {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn to_documents(&self, _ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        Ok(vec![self.0.clone()])
    }
}
