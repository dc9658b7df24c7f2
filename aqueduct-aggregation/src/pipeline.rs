//! Pipeline assembly: ordered stages, context threading, verification.

use std::sync::Arc;

use bson::Document;
use tracing::debug;

use crate::context::{ContextRef, ExposedFieldsContext, LookupPolicy, RootContext};
use crate::error::{AggregationError, AggregationResult};
use crate::expr::Expr;
use crate::filter::FilterBuilder;
use crate::stage::{
    AddFieldsStage, AggregationStage, BucketAutoStage, BucketStage, CountStage, FacetStage,
    FieldExposure, GroupStage, LimitStage, LookupStage, MatchStage, MergeStage, OutStage,
    PaginateStage, ProjectStage, RawStage, ReplaceRootStage, SampleStage, SetWindowFieldsStage,
    SkipStage, SortByCountStage, SortStage, StageConstraint, UnionWithStage, UnsetStage,
    UnwindStage, VectorSearchStage,
};

/// An ordered list of aggregation stages.
///
/// Compiling a pipeline threads an operation-context chain through its
/// stages: each stage renders against the visibility its predecessors left
/// behind, then folds its own field exposure into the context for its
/// successors. Stages that emit several wire documents are flattened in
/// order.
///
/// # Example
///
/// ```rust,ignore
/// use aqueduct_aggregation::prelude::*;
///
/// let pipeline = Pipeline::new()
///     .match_filter(FilterBuilder::new().eq("status", "complete"))
///     .group(GroupStage::by(Expr::field("region")).sum("total", Expr::field("amount")))
///     .sort(SortStage::new().desc("total"))
///     .limit(5);
///
/// let documents = pipeline.to_documents()?;
/// ```
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn AggregationStage>>,
    policy: LookupPolicy,
}

impl Pipeline {
    /// Create an empty pipeline with relaxed reference resolution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn unresolvable field references into compile-time errors.
    pub fn strict(mut self) -> Self {
        self.policy = LookupPolicy::Strict;
        self
    }

    /// Append any stage.
    pub fn stage(mut self, stage: impl AggregationStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Append a `$match` with a query document.
    pub fn match_query(self, filter: Document) -> Self {
        self.stage(MatchStage::query(filter))
    }

    /// Append a `$match` from a [`FilterBuilder`].
    pub fn match_filter(self, filter: FilterBuilder) -> Self {
        self.stage(MatchStage::filter(filter))
    }

    /// Append a `$match` wrapping an expression in `$expr`.
    pub fn match_expr(self, expr: impl Into<Expr>) -> Self {
        self.stage(MatchStage::expr(expr))
    }

    /// Append a `$project` stage.
    pub fn project(self, stage: ProjectStage) -> Self {
        self.stage(stage)
    }

    /// Append a `$group` stage.
    pub fn group(self, stage: GroupStage) -> Self {
        self.stage(stage)
    }

    /// Append a `$sort` stage.
    pub fn sort(self, stage: SortStage) -> Self {
        self.stage(stage)
    }

    /// Append a `$limit` stage.
    pub fn limit(self, limit: i64) -> Self {
        self.stage(LimitStage(limit))
    }

    /// Append a `$skip` stage.
    pub fn skip(self, skip: u64) -> Self {
        self.stage(SkipStage(skip))
    }

    /// Append `$skip` + `$limit` for 0-based page `page` of `size` documents.
    pub fn paginate(self, page: u64, size: i64) -> Self {
        self.stage(PaginateStage::page(page, size))
    }

    /// Append a `$sample` stage.
    pub fn sample(self, size: i64) -> Self {
        self.stage(SampleStage(size))
    }

    /// Append a `$count` stage.
    pub fn count(self, field: &str) -> Self {
        self.stage(CountStage::into_field(field))
    }

    /// Append an `$unwind` stage.
    pub fn unwind(self, stage: UnwindStage) -> Self {
        self.stage(stage)
    }

    /// Append a `$lookup` stage.
    pub fn lookup(self, stage: LookupStage) -> Self {
        self.stage(stage)
    }

    /// Append an `$addFields`/`$set` stage.
    pub fn add_fields(self, stage: AddFieldsStage) -> Self {
        self.stage(stage)
    }

    /// Append an `$unset` stage.
    pub fn unset<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<smol_str::SmolStr>,
    {
        self.stage(UnsetStage::fields(fields))
    }

    /// Append a `$replaceRoot` stage.
    pub fn replace_root(self, new_root: impl Into<Expr>) -> Self {
        self.stage(ReplaceRootStage::with(new_root))
    }

    /// Append a `$facet` stage.
    pub fn facet(self, stage: FacetStage) -> Self {
        self.stage(stage)
    }

    /// Append a `$bucket` stage.
    pub fn bucket(self, stage: BucketStage) -> Self {
        self.stage(stage)
    }

    /// Append a `$bucketAuto` stage.
    pub fn bucket_auto(self, stage: BucketAutoStage) -> Self {
        self.stage(stage)
    }

    /// Append a `$sortByCount` stage.
    pub fn sort_by_count(self, expr: impl Into<Expr>) -> Self {
        self.stage(SortByCountStage::by(expr))
    }

    /// Append a `$unionWith` stage.
    pub fn union_with(self, stage: UnionWithStage) -> Self {
        self.stage(stage)
    }

    /// Append a `$setWindowFields` stage.
    pub fn set_window_fields(self, stage: SetWindowFieldsStage) -> Self {
        self.stage(stage)
    }

    /// Append a `$vectorSearch` stage.
    pub fn vector_search(self, stage: VectorSearchStage) -> Self {
        self.stage(stage)
    }

    /// Append a terminal `$out` stage.
    pub fn out(self, stage: OutStage) -> Self {
        self.stage(stage)
    }

    /// Append a terminal `$merge` stage.
    pub fn merge(self, stage: MergeStage) -> Self {
        self.stage(stage)
    }

    /// Append a prebuilt stage document verbatim.
    pub fn raw(self, stage: Document) -> Self {
        self.stage(RawStage(stage))
    }

    /// The assembled stages.
    pub fn stages(&self) -> &[Box<dyn AggregationStage>] {
        &self.stages
    }

    /// Number of stages (before multi-document flattening).
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether no stages were added.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Check structural invariants without rendering.
    ///
    /// - the pipeline must contain at least one stage;
    /// - a terminal stage ($out, $merge) may only appear last;
    /// - a first-only stage ($vectorSearch) may only appear first.
    pub fn verify(&self) -> AggregationResult<()> {
        if self.stages.is_empty() {
            return Err(AggregationError::invalid_pipeline(
                "pipeline contains no stages",
            ));
        }
        let last = self.stages.len() - 1;
        for (position, stage) in self.stages.iter().enumerate() {
            match stage.constraint() {
                StageConstraint::Terminal if position != last => {
                    return Err(AggregationError::invalid_pipeline(format!(
                        "{} must be the last stage (found at position {position})",
                        stage.name()
                    )));
                }
                StageConstraint::First if position != 0 => {
                    return Err(AggregationError::invalid_pipeline(format!(
                        "{} must be the first stage (found at position {position})",
                        stage.name()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Compile to wire documents, starting from root visibility.
    pub fn to_documents(&self) -> AggregationResult<Vec<Document>> {
        self.to_documents_with(RootContext::shared())
    }

    /// Compile to wire documents, starting from the given context.
    pub fn to_documents_with(&self, initial: ContextRef) -> AggregationResult<Vec<Document>> {
        self.verify()?;
        debug!(stages = self.stages.len(), "compiling aggregation pipeline");

        let mut documents = Vec::with_capacity(self.stages.len());
        let mut current = initial;
        for stage in &self.stages {
            documents.extend(stage.to_documents(current.as_ref())?);
            current = match stage.exposure() {
                FieldExposure::Keep => current,
                FieldExposure::Reset => RootContext::shared(),
                FieldExposure::Replace(exposed) => {
                    Arc::new(ExposedFieldsContext::replacing(exposed, self.policy))
                }
                FieldExposure::Extend(exposed) => {
                    Arc::new(ExposedFieldsContext::extending(exposed, current, self.policy))
                }
            };
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{AccumulatorOperators, ArithmeticOperators};
    use crate::field::aliased;
    use crate::stage::{Window, WindowOutput};
    use bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_basic_pipeline() {
        let pipeline = Pipeline::new()
            .match_filter(FilterBuilder::new().eq("status", "complete"))
            .group(GroupStage::by(Expr::field("region")).sum("total", Expr::field("amount")))
            .sort(SortStage::new().desc("total"))
            .limit(5);

        assert_eq!(
            pipeline.to_documents().unwrap(),
            vec![
                doc! { "$match": { "status": "complete" } },
                doc! { "$group": { "_id": "$region", "total": { "$sum": "$amount" } } },
                doc! { "$sort": { "total": -1 } },
                doc! { "$limit": 5_i64 },
            ]
        );
    }

    #[test]
    fn test_context_threading_after_group() {
        // "total" only exists after the $group stage; strict mode accepts
        // it downstream and rejects names the group did not expose.
        let ok = Pipeline::new()
            .strict()
            .group(GroupStage::by(Expr::field("region")).sum("total", Expr::field("amount")))
            .sort(SortStage::new().desc("total"));
        assert!(ok.to_documents().is_ok());

        let bad = Pipeline::new()
            .strict()
            .group(GroupStage::by(Expr::field("region")).sum("total", Expr::field("amount")))
            .sort(SortStage::new().desc("amount"));
        let err = bad.to_documents().unwrap_err();
        assert!(err.is_unknown_field());
    }

    #[test]
    fn test_projection_rename_visible_downstream() {
        let pipeline = Pipeline::new()
            .strict()
            .project(ProjectStage::new().and_field(aliased("total", "order.amount")))
            .match_expr(ArithmeticOperators::value_of("total").subtract(0));

        assert_eq!(
            pipeline.to_documents().unwrap(),
            vec![
                doc! { "$project": { "total": "$order.amount" } },
                doc! { "$match": { "$expr": { "$subtract": ["$total", 0] } } },
            ]
        );
    }

    #[test]
    fn test_extend_keeps_previous_fields_visible() {
        let pipeline = Pipeline::new()
            .strict()
            .project(ProjectStage::include(["amount"]))
            .add_fields(AddFieldsStage::new().field(
                "doubled",
                ArithmeticOperators::value_of("amount").multiply_by(2),
            ))
            .sort(SortStage::new().desc("doubled").asc("amount"));

        assert!(pipeline.to_documents().is_ok());
    }

    #[test]
    fn test_replace_root_resets_visibility() {
        let pipeline = Pipeline::new()
            .strict()
            .project(ProjectStage::include(["details"]))
            .replace_root(Expr::field("details"))
            .sort(SortStage::new().asc("anything"));

        assert!(pipeline.to_documents().is_ok());
    }

    #[test]
    fn test_multi_document_stages_flatten() {
        let pipeline = Pipeline::new()
            .match_query(doc! {})
            .paginate(1, 20);

        assert_eq!(
            pipeline.to_documents().unwrap(),
            vec![
                doc! { "$match": {} },
                doc! { "$skip": 20_i64 },
                doc! { "$limit": 20_i64 },
            ]
        );
    }

    #[test]
    fn test_vector_search_score_flattens_and_extends() {
        let pipeline = Pipeline::new()
            .strict()
            .vector_search(
                VectorSearchStage::index("idx")
                    .path("embedding")
                    .query_vector(vec![0.5])
                    .with_score("score"),
            )
            .sort(SortStage::new().desc("score"));

        let docs = pipeline.to_documents().unwrap();
        assert_eq!(docs.len(), 3);
        assert!(docs[1].contains_key("$addFields"));
        assert_eq!(docs[2], doc! { "$sort": { "score": -1 } });
    }

    #[test]
    fn test_empty_pipeline_is_invalid() {
        let err = Pipeline::new().to_documents().unwrap_err();
        assert!(matches!(err, AggregationError::InvalidPipeline(_)));
    }

    #[test]
    fn test_terminal_stage_must_be_last() {
        let pipeline = Pipeline::new()
            .out(OutStage::collection("totals"))
            .limit(1);
        let err = pipeline.verify().unwrap_err();
        assert!(err.to_string().contains("$out must be the last stage"));

        let ok = Pipeline::new().limit(1).out(OutStage::collection("totals"));
        assert!(ok.verify().is_ok());
    }

    #[test]
    fn test_merge_must_be_last() {
        let pipeline = Pipeline::new()
            .merge(MergeStage::into_collection("totals"))
            .limit(1);
        assert!(pipeline.verify().is_err());
    }

    #[test]
    fn test_vector_search_must_be_first() {
        let pipeline = Pipeline::new().limit(1).vector_search(
            VectorSearchStage::index("idx").path("v").query_vector(vec![1.0]),
        );
        let err = pipeline.verify().unwrap_err();
        assert!(err.to_string().contains("$vectorSearch must be the first stage"));
    }

    #[test]
    fn test_window_fields_in_pipeline() {
        let pipeline = Pipeline::new()
            .set_window_fields(
                SetWindowFieldsStage::new()
                    .partition_by(Expr::field("region"))
                    .sort_asc("date")
                    .output(
                        WindowOutput::new(
                            "running",
                            AccumulatorOperators::sum(Expr::field("amount")),
                        )
                        .over(Window::cumulative()),
                    ),
            )
            .sort(SortStage::new().desc("running"));

        assert!(pipeline.to_documents().is_ok());
    }

    #[test]
    fn test_raw_stage_in_pipeline() {
        let pipeline = Pipeline::new().raw(doc! { "$indexStats": {} });
        assert_eq!(
            pipeline.to_documents().unwrap(),
            vec![doc! { "$indexStats": {} }]
        );
    }
}
