//! The `$facet`, `$bucket` and `$bucketAuto` stages.

use bson::{Bson, Document, doc};
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::context::AggregationContext;
use crate::error::AggregationResult;
use crate::expr::Expr;
use crate::field::{ExposedFields, field};
use crate::pipeline::Pipeline;

use super::{AggregationStage, FieldExposure};

/// `$facet`: run several sub-pipelines over the same input documents.
///
/// Each branch compiles in its own root scope; at that point the upstream
/// exposed names are the physical document keys, so references render the
/// same either way. Strict resolution does not descend into branches.
#[derive(Debug)]
pub struct FacetStage {
    facets: Vec<(SmolStr, Pipeline)>,
}

impl FacetStage {
    /// Create an empty `$facet` stage.
    pub fn new() -> Self {
        Self { facets: Vec::new() }
    }

    /// Add a named branch.
    pub fn branch(mut self, name: impl Into<SmolStr>, pipeline: Pipeline) -> Self {
        self.facets.push((name.into(), pipeline));
        self
    }
}

impl Default for FacetStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationStage for FacetStage {
    fn name(&self) -> &'static str {
        "$facet"
    }

    fn to_documents(&self, _ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let mut facets = Document::new();
        for (name, pipeline) in &self.facets {
            facets.insert(name.as_str(), pipeline.to_documents()?);
        }
        Ok(vec![doc! { "$facet": facets }])
    }

    fn exposure(&self) -> FieldExposure {
        let mut exposed = ExposedFields::none();
        for (name, _) in &self.facets {
            exposed = exposed.and_synthetic(field(name.clone()));
        }
        FieldExposure::Replace(exposed)
    }
}

/// `$bucket`: group into buckets by explicit boundaries.
#[derive(Debug, Clone)]
pub struct BucketStage {
    group_by: Expr,
    boundaries: Vec<Bson>,
    default_bucket: Option<Bson>,
    output: IndexMap<SmolStr, Expr>,
}

impl BucketStage {
    /// Bucket by the given expression.
    pub fn by(group_by: impl Into<Expr>) -> Self {
        Self {
            group_by: group_by.into(),
            boundaries: Vec::new(),
            default_bucket: None,
            output: IndexMap::new(),
        }
    }

    /// Set the bucket boundaries (ascending, same type).
    pub fn boundaries<I, B>(mut self, boundaries: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bson>,
    {
        self.boundaries = boundaries.into_iter().map(Into::into).collect();
        self
    }

    /// Bucket id for values outside the boundaries.
    pub fn default_bucket(mut self, id: impl Into<Bson>) -> Self {
        self.default_bucket = Some(id.into());
        self
    }

    /// Add an output accumulator.
    pub fn output(mut self, name: impl Into<SmolStr>, accumulator: impl Into<Expr>) -> Self {
        self.output.insert(name.into(), accumulator.into());
        self
    }

    fn output_exposure(&self) -> FieldExposure {
        let mut exposed = ExposedFields::none().and_synthetic(field("_id"));
        if self.output.is_empty() {
            // The server adds a count output when none is given.
            exposed = exposed.and_synthetic(field("count"));
        }
        for name in self.output.keys() {
            exposed = exposed.and_synthetic(field(name.clone()));
        }
        FieldExposure::Replace(exposed)
    }

    fn render_output(&self, ctx: &dyn AggregationContext) -> AggregationResult<Option<Document>> {
        if self.output.is_empty() {
            return Ok(None);
        }
        let mut output = Document::new();
        for (name, expr) in &self.output {
            output.insert(name.as_str(), expr.to_bson(ctx)?);
        }
        Ok(Some(output))
    }
}

impl AggregationStage for BucketStage {
    fn name(&self) -> &'static str {
        "$bucket"
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let mut spec = doc! {
            "groupBy": self.group_by.to_bson(ctx)?,
            "boundaries": self.boundaries.clone(),
        };
        if let Some(default_bucket) = &self.default_bucket {
            spec.insert("default", default_bucket.clone());
        }
        if let Some(output) = self.render_output(ctx)? {
            spec.insert("output", output);
        }
        Ok(vec![doc! { "$bucket": spec }])
    }

    fn exposure(&self) -> FieldExposure {
        self.output_exposure()
    }
}

/// `$bucketAuto`: group into a target number of evenly sized buckets.
#[derive(Debug, Clone)]
pub struct BucketAutoStage {
    group_by: Expr,
    buckets: i32,
    granularity: Option<SmolStr>,
    output: IndexMap<SmolStr, Expr>,
}

impl BucketAutoStage {
    /// Bucket by the given expression into `buckets` buckets.
    pub fn by(group_by: impl Into<Expr>, buckets: i32) -> Self {
        Self {
            group_by: group_by.into(),
            buckets,
            granularity: None,
            output: IndexMap::new(),
        }
    }

    /// Round boundaries to a preferred-number series (`"R5"`, `"E24"`,
    /// `"POWERSOF2"`, ...).
    pub fn granularity(mut self, series: impl Into<SmolStr>) -> Self {
        self.granularity = Some(series.into());
        self
    }

    /// Add an output accumulator.
    pub fn output(mut self, name: impl Into<SmolStr>, accumulator: impl Into<Expr>) -> Self {
        self.output.insert(name.into(), accumulator.into());
        self
    }
}

impl AggregationStage for BucketAutoStage {
    fn name(&self) -> &'static str {
        "$bucketAuto"
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let mut spec = doc! {
            "groupBy": self.group_by.to_bson(ctx)?,
            "buckets": self.buckets,
        };
        if let Some(granularity) = &self.granularity {
            spec.insert("granularity", granularity.as_str());
        }
        if !self.output.is_empty() {
            let mut output = Document::new();
            for (name, expr) in &self.output {
                output.insert(name.as_str(), expr.to_bson(ctx)?);
            }
            spec.insert("output", output);
        }
        Ok(vec![doc! { "$bucketAuto": spec }])
    }

    fn exposure(&self) -> FieldExposure {
        let mut exposed = ExposedFields::none().and_synthetic(field("_id"));
        if self.output.is_empty() {
            exposed = exposed.and_synthetic(field("count"));
        }
        for name in self.output.keys() {
            exposed = exposed.and_synthetic(field(name.clone()));
        }
        FieldExposure::Replace(exposed)
    }
}
