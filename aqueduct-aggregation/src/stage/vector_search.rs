//! The `$vectorSearch` stage (Atlas Vector Search).

use bson::{Bson, Document, doc};
use smol_str::SmolStr;

use crate::context::AggregationContext;
use crate::error::AggregationResult;
use crate::field::{ExposedFields, field};

use super::{AggregationStage, FieldExposure, StageConstraint};

/// `$vectorSearch`: approximate or exact nearest-neighbour search against a
/// vector index.
///
/// Must be the first pipeline stage. With [`with_score`](Self::with_score)
/// set, a trailing `$addFields` stage projects the similarity score via
/// `{ "$meta": "vectorSearchScore" }`, so this stage emits two documents.
///
/// # Example
///
/// ```rust,ignore
/// let stage = VectorSearchStage::index("plot_index")
///     .path("plot_embedding")
///     .query_vector(vec![-0.002, 0.14, 0.03])
///     .limit(10)
///     .num_candidates(150)
///     .with_score("score");
/// ```
#[derive(Debug, Clone)]
pub struct VectorSearchStage {
    index: SmolStr,
    path: SmolStr,
    query_vector: Vec<f64>,
    limit: i64,
    num_candidates: Option<i64>,
    exact: bool,
    filter: Option<Document>,
    score_field: Option<SmolStr>,
}

impl VectorSearchStage {
    /// Search against the given vector index.
    pub fn index(name: impl Into<SmolStr>) -> Self {
        Self {
            index: name.into(),
            path: SmolStr::default(),
            query_vector: Vec::new(),
            limit: 10,
            num_candidates: None,
            exact: false,
            filter: None,
            score_field: None,
        }
    }

    /// The indexed vector field.
    pub fn path(mut self, path: impl Into<SmolStr>) -> Self {
        self.path = path.into();
        self
    }

    /// The query vector.
    pub fn query_vector(mut self, vector: Vec<f64>) -> Self {
        self.query_vector = vector;
        self
    }

    /// Number of results to return.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Candidates to consider during approximate search.
    pub fn num_candidates(mut self, candidates: i64) -> Self {
        self.num_candidates = Some(candidates);
        self
    }

    /// Use exact (ENN) instead of approximate search.
    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Pre-filter candidate documents.
    pub fn pre_filter(mut self, filter: Document) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Also expose the similarity score under the given field.
    pub fn with_score(mut self, name: impl Into<SmolStr>) -> Self {
        self.score_field = Some(name.into());
        self
    }
}

impl AggregationStage for VectorSearchStage {
    fn name(&self) -> &'static str {
        "$vectorSearch"
    }

    fn to_documents(&self, _ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let mut spec = doc! {
            "index": self.index.as_str(),
            "path": self.path.as_str(),
            "queryVector": self.query_vector.clone(),
            "limit": self.limit,
        };
        if self.exact {
            spec.insert("exact", true);
        } else if let Some(candidates) = self.num_candidates {
            spec.insert("numCandidates", candidates);
        }
        if let Some(filter) = &self.filter {
            spec.insert("filter", filter.clone());
        }

        let mut stages = vec![doc! { "$vectorSearch": spec }];
        if let Some(score) = &self.score_field {
            let mut fields = Document::new();
            fields.insert(
                score.as_str(),
                Bson::Document(doc! { "$meta": "vectorSearchScore" }),
            );
            stages.push(doc! { "$addFields": fields });
        }
        Ok(stages)
    }

    fn exposure(&self) -> FieldExposure {
        match &self.score_field {
            Some(score) => FieldExposure::Extend(
                ExposedFields::none().and_synthetic(field(score.clone())),
            ),
            None => FieldExposure::Keep,
        }
    }

    fn constraint(&self) -> StageConstraint {
        StageConstraint::First
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_approximate_search() {
        let stage = VectorSearchStage::index("plot_index")
            .path("embedding")
            .query_vector(vec![0.1, 0.2])
            .limit(5)
            .num_candidates(100);

        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! {
                "$vectorSearch": {
                    "index": "plot_index",
                    "path": "embedding",
                    "queryVector": [0.1, 0.2],
                    "limit": 5_i64,
                    "numCandidates": 100_i64,
                }
            }]
        );
    }

    #[test]
    fn test_exact_search_ignores_candidates() {
        let stage = VectorSearchStage::index("idx")
            .path("v")
            .query_vector(vec![1.0])
            .num_candidates(100)
            .exact();

        let docs = stage.to_documents(&RootContext).unwrap();
        let spec = docs[0].get_document("$vectorSearch").unwrap();
        assert!(spec.get_bool("exact").unwrap());
        assert!(!spec.contains_key("numCandidates"));
    }

    #[test]
    fn test_score_projection_emits_second_stage() {
        let stage = VectorSearchStage::index("idx")
            .path("v")
            .query_vector(vec![1.0])
            .with_score("score");

        let docs = stage.to_documents(&RootContext).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(
            docs[1],
            doc! { "$addFields": { "score": { "$meta": "vectorSearchScore" } } }
        );
        match stage.exposure() {
            FieldExposure::Extend(exposed) => assert_eq!(exposed.names(), vec!["score"]),
            other => panic!("expected extend exposure, got {other:?}"),
        }
    }

    #[test]
    fn test_constraint_is_first() {
        let stage = VectorSearchStage::index("idx");
        assert_eq!(stage.constraint(), StageConstraint::First);
    }
}
