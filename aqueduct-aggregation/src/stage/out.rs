//! The terminal `$out` and `$merge` stages.

use bson::{Bson, Document, doc};
use smol_str::SmolStr;

use crate::context::AggregationContext;
use crate::error::AggregationResult;

use super::{AggregationStage, StageConstraint};

/// `$out`: replace a target collection with the pipeline result.
///
/// Terminal: the assembler rejects pipelines where it is not last.
#[derive(Debug, Clone)]
pub struct OutStage {
    collection: SmolStr,
    db: Option<SmolStr>,
}

impl OutStage {
    /// Write into the given collection.
    pub fn collection(name: impl Into<SmolStr>) -> Self {
        Self {
            collection: name.into(),
            db: None,
        }
    }

    /// Write into a collection of another database.
    pub fn in_database(mut self, db: impl Into<SmolStr>) -> Self {
        self.db = Some(db.into());
        self
    }
}

impl AggregationStage for OutStage {
    fn name(&self) -> &'static str {
        "$out"
    }

    fn to_documents(&self, _ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let stage = match &self.db {
            None => doc! { "$out": self.collection.as_str() },
            Some(db) => doc! {
                "$out": { "db": db.as_str(), "coll": self.collection.as_str() }
            },
        };
        Ok(vec![stage])
    }

    fn constraint(&self) -> StageConstraint {
        StageConstraint::Terminal
    }
}

/// Action when a `$merge` document matches an existing one.
#[derive(Debug, Clone)]
pub enum WhenMatched {
    /// Replace the existing document.
    Replace,
    /// Keep the existing document.
    KeepExisting,
    /// Merge fields into the existing document.
    Merge,
    /// Fail the aggregation.
    Fail,
    /// Apply an update pipeline to the existing document.
    Pipeline(Vec<Document>),
}

/// Action when a `$merge` document matches nothing.
#[derive(Debug, Clone, Copy)]
pub enum WhenNotMatched {
    /// Insert the new document.
    Insert,
    /// Discard the new document.
    Discard,
    /// Fail the aggregation.
    Fail,
}

/// `$merge`: upsert the pipeline result into a target collection.
///
/// Terminal: the assembler rejects pipelines where it is not last.
#[derive(Debug, Clone)]
pub struct MergeStage {
    into: SmolStr,
    db: Option<SmolStr>,
    on: Vec<SmolStr>,
    when_matched: Option<WhenMatched>,
    when_not_matched: Option<WhenNotMatched>,
}

impl MergeStage {
    /// Merge into the given collection.
    pub fn into_collection(name: impl Into<SmolStr>) -> Self {
        Self {
            into: name.into(),
            db: None,
            on: Vec::new(),
            when_matched: None,
            when_not_matched: None,
        }
    }

    /// Merge into a collection of another database.
    pub fn in_database(mut self, db: impl Into<SmolStr>) -> Self {
        self.db = Some(db.into());
        self
    }

    /// Match documents on the given field(s) instead of `_id`.
    pub fn on<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.on = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Action for matching documents.
    pub fn when_matched(mut self, action: WhenMatched) -> Self {
        self.when_matched = Some(action);
        self
    }

    /// Action for non-matching documents.
    pub fn when_not_matched(mut self, action: WhenNotMatched) -> Self {
        self.when_not_matched = Some(action);
        self
    }
}

impl AggregationStage for MergeStage {
    fn name(&self) -> &'static str {
        "$merge"
    }

    fn to_documents(&self, _ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let mut spec = Document::new();
        match &self.db {
            None => spec.insert("into", self.into.as_str()),
            Some(db) => spec.insert(
                "into",
                doc! { "db": db.as_str(), "coll": self.into.as_str() },
            ),
        };

        match self.on.len() {
            0 => {}
            1 => {
                spec.insert("on", self.on[0].as_str());
            }
            _ => {
                let on: Vec<Bson> = self
                    .on
                    .iter()
                    .map(|f| Bson::String(f.to_string()))
                    .collect();
                spec.insert("on", on);
            }
        }

        if let Some(when_matched) = &self.when_matched {
            let value = match when_matched {
                WhenMatched::Replace => Bson::String("replace".into()),
                WhenMatched::KeepExisting => Bson::String("keepExisting".into()),
                WhenMatched::Merge => Bson::String("merge".into()),
                WhenMatched::Fail => Bson::String("fail".into()),
                WhenMatched::Pipeline(stages) => {
                    Bson::Array(stages.iter().cloned().map(Bson::Document).collect())
                }
            };
            spec.insert("whenMatched", value);
        }

        if let Some(when_not_matched) = self.when_not_matched {
            let value = match when_not_matched {
                WhenNotMatched::Insert => "insert",
                WhenNotMatched::Discard => "discard",
                WhenNotMatched::Fail => "fail",
            };
            spec.insert("whenNotMatched", value);
        }

        Ok(vec![doc! { "$merge": spec }])
    }

    fn constraint(&self) -> StageConstraint {
        StageConstraint::Terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_out_simple() {
        let stage = OutStage::collection("monthly_totals");
        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! { "$out": "monthly_totals" }]
        );
        assert_eq!(stage.constraint(), StageConstraint::Terminal);
    }

    #[test]
    fn test_out_with_database() {
        let stage = OutStage::collection("totals").in_database("reporting");
        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! { "$out": { "db": "reporting", "coll": "totals" } }]
        );
    }

    #[test]
    fn test_merge_full_form() {
        let stage = MergeStage::into_collection("totals")
            .on(["_id"])
            .when_matched(WhenMatched::Replace)
            .when_not_matched(WhenNotMatched::Insert);
        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! {
                "$merge": {
                    "into": "totals",
                    "on": "_id",
                    "whenMatched": "replace",
                    "whenNotMatched": "insert",
                }
            }]
        );
    }

    #[test]
    fn test_merge_multiple_on_fields_and_pipeline() {
        let stage = MergeStage::into_collection("totals")
            .on(["region", "year"])
            .when_matched(WhenMatched::Pipeline(vec![
                doc! { "$addFields": { "updated": "$$NOW" } },
            ]));
        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! {
                "$merge": {
                    "into": "totals",
                    "on": ["region", "year"],
                    "whenMatched": [{ "$addFields": { "updated": "$$NOW" } }],
                }
            }]
        );
    }
}
