//! The `$group` stage.

use bson::{Bson, Document, doc};
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::context::AggregationContext;
use crate::error::AggregationResult;
use crate::expr::{AccumulatorOperators, Expr};
use crate::field::{ExposedFields, field};

use super::{AggregationStage, FieldExposure};

/// The `_id` of a `$group` stage.
#[derive(Debug, Clone)]
pub enum GroupId {
    /// `_id: null` - a single group over all documents.
    None,
    /// A single grouping expression.
    Single(Expr),
    /// A composite id document of named expressions.
    Composite(Vec<(SmolStr, Expr)>),
}

/// `$group`: accumulate documents per grouping key.
///
/// # Example
///
/// ```rust,ignore
/// // { "$group": { "_id": "$region", "total": { "$sum": "$amount" }, "orders": { "$sum": 1 } } }
/// let stage = GroupStage::by(Expr::field("region"))
///     .sum("total", Expr::field("amount"))
///     .count("orders");
/// ```
#[derive(Debug, Clone)]
pub struct GroupStage {
    id: GroupId,
    items: IndexMap<SmolStr, Expr>,
}

impl GroupStage {
    /// Group by a single expression.
    pub fn by(expr: impl Into<Expr>) -> Self {
        Self {
            id: GroupId::Single(expr.into()),
            items: IndexMap::new(),
        }
    }

    /// Group everything into a single bucket (`_id: null`).
    pub fn by_none() -> Self {
        Self {
            id: GroupId::None,
            items: IndexMap::new(),
        }
    }

    /// Group by a composite id of named expressions.
    pub fn by_composite<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<SmolStr>,
    {
        Self {
            id: GroupId::Composite(parts.into_iter().map(|(n, e)| (n.into(), e)).collect()),
            items: IndexMap::new(),
        }
    }

    /// Add an accumulator under `name`; same-name entries replace in place.
    pub fn accumulate(mut self, name: impl Into<SmolStr>, accumulator: impl Into<Expr>) -> Self {
        self.items.insert(name.into(), accumulator.into());
        self
    }

    /// `$sum` accumulator.
    pub fn sum(self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.accumulate(name, AccumulatorOperators::sum(expr))
    }

    /// `$sum: 1` counter.
    pub fn count(self, name: impl Into<SmolStr>) -> Self {
        self.accumulate(name, AccumulatorOperators::sum(1))
    }

    /// `$avg` accumulator.
    pub fn avg(self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.accumulate(name, AccumulatorOperators::avg(expr))
    }

    /// `$min` accumulator.
    pub fn min(self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.accumulate(name, AccumulatorOperators::min(expr))
    }

    /// `$max` accumulator.
    pub fn max(self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.accumulate(name, AccumulatorOperators::max(expr))
    }

    /// `$first` accumulator.
    pub fn first(self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.accumulate(name, AccumulatorOperators::first(expr))
    }

    /// `$last` accumulator.
    pub fn last(self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.accumulate(name, AccumulatorOperators::last(expr))
    }

    /// `$push` accumulator.
    pub fn push(self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.accumulate(name, AccumulatorOperators::push(expr))
    }

    /// `$addToSet` accumulator.
    pub fn add_to_set(self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.accumulate(name, AccumulatorOperators::add_to_set(expr))
    }

    /// `$stdDevPop` accumulator.
    pub fn std_dev_pop(self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.accumulate(name, AccumulatorOperators::std_dev_pop(expr))
    }

    /// `$stdDevSamp` accumulator.
    pub fn std_dev_samp(self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.accumulate(name, AccumulatorOperators::std_dev_samp(expr))
    }
}

impl AggregationStage for GroupStage {
    fn name(&self) -> &'static str {
        "$group"
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let id = match &self.id {
            GroupId::None => Bson::Null,
            GroupId::Single(expr) => expr.to_bson(ctx)?,
            GroupId::Composite(parts) => {
                let mut id = Document::new();
                for (name, expr) in parts {
                    id.insert(name.as_str(), expr.to_bson(ctx)?);
                }
                Bson::Document(id)
            }
        };

        let mut group = doc! { "_id": id };
        for (name, expr) in &self.items {
            group.insert(name.as_str(), expr.to_bson(ctx)?);
        }
        Ok(vec![doc! { "$group": group }])
    }

    fn exposure(&self) -> FieldExposure {
        let mut exposed = ExposedFields::none().and_synthetic(field("_id"));
        for name in self.items.keys() {
            exposed = exposed.and_synthetic(field(name.clone()));
        }
        FieldExposure::Replace(exposed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_group_by_field_with_accumulators() {
        let stage = GroupStage::by(Expr::field("region"))
            .sum("total", Expr::field("amount"))
            .count("orders");
        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! {
                "$group": {
                    "_id": "$region",
                    "total": { "$sum": "$amount" },
                    "orders": { "$sum": 1 },
                }
            }]
        );
    }

    #[test]
    fn test_group_by_none() {
        let stage = GroupStage::by_none().avg("mean", Expr::field("score"));
        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! {
                "$group": { "_id": null, "mean": { "$avg": "$score" } }
            }]
        );
    }

    #[test]
    fn test_group_by_composite_id() {
        let stage = GroupStage::by_composite([
            ("region", Expr::field("region")),
            ("year", Expr::op("$year", vec![Expr::field("ts")])),
        ])
        .count("n");
        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! {
                "$group": {
                    "_id": { "region": "$region", "year": { "$year": "$ts" } },
                    "n": { "$sum": 1 },
                }
            }]
        );
    }

    #[test]
    fn test_group_exposes_id_and_accumulators() {
        let stage = GroupStage::by(Expr::field("region")).sum("total", Expr::field("amount"));
        match stage.exposure() {
            FieldExposure::Replace(exposed) => {
                assert_eq!(exposed.names(), vec!["_id", "total"]);
                assert!(exposed.iter().all(|f| f.is_synthetic()));
            }
            other => panic!("expected replace exposure, got {other:?}"),
        }
    }

    #[test]
    fn test_same_name_accumulator_replaces() {
        let stage = GroupStage::by_none()
            .sum("v", Expr::field("a"))
            .max("v", Expr::field("b"));
        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! {
                "$group": { "_id": null, "v": { "$max": "$b" } }
            }]
        );
    }
}
