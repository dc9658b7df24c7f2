//! The `$lookup` stage.

use bson::{Document, doc};
use smol_str::SmolStr;

use crate::context::AggregationContext;
use crate::error::AggregationResult;
use crate::expr::Expr;
use crate::field::{ExposedFields, Field, field};
use crate::pipeline::Pipeline;

use super::{AggregationStage, FieldExposure};

/// `$lookup`: a left outer join against another collection.
///
/// Supports the foreign-key form (`localField`/`foreignField`) and the
/// sub-pipeline form with `let` bindings. The joined collection has its own
/// root scope; `let` bindings surface in the sub-pipeline as `$$variables`.
///
/// # Example
///
/// ```rust,ignore
/// // Foreign-key form
/// let stage = LookupStage::from("orders")
///     .local_field("order_id")
///     .foreign_field("_id")
///     .into_field("orders");
///
/// // Sub-pipeline form
/// let stage = LookupStage::from("orders")
///     .let_var("cust", Expr::field("customer_id"))
///     .pipeline(sub_pipeline)
///     .into_field("recent_orders");
/// ```
#[derive(Debug)]
pub struct LookupStage {
    from: SmolStr,
    local_field: Option<Field>,
    foreign_field: Option<SmolStr>,
    let_vars: Vec<(SmolStr, Expr)>,
    pipeline: Option<Pipeline>,
    as_field: SmolStr,
}

impl LookupStage {
    /// Join against the given collection.
    pub fn from(collection: impl Into<SmolStr>) -> Self {
        Self {
            from: collection.into(),
            local_field: None,
            foreign_field: None,
            let_vars: Vec::new(),
            pipeline: None,
            as_field: SmolStr::new("joined"),
        }
    }

    /// The join key in the input documents.
    pub fn local_field(mut self, name: impl Into<SmolStr>) -> Self {
        self.local_field = Some(field(name));
        self
    }

    /// The join key in the foreign collection.
    pub fn foreign_field(mut self, name: impl Into<SmolStr>) -> Self {
        self.foreign_field = Some(name.into());
        self
    }

    /// Bind a `let` variable for the sub-pipeline.
    pub fn let_var(mut self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.let_vars.push((name.into(), expr.into()));
        self
    }

    /// The sub-pipeline to run on the foreign collection.
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// The output array field.
    pub fn into_field(mut self, name: impl Into<SmolStr>) -> Self {
        self.as_field = name.into();
        self
    }
}

impl AggregationStage for LookupStage {
    fn name(&self) -> &'static str {
        "$lookup"
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let mut spec = doc! { "from": self.from.as_str() };

        if let Some(local) = &self.local_field {
            spec.insert("localField", ctx.reference_for(local)?.raw());
        }
        if let Some(foreign) = &self.foreign_field {
            spec.insert("foreignField", foreign.as_str());
        }

        if !self.let_vars.is_empty() {
            // Binding values resolve in the outer scope.
            let mut bindings = Document::new();
            for (name, expr) in &self.let_vars {
                bindings.insert(name.as_str(), expr.to_bson(ctx)?);
            }
            spec.insert("let", bindings);
        }

        if let Some(pipeline) = &self.pipeline {
            // The foreign collection starts a fresh root scope.
            spec.insert("pipeline", pipeline.to_documents()?);
        }

        spec.insert("as", self.as_field.as_str());
        Ok(vec![doc! { "$lookup": spec }])
    }

    fn exposure(&self) -> FieldExposure {
        FieldExposure::Extend(ExposedFields::none().and_synthetic(field(self.as_field.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use crate::expr::ComparisonOperators;
    use crate::stage::MatchStage;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_foreign_key_form() {
        let stage = LookupStage::from("orders")
            .local_field("order_id")
            .foreign_field("_id")
            .into_field("orders");
        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! {
                "$lookup": {
                    "from": "orders",
                    "localField": "order_id",
                    "foreignField": "_id",
                    "as": "orders",
                }
            }]
        );
    }

    #[test]
    fn test_pipeline_form_with_let() {
        let sub = Pipeline::new().stage(MatchStage::expr(
            ComparisonOperators::value_of("customer_id").equal_to(Expr::variable("cust")),
        ));
        let stage = LookupStage::from("orders")
            .let_var("cust", Expr::field("customer_id"))
            .pipeline(sub)
            .into_field("recent");

        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! {
                "$lookup": {
                    "from": "orders",
                    "let": { "cust": "$customer_id" },
                    "pipeline": [
                        { "$match": { "$expr": { "$eq": ["$customer_id", "$$cust"] } } }
                    ],
                    "as": "recent",
                }
            }]
        );
    }

    #[test]
    fn test_exposure_extends_with_output_field() {
        let stage = LookupStage::from("orders").into_field("orders");
        match stage.exposure() {
            FieldExposure::Extend(exposed) => {
                assert_eq!(exposed.names(), vec!["orders"]);
                assert!(exposed.get("orders").unwrap().is_synthetic());
            }
            other => panic!("expected extend exposure, got {other:?}"),
        }
    }
}
