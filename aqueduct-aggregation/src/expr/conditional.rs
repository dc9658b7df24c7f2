//! Conditional expression operators.

use super::Expr;

/// Gateway for conditional operators (`$cond`, `$ifNull`, `$switch`).
#[derive(Debug, Clone, Copy)]
pub struct ConditionalOperators;

impl ConditionalOperators {
    /// `$cond`: `[if, then, else]`.
    pub fn if_then_else(
        cond: impl Into<Expr>,
        then: impl Into<Expr>,
        otherwise: impl Into<Expr>,
    ) -> Expr {
        Expr::op("$cond", vec![cond.into(), then.into(), otherwise.into()])
    }

    /// `$ifNull`: `value` when non-null, `replacement` otherwise.
    pub fn if_null(value: impl Into<Expr>, replacement: impl Into<Expr>) -> Expr {
        Expr::op("$ifNull", vec![value.into(), replacement.into()])
    }

    /// Start a `$switch` expression.
    pub fn switch() -> SwitchBuilder {
        SwitchBuilder::default()
    }
}

/// One `case`/`then` pair of a `$switch`.
#[derive(Debug, Clone)]
pub struct CaseBranch {
    /// The condition.
    pub case: Expr,
    /// The value when the condition holds.
    pub then: Expr,
}

/// Builder for `$switch` expressions.
#[derive(Debug, Clone, Default)]
pub struct SwitchBuilder {
    branches: Vec<CaseBranch>,
    default: Option<Expr>,
}

impl SwitchBuilder {
    /// Add a `case`/`then` branch.
    pub fn case(mut self, case: impl Into<Expr>, then: impl Into<Expr>) -> Self {
        self.branches.push(CaseBranch {
            case: case.into(),
            then: then.into(),
        });
        self
    }

    /// Set the `default` value.
    pub fn default_to(mut self, value: impl Into<Expr>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Build the `$switch` expression.
    pub fn build(self) -> Expr {
        let branches = Expr::Array(
            self.branches
                .into_iter()
                .map(|b| {
                    Expr::Document(vec![("case".into(), b.case), ("then".into(), b.then)])
                })
                .collect(),
        );
        let mut spec = vec![("branches".into(), branches)];
        if let Some(default) = self.default {
            spec.push(("default".into(), default));
        }
        Expr::op("$switch", vec![Expr::Document(spec)])
    }
}

impl From<SwitchBuilder> for Expr {
    fn from(builder: SwitchBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use crate::expr::{ComparisonOperators, lit};
    use bson::{Bson, doc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cond() {
        let expr = ConditionalOperators::if_then_else(
            ComparisonOperators::value_of("qty").greater_than_or_equal(100),
            lit("bulk"),
            lit("retail"),
        );
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$cond": [{ "$gte": ["$qty", 100] }, "bulk", "retail"]
            })
        );
    }

    #[test]
    fn test_if_null() {
        let expr = ConditionalOperators::if_null(Expr::field("nickname"), Expr::field("name"));
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$ifNull": ["$nickname", "$name"] })
        );
    }

    #[test]
    fn test_switch() {
        let expr = ConditionalOperators::switch()
            .case(
                ComparisonOperators::value_of("score").greater_than_or_equal(90),
                lit("A"),
            )
            .case(
                ComparisonOperators::value_of("score").greater_than_or_equal(80),
                lit("B"),
            )
            .default_to(lit("F"))
            .build();

        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$switch": {
                    "branches": [
                        { "case": { "$gte": ["$score", 90] }, "then": "A" },
                        { "case": { "$gte": ["$score", 80] }, "then": "B" },
                    ],
                    "default": "F",
                }
            })
        );
    }
}
