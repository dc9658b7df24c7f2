//! Boolean expression operators.

use super::Expr;

/// Gateway for boolean operators (`$and`, `$or`, `$not`).
#[derive(Debug, Clone, Copy)]
pub struct BooleanOperators;

impl BooleanOperators {
    /// `$and` over all given expressions.
    pub fn and<I>(exprs: I) -> Expr
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr::op("$and", exprs.into_iter().collect())
    }

    /// `$or` over all given expressions.
    pub fn or<I>(exprs: I) -> Expr
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr::op("$or", exprs.into_iter().collect())
    }

    /// `$not`.
    pub fn not(expr: impl Into<Expr>) -> Expr {
        Expr::op("$not", vec![expr.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use crate::expr::ComparisonOperators;
    use bson::{Bson, doc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_and() {
        let expr = BooleanOperators::and([
            ComparisonOperators::value_of("age").greater_than_or_equal(18),
            ComparisonOperators::value_of("age").less_than(65),
        ]);
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$and": [{ "$gte": ["$age", 18] }, { "$lt": ["$age", 65] }]
            })
        );
    }

    #[test]
    fn test_nested_and_flattens() {
        let inner = BooleanOperators::and([Expr::field("a"), Expr::field("b")]);
        let expr = BooleanOperators::and([inner, Expr::field("c")]);
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$and": ["$a", "$b", "$c"] })
        );
    }

    #[test]
    fn test_not() {
        let expr = BooleanOperators::not(Expr::field("archived"));
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$not": ["$archived"] })
        );
    }
}
