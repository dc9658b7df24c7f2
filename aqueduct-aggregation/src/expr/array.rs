//! Array expression operators.

use smol_str::SmolStr;

use super::Expr;

/// Gateway for array operators (`$filter`, `$map`, `$arrayElemAt`, ...).
#[derive(Debug, Clone)]
pub struct ArrayOperators {
    value: Expr,
}

impl ArrayOperators {
    /// Start from an array-valued field path or expression.
    pub fn value_of(value: impl Into<Expr>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// `$arrayElemAt`.
    pub fn element_at(self, index: impl Into<Expr>) -> Expr {
        Expr::op("$arrayElemAt", vec![self.value, index.into()])
    }

    /// `$first`.
    pub fn first(self) -> Expr {
        Expr::op("$first", vec![self.value])
    }

    /// `$last`.
    pub fn last(self) -> Expr {
        Expr::op("$last", vec![self.value])
    }

    /// `$concatArrays` with the given arrays.
    pub fn concat_with<I, E>(self, others: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        let mut args = vec![self.value];
        args.extend(others.into_iter().map(Into::into));
        Expr::op("$concatArrays", args)
    }

    /// `$filter`, binding `as_name` in the predicate.
    pub fn keep(self, as_name: impl Into<SmolStr>, cond: impl Into<Expr>) -> Expr {
        Expr::Filter {
            input: Box::new(self.value),
            as_name: as_name.into(),
            cond: Box::new(cond.into()),
        }
    }

    /// `$map`, binding `as_name` in the body.
    pub fn transform(self, as_name: impl Into<SmolStr>, body: impl Into<Expr>) -> Expr {
        Expr::Map {
            input: Box::new(self.value),
            as_name: as_name.into(),
            body: Box::new(body.into()),
        }
    }

    /// `$in`: whether `value` occurs in this array.
    pub fn contains_value(self, value: impl Into<Expr>) -> Expr {
        Expr::op("$in", vec![value.into(), self.value])
    }

    /// `$size`.
    pub fn size(self) -> Expr {
        Expr::op("$size", vec![self.value])
    }

    /// `$slice` keeping the first (or, negative, last) `n` elements.
    pub fn slice(self, n: impl Into<Expr>) -> Expr {
        Expr::op("$slice", vec![self.value, n.into()])
    }

    /// `$slice` with an explicit start position.
    pub fn slice_from(self, position: impl Into<Expr>, n: impl Into<Expr>) -> Expr {
        Expr::op("$slice", vec![self.value, position.into(), n.into()])
    }

    /// `$reverseArray`.
    pub fn reverse(self) -> Expr {
        Expr::op("$reverseArray", vec![self.value])
    }

    /// `$reduce`. The `in_expr` body refers to the accumulator and element
    /// via [`Expr::variable`] (`value` and `this`).
    pub fn reduce(self, initial: impl Into<Expr>, in_expr: impl Into<Expr>) -> Expr {
        Expr::op(
            "$reduce",
            vec![Expr::Document(vec![
                ("input".into(), self.value),
                ("initialValue".into(), initial.into()),
                ("in".into(), in_expr.into()),
            ])],
        )
    }

    /// `$range`.
    pub fn range(start: impl Into<Expr>, end: impl Into<Expr>) -> Expr {
        Expr::op("$range", vec![start.into(), end.into()])
    }

    /// `$range` with a step.
    pub fn range_by(start: impl Into<Expr>, end: impl Into<Expr>, step: impl Into<Expr>) -> Expr {
        Expr::op("$range", vec![start.into(), end.into(), step.into()])
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
    fn test_element_at() {
        let expr = ArrayOperators::value_of("scores").element_at(0);
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$arrayElemAt": ["$scores", 0] })
        );
    }

    #[test]
    fn test_keep_renders_filter_with_bound_variable() {
        let expr = ArrayOperators::value_of("items")
            .keep("item", ComparisonOperators::value_of("item.qty").greater_than(0));
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$filter": {
                    "input": "$items",
                    "as": "item",
                    "cond": { "$gt": ["$$item.qty", 0] },
                }
            })
        );
    }

    #[test]
    fn test_contains_value_argument_order() {
        let expr = ArrayOperators::value_of("tags").contains_value(lit("beta"));
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$in": ["beta", "$tags"] })
        );
    }

    #[test]
    fn test_reduce() {
        let expr = ArrayOperators::value_of("amounts").reduce(
            lit(0),
            Expr::op(
                "$add",
                vec![Expr::variable("value"), Expr::variable("this")],
            ),
        );
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$reduce": {
                    "input": "$amounts",
                    "initialValue": 0,
                    "in": { "$add": ["$$value", "$$this"] },
                }
            })
        );
    }

    #[test]
    fn test_range() {
        let expr = ArrayOperators::range_by(0, Expr::field("n"), 2);
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$range": [0, "$n", 2] })
        );
    }
}
