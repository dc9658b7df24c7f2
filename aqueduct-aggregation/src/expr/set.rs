//! Set expression operators.

use super::Expr;

/// Gateway for set operators (`$setUnion`, `$setIsSubset`, ...).
///
/// The wrapped value is treated as an array-valued expression.
#[derive(Debug, Clone)]
pub struct SetOperators {
    value: Expr,
}

impl SetOperators {
    /// Start from an array-valued field path or expression.
    pub fn value_of(value: impl Into<Expr>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// `$setUnion` with the given sets.
    pub fn union<I, E>(self, others: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        let mut args = vec![self.value];
        args.extend(others.into_iter().map(Into::into));
        Expr::op("$setUnion", args)
    }

    /// `$setIntersection` with the given sets.
    pub fn intersection<I, E>(self, others: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        let mut args = vec![self.value];
        args.extend(others.into_iter().map(Into::into));
        Expr::op("$setIntersection", args)
    }

    /// `$setDifference`: elements of this set not in `other`.
    pub fn difference(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$setDifference", vec![self.value, other.into()])
    }

    /// `$setEquals` with the given sets.
    pub fn is_equal_to<I, E>(self, others: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        let mut args = vec![self.value];
        args.extend(others.into_iter().map(Into::into));
        Expr::op("$setEquals", args)
    }

    /// `$setIsSubset`: whether this set is contained in `other`.
    pub fn is_subset_of(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$setIsSubset", vec![self.value, other.into()])
    }

    /// `$anyElementTrue`.
    pub fn any_element_true(self) -> Expr {
        Expr::op("$anyElementTrue", vec![self.value])
    }

    /// `$allElementsTrue`.
    pub fn all_elements_true(self) -> Expr {
        Expr::op("$allElementsTrue", vec![self.value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use bson::{Bson, doc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_union() {
        let expr = SetOperators::value_of("tags").union([Expr::field("extra_tags")]);
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$setUnion": ["$tags", "$extra_tags"] })
        );
    }

    #[test]
    fn test_set_difference() {
        let expr = SetOperators::value_of("all").difference("seen");
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$setDifference": ["$all", "$seen"] })
        );
    }

    #[test]
    fn test_is_subset_of() {
        let expr = SetOperators::value_of("roles").is_subset_of("allowed_roles");
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$setIsSubset": ["$roles", "$allowed_roles"] })
        );
    }

    #[test]
    fn test_all_elements_true_keeps_array_form() {
        let expr = SetOperators::value_of("checks").all_elements_true();
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$allElementsTrue": ["$checks"] })
        );
    }
}
