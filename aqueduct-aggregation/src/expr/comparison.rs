//! Comparison expression operators.

use super::Expr;

/// Gateway for comparison operators (`$eq`, `$gt`, `$cmp`, ...).
#[derive(Debug, Clone)]
pub struct ComparisonOperators {
    value: Expr,
}

impl ComparisonOperators {
    /// Start from a field path, literal or prior expression.
    pub fn value_of(value: impl Into<Expr>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// `$eq`.
    pub fn equal_to(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$eq", vec![self.value, other.into()])
    }

    /// `$ne`.
    pub fn not_equal_to(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$ne", vec![self.value, other.into()])
    }

    /// `$gt`.
    pub fn greater_than(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$gt", vec![self.value, other.into()])
    }

    /// `$gte`.
    pub fn greater_than_or_equal(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$gte", vec![self.value, other.into()])
    }

    /// `$lt`.
    pub fn less_than(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$lt", vec![self.value, other.into()])
    }

    /// `$lte`.
    pub fn less_than_or_equal(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$lte", vec![self.value, other.into()])
    }

    /// `$cmp`: -1, 0 or 1.
    pub fn compare_to(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$cmp", vec![self.value, other.into()])
    }
}
