//! Accumulator operators, shared by `$group` and `$setWindowFields` output.

use super::Expr;

/// Gateway for accumulator operators (`$sum`, `$avg`, `$push`, ...).
#[derive(Debug, Clone, Copy)]
pub struct AccumulatorOperators;

impl AccumulatorOperators {
    /// `$sum`.
    pub fn sum(expr: impl Into<Expr>) -> Expr {
        Expr::op("$sum", vec![expr.into()])
    }

    /// `$avg`.
    pub fn avg(expr: impl Into<Expr>) -> Expr {
        Expr::op("$avg", vec![expr.into()])
    }

    /// `$min`.
    pub fn min(expr: impl Into<Expr>) -> Expr {
        Expr::op("$min", vec![expr.into()])
    }

    /// `$max`.
    pub fn max(expr: impl Into<Expr>) -> Expr {
        Expr::op("$max", vec![expr.into()])
    }

    /// `$first`.
    pub fn first(expr: impl Into<Expr>) -> Expr {
        Expr::op("$first", vec![expr.into()])
    }

    /// `$last`.
    pub fn last(expr: impl Into<Expr>) -> Expr {
        Expr::op("$last", vec![expr.into()])
    }

    /// `$push`.
    pub fn push(expr: impl Into<Expr>) -> Expr {
        Expr::op("$push", vec![expr.into()])
    }

    /// `$addToSet`.
    pub fn add_to_set(expr: impl Into<Expr>) -> Expr {
        Expr::op("$addToSet", vec![expr.into()])
    }

    /// `$count` (no argument).
    pub fn count() -> Expr {
        Expr::op("$count", vec![Expr::Document(Vec::new())])
    }

    /// `$stdDevPop`.
    pub fn std_dev_pop(expr: impl Into<Expr>) -> Expr {
        Expr::op("$stdDevPop", vec![expr.into()])
    }

    /// `$stdDevSamp`.
    pub fn std_dev_samp(expr: impl Into<Expr>) -> Expr {
        Expr::op("$stdDevSamp", vec![expr.into()])
    }
}
