//! Arithmetic expression operators.

use super::Expr;

/// Gateway for arithmetic operators (`$add`, `$multiply`, `$round`, ...).
///
/// # Example
///
/// ```rust,ignore
/// // { "$multiply": ["$price", "$qty"] }
/// let total = ArithmeticOperators::value_of("price").multiply_by("qty");
/// ```
#[derive(Debug, Clone)]
pub struct ArithmeticOperators {
    value: Expr,
}

impl ArithmeticOperators {
    /// Start from a field path, literal or prior expression.
    pub fn value_of(value: impl Into<Expr>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// `$add`.
    pub fn add(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$add", vec![self.value, other.into()])
    }

    /// `$subtract`.
    pub fn subtract(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$subtract", vec![self.value, other.into()])
    }

    /// `$multiply`.
    pub fn multiply_by(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$multiply", vec![self.value, other.into()])
    }

    /// `$divide`.
    pub fn divide_by(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$divide", vec![self.value, other.into()])
    }

    /// `$mod`.
    pub fn mod_by(self, other: impl Into<Expr>) -> Expr {
        Expr::op("$mod", vec![self.value, other.into()])
    }

    /// `$abs`.
    pub fn abs(self) -> Expr {
        Expr::op("$abs", vec![self.value])
    }

    /// `$ceil`.
    pub fn ceil(self) -> Expr {
        Expr::op("$ceil", vec![self.value])
    }

    /// `$floor`.
    pub fn floor(self) -> Expr {
        Expr::op("$floor", vec![self.value])
    }

    /// `$trunc` to the given decimal place.
    pub fn trunc(self, place: impl Into<Expr>) -> Expr {
        Expr::op("$trunc", vec![self.value, place.into()])
    }

    /// `$round` to the given decimal place.
    pub fn round(self, place: impl Into<Expr>) -> Expr {
        Expr::op("$round", vec![self.value, place.into()])
    }

    /// `$round` to a whole number.
    pub fn round_whole(self) -> Expr {
        Expr::op("$round", vec![self.value])
    }

    /// `$sqrt`.
    pub fn sqrt(self) -> Expr {
        Expr::op("$sqrt", vec![self.value])
    }

    /// `$pow`.
    pub fn pow(self, exponent: impl Into<Expr>) -> Expr {
        Expr::op("$pow", vec![self.value, exponent.into()])
    }

    /// `$exp`.
    pub fn exp(self) -> Expr {
        Expr::op("$exp", vec![self.value])
    }

    /// `$ln`.
    pub fn ln(self) -> Expr {
        Expr::op("$ln", vec![self.value])
    }

    /// `$log` with the given base.
    pub fn log(self, base: impl Into<Expr>) -> Expr {
        Expr::op("$log", vec![self.value, base.into()])
    }
}
