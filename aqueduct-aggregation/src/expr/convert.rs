//! Type conversion expression operators.

use super::Expr;

/// Target types for `$convert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertTarget {
    /// `bool`
    Bool,
    /// `date`
    Date,
    /// `decimal`
    Decimal,
    /// `double`
    Double,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `objectId`
    ObjectId,
    /// `string`
    String,
}

impl ConvertTarget {
    /// The wire-format type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Date => "date",
            Self::Decimal => "decimal",
            Self::Double => "double",
            Self::Int => "int",
            Self::Long => "long",
            Self::ObjectId => "objectId",
            Self::String => "string",
        }
    }

    /// The shorthand operator for this target (`$toInt`, ...).
    fn shorthand(&self) -> &'static str {
        match self {
            Self::Bool => "$toBool",
            Self::Date => "$toDate",
            Self::Decimal => "$toDecimal",
            Self::Double => "$toDouble",
            Self::Int => "$toInt",
            Self::Long => "$toLong",
            Self::ObjectId => "$toObjectId",
            Self::String => "$toString",
        }
    }
}

/// Gateway for conversion operators (`$convert` and its shorthands).
///
/// # Example
///
/// ```rust,ignore
/// // { "$convert": { "input": "$raw", "to": "int", "onError": 0 } }
/// let n = ConvertOperators::value_of("raw")
///     .convert_to(ConvertTarget::Int)
///     .on_error(0)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConvertOperators {
    value: Expr,
}

impl ConvertOperators {
    /// Start from a field path, literal or prior expression.
    pub fn value_of(value: impl Into<Expr>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Full-form `$convert` with optional error/null handling.
    pub fn convert_to(self, target: ConvertTarget) -> Convert {
        Convert {
            value: self.value,
            to: target,
            on_error: None,
            on_null: None,
        }
    }

    fn shorthand(self, target: ConvertTarget) -> Expr {
        Expr::op(target.shorthand(), vec![self.value])
    }

    /// `$toBool`.
    pub fn to_bool(self) -> Expr {
        self.shorthand(ConvertTarget::Bool)
    }

    /// `$toDate`.
    pub fn to_date(self) -> Expr {
        self.shorthand(ConvertTarget::Date)
    }

    /// `$toDecimal`.
    pub fn to_decimal(self) -> Expr {
        self.shorthand(ConvertTarget::Decimal)
    }

    /// `$toDouble`.
    pub fn to_double(self) -> Expr {
        self.shorthand(ConvertTarget::Double)
    }

    /// `$toInt`.
    pub fn to_int(self) -> Expr {
        self.shorthand(ConvertTarget::Int)
    }

    /// `$toLong`.
    pub fn to_long(self) -> Expr {
        self.shorthand(ConvertTarget::Long)
    }

    /// `$toObjectId`.
    pub fn to_object_id(self) -> Expr {
        self.shorthand(ConvertTarget::ObjectId)
    }

    /// `$toString`.
    pub fn to_string_value(self) -> Expr {
        self.shorthand(ConvertTarget::String)
    }

    /// `$type`: the BSON type name of the value.
    pub fn bson_type(self) -> Expr {
        Expr::op("$type", vec![self.value])
    }
}

/// A `$convert` under construction.
#[derive(Debug, Clone)]
pub struct Convert {
    value: Expr,
    to: ConvertTarget,
    on_error: Option<Expr>,
    on_null: Option<Expr>,
}

impl Convert {
    /// Value to produce when conversion fails.
    pub fn on_error(mut self, value: impl Into<Expr>) -> Self {
        self.on_error = Some(value.into());
        self
    }

    /// Value to produce when the input is null or missing.
    pub fn on_null(mut self, value: impl Into<Expr>) -> Self {
        self.on_null = Some(value.into());
        self
    }

    /// Build the `$convert` expression.
    pub fn build(self) -> Expr {
        let mut spec = vec![
            ("input".into(), self.value),
            ("to".into(), super::lit(self.to.as_str())),
        ];
        if let Some(on_error) = self.on_error {
            spec.push(("onError".into(), on_error));
        }
        if let Some(on_null) = self.on_null {
            spec.push(("onNull".into(), on_null));
        }
        Expr::op("$convert", vec![Expr::Document(spec)])
    }
}

impl From<Convert> for Expr {
    fn from(convert: Convert) -> Self {
        convert.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use bson::{Bson, doc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shorthand() {
        let expr = ConvertOperators::value_of("raw").to_int();
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$toInt": "$raw" })
        );
    }

    #[test]
    fn test_full_convert() {
        let expr = ConvertOperators::value_of("raw")
            .convert_to(ConvertTarget::Decimal)
            .on_error(0)
            .on_null(0)
            .build();
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$convert": { "input": "$raw", "to": "decimal", "onError": 0, "onNull": 0 }
            })
        );
    }

    #[test]
    fn test_bson_type() {
        let expr = ConvertOperators::value_of("payload").bson_type();
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$type": "$payload" })
        );
    }
}
