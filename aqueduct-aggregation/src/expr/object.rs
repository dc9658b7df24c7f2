//! Object expression operators.

use super::Expr;

/// Gateway for object operators (`$mergeObjects`, `$getField`, ...).
#[derive(Debug, Clone)]
pub struct ObjectOperators {
    value: Expr,
}

impl ObjectOperators {
    /// Start from a document-valued field path or expression.
    pub fn value_of(value: impl Into<Expr>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// `$mergeObjects` with the given documents; later values win.
    pub fn merge_with<I, E>(self, others: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        let mut args = vec![self.value];
        args.extend(others.into_iter().map(Into::into));
        Expr::op("$mergeObjects", args)
    }

    /// `$objectToArray`: `{k, v}` pairs.
    pub fn object_to_array(self) -> Expr {
        Expr::op("$objectToArray", vec![self.value])
    }

    /// `$getField`: read a field (works for names containing dots or `$`).
    pub fn get_field(self, name: impl Into<Expr>) -> Expr {
        Expr::op(
            "$getField",
            vec![Expr::Document(vec![
                ("field".into(), name.into()),
                ("input".into(), self.value),
            ])],
        )
    }

    /// `$setField`: write a field.
    pub fn set_field(self, name: impl Into<Expr>, value: impl Into<Expr>) -> Expr {
        Expr::op(
            "$setField",
            vec![Expr::Document(vec![
                ("field".into(), name.into()),
                ("input".into(), self.value),
                ("value".into(), value.into()),
            ])],
        )
    }

    /// Remove a field ($setField with `$$REMOVE`).
    pub fn unset_field(self, name: impl Into<Expr>) -> Expr {
        self.set_field(name, Expr::remove())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use crate::expr::lit;
    use bson::{Bson, doc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_objects() {
        let expr = ObjectOperators::value_of("defaults").merge_with([Expr::field("overrides")]);
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$mergeObjects": ["$defaults", "$overrides"] })
        );
    }

    #[test]
    fn test_object_to_array() {
        let expr = ObjectOperators::value_of("attrs").object_to_array();
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$objectToArray": "$attrs" })
        );
    }

    #[test]
    fn test_get_field() {
        let expr = ObjectOperators::value_of("stats").get_field(lit("a.b"));
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$getField": { "field": "a.b", "input": "$stats" }
            })
        );
    }

    #[test]
    fn test_unset_field() {
        let expr = ObjectOperators::value_of("doc").unset_field(lit("password"));
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$setField": { "field": "password", "input": "$doc", "value": "$$REMOVE" }
            })
        );
    }
}
