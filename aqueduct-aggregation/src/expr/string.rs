//! String expression operators.

use super::Expr;

/// Gateway for string operators (`$concat`, `$substrCP`, `$regexMatch`, ...).
///
/// Length and substring operators use the code-point variants.
#[derive(Debug, Clone)]
pub struct StringOperators {
    value: Expr,
}

impl StringOperators {
    /// Start from a string-valued field path or expression.
    pub fn value_of(value: impl Into<Expr>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// `$concat` with the given strings.
    pub fn concat_with<I, E>(self, others: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        let mut args = vec![self.value];
        args.extend(others.into_iter().map(Into::into));
        Expr::op("$concat", args)
    }

    /// `$toLower`.
    pub fn to_lower(self) -> Expr {
        Expr::op("$toLower", vec![self.value])
    }

    /// `$toUpper`.
    pub fn to_upper(self) -> Expr {
        Expr::op("$toUpper", vec![self.value])
    }

    /// `$strLenCP`.
    pub fn length(self) -> Expr {
        Expr::op("$strLenCP", vec![self.value])
    }

    /// `$substrCP`.
    pub fn substring(self, start: impl Into<Expr>, count: impl Into<Expr>) -> Expr {
        Expr::op("$substrCP", vec![self.value, start.into(), count.into()])
    }

    /// `$split`.
    pub fn split(self, delimiter: impl Into<Expr>) -> Expr {
        Expr::op("$split", vec![self.value, delimiter.into()])
    }

    /// `$trim` whitespace (or the given characters).
    pub fn trim(self, chars: Option<Expr>) -> Expr {
        let mut spec = vec![("input".into(), self.value)];
        if let Some(chars) = chars {
            spec.push(("chars".into(), chars));
        }
        Expr::op("$trim", vec![Expr::Document(spec)])
    }

    /// `$ltrim` whitespace.
    pub fn trim_start(self) -> Expr {
        Expr::op("$ltrim", vec![Expr::Document(vec![("input".into(), self.value)])])
    }

    /// `$rtrim` whitespace.
    pub fn trim_end(self) -> Expr {
        Expr::op("$rtrim", vec![Expr::Document(vec![("input".into(), self.value)])])
    }

    /// `$replaceAll`.
    pub fn replace_all(self, find: impl Into<Expr>, replacement: impl Into<Expr>) -> Expr {
        Expr::op(
            "$replaceAll",
            vec![Expr::Document(vec![
                ("input".into(), self.value),
                ("find".into(), find.into()),
                ("replacement".into(), replacement.into()),
            ])],
        )
    }

    /// `$regexMatch`.
    pub fn regex_match(self, pattern: impl Into<Expr>) -> Expr {
        Expr::op(
            "$regexMatch",
            vec![Expr::Document(vec![
                ("input".into(), self.value),
                ("regex".into(), pattern.into()),
            ])],
        )
    }
}
