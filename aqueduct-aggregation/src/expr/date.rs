//! Date expression operators.
//!
//! Every part extractor accepts an optional timezone; without one the server
//! evaluates in UTC.

use smol_str::SmolStr;

use super::Expr;

/// A timezone argument: an Olson name, a UTC offset, or an expression.
#[derive(Debug, Clone)]
pub struct Timezone(Expr);

impl Timezone {
    /// An Olson timezone identifier, e.g. `America/Chicago`.
    pub fn named(id: impl Into<String>) -> Self {
        Self(super::lit(id.into()))
    }

    /// A UTC offset, e.g. `+04:45`.
    pub fn offset(offset: impl Into<String>) -> Self {
        Self(super::lit(offset.into()))
    }

    /// A timezone taken from a document field or expression.
    pub fn of(expr: impl Into<Expr>) -> Self {
        Self(expr.into())
    }
}

/// A calendar unit for date arithmetic and windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Calendar year.
    Year,
    /// Calendar quarter.
    Quarter,
    /// Calendar month.
    Month,
    /// ISO week.
    Week,
    /// Day.
    Day,
    /// Hour.
    Hour,
    /// Minute.
    Minute,
    /// Second.
    Second,
    /// Millisecond.
    Millisecond,
}

impl TimeUnit {
    /// The wire-format unit name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Quarter => "quarter",
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
            Self::Millisecond => "millisecond",
        }
    }
}

/// Gateway for date operators (`$year`, `$dateToString`, `$dateDiff`, ...).
///
/// # Example
///
/// ```rust,ignore
/// // { "$year": { "date": "$joined", "timezone": "Europe/Berlin" } }
/// let y = DateOperators::date_of("joined")
///     .with_timezone(Timezone::named("Europe/Berlin"))
///     .year();
/// ```
#[derive(Debug, Clone)]
pub struct DateOperators {
    date: Expr,
    timezone: Option<Expr>,
}

impl DateOperators {
    /// Start from a date-valued field path or expression.
    pub fn date_of(date: impl Into<Expr>) -> Self {
        Self {
            date: date.into(),
            timezone: None,
        }
    }

    /// Evaluate in the given timezone.
    pub fn with_timezone(mut self, timezone: Timezone) -> Self {
        self.timezone = Some(timezone.0);
        self
    }

    fn part(self, operator: &str) -> Expr {
        match self.timezone {
            None => Expr::op(SmolStr::new(operator), vec![self.date]),
            Some(tz) => Expr::op(
                SmolStr::new(operator),
                vec![Expr::Document(vec![
                    ("date".into(), self.date),
                    ("timezone".into(), tz),
                ])],
            ),
        }
    }

    /// `$year`.
    pub fn year(self) -> Expr {
        self.part("$year")
    }

    /// `$month`.
    pub fn month(self) -> Expr {
        self.part("$month")
    }

    /// `$dayOfMonth`.
    pub fn day_of_month(self) -> Expr {
        self.part("$dayOfMonth")
    }

    /// `$dayOfWeek` (1 = Sunday).
    pub fn day_of_week(self) -> Expr {
        self.part("$dayOfWeek")
    }

    /// `$dayOfYear`.
    pub fn day_of_year(self) -> Expr {
        self.part("$dayOfYear")
    }

    /// `$hour`.
    pub fn hour(self) -> Expr {
        self.part("$hour")
    }

    /// `$minute`.
    pub fn minute(self) -> Expr {
        self.part("$minute")
    }

    /// `$second`.
    pub fn second(self) -> Expr {
        self.part("$second")
    }

    /// `$millisecond`.
    pub fn millisecond(self) -> Expr {
        self.part("$millisecond")
    }

    /// `$week`.
    pub fn week(self) -> Expr {
        self.part("$week")
    }

    /// `$isoWeek`.
    pub fn iso_week(self) -> Expr {
        self.part("$isoWeek")
    }

    /// `$isoDayOfWeek` (1 = Monday).
    pub fn iso_day_of_week(self) -> Expr {
        self.part("$isoDayOfWeek")
    }

    /// `$dateToString` with the given format string.
    pub fn format(self, format: impl Into<String>) -> Expr {
        let mut spec = vec![
            ("format".into(), super::lit(format.into())),
            ("date".into(), self.date),
        ];
        if let Some(tz) = self.timezone {
            spec.push(("timezone".into(), tz));
        }
        Expr::op("$dateToString", vec![Expr::Document(spec)])
    }

    /// `$dateAdd`.
    pub fn add(self, unit: TimeUnit, amount: impl Into<Expr>) -> Expr {
        self.shift("$dateAdd", unit, amount.into())
    }

    /// `$dateSubtract`.
    pub fn subtract(self, unit: TimeUnit, amount: impl Into<Expr>) -> Expr {
        self.shift("$dateSubtract", unit, amount.into())
    }

    fn shift(self, operator: &str, unit: TimeUnit, amount: Expr) -> Expr {
        let mut spec = vec![
            ("startDate".into(), self.date),
            ("unit".into(), super::lit(unit.as_str())),
            ("amount".into(), amount),
        ];
        if let Some(tz) = self.timezone {
            spec.push(("timezone".into(), tz));
        }
        Expr::op(SmolStr::new(operator), vec![Expr::Document(spec)])
    }

    /// `$dateDiff` from this date to `end` in `unit`.
    pub fn diff(self, end: impl Into<Expr>, unit: TimeUnit) -> Expr {
        let mut spec = vec![
            ("startDate".into(), self.date),
            ("endDate".into(), end.into()),
            ("unit".into(), super::lit(unit.as_str())),
        ];
        if let Some(tz) = self.timezone {
            spec.push(("timezone".into(), tz));
        }
        Expr::op("$dateDiff", vec![Expr::Document(spec)])
    }

    /// `$dateTrunc` to the given unit.
    pub fn trunc(self, unit: TimeUnit) -> Expr {
        let mut spec = vec![
            ("date".into(), self.date),
            ("unit".into(), super::lit(unit.as_str())),
        ];
        if let Some(tz) = self.timezone {
            spec.push(("timezone".into(), tz));
        }
        Expr::op("$dateTrunc", vec![Expr::Document(spec)])
    }

    /// `$dateFromString`.
    pub fn from_string(value: impl Into<Expr>) -> Expr {
        Expr::op(
            "$dateFromString",
            vec![Expr::Document(vec![("dateString".into(), value.into())])],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use bson::{Bson, doc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_part_without_timezone() {
        let expr = DateOperators::date_of("joined").year();
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! { "$year": "$joined" })
        );
    }

    #[test]
    fn test_part_with_timezone() {
        let expr = DateOperators::date_of("joined")
            .with_timezone(Timezone::named("Europe/Berlin"))
            .month();
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$month": { "date": "$joined", "timezone": "Europe/Berlin" }
            })
        );
    }

    #[test]
    fn test_date_to_string() {
        let expr = DateOperators::date_of("ts").format("%Y-%m-%d");
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$dateToString": { "format": "%Y-%m-%d", "date": "$ts" }
            })
        );
    }

    #[test]
    fn test_date_add() {
        let expr = DateOperators::date_of("ts").add(TimeUnit::Day, 30);
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$dateAdd": { "startDate": "$ts", "unit": "day", "amount": 30 }
            })
        );
    }

    #[test]
    fn test_date_diff() {
        let expr = DateOperators::date_of("created").diff(Expr::now(), TimeUnit::Hour);
        assert_eq!(
            expr.to_bson(&RootContext).unwrap(),
            Bson::Document(doc! {
                "$dateDiff": { "startDate": "$created", "endDate": "$$NOW", "unit": "hour" }
            })
        );
    }

    #[test]
    fn test_chrono_literal_renders_as_bson_datetime() {
        let when = chrono::DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let expr = DateOperators::date_of(Expr::Literal(Bson::DateTime(when.into()))).year();
        let rendered = expr.to_bson(&RootContext).unwrap();
        let doc = rendered.as_document().unwrap();
        assert!(matches!(doc.get("$year"), Some(Bson::DateTime(_))));
    }
}
