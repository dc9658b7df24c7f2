//! The `$setWindowFields` stage.

use bson::{Bson, Document, doc};
use smol_str::SmolStr;

use crate::context::AggregationContext;
use crate::error::{AggregationError, AggregationResult};
use crate::expr::{Expr, TimeUnit};
use crate::field::{ExposedFields, Field, field};

use super::{AggregationStage, FieldExposure, SortDirection};

/// A window frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowBound {
    /// `"unbounded"`.
    Unbounded,
    /// `"current"`.
    Current,
    /// A numeric offset relative to the current document (negative =
    /// preceding, positive = following).
    Offset(i64),
}

impl WindowBound {
    fn to_bson(self) -> Bson {
        match self {
            Self::Unbounded => Bson::String("unbounded".into()),
            Self::Current => Bson::String("current".into()),
            Self::Offset(n) => Bson::Int64(n),
        }
    }
}

/// A window frame: document-position based or value-range based.
#[derive(Debug, Clone, Copy)]
pub enum Window {
    /// `documents: [lower, upper]`.
    Documents(WindowBound, WindowBound),
    /// `range: [lower, upper]` with an optional time unit.
    Range {
        /// Lower bound.
        lower: WindowBound,
        /// Upper bound.
        upper: WindowBound,
        /// Time unit for date-valued sort fields.
        unit: Option<TimeUnit>,
    },
}

impl Window {
    /// A documents frame.
    pub fn documents(lower: WindowBound, upper: WindowBound) -> Self {
        Self::Documents(lower, upper)
    }

    /// A range frame.
    pub fn range(lower: WindowBound, upper: WindowBound) -> Self {
        Self::Range {
            lower,
            upper,
            unit: None,
        }
    }

    /// A range frame over a date-valued sort field.
    pub fn range_by_unit(lower: WindowBound, upper: WindowBound, unit: TimeUnit) -> Self {
        Self::Range {
            lower,
            upper,
            unit: Some(unit),
        }
    }

    /// The cumulative frame: everything up to the current document.
    pub fn cumulative() -> Self {
        Self::Documents(WindowBound::Unbounded, WindowBound::Current)
    }

    fn to_document(self) -> Document {
        match self {
            Self::Documents(lower, upper) => {
                doc! { "documents": [lower.to_bson(), upper.to_bson()] }
            }
            Self::Range { lower, upper, unit } => {
                let mut spec = doc! { "range": [lower.to_bson(), upper.to_bson()] };
                if let Some(unit) = unit {
                    spec.insert("unit", unit.as_str());
                }
                spec
            }
        }
    }
}

/// Window-only operators (`$rank`, `$shift`, ...); accumulators from
/// [`AccumulatorOperators`](crate::expr::AccumulatorOperators) work as
/// window operators too.
#[derive(Debug, Clone, Copy)]
pub struct WindowOperators;

impl WindowOperators {
    /// `$documentNumber`.
    pub fn document_number() -> Expr {
        Expr::op("$documentNumber", vec![Expr::Document(Vec::new())])
    }

    /// `$rank`.
    pub fn rank() -> Expr {
        Expr::op("$rank", vec![Expr::Document(Vec::new())])
    }

    /// `$denseRank`.
    pub fn dense_rank() -> Expr {
        Expr::op("$denseRank", vec![Expr::Document(Vec::new())])
    }

    /// `$shift`: the value of `output` from the document `by` positions
    /// away, with a default for out-of-partition positions.
    pub fn shift(output: impl Into<Expr>, by: i32, default: impl Into<Expr>) -> Expr {
        Expr::op(
            "$shift",
            vec![Expr::Document(vec![
                ("output".into(), output.into()),
                ("by".into(), Expr::literal(by)),
                ("default".into(), default.into()),
            ])],
        )
    }
}

/// One output field of a `$setWindowFields` stage.
#[derive(Debug, Clone)]
pub struct WindowOutput {
    name: SmolStr,
    operator: Expr,
    window: Option<Window>,
}

impl WindowOutput {
    /// Compute `operator` into the field `name` over the whole partition.
    pub fn new(name: impl Into<SmolStr>, operator: impl Into<Expr>) -> Self {
        Self {
            name: name.into(),
            operator: operator.into(),
            window: None,
        }
    }

    /// Restrict the computation to a frame.
    pub fn over(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }
}

/// `$setWindowFields`: per-partition window computations.
///
/// # Example
///
/// ```rust,ignore
/// // Running total per region, ordered by date.
/// let stage = SetWindowFieldsStage::new()
///     .partition_by(Expr::field("region"))
///     .sort_asc("date")
///     .output(
///         WindowOutput::new("running", AccumulatorOperators::sum(Expr::field("amount")))
///             .over(Window::cumulative()),
///     );
/// ```
#[derive(Debug, Clone, Default)]
pub struct SetWindowFieldsStage {
    partition_by: Option<Expr>,
    sort_by: Vec<(Field, SortDirection)>,
    output: Vec<WindowOutput>,
}

impl SetWindowFieldsStage {
    /// Create an empty stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition documents by the given expression.
    pub fn partition_by(mut self, expr: impl Into<Expr>) -> Self {
        self.partition_by = Some(expr.into());
        self
    }

    /// Sort ascending within partitions.
    pub fn sort_asc(mut self, name: impl Into<SmolStr>) -> Self {
        self.sort_by.push((field(name), SortDirection::Asc));
        self
    }

    /// Sort descending within partitions.
    pub fn sort_desc(mut self, name: impl Into<SmolStr>) -> Self {
        self.sort_by.push((field(name), SortDirection::Desc));
        self
    }

    /// Add an output field.
    pub fn output(mut self, output: WindowOutput) -> Self {
        self.output.push(output);
        self
    }
}

impl AggregationStage for SetWindowFieldsStage {
    fn name(&self) -> &'static str {
        "$setWindowFields"
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let mut spec = Document::new();

        if let Some(partition_by) = &self.partition_by {
            spec.insert("partitionBy", partition_by.to_bson(ctx)?);
        }

        if !self.sort_by.is_empty() {
            let mut sort = Document::new();
            for (field, direction) in &self.sort_by {
                let key = ctx.reference_for(field)?.raw().to_string();
                let value = match direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                };
                sort.insert(key, value);
            }
            spec.insert("sortBy", sort);
        }

        let mut output = Document::new();
        for item in &self.output {
            // The window spec merges into the operator document.
            let rendered = item.operator.to_bson(ctx)?;
            let mut operator = match rendered {
                Bson::Document(doc) => doc,
                other => {
                    return Err(AggregationError::invalid_argument(
                        "$setWindowFields",
                        format!("window operator for '{}' must render to a document, got {other}", item.name),
                    ));
                }
            };
            if let Some(window) = item.window {
                operator.insert("window", window.to_document());
            }
            output.insert(item.name.as_str(), operator);
        }
        spec.insert("output", output);

        Ok(vec![doc! { "$setWindowFields": spec }])
    }

    fn exposure(&self) -> FieldExposure {
        let mut exposed = ExposedFields::none();
        for item in &self.output {
            exposed = exposed.and_synthetic(field(item.name.clone()));
        }
        FieldExposure::Extend(exposed)
    }
}
