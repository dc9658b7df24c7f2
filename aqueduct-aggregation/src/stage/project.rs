//! The `$project` stage.

use bson::{Bson, Document, doc};
use smol_str::SmolStr;

use crate::context::AggregationContext;
use crate::error::AggregationResult;
use crate::expr::Expr;
use crate::field::{ExposedFields, Field, field};

use super::{AggregationStage, FieldExposure};

#[derive(Debug, Clone)]
enum Projection {
    /// Plain or aliased inclusion.
    Include(Field),
    /// Exclusion (`name: 0`).
    Exclude(SmolStr),
    /// A computed field.
    Computed { name: SmolStr, expr: Expr },
}

/// `$project`: reshape documents by including, renaming, excluding and
/// computing fields.
///
/// Included fields whose resolved path equals their exposed name render as
/// `name: 1`; aliased or renamed fields render as `name: "$path"`. The
/// `_id` field stays visible unless explicitly excluded.
///
/// # Example
///
/// ```rust,ignore
/// let stage = ProjectStage::include(["customer", "status"])
///     .and_field(aliased("total", "order.amount"))
///     .and_computed("net", transform("total - fees")?)
///     .exclude_id();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProjectStage {
    items: Vec<Projection>,
    exclude_id: bool,
}

impl ProjectStage {
    /// Create an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include the given plain fields.
    pub fn include<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let mut stage = Self::new();
        for name in names {
            stage.items.push(Projection::Include(field(name)));
        }
        stage
    }

    /// Include one more field, aliased or plain.
    pub fn and_field(mut self, field: Field) -> Self {
        self.items.push(Projection::Include(field));
        self
    }

    /// Add a computed field.
    pub fn and_computed(mut self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.items.push(Projection::Computed {
            name: name.into(),
            expr: expr.into(),
        });
        self
    }

    /// Exclude a field.
    pub fn and_exclude(mut self, name: impl Into<SmolStr>) -> Self {
        self.items.push(Projection::Exclude(name.into()));
        self
    }

    /// Suppress the `_id` field.
    pub fn exclude_id(mut self) -> Self {
        self.exclude_id = true;
        self
    }
}

impl AggregationStage for ProjectStage {
    fn name(&self) -> &'static str {
        "$project"
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let mut projection = Document::new();
        if self.exclude_id {
            projection.insert("_id", Bson::Int32(0));
        }
        for item in &self.items {
            match item {
                Projection::Include(field) => {
                    let reference = ctx.reference_for(field)?;
                    if reference.raw() == field.name() {
                        projection.insert(field.name(), Bson::Int32(1));
                    } else {
                        projection.insert(field.name(), reference.to_bson());
                    }
                }
                Projection::Exclude(name) => {
                    projection.insert(name.as_str(), Bson::Int32(0));
                }
                Projection::Computed { name, expr } => {
                    projection.insert(name.as_str(), expr.to_bson(ctx)?);
                }
            }
        }
        Ok(vec![doc! { "$project": projection }])
    }

    fn exposure(&self) -> FieldExposure {
        let mut exposed = ExposedFields::none();
        if !self.exclude_id {
            exposed = exposed.and_original(field("_id"));
        }
        for item in &self.items {
            match item {
                Projection::Include(f) => {
                    exposed = if f.is_aliased() {
                        exposed.and_synthetic(field(f.name()))
                    } else {
                        exposed.and_original(f.clone())
                    };
                }
                Projection::Exclude(_) => {}
                Projection::Computed { name, .. } => {
                    exposed = exposed.and_synthetic(field(name.clone()));
                }
            }
        }
        FieldExposure::Replace(exposed)
    }
}
