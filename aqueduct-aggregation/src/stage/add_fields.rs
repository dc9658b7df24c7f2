//! The `$addFields`/`$set` and `$replaceRoot` stages.

use bson::{Document, doc};
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::context::AggregationContext;
use crate::error::AggregationResult;
use crate::expr::Expr;
use crate::field::{ExposedFields, field};

use super::{AggregationStage, FieldExposure};

/// `$addFields` (or its alias `$set`): add or overwrite computed fields.
///
/// Unlike `$project`, existing fields stay visible.
#[derive(Debug, Clone)]
pub struct AddFieldsStage {
    items: IndexMap<SmolStr, Expr>,
    as_set: bool,
}

impl AddFieldsStage {
    /// Create an empty `$addFields` stage.
    pub fn new() -> Self {
        Self {
            items: IndexMap::new(),
            as_set: false,
        }
    }

    /// Create an empty stage rendering as `$set`.
    pub fn as_set() -> Self {
        Self {
            items: IndexMap::new(),
            as_set: true,
        }
    }

    /// Add a computed field; same-name entries replace in place.
    pub fn field(mut self, name: impl Into<SmolStr>, expr: impl Into<Expr>) -> Self {
        self.items.insert(name.into(), expr.into());
        self
    }

    /// Whether any fields were added.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for AddFieldsStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationStage for AddFieldsStage {
    fn name(&self) -> &'static str {
        if self.as_set { "$set" } else { "$addFields" }
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let mut fields = Document::new();
        for (name, expr) in &self.items {
            fields.insert(name.as_str(), expr.to_bson(ctx)?);
        }
        let mut stage = Document::new();
        stage.insert(self.name(), fields);
        Ok(vec![stage])
    }

    fn exposure(&self) -> FieldExposure {
        let mut exposed = ExposedFields::none();
        for name in self.items.keys() {
            exposed = exposed.and_synthetic(field(name.clone()));
        }
        FieldExposure::Extend(exposed)
    }
}

/// `$replaceRoot` (or its shorthand `$replaceWith`): promote an expression
/// to be the whole document.
///
/// Afterwards nothing is known about the document shape, so visibility
/// resets to root semantics.
#[derive(Debug, Clone)]
pub struct ReplaceRootStage {
    new_root: Expr,
    shorthand: bool,
}

impl ReplaceRootStage {
    /// Replace the root with the given expression.
    pub fn with(new_root: impl Into<Expr>) -> Self {
        Self {
            new_root: new_root.into(),
            shorthand: false,
        }
    }

    /// Render as `$replaceWith` instead of `$replaceRoot`.
    pub fn as_replace_with(mut self) -> Self {
        self.shorthand = true;
        self
    }
}

impl AggregationStage for ReplaceRootStage {
    fn name(&self) -> &'static str {
        if self.shorthand {
            "$replaceWith"
        } else {
            "$replaceRoot"
        }
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let stage = if self.shorthand {
            doc! { "$replaceWith": self.new_root.to_bson(ctx)? }
        } else {
            doc! { "$replaceRoot": { "newRoot": self.new_root.to_bson(ctx)? } }
        };
        Ok(vec![stage])
    }

    fn exposure(&self) -> FieldExposure {
        FieldExposure::Reset
    }
}
