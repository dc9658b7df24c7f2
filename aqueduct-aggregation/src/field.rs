//! Symbolic field model for aggregation pipelines.
//!
//! A pipeline stage refers to document values by symbolic name. This module
//! tracks those names through three layers:
//!
//! - [`Field`] - a bare symbolic name, optionally aliasing an underlying
//!   document path (`field("total", "order.amount")`).
//! - [`ExposedFields`] - the set of names a stage makes visible to its
//!   successors, partitioned into synthetic fields (computed at that stage)
//!   and original fields (carried from the input document).
//! - [`FieldReference`] - a resolved pointer, rendered either as a raw path
//!   (`"price"`, for key positions such as `$sort`) or expression-qualified
//!   (`"$price"`, or `"$$this"` for variables bound inside expressions).

use std::fmt;
use std::slice;

use bson::Bson;
use indexmap::IndexMap;
use smol_str::SmolStr;

/// A symbolic field name, optionally aliasing an underlying document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    name: SmolStr,
    target: Option<SmolStr>,
}

impl Field {
    /// Create a field whose exposed name and document path are the same.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            target: None,
        }
    }

    /// Create a field exposing `name` as an alias for the path `target`.
    pub fn aliased(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        let name = name.into();
        let target = target.into();
        if name == target {
            Self { name, target: None }
        } else {
            Self {
                name,
                target: Some(target),
            }
        }
    }

    /// The exposed name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying document path (the name itself when not aliased).
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.name)
    }

    /// Whether this field renames its underlying path.
    pub fn is_aliased(&self) -> bool {
        self.target.is_some()
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Field::new(name)
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Field::new(name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{} -> {}", self.name, target),
            None => f.write_str(&self.name),
        }
    }
}

/// Create a [`Field`].
pub fn field(name: impl Into<SmolStr>) -> Field {
    Field::new(name)
}

/// Create an aliased [`Field`] exposing `name` for the path `target`.
pub fn aliased(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Field {
    Field::aliased(name, target)
}

/// An ordered, name-unique collection of fields.
///
/// Inserting a field under an existing name replaces the earlier entry while
/// keeping its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    fields: IndexMap<SmolStr, Field>,
}

impl Fields {
    /// Create an empty collection.
    pub fn none() -> Self {
        Self::default()
    }

    /// Create a collection from plain (non-aliased) names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let mut fields = Self::none();
        for name in names {
            fields = fields.and(Field::new(name));
        }
        fields
    }

    /// Add a field, replacing any earlier field with the same name.
    pub fn and(mut self, field: Field) -> Self {
        self.fields.insert(SmolStr::new(field.name()), field);
        self
    }

    /// Look up a field by exposed name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<SmolStr>> FromIterator<S> for Fields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Fields::from_names(iter)
    }
}

/// A field made visible by a pipeline stage.
///
/// `synthetic` marks values computed at the exposing stage rather than
/// carried over from the input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposedField {
    field: Field,
    synthetic: bool,
}

impl ExposedField {
    /// Expose a field carried from the input document.
    pub fn original(field: Field) -> Self {
        Self {
            field,
            synthetic: false,
        }
    }

    /// Expose a field computed at the current stage.
    pub fn synthetic(field: Field) -> Self {
        Self {
            field,
            synthetic: true,
        }
    }

    /// The exposed name.
    pub fn name(&self) -> &str {
        self.field.name()
    }

    /// The underlying document path.
    pub fn target(&self) -> &str {
        self.field.target()
    }

    /// The wrapped field.
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Whether the value is computed at the exposing stage.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

/// The set of symbolic names visible after a pipeline stage.
///
/// Iteration yields synthetic fields before original ones, each partition in
/// insertion order. All combinators return a new value; the synthetic and
/// original partitions never mix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExposedFields {
    synthetic: Vec<ExposedField>,
    original: Vec<ExposedField>,
}

impl ExposedFields {
    /// Create an empty exposure.
    pub fn none() -> Self {
        Self::default()
    }

    /// Expose all given fields as synthetic.
    pub fn from_synthetic(fields: &Fields) -> Self {
        fields
            .iter()
            .fold(Self::none(), |acc, f| acc.and(ExposedField::synthetic(f.clone())))
    }

    /// Expose all given fields as original.
    pub fn from_original(fields: &Fields) -> Self {
        fields
            .iter()
            .fold(Self::none(), |acc, f| acc.and(ExposedField::original(f.clone())))
    }

    /// Add an exposed field, replacing any earlier exposure of the same name.
    pub fn and(mut self, exposed: ExposedField) -> Self {
        self.synthetic.retain(|f| f.name() != exposed.name());
        self.original.retain(|f| f.name() != exposed.name());
        if exposed.is_synthetic() {
            self.synthetic.push(exposed);
        } else {
            self.original.push(exposed);
        }
        self
    }

    /// Add a synthetic exposure of `field`.
    pub fn and_synthetic(self, field: Field) -> Self {
        self.and(ExposedField::synthetic(field))
    }

    /// Add an original exposure of `field`.
    pub fn and_original(self, field: Field) -> Self {
        self.and(ExposedField::original(field))
    }

    /// Look up an exposed field by name, synthetic partition first.
    pub fn get(&self, name: &str) -> Option<&ExposedField> {
        self.synthetic
            .iter()
            .find(|f| f.name() == name)
            .or_else(|| self.original.iter().find(|f| f.name() == name))
    }

    /// Iterate exposed fields, synthetic first.
    pub fn iter(&self) -> impl Iterator<Item = &ExposedField> {
        self.synthetic.iter().chain(self.original.iter())
    }

    /// Iterate only the synthetic partition.
    pub fn synthetic(&self) -> slice::Iter<'_, ExposedField> {
        self.synthetic.iter()
    }

    /// Iterate only the original partition.
    pub fn original(&self) -> slice::Iter<'_, ExposedField> {
        self.original.iter()
    }

    /// Exposed names, synthetic first.
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|f| f.name()).collect()
    }

    /// Number of exposed fields.
    pub fn len(&self) -> usize {
        self.synthetic.len() + self.original.len()
    }

    /// Whether nothing is exposed.
    pub fn is_empty(&self) -> bool {
        self.synthetic.is_empty() && self.original.is_empty()
    }
}

/// How a resolved reference renders in expression position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// A document path: `$path`.
    Direct,
    /// A variable bound by an enclosing expression: `$$name`.
    Variable,
}

/// A resolved symbolic pointer to a document value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReference {
    target: SmolStr,
    kind: ReferenceKind,
}

impl FieldReference {
    /// A direct reference to a document path.
    pub fn direct(target: impl Into<SmolStr>) -> Self {
        Self {
            target: target.into(),
            kind: ReferenceKind::Direct,
        }
    }

    /// A variable reference (`$$name`).
    pub fn variable(target: impl Into<SmolStr>) -> Self {
        Self {
            target: target.into(),
            kind: ReferenceKind::Variable,
        }
    }

    /// The raw path, without any `$` qualification.
    ///
    /// Used in key positions (`$sort`, `$unset`, lookup `localField`).
    pub fn raw(&self) -> &str {
        &self.target
    }

    /// The reference kind.
    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// The expression-qualified rendering: `$path` or `$$name`.
    pub fn qualified(&self) -> String {
        match self.kind {
            ReferenceKind::Direct => format!("${}", self.target),
            ReferenceKind::Variable => format!("$${}", self.target),
        }
    }

    /// Render as a BSON expression value.
    pub fn to_bson(&self) -> Bson {
        Bson::String(self.qualified())
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}
