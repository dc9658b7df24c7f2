//! Operation contexts: resolving symbolic field references per stage.
//!
//! Every stage renders against an [`AggregationContext`] describing which
//! names are visible at that point in the pipeline. The assembler threads a
//! chain of contexts: the root context resolves anything against the source
//! collection, a replacing stage ($project, $group) narrows visibility to
//! its own exposure, an extending stage ($addFields, $lookup) layers new
//! names over its predecessor, and nested expression bodies ($map, $filter,
//! $let) bind variables on top of whatever context encloses them.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::error::{AggregationError, AggregationResult};
use crate::field::{ExposedFields, Field, FieldReference};

/// Resolves symbolic field references at one point of a pipeline.
pub trait AggregationContext: Send + Sync {
    /// Resolve a field, using its underlying target path as the lookup key.
    fn reference_for(&self, field: &Field) -> AggregationResult<FieldReference>;

    /// Resolve a bare name or dotted path.
    fn reference_by_name(&self, name: &str) -> AggregationResult<FieldReference> {
        self.reference_for(&Field::new(name))
    }
}

/// A shared, thread-safe context handle.
pub type ContextRef = Arc<dyn AggregationContext>;

/// The root context: every name resolves against the source collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootContext;

impl RootContext {
    /// A shared root context.
    pub fn shared() -> ContextRef {
        Arc::new(RootContext)
    }
}

impl AggregationContext for RootContext {
    fn reference_for(&self, field: &Field) -> AggregationResult<FieldReference> {
        Ok(FieldReference::direct(field.target()))
    }
}

/// What happens when a name is not found in the exposed set (or any parent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupPolicy {
    /// Unresolved names fall through as direct references.
    #[default]
    Relaxed,
    /// Unresolved names are an [`AggregationError::UnknownField`].
    Strict,
}

/// A context limited to the fields a stage exposed.
///
/// A dotted path resolves when its head segment is exposed. With a parent
/// context set, lookup misses delegate to the parent before the policy
/// applies, which gives extending ($addFields-style) semantics; without one,
/// the exposure fully replaces what was visible before.
pub struct ExposedFieldsContext {
    exposed: ExposedFields,
    parent: Option<ContextRef>,
    policy: LookupPolicy,
}

impl ExposedFieldsContext {
    /// A context where only `exposed` is visible.
    pub fn replacing(exposed: ExposedFields, policy: LookupPolicy) -> Self {
        Self {
            exposed,
            parent: None,
            policy,
        }
    }

    /// A context layering `exposed` over everything `parent` resolves.
    ///
    /// The policy applies only when both the exposure and the parent miss.
    pub fn extending(exposed: ExposedFields, parent: ContextRef, policy: LookupPolicy) -> Self {
        Self {
            exposed,
            parent: Some(parent),
            policy,
        }
    }

    /// The exposed field set.
    pub fn exposed(&self) -> &ExposedFields {
        &self.exposed
    }

    fn resolve(&self, path: &str) -> Option<FieldReference> {
        if let Some(exposed) = self.exposed.get(path) {
            // Rendering uses the exposed name: downstream of a renaming
            // stage the alias is the real document key.
            return Some(FieldReference::direct(exposed.name()));
        }

        // Dotted paths into an exposed field resolve as a whole.
        if let Some((head, _)) = path.split_once('.') {
            if self.exposed.get(head).is_some() {
                return Some(FieldReference::direct(path));
            }
        }

        if let Some(parent) = &self.parent {
            return parent.reference_by_name(path).ok();
        }

        None
    }
}

impl AggregationContext for ExposedFieldsContext {
    fn reference_for(&self, field: &Field) -> AggregationResult<FieldReference> {
        let path = field.target();
        match self.resolve(path) {
            Some(reference) => Ok(reference),
            None => match self.policy {
                LookupPolicy::Relaxed => Ok(FieldReference::direct(path)),
                LookupPolicy::Strict => {
                    Err(AggregationError::unknown_field(path, &self.exposed.names()))
                }
            },
        }
    }
}

/// A context for nested expression bodies, binding expression variables.
///
/// Names whose head segment matches a bound variable render `$$`-qualified;
/// everything else delegates to the enclosing context. Nested contexts only
/// live for the duration of a single render call, so they borrow.
pub struct NestedExprContext<'a> {
    inner: &'a dyn AggregationContext,
    variables: Vec<SmolStr>,
}

impl<'a> NestedExprContext<'a> {
    /// Bind `variables` on top of `inner`.
    pub fn new<I, S>(inner: &'a dyn AggregationContext, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            inner,
            variables: variables.into_iter().map(Into::into).collect(),
        }
    }

    fn is_bound(&self, head: &str) -> bool {
        self.variables.iter().any(|v| v == head)
    }
}

impl AggregationContext for NestedExprContext<'_> {
    fn reference_for(&self, field: &Field) -> AggregationResult<FieldReference> {
        let path = field.target();
        let head = path.split('.').next().unwrap_or(path);
        if self.is_bound(head) {
            Ok(FieldReference::variable(path))
        } else {
            self.inner.reference_for(field)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{aliased, field};
    use pretty_assertions::assert_eq;

    fn exposure() -> ExposedFields {
        ExposedFields::none()
            .and_synthetic(field("total"))
            .and_original(field("customer"))
    }

    #[test]
    fn test_root_context_resolves_anything() {
        let ctx = RootContext;
        let r = ctx.reference_by_name("a.b.c").unwrap();
        assert_eq!(r.qualified(), "$a.b.c");
    }

    #[test]
    fn test_root_context_uses_alias_target() {
        let ctx = RootContext;
        let r = ctx.reference_for(&aliased("total", "order.amount")).unwrap();
        assert_eq!(r.qualified(), "$order.amount");
    }

    #[test]
    fn test_replacing_context_resolves_exposed_name() {
        let ctx = ExposedFieldsContext::replacing(exposure(), LookupPolicy::Strict);
        assert_eq!(ctx.reference_by_name("total").unwrap().qualified(), "$total");
        assert_eq!(
            ctx.reference_by_name("customer.name").unwrap().qualified(),
            "$customer.name"
        );
    }

    #[test]
    fn test_replacing_context_strict_rejects_unknown() {
        let ctx = ExposedFieldsContext::replacing(exposure(), LookupPolicy::Strict);
        let err = ctx.reference_by_name("missing").unwrap_err();
        assert!(err.is_unknown_field());
        assert!(err.to_string().contains("total"));
    }

    #[test]
    fn test_replacing_context_relaxed_falls_through() {
        let ctx = ExposedFieldsContext::replacing(exposure(), LookupPolicy::Relaxed);
        assert_eq!(ctx.reference_by_name("missing").unwrap().qualified(), "$missing");
    }

    #[test]
    fn test_extending_context_delegates_to_parent() {
        let ctx = ExposedFieldsContext::extending(
            ExposedFields::none().and_synthetic(field("score")),
            RootContext::shared(),
            LookupPolicy::Relaxed,
        );
        assert_eq!(ctx.reference_by_name("score").unwrap().qualified(), "$score");
        assert_eq!(ctx.reference_by_name("anything").unwrap().qualified(), "$anything");
    }

    #[test]
    fn test_extending_over_strict_replacement() {
        let strict: ContextRef = Arc::new(ExposedFieldsContext::replacing(
            exposure(),
            LookupPolicy::Strict,
        ));
        let ctx = ExposedFieldsContext::extending(
            ExposedFields::none().and_synthetic(field("score")),
            strict,
            LookupPolicy::Strict,
        );

        assert_eq!(ctx.reference_by_name("score").unwrap().qualified(), "$score");
        assert_eq!(ctx.reference_by_name("total").unwrap().qualified(), "$total");
        // A miss in both the exposure and the parent is an error in strict mode.
        assert!(ctx.reference_by_name("gone").unwrap_err().is_unknown_field());
    }

    #[test]
    fn test_nested_context_binds_variables() {
        let root = RootContext;
        let ctx = NestedExprContext::new(&root, ["this", "item"]);
        assert_eq!(ctx.reference_by_name("this").unwrap().qualified(), "$$this");
        assert_eq!(
            ctx.reference_by_name("item.price").unwrap().qualified(),
            "$$item.price"
        );
        assert_eq!(ctx.reference_by_name("price").unwrap().qualified(), "$price");
    }
}
