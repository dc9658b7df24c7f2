//! Query-filter building for `$match` stages.

use bson::{Bson, Document, doc, oid::ObjectId};

use crate::context::AggregationContext;
use crate::error::AggregationResult;
use crate::expr::Expr;

/// Builder for `$match` filter documents.
///
/// # Example
///
/// ```rust,ignore
/// use aqueduct_aggregation::filter::FilterBuilder;
///
/// let filter = FilterBuilder::new()
///     .eq("status", "active")
///     .gte("age", 18)
///     .regex("email", r"@example\.com$")
///     .build();
///
/// // { "status": "active", "age": { "$gte": 18 }, "email": { "$regex": "@example\\.com$" } }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    doc: Document,
}

impl FilterBuilder {
    /// Create an empty filter builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter builder from an existing document.
    pub fn from_doc(doc: Document) -> Self {
        Self { doc }
    }

    /// Equality condition.
    pub fn eq(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.doc.insert(field, value.into());
        self
    }

    /// Not-equal condition.
    pub fn ne(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.doc.insert(field, doc! { "$ne": value.into() });
        self
    }

    /// Greater-than condition.
    pub fn gt(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.doc.insert(field, doc! { "$gt": value.into() });
        self
    }

    /// Greater-than-or-equal condition.
    pub fn gte(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.doc.insert(field, doc! { "$gte": value.into() });
        self
    }

    /// Less-than condition.
    pub fn lt(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.doc.insert(field, doc! { "$lt": value.into() });
        self
    }

    /// Less-than-or-equal condition.
    pub fn lte(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.doc.insert(field, doc! { "$lte": value.into() });
        self
    }

    /// Closed-range condition: `low <= field <= high`.
    pub fn between(mut self, field: &str, low: impl Into<Bson>, high: impl Into<Bson>) -> Self {
        self.doc
            .insert(field, doc! { "$gte": low.into(), "$lte": high.into() });
        self
    }

    /// Membership condition (`$in`).
    pub fn in_array(mut self, field: &str, values: Vec<impl Into<Bson>>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.doc.insert(field, doc! { "$in": values });
        self
    }

    /// Exclusion condition (`$nin`).
    pub fn not_in(mut self, field: &str, values: Vec<impl Into<Bson>>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.doc.insert(field, doc! { "$nin": values });
        self
    }

    /// Regex condition.
    pub fn regex(mut self, field: &str, pattern: &str) -> Self {
        self.doc.insert(field, doc! { "$regex": pattern });
        self
    }

    /// Regex condition with options.
    pub fn regex_with_options(mut self, field: &str, pattern: &str, options: &str) -> Self {
        self.doc
            .insert(field, doc! { "$regex": pattern, "$options": options });
        self
    }

    /// Field-existence condition.
    pub fn exists(mut self, field: &str, exists: bool) -> Self {
        self.doc.insert(field, doc! { "$exists": exists });
        self
    }

    /// BSON type condition.
    pub fn type_is(mut self, field: &str, bson_type: &str) -> Self {
        self.doc.insert(field, doc! { "$type": bson_type });
        self
    }

    /// Array size condition.
    pub fn size(mut self, field: &str, size: i32) -> Self {
        self.doc.insert(field, doc! { "$size": size });
        self
    }

    /// Array contains-all condition (`$all`).
    pub fn all(mut self, field: &str, values: Vec<impl Into<Bson>>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.doc.insert(field, doc! { "$all": values });
        self
    }

    /// Array element match condition.
    pub fn elem_match(mut self, field: &str, query: Document) -> Self {
        self.doc.insert(field, doc! { "$elemMatch": query });
        self
    }

    /// Text search condition.
    pub fn text_search(mut self, search: &str) -> Self {
        self.doc.insert("$text", doc! { "$search": search });
        self
    }

    /// `_id` equality condition.
    pub fn by_id(mut self, id: ObjectId) -> Self {
        self.doc.insert("_id", id);
        self
    }

    /// Combine sub-filters with `$and`.
    pub fn and(mut self, conditions: Vec<Document>) -> Self {
        self.doc.insert("$and", conditions);
        self
    }

    /// Combine sub-filters with `$or`.
    pub fn or(mut self, conditions: Vec<Document>) -> Self {
        self.doc.insert("$or", conditions);
        self
    }

    /// Combine sub-filters with `$nor`.
    pub fn nor(mut self, conditions: Vec<Document>) -> Self {
        self.doc.insert("$nor", conditions);
        self
    }

    /// Negate a per-field condition.
    pub fn not(mut self, field: &str, condition: Document) -> Self {
        self.doc.insert(field, doc! { "$not": condition });
        self
    }

    /// Merge another filter into this one; later keys win.
    pub fn merge(mut self, other: Document) -> Self {
        for (k, v) in other {
            self.doc.insert(k, v);
        }
        self
    }

    /// Build the filter document.
    pub fn build(self) -> Document {
        self.doc
    }

    /// Whether no conditions were added.
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    /// Build an `$expr`-wrapped filter from an aggregation expression,
    /// resolving its field references through `ctx`.
    pub fn expr(expr: &Expr, ctx: &dyn AggregationContext) -> AggregationResult<Document> {
        Ok(doc! { "$expr": expr.to_bson(ctx)? })
    }
}

/// An empty filter (matches all documents).
pub fn all_documents() -> Document {
    doc! {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use crate::expr::ComparisonOperators;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_eq_and_comparison() {
        let filter = FilterBuilder::new()
            .eq("status", "active")
            .gte("age", 18)
            .build();

        assert_eq!(filter.get_str("status").unwrap(), "active");
        let age = filter.get_document("age").unwrap();
        assert_eq!(age.get_i32("$gte").unwrap(), 18);
    }

    #[test]
    fn test_between() {
        let filter = FilterBuilder::new().between("price", 10, 20).build();
        let price = filter.get_document("price").unwrap();
        assert_eq!(price.get_i32("$gte").unwrap(), 10);
        assert_eq!(price.get_i32("$lte").unwrap(), 20);
    }

    #[test]
    fn test_in_array() {
        let filter = FilterBuilder::new()
            .in_array("status", vec!["active", "pending"])
            .build();
        assert!(filter.get_document("status").unwrap().contains_key("$in"));
    }

    #[test]
    fn test_or_combination() {
        let filter = FilterBuilder::new()
            .or(vec![doc! { "status": "active" }, doc! { "priority": "high" }])
            .build();
        assert!(filter.contains_key("$or"));
    }

    #[test]
    fn test_by_id() {
        let oid = ObjectId::new();
        let filter = FilterBuilder::new().by_id(oid).build();
        assert_eq!(filter.get_object_id("_id").unwrap(), oid);
    }

    #[test]
    fn test_expr_filter() {
        let expr = ComparisonOperators::value_of("spent").greater_than("budget");
        let filter = FilterBuilder::expr(&expr, &RootContext).unwrap();
        assert_eq!(
            filter,
            doc! { "$expr": { "$gt": ["$spent", "$budget"] } }
        );
    }

    #[test]
    fn test_all_documents() {
        assert!(all_documents().is_empty());
    }
}
