//! The `$unwind` stage.

use bson::{Document, doc};
use smol_str::SmolStr;

use crate::context::AggregationContext;
use crate::error::AggregationResult;
use crate::field::{ExposedFields, Field, field};

use super::{AggregationStage, FieldExposure};

/// `$unwind`: emit one document per array element.
///
/// Renders the short form (`{ "$unwind": "$path" }`) when no options are
/// set, the document form otherwise.
#[derive(Debug, Clone)]
pub struct UnwindStage {
    path: Field,
    include_array_index: Option<SmolStr>,
    preserve_null_and_empty: bool,
}

impl UnwindStage {
    /// Unwind the array at `path`.
    pub fn path(path: impl Into<SmolStr>) -> Self {
        Self {
            path: field(path),
            include_array_index: None,
            preserve_null_and_empty: false,
        }
    }

    /// Also emit the element's array index under the given field.
    pub fn with_array_index(mut self, name: impl Into<SmolStr>) -> Self {
        self.include_array_index = Some(name.into());
        self
    }

    /// Keep documents whose array is null, missing or empty.
    pub fn preserve_null_and_empty(mut self) -> Self {
        self.preserve_null_and_empty = true;
        self
    }
}

impl AggregationStage for UnwindStage {
    fn name(&self) -> &'static str {
        "$unwind"
    }

    fn to_documents(&self, ctx: &dyn AggregationContext) -> AggregationResult<Vec<Document>> {
        let path = ctx.reference_for(&self.path)?.qualified();

        let stage = if self.include_array_index.is_none() && !self.preserve_null_and_empty {
            doc! { "$unwind": path }
        } else {
            let mut spec = doc! { "path": path };
            if let Some(index) = &self.include_array_index {
                spec.insert("includeArrayIndex", index.as_str());
            }
            if self.preserve_null_and_empty {
                spec.insert("preserveNullAndEmptyArrays", true);
            }
            doc! { "$unwind": spec }
        };
        Ok(vec![stage])
    }

    fn exposure(&self) -> FieldExposure {
        match &self.include_array_index {
            Some(index) => FieldExposure::Extend(
                ExposedFields::none().and_synthetic(field(index.clone())),
            ),
            None => FieldExposure::Keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_short_form() {
        let stage = UnwindStage::path("items");
        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! { "$unwind": "$items" }]
        );
    }

    #[test]
    fn test_document_form() {
        let stage = UnwindStage::path("items")
            .with_array_index("idx")
            .preserve_null_and_empty();
        assert_eq!(
            stage.to_documents(&RootContext).unwrap(),
            vec![doc! {
                "$unwind": {
                    "path": "$items",
                    "includeArrayIndex": "idx",
                    "preserveNullAndEmptyArrays": true,
                }
            }]
        );
    }

    #[test]
    fn test_exposure_extends_with_index_field() {
        let stage = UnwindStage::path("items").with_array_index("idx");
        match stage.exposure() {
            FieldExposure::Extend(exposed) => assert_eq!(exposed.names(), vec!["idx"]),
            other => panic!("expected extend exposure, got {other:?}"),
        }
        assert!(matches!(
            UnwindStage::path("items").exposure(),
            FieldExposure::Keep
        ));
    }
}
