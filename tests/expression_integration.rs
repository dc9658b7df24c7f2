//! Integration tests for the expression language through the facade crate.

use aqueduct_odm::expression;
use aqueduct_odm::prelude::*;
use bson::{Bson, doc};
use pretty_assertions::assert_eq;

fn render(input: &str) -> Bson {
    expression(input).unwrap().to_bson(&RootContext).unwrap()
}

#[test]
fn test_arithmetic_precedence_and_flattening() {
    assert_eq!(
        render("a + b + c * d"),
        Bson::Document(doc! {
            "$add": ["$a", "$b", { "$multiply": ["$c", "$d"] }]
        })
    );
}

#[test]
fn test_property_paths_and_functions() {
    assert_eq!(
        render("concat(customer.first, ' ', customer.last)"),
        Bson::Document(doc! {
            "$concat": ["$customer.first", " ", "$customer.last"]
        })
    );
}

#[test]
fn test_comparison_logic_ternary() {
    assert_eq!(
        render("qty >= 100 && region == 'emea' ? price * 0.9 : price"),
        Bson::Document(doc! {
            "$cond": [
                { "$and": [
                    { "$gte": ["$qty", 100] },
                    { "$eq": ["$region", "emea"] },
                ] },
                { "$multiply": ["$price", 0.9] },
                "$price",
            ]
        })
    );
}

#[test]
fn test_indexing_and_arrays() {
    assert_eq!(
        render("tags[0]"),
        Bson::Document(doc! { "$arrayElemAt": ["$tags", 0] })
    );
    assert_eq!(
        render("setUnion(tags, ['new'])"),
        Bson::Document(doc! { "$setUnion": ["$tags", ["new"]] })
    );
}

#[test]
fn test_parsed_expression_in_pipeline_stage() {
    let pipeline = Pipeline::new()
        .project(ProjectStage::include(["sku"]).and_computed("net", expression("gross - fees").unwrap()))
        .match_expr(expression("net > 0").unwrap());

    assert_eq!(
        pipeline.to_documents().unwrap(),
        vec![
            doc! { "$project": { "sku": 1, "net": { "$subtract": ["$gross", "$fees"] } } },
            doc! { "$match": { "$expr": { "$gt": ["$net", 0] } } },
        ]
    );
}

#[test]
fn test_parsed_expression_respects_strict_context() {
    // "amount" disappears after the projection, so strict mode rejects it.
    let pipeline = Pipeline::new()
        .strict()
        .project(ProjectStage::include(["sku"]).exclude_id())
        .match_expr(expression("amount > 0").unwrap());

    let err = pipeline.to_documents().unwrap_err();
    assert!(matches!(err, AggregationError::UnknownField { .. }));
}

#[test]
fn test_parse_errors_are_reported_with_position() {
    let err = expression("price + * 2").unwrap_err();
    assert!(matches!(err, AggregationError::Parse { .. }));

    let err = expression("frobnicate(x)").unwrap_err();
    assert_eq!(
        err.to_string(),
        "unknown aggregation function 'frobnicate'"
    );
}

#[test]
fn test_unary_operators() {
    assert_eq!(render("-3"), Bson::Int32(-3));
    assert_eq!(
        render("-discount"),
        Bson::Document(doc! { "$multiply": [-1, "$discount"] })
    );
    assert_eq!(
        render("!(archived || deleted)"),
        Bson::Document(doc! { "$not": [{ "$or": ["$archived", "$deleted"] }] })
    );
}
