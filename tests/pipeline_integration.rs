//! Integration tests for pipeline compilation through the facade crate.
//!
//! These exercise the full compile path: builders -> context threading ->
//! wire documents, including the structural invariants the assembler
//! enforces.

use aqueduct_odm::prelude::*;
use bson::doc;
use pretty_assertions::assert_eq;

/// An analytics-style pipeline compiles to the exact wire documents.
#[test]
fn test_order_totals_pipeline() {
    let pipeline = Pipeline::new()
        .match_filter(
            FilterBuilder::new()
                .eq("status", "complete")
                .gte("amount", 10),
        )
        .group(
            GroupStage::by(Expr::field("region"))
                .sum("total", Expr::field("amount"))
                .count("orders"),
        )
        .sort(SortStage::new().desc("total"))
        .limit(5);

    assert_eq!(
        pipeline.to_documents().unwrap(),
        vec![
            doc! { "$match": { "status": "complete", "amount": { "$gte": 10 } } },
            doc! { "$group": {
                "_id": "$region",
                "total": { "$sum": "$amount" },
                "orders": { "$sum": 1 },
            } },
            doc! { "$sort": { "total": -1 } },
            doc! { "$limit": 5_i64 },
        ]
    );
}

/// Renames made by $project are what downstream stages see.
#[test]
fn test_rename_propagates_through_pipeline() {
    let pipeline = Pipeline::new()
        .strict()
        .project(
            ProjectStage::new()
                .and_field(aliased("total", "order.amount"))
                .and_field(field("customer")),
        )
        .sort(SortStage::new().desc("total"))
        .group(GroupStage::by(Expr::field("customer")).max("best", Expr::field("total")));

    assert_eq!(
        pipeline.to_documents().unwrap(),
        vec![
            doc! { "$project": { "total": "$order.amount", "customer": 1 } },
            doc! { "$sort": { "total": -1 } },
            doc! { "$group": { "_id": "$customer", "best": { "$max": "$total" } } },
        ]
    );
}

/// Strict mode rejects references to fields a $group did not expose.
#[test]
fn test_strict_mode_rejects_dangling_reference() {
    let pipeline = Pipeline::new()
        .strict()
        .group(GroupStage::by(Expr::field("region")).count("n"))
        .sort(SortStage::new().desc("amount"));

    let err = pipeline.to_documents().unwrap_err();
    assert!(matches!(err, AggregationError::UnknownField { .. }));
    assert!(err.to_string().contains("amount"));
}

/// $lookup with a sub-pipeline and let bindings.
#[test]
fn test_lookup_subpipeline() {
    let recent = Pipeline::new()
        .match_expr(ComparisonOperators::value_of("customer_id").equal_to(Expr::variable("cust")))
        .sort(SortStage::new().desc("created"))
        .limit(3);

    let pipeline = Pipeline::new().lookup(
        LookupStage::from("orders")
            .let_var("cust", Expr::field("_id"))
            .pipeline(recent)
            .into_field("recent_orders"),
    );

    let docs = pipeline.to_documents().unwrap();
    let lookup = docs[0].get_document("$lookup").unwrap();
    assert_eq!(lookup.get_str("from").unwrap(), "orders");
    assert_eq!(lookup.get_array("pipeline").unwrap().len(), 3);
    assert_eq!(lookup.get_str("as").unwrap(), "recent_orders");
}

/// $facet branches compile independently over the same input.
#[test]
fn test_facet_pipeline() {
    let pipeline = Pipeline::new()
        .match_filter(FilterBuilder::new().eq("status", "open"))
        .facet(
            FacetStage::new()
                .branch("count", Pipeline::new().count("n"))
                .branch(
                    "by_priority",
                    Pipeline::new().sort_by_count(Expr::field("priority")),
                ),
        );

    assert_eq!(
        pipeline.to_documents().unwrap(),
        vec![
            doc! { "$match": { "status": "open" } },
            doc! { "$facet": {
                "count": [{ "$count": "n" }],
                "by_priority": [{ "$sortByCount": "$priority" }],
            } },
        ]
    );
}

/// A window-function pipeline with a cumulative frame.
#[test]
fn test_running_total_pipeline() {
    let pipeline = Pipeline::new().set_window_fields(
        SetWindowFieldsStage::new()
            .partition_by(Expr::field("region"))
            .sort_asc("date")
            .output(
                WindowOutput::new("running", AccumulatorOperators::sum(Expr::field("amount")))
                    .over(Window::cumulative()),
            ),
    );

    let docs = pipeline.to_documents().unwrap();
    let spec = docs[0].get_document("$setWindowFields").unwrap();
    assert_eq!(spec.get_str("partitionBy").unwrap(), "$region");
    assert!(spec.get_document("output").unwrap().contains_key("running"));
}

/// Terminal stages are rejected anywhere but last.
#[test]
fn test_terminal_stage_ordering() {
    let bad = Pipeline::new()
        .merge(MergeStage::into_collection("totals"))
        .limit(1);
    assert!(bad.verify().is_err());

    let good = Pipeline::new()
        .group(GroupStage::by(Expr::field("region")).count("n"))
        .merge(
            MergeStage::into_collection("totals")
                .on(["_id"])
                .when_matched(WhenMatched::Replace)
                .when_not_matched(WhenNotMatched::Insert),
        );
    assert!(good.verify().is_ok());
}

/// $vectorSearch must come first and may emit a score projection stage.
#[test]
fn test_vector_search_pipeline() {
    let pipeline = Pipeline::new()
        .vector_search(
            VectorSearchStage::index("embeddings_index")
                .path("embedding")
                .query_vector(vec![0.1, 0.2, 0.3])
                .limit(10)
                .num_candidates(200)
                .with_score("score"),
        )
        .match_query(doc! { "score": { "$gte": 0.75 } });

    let docs = pipeline.to_documents().unwrap();
    assert_eq!(docs.len(), 3);
    assert!(docs[0].contains_key("$vectorSearch"));
    assert_eq!(
        docs[1],
        doc! { "$addFields": { "score": { "$meta": "vectorSearchScore" } } }
    );

    let misplaced = Pipeline::new().limit(1).vector_search(
        VectorSearchStage::index("idx").path("v").query_vector(vec![0.0]),
    );
    assert!(misplaced.verify().is_err());
}

/// Unwind with index extends visibility; paginate flattens to two stages.
#[test]
fn test_unwind_and_paginate() {
    let pipeline = Pipeline::new()
        .strict()
        .project(ProjectStage::include(["items"]))
        .unwind(UnwindStage::path("items").with_array_index("position"))
        .sort(SortStage::new().asc("position"))
        .paginate(2, 10);

    assert_eq!(
        pipeline.to_documents().unwrap(),
        vec![
            doc! { "$project": { "items": 1 } },
            doc! { "$unwind": { "path": "$items", "includeArrayIndex": "position" } },
            doc! { "$sort": { "position": 1 } },
            doc! { "$skip": 20_i64 },
            doc! { "$limit": 10_i64 },
        ]
    );
}
