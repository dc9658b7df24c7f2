//! Benchmarks for pipeline compilation and expression parsing.
//!
//! Compilation is pure document building, so these measure the builder and
//! context-threading overhead without any I/O.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use aqueduct_aggregation::prelude::*;

fn bench_pipeline_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_compilation");

    group.bench_function("match_group_sort_limit", |b| {
        b.iter(|| {
            let pipeline = Pipeline::new()
                .match_filter(FilterBuilder::new().eq("status", "complete"))
                .group(
                    GroupStage::by(Expr::field("region"))
                        .sum("total", Expr::field("amount"))
                        .count("orders"),
                )
                .sort(SortStage::new().desc("total"))
                .limit(5);
            black_box(pipeline.to_documents().unwrap())
        })
    });

    group.bench_function("project_with_computed_fields", |b| {
        b.iter(|| {
            let pipeline = Pipeline::new().project(
                ProjectStage::include(["sku", "region"])
                    .and_field(aliased("total", "order.amount"))
                    .and_computed(
                        "net",
                        ArithmeticOperators::value_of("gross").subtract("fees"),
                    )
                    .exclude_id(),
            );
            black_box(pipeline.to_documents().unwrap())
        })
    });

    group.bench_function("window_fields", |b| {
        b.iter(|| {
            let pipeline = Pipeline::new().set_window_fields(
                SetWindowFieldsStage::new()
                    .partition_by(Expr::field("region"))
                    .sort_asc("date")
                    .output(
                        WindowOutput::new(
                            "running",
                            AccumulatorOperators::sum(Expr::field("amount")),
                        )
                        .over(Window::cumulative()),
                    ),
            );
            black_box(pipeline.to_documents().unwrap())
        })
    });

    group.finish();
}

fn bench_expression_language(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression_language");

    group.bench_function("arithmetic", |b| {
        b.iter(|| black_box(expression("netPrice + discount * 2").unwrap()))
    });

    group.bench_function("nested_calls_and_ternary", |b| {
        b.iter(|| {
            black_box(
                expression("qty >= 100 ? concat(sku, '-bulk') : concat(sku, '-retail')").unwrap(),
            )
        })
    });

    group.bench_function("render_against_root", |b| {
        let expr = expression("a + b * c - d / e").unwrap();
        b.iter(|| black_box(expr.to_bson(&RootContext).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_pipeline_compilation, bench_expression_language);
criterion_main!(benches);
