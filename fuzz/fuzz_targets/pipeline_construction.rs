//! Structured fuzz target for pipeline construction.
//!
//! Builds pipelines from arbitrary stage sequences and checks that
//! compilation either succeeds or fails with an error, never panics.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_pipeline_construction
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use aqueduct_aggregation::expr::Expr;
use aqueduct_aggregation::prelude::*;

#[derive(Debug, Arbitrary)]
enum FuzzStage {
    Match { field: String, value: i64 },
    Project { fields: Vec<String> },
    GroupBy { field: String, sum: String },
    SortDesc { field: String },
    Limit { n: i64 },
    Skip { n: u64 },
    Unwind { path: String },
    Count { field: String },
    Out { collection: String },
}

fuzz_target!(|stages: Vec<FuzzStage>| {
    let mut pipeline = Pipeline::new();
    for stage in stages {
        pipeline = match stage {
            FuzzStage::Match { field, value } => {
                pipeline.match_filter(FilterBuilder::new().eq(&field, value))
            }
            FuzzStage::Project { fields } => pipeline.project(ProjectStage::include(fields)),
            FuzzStage::GroupBy { field, sum } => {
                pipeline.group(GroupStage::by(Expr::field(field)).sum(sum, Expr::field("amount")))
            }
            FuzzStage::SortDesc { field } => pipeline.sort(SortStage::new().desc(field)),
            FuzzStage::Limit { n } => pipeline.limit(n),
            FuzzStage::Skip { n } => pipeline.skip(n),
            FuzzStage::Unwind { path } => pipeline.unwind(UnwindStage::path(path)),
            FuzzStage::Count { field } => pipeline.count(&field),
            FuzzStage::Out { collection } => pipeline.out(OutStage::collection(collection)),
        };
    }

    // Compilation must never panic, in either lookup mode.
    let _ = pipeline.to_documents();
});
