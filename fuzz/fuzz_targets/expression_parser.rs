//! Fuzz target for the embedded expression language.
//!
//! Feeds arbitrary strings to the parser and, when parsing succeeds,
//! renders the lowered expression against the root context.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_expression_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

use aqueduct_aggregation::context::RootContext;
use aqueduct_aggregation::expression;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // The parser should never panic, only return errors.
        if let Ok(expr) = expression(input) {
            // Rendering a successfully lowered expression must not panic
            // either; the root context resolves any path.
            let _ = expr.to_bson(&RootContext);
        }
    }
});
