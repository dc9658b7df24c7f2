//! Pest grammar parser for the aggregation expression language.

use pest_derive::Parser;

/// The expression-language parser.
#[derive(Parser)]
#[grammar = "parser/expr.pest"]
pub struct ExprParser;
