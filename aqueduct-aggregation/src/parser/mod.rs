//! The embedded expression language.
//!
//! A small infix language for describing pipeline expressions as text,
//! compiled to the same [`Expr`](crate::expr::Expr) tree the fluent builders
//! produce, so parsed expressions resolve field references through whatever
//! context the enclosing stage renders in.
//!
//! ```text
//! "netPrice + discount * 2"        -> { "$add": ["$netPrice", { "$multiply": ["$discount", 2] }] }
//! "concat(first, ' ', last)"       -> { "$concat": ["$first", " ", "$last"] }
//! "qty >= 100 ? 'bulk' : 'retail'" -> { "$cond": [{ "$gte": ["$qty", 100] }, "bulk", "retail"] }
//! ```

mod grammar;
mod transform;

pub use grammar::{ExprParser, Rule};
pub use transform::{lower, transform};

use pest::Parser;
use pest::iterators::Pair;

use crate::error::{AggregationError, AggregationResult};

/// A unary operator of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical negation.
    Not,
}

/// A binary operator of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

/// A parsed expression-language node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprAst {
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    Str(String),
    /// Boolean literal.
    Bool(bool),
    /// `null`.
    Null,
    /// A property path (`order.total`), segments in order.
    Path(Vec<String>),
    /// An inline array.
    Array(Vec<ExprAst>),
    /// A unary application.
    Unary(UnaryOp, Box<ExprAst>),
    /// A binary application.
    Binary(BinaryOp, Box<ExprAst>, Box<ExprAst>),
    /// `cond ? then : otherwise`.
    Ternary {
        /// The condition.
        cond: Box<ExprAst>,
        /// Value when the condition holds.
        then: Box<ExprAst>,
        /// Value otherwise.
        otherwise: Box<ExprAst>,
    },
    /// A function call by aggregation-function name.
    Call(String, Vec<ExprAst>),
    /// Array indexing (`scores[0]`).
    Index(Box<ExprAst>, Box<ExprAst>),
}

/// Parse expression-language input into an AST.
pub fn parse_expr(input: &str) -> AggregationResult<ExprAst> {
    let mut pairs = ExprParser::parse(Rule::expr_input, input).map_err(|e| {
        let (line, column) = match e.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        AggregationError::Parse {
            line,
            column,
            message: e.variant.message().into_owned(),
        }
    })?;

    // expr_input is silent, so the first pair is the expression itself.
    build_node(pairs.next().expect("grammar yields one expression"))
}

fn build_node(pair: Pair<'_, Rule>) -> AggregationResult<ExprAst> {
    match pair.as_rule() {
        Rule::expression => build_node(pair.into_inner().next().expect("inner expression")),
        Rule::ternary => build_ternary(pair),
        Rule::or_expr
        | Rule::and_expr
        | Rule::equality
        | Rule::comparison
        | Rule::additive
        | Rule::multiplicative => build_binary_chain(pair),
        Rule::unary => build_unary(pair),
        Rule::postfix => build_postfix(pair),
        Rule::function_call => build_call(pair),
        Rule::property_path => Ok(ExprAst::Path(
            pair.into_inner().map(|p| p.as_str().to_string()).collect(),
        )),
        Rule::array => pair
            .into_inner()
            .map(build_node)
            .collect::<AggregationResult<Vec<_>>>()
            .map(ExprAst::Array),
        Rule::integer => Ok(ExprAst::Int(parse_int(pair.as_str())?)),
        Rule::float => Ok(ExprAst::Float(parse_float(pair.as_str())?)),
        Rule::string => {
            let raw = pair.as_str();
            Ok(ExprAst::Str(raw[1..raw.len() - 1].to_string()))
        }
        Rule::boolean => Ok(ExprAst::Bool(pair.as_str() == "true")),
        Rule::null => Ok(ExprAst::Null),
        rule => Err(AggregationError::unsupported(format!(
            "unexpected grammar rule {rule:?}"
        ))),
    }
}

fn build_ternary(pair: Pair<'_, Rule>) -> AggregationResult<ExprAst> {
    let mut inner = pair.into_inner();
    let cond = build_node(inner.next().expect("ternary condition"))?;
    match (inner.next(), inner.next()) {
        (Some(then), Some(otherwise)) => Ok(ExprAst::Ternary {
            cond: Box::new(cond),
            then: Box::new(build_node(then)?),
            otherwise: Box::new(build_node(otherwise)?),
        }),
        _ => Ok(cond),
    }
}

fn build_binary_chain(pair: Pair<'_, Rule>) -> AggregationResult<ExprAst> {
    let mut inner = pair.into_inner();
    let mut lhs = build_node(inner.next().expect("binary lhs"))?;
    while let Some(op_pair) = inner.next() {
        let op = binary_op(op_pair.as_str());
        let rhs = build_node(inner.next().expect("binary rhs"))?;
        lhs = ExprAst::Binary(op, Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn binary_op(token: &str) -> BinaryOp {
    match token {
        "||" => BinaryOp::Or,
        "&&" => BinaryOp::And,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::Ne,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Lte,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::Gte,
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "%" => BinaryOp::Mod,
        other => unreachable!("grammar admits no operator token {other:?}"),
    }
}

fn build_unary(pair: Pair<'_, Rule>) -> AggregationResult<ExprAst> {
    let mut inner = pair.into_inner();
    let first = inner.next().expect("unary operand");
    match first.as_rule() {
        Rule::neg_op => Ok(ExprAst::Unary(
            UnaryOp::Neg,
            Box::new(build_node(inner.next().expect("negated operand"))?),
        )),
        Rule::not_op => Ok(ExprAst::Unary(
            UnaryOp::Not,
            Box::new(build_node(inner.next().expect("negated operand"))?),
        )),
        _ => build_node(first),
    }
}

fn build_postfix(pair: Pair<'_, Rule>) -> AggregationResult<ExprAst> {
    let mut inner = pair.into_inner();
    let mut base = build_node(inner.next().expect("postfix base"))?;
    for index in inner {
        let index_expr = build_node(index.into_inner().next().expect("index expression"))?;
        base = ExprAst::Index(Box::new(base), Box::new(index_expr));
    }
    Ok(base)
}

fn build_call(pair: Pair<'_, Rule>) -> AggregationResult<ExprAst> {
    let mut inner = pair.into_inner();
    let name = inner.next().expect("function name").as_str().to_string();
    let args = inner
        .map(build_node)
        .collect::<AggregationResult<Vec<_>>>()?;
    Ok(ExprAst::Call(name, args))
}

fn parse_int(text: &str) -> AggregationResult<i64> {
    text.parse().map_err(|_| AggregationError::Parse {
        line: 1,
        column: 1,
        message: format!("integer literal '{text}' out of range"),
    })
}

fn parse_float(text: &str) -> AggregationResult<f64> {
    text.parse().map_err(|_| AggregationError::Parse {
        line: 1,
        column: 1,
        message: format!("invalid float literal '{text}'"),
    })
}
