//! Lowering parsed expression-language ASTs into expression trees.

use bson::Bson;

use crate::error::{AggregationError, AggregationResult};
use crate::expr::Expr;

use super::{BinaryOp, ExprAst, UnaryOp, parse_expr};

/// Parse and lower expression-language input in one step.
///
/// The result renders through any context, so parsed expressions take part
/// in field renaming and exposure like hand-built ones.
pub fn transform(input: &str) -> AggregationResult<Expr> {
    lower(parse_expr(input)?)
}

/// Lower a parsed AST into an [`Expr`].
pub fn lower(ast: ExprAst) -> AggregationResult<Expr> {
    match ast {
        ExprAst::Int(value) => Ok(Expr::Literal(int_literal(value))),
        ExprAst::Float(value) => Ok(Expr::Literal(Bson::Double(value))),
        ExprAst::Str(value) => Ok(Expr::Literal(Bson::String(value))),
        ExprAst::Bool(value) => Ok(Expr::Literal(Bson::Boolean(value))),
        ExprAst::Null => Ok(Expr::Literal(Bson::Null)),
        ExprAst::Path(segments) => Ok(Expr::field(segments.join("."))),
        ExprAst::Array(items) => Ok(Expr::Array(
            items
                .into_iter()
                .map(lower)
                .collect::<AggregationResult<Vec<_>>>()?,
        )),
        ExprAst::Unary(UnaryOp::Not, inner) => Ok(Expr::op("$not", vec![lower(*inner)?])),
        ExprAst::Unary(UnaryOp::Neg, inner) => lower_negation(*inner),
        ExprAst::Binary(op, lhs, rhs) => Ok(Expr::op(
            binary_operator(op),
            vec![lower(*lhs)?, lower(*rhs)?],
        )),
        ExprAst::Ternary {
            cond,
            then,
            otherwise,
        } => Ok(Expr::op(
            "$cond",
            vec![lower(*cond)?, lower(*then)?, lower(*otherwise)?],
        )),
        ExprAst::Index(base, index) => Ok(Expr::op(
            "$arrayElemAt",
            vec![lower(*base)?, lower(*index)?],
        )),
        ExprAst::Call(name, args) => lower_call(&name, args),
    }
}

fn int_literal(value: i64) -> Bson {
    if let Ok(small) = i32::try_from(value) {
        Bson::Int32(small)
    } else {
        Bson::Int64(value)
    }
}

/// Negative literals fold; anything else lowers to `$multiply [-1, x]`.
fn lower_negation(inner: ExprAst) -> AggregationResult<Expr> {
    match inner {
        ExprAst::Int(value) => Ok(Expr::Literal(int_literal(-value))),
        ExprAst::Float(value) => Ok(Expr::Literal(Bson::Double(-value))),
        other => Ok(Expr::op(
            "$multiply",
            vec![Expr::Literal(Bson::Int32(-1)), lower(other)?],
        )),
    }
}

fn binary_operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "$or",
        BinaryOp::And => "$and",
        BinaryOp::Eq => "$eq",
        BinaryOp::Ne => "$ne",
        BinaryOp::Lt => "$lt",
        BinaryOp::Lte => "$lte",
        BinaryOp::Gt => "$gt",
        BinaryOp::Gte => "$gte",
        BinaryOp::Add => "$add",
        BinaryOp::Sub => "$subtract",
        BinaryOp::Mul => "$multiply",
        BinaryOp::Div => "$divide",
        BinaryOp::Mod => "$mod",
    }
}

/// Function-name to operator mapping: (operator, min arity, max arity).
fn function_operator(name: &str) -> Option<(&'static str, usize, Option<usize>)> {
    Some(match name {
        // Arithmetic
        "abs" => ("$abs", 1, Some(1)),
        "ceil" => ("$ceil", 1, Some(1)),
        "floor" => ("$floor", 1, Some(1)),
        "round" => ("$round", 1, Some(2)),
        "trunc" => ("$trunc", 1, Some(2)),
        "sqrt" => ("$sqrt", 1, Some(1)),
        "pow" => ("$pow", 2, Some(2)),
        "exp" => ("$exp", 1, Some(1)),
        "ln" => ("$ln", 1, Some(1)),
        "log" => ("$log", 2, Some(2)),

        // Strings
        "concat" => ("$concat", 1, None),
        "toLower" => ("$toLower", 1, Some(1)),
        "toUpper" => ("$toUpper", 1, Some(1)),
        "strLenCP" => ("$strLenCP", 1, Some(1)),
        "substr" | "substrCP" => ("$substrCP", 3, Some(3)),
        "split" => ("$split", 2, Some(2)),

        // Dates
        "year" => ("$year", 1, Some(1)),
        "month" => ("$month", 1, Some(1)),
        "dayOfMonth" => ("$dayOfMonth", 1, Some(1)),
        "dayOfWeek" => ("$dayOfWeek", 1, Some(1)),
        "dayOfYear" => ("$dayOfYear", 1, Some(1)),
        "hour" => ("$hour", 1, Some(1)),
        "minute" => ("$minute", 1, Some(1)),
        "second" => ("$second", 1, Some(1)),
        "millisecond" => ("$millisecond", 1, Some(1)),
        "week" => ("$week", 1, Some(1)),
        "isoWeek" => ("$isoWeek", 1, Some(1)),
        "isoDayOfWeek" => ("$isoDayOfWeek", 1, Some(1)),

        // Conditionals
        "cond" => ("$cond", 3, Some(3)),
        "ifNull" => ("$ifNull", 2, Some(2)),

        // Arrays
        "size" => ("$size", 1, Some(1)),
        "arrayElemAt" => ("$arrayElemAt", 2, Some(2)),
        "concatArrays" => ("$concatArrays", 1, None),
        "first" => ("$first", 1, Some(1)),
        "last" => ("$last", 1, Some(1)),
        "reverseArray" => ("$reverseArray", 1, Some(1)),
        "range" => ("$range", 2, Some(3)),
        "slice" => ("$slice", 2, Some(3)),

        // Sets
        "setUnion" => ("$setUnion", 1, None),
        "setIntersection" => ("$setIntersection", 1, None),
        "setDifference" => ("$setDifference", 2, Some(2)),
        "setEquals" => ("$setEquals", 2, None),
        "setIsSubset" => ("$setIsSubset", 2, Some(2)),
        "anyElementTrue" => ("$anyElementTrue", 1, Some(1)),
        "allElementsTrue" => ("$allElementsTrue", 1, Some(1)),

        // Conversions
        "toBool" => ("$toBool", 1, Some(1)),
        "toDate" => ("$toDate", 1, Some(1)),
        "toDecimal" => ("$toDecimal", 1, Some(1)),
        "toDouble" => ("$toDouble", 1, Some(1)),
        "toInt" => ("$toInt", 1, Some(1)),
        "toLong" => ("$toLong", 1, Some(1)),
        "toObjectId" => ("$toObjectId", 1, Some(1)),
        "toString" => ("$toString", 1, Some(1)),
        "type" => ("$type", 1, Some(1)),

        // Objects
        "mergeObjects" => ("$mergeObjects", 1, None),
        "objectToArray" => ("$objectToArray", 1, Some(1)),

        // Accumulators
        "sum" => ("$sum", 1, None),
        "avg" => ("$avg", 1, None),
        "min" => ("$min", 1, None),
        "max" => ("$max", 1, None),
        "stdDevPop" => ("$stdDevPop", 1, None),
        "stdDevSamp" => ("$stdDevSamp", 1, None),
        "push" => ("$push", 1, Some(1)),
        "addToSet" => ("$addToSet", 1, Some(1)),

        // Comparison / boolean
        "eq" => ("$eq", 2, Some(2)),
        "ne" => ("$ne", 2, Some(2)),
        "gt" => ("$gt", 2, Some(2)),
        "gte" => ("$gte", 2, Some(2)),
        "lt" => ("$lt", 2, Some(2)),
        "lte" => ("$lte", 2, Some(2)),
        "cmp" => ("$cmp", 2, Some(2)),
        "and" => ("$and", 1, None),
        "or" => ("$or", 1, None),
        "not" => ("$not", 1, Some(1)),

        _ => return None,
    })
}

fn lower_call(name: &str, args: Vec<ExprAst>) -> AggregationResult<Expr> {
    let (operator, min, max) =
        function_operator(name).ok_or_else(|| AggregationError::unknown_function(name))?;

    if args.len() < min || max.is_some_and(|max| args.len() > max) {
        let expected = match max {
            Some(max) if max == min => format!("exactly {min}"),
            Some(max) => format!("{min} to {max}"),
            None => format!("at least {min}"),
        };
        return Err(AggregationError::invalid_argument(
            operator,
            format!("expects {expected} arguments, got {}", args.len()),
        ));
    }

    Ok(Expr::op(
        operator,
        args.into_iter()
            .map(lower)
            .collect::<AggregationResult<Vec<_>>>()?,
    ))
}
