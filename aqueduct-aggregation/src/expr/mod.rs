//! Aggregation expression tree and operator gateways.
//!
//! [`Expr`] is the intermediate representation every builder lowers into:
//! a literal, a symbolic path, a variable, or an operator application.
//! Rendering an `Expr` against an [`AggregationContext`] produces the BSON
//! the server consumes, resolving symbolic paths along the way.
//!
//! Operator constructors are grouped into gateway types mirroring the
//! server's operator families: [`SetOperators`], [`DateOperators`],
//! [`ConvertOperators`], [`ObjectOperators`], [`ArithmeticOperators`],
//! [`ComparisonOperators`], [`BooleanOperators`], [`ConditionalOperators`],
//! [`ArrayOperators`], [`StringOperators`] and [`AccumulatorOperators`].
//!
//! # Example
//!
//! ```rust,ignore
//! use aqueduct_aggregation::expr::{ArithmeticOperators, Expr};
//! use aqueduct_aggregation::context::RootContext;
//!
//! // { "$multiply": ["$price", "$quantity"] }
//! let total = ArithmeticOperators::value_of("price").multiply_by("quantity");
//! let bson = total.to_bson(&RootContext)?;
//! ```

mod accumulator;
mod arithmetic;
mod array;
mod boolean;
mod comparison;
mod conditional;
mod convert;
mod date;
mod object;
mod set;
mod string;

pub use accumulator::AccumulatorOperators;
pub use arithmetic::ArithmeticOperators;
pub use array::ArrayOperators;
pub use boolean::BooleanOperators;
pub use comparison::ComparisonOperators;
pub use conditional::{CaseBranch, ConditionalOperators, SwitchBuilder};
pub use convert::{ConvertOperators, ConvertTarget};
pub use date::{DateOperators, TimeUnit, Timezone};
pub use object::ObjectOperators;
pub use set::SetOperators;
pub use string::StringOperators;

use bson::{Bson, Document};
use smol_str::SmolStr;

use crate::context::{AggregationContext, NestedExprContext};
use crate::error::AggregationResult;
use crate::field::Field;

/// Anything that renders to a BSON expression against a context.
pub trait AggregationExpr: std::fmt::Debug + Send + Sync {
    /// Render to a BSON value, resolving symbolic references through `ctx`.
    fn to_bson(&self, ctx: &dyn AggregationContext) -> AggregationResult<Bson>;
}

/// Operators whose argument lists flatten when nested in themselves.
const ASSOCIATIVE: &[&str] = &["$add", "$multiply", "$and", "$or", "$concat", "$concatArrays"];

/// Operators the server only accepts in array form, even with one argument.
const ALWAYS_ARRAY: &[&str] = &["$not", "$allElementsTrue", "$anyElementTrue"];

/// An aggregation expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal BSON value.
    Literal(Bson),
    /// A symbolic field path, resolved through the active context.
    Path(Field),
    /// A variable reference, rendered `$$NAME`.
    Variable(SmolStr),
    /// An operator application: `{ "$op": [args...] }`.
    Op {
        /// Wire-format operator name, including the `$`.
        operator: SmolStr,
        /// Operator arguments in order.
        args: Vec<Expr>,
    },
    /// An array of expressions.
    Array(Vec<Expr>),
    /// A sub-document of expressions, keys in insertion order.
    Document(Vec<(SmolStr, Expr)>),
    /// `$map` over an array, binding `as_name` in the body.
    Map {
        /// The input array expression.
        input: Box<Expr>,
        /// The per-element variable name.
        as_name: SmolStr,
        /// The body, rendered with `as_name` bound.
        body: Box<Expr>,
    },
    /// `$filter` over an array, binding `as_name` in the condition.
    Filter {
        /// The input array expression.
        input: Box<Expr>,
        /// The per-element variable name.
        as_name: SmolStr,
        /// The predicate, rendered with `as_name` bound.
        cond: Box<Expr>,
    },
    /// `$let`: bind variables for the body expression.
    Let {
        /// Variable bindings in order.
        vars: Vec<(SmolStr, Expr)>,
        /// The body, rendered with all bound names in scope.
        body: Box<Expr>,
    },
}

impl Expr {
    /// A literal value.
    pub fn literal(value: impl Into<Bson>) -> Self {
        Expr::Literal(value.into())
    }

    /// A symbolic field path.
    pub fn field(name: impl Into<SmolStr>) -> Self {
        Expr::Path(Field::new(name))
    }

    /// A variable reference (`$$NAME`).
    pub fn variable(name: impl Into<SmolStr>) -> Self {
        Expr::Variable(name.into())
    }

    /// The `$$ROOT` system variable.
    pub fn root() -> Self {
        Expr::variable("ROOT")
    }

    /// The `$$CURRENT` system variable.
    pub fn current() -> Self {
        Expr::variable("CURRENT")
    }

    /// The `$$NOW` system variable.
    pub fn now() -> Self {
        Expr::variable("NOW")
    }

    /// The `$$REMOVE` system variable.
    pub fn remove() -> Self {
        Expr::variable("REMOVE")
    }

    /// An operator application.
    pub fn op(operator: impl Into<SmolStr>, args: Vec<Expr>) -> Self {
        Expr::Op {
            operator: operator.into(),
            args,
        }
    }

    /// A `$map` expression binding `as_name` over `input`.
    pub fn map(input: impl Into<Expr>, as_name: impl Into<SmolStr>, body: impl Into<Expr>) -> Self {
        Expr::Map {
            input: Box::new(input.into()),
            as_name: as_name.into(),
            body: Box::new(body.into()),
        }
    }

    /// A `$filter` expression binding `as_name` over `input`.
    pub fn filter(
        input: impl Into<Expr>,
        as_name: impl Into<SmolStr>,
        cond: impl Into<Expr>,
    ) -> Self {
        Expr::Filter {
            input: Box::new(input.into()),
            as_name: as_name.into(),
            cond: Box::new(cond.into()),
        }
    }

    /// A `$let` expression binding `vars` for `body`.
    pub fn bind<I, S>(vars: I, body: impl Into<Expr>) -> Self
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<SmolStr>,
    {
        Expr::Let {
            vars: vars.into_iter().map(|(n, e)| (n.into(), e)).collect(),
            body: Box::new(body.into()),
        }
    }

    /// Render to BSON, resolving symbolic references through `ctx`.
    pub fn to_bson(&self, ctx: &dyn AggregationContext) -> AggregationResult<Bson> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path(field) => Ok(ctx.reference_for(field)?.to_bson()),
            Expr::Variable(name) => Ok(Bson::String(format!("$${name}"))),
            Expr::Op { operator, args } => render_op(operator, args, ctx),
            Expr::Array(items) => Ok(Bson::Array(
                items
                    .iter()
                    .map(|e| e.to_bson(ctx))
                    .collect::<AggregationResult<Vec<_>>>()?,
            )),
            Expr::Document(entries) => {
                let mut doc = Document::new();
                for (key, expr) in entries {
                    doc.insert(key.as_str(), expr.to_bson(ctx)?);
                }
                Ok(Bson::Document(doc))
            }
            Expr::Map {
                input,
                as_name,
                body,
            } => {
                let nested = NestedExprContext::new(ctx, [as_name.clone()]);
                Ok(Bson::Document(bson::doc! {
                    "$map": {
                        "input": input.to_bson(ctx)?,
                        "as": as_name.as_str(),
                        "in": body.to_bson(&nested)?,
                    }
                }))
            }
            Expr::Filter {
                input,
                as_name,
                cond,
            } => {
                let nested = NestedExprContext::new(ctx, [as_name.clone()]);
                Ok(Bson::Document(bson::doc! {
                    "$filter": {
                        "input": input.to_bson(ctx)?,
                        "as": as_name.as_str(),
                        "cond": cond.to_bson(&nested)?,
                    }
                }))
            }
            Expr::Let { vars, body } => {
                let mut bindings = Document::new();
                for (name, expr) in vars {
                    bindings.insert(name.as_str(), expr.to_bson(ctx)?);
                }
                let bound: Vec<SmolStr> = vars.iter().map(|(n, _)| n.clone()).collect();
                let nested = NestedExprContext::new(ctx, bound);
                Ok(Bson::Document(bson::doc! {
                    "$let": {
                        "vars": bindings,
                        "in": body.to_bson(&nested)?,
                    }
                }))
            }
        }
    }
}

fn render_op(
    operator: &str,
    args: &[Expr],
    ctx: &dyn AggregationContext,
) -> AggregationResult<Bson> {
    let mut rendered = Vec::with_capacity(args.len());
    for arg in args {
        // Same-operator nesting of associative operators flattens into one
        // n-ary argument list.
        if let Expr::Op {
            operator: inner_op,
            args: inner_args,
        } = arg
        {
            if inner_op == operator && ASSOCIATIVE.contains(&operator) {
                for inner in inner_args {
                    rendered.push(inner.to_bson(ctx)?);
                }
                continue;
            }
        }
        rendered.push(arg.to_bson(ctx)?);
    }

    let mut doc = Document::new();
    if rendered.len() == 1 && !ALWAYS_ARRAY.contains(&operator) {
        // Single-argument operators render without the array wrapper, except
        // when the argument itself is an array (the wrapper disambiguates).
        let only = rendered.pop().unwrap();
        if matches!(only, Bson::Array(_)) {
            doc.insert(operator, Bson::Array(vec![only]));
        } else {
            doc.insert(operator, only);
        }
    } else {
        doc.insert(operator, Bson::Array(rendered));
    }
    Ok(Bson::Document(doc))
}

impl AggregationExpr for Expr {
    fn to_bson(&self, ctx: &dyn AggregationContext) -> AggregationResult<Bson> {
        Expr::to_bson(self, ctx)
    }
}

impl From<Field> for Expr {
    fn from(field: Field) -> Self {
        Expr::Path(field)
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::field(name)
    }
}

impl From<Bson> for Expr {
    fn from(value: Bson) -> Self {
        Expr::Literal(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::Literal(Bson::Int32(value))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::Literal(Bson::Int64(value))
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Literal(Bson::Double(value))
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Literal(Bson::Boolean(value))
    }
}

impl From<String> for Expr {
    fn from(name: String) -> Self {
        Expr::field(name)
    }
}

/// A literal expression.
///
/// String conversions via `From` build field paths; string literals go
/// through here.
pub fn lit(value: impl Into<Bson>) -> Expr {
    Expr::Literal(value.into())
}
