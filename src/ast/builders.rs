//! Ergonomic constructors for expression trees.
//!
//! ```ignore
//! use qail_rewrite::ast::builders::*;
//! let person = root("person", ValueType::record("Person"));
//! let adult = gte(person.property("age", ValueType::Int32), constant(18));
//! ```

use crate::ast::{Expr, ExprRef, Operator, Path, PathRef, PathStep, Value, ValueType};
use std::sync::Arc;

/// Anything that can be placed into an argument slot.
pub trait IntoExpr {
    fn into_expr(self) -> ExprRef;
}

impl IntoExpr for ExprRef {
    fn into_expr(self) -> ExprRef {
        self
    }
}

impl IntoExpr for &ExprRef {
    fn into_expr(self) -> ExprRef {
        self.clone()
    }
}

impl IntoExpr for PathRef {
    fn into_expr(self) -> ExprRef {
        PathRef::into_expr(self)
    }
}

impl IntoExpr for &PathRef {
    fn into_expr(self) -> ExprRef {
        self.expr().clone()
    }
}

impl IntoExpr for Expr {
    fn into_expr(self) -> ExprRef {
        Arc::new(self)
    }
}

/// A query root (alias) of the given record type.
pub fn root(name: impl Into<String>, ty: ValueType) -> PathRef {
    let expr = Arc::new(Expr::Path(Path {
        step: PathStep::Root { name: name.into() },
        ty,
    }));
    match PathRef::try_from(expr) {
        Ok(path) => path,
        Err(_) => unreachable!("root paths are paths"),
    }
}

/// Constant typed after its value.
///
/// Integers are typed `Int64` and floats `Float64`, which narrower columns do
/// not accept. Use [`int8`], [`int16`], [`int32`], [`float32`] or
/// [`typed_constant`] for those.
pub fn constant(value: impl Into<Value>) -> ExprRef {
    let value = value.into();
    let ty = value.value_type();
    Arc::new(Expr::Constant { value, ty })
}

pub fn int8(value: i8) -> ExprRef {
    typed_constant(i64::from(value), ValueType::Int8)
}

pub fn int16(value: i16) -> ExprRef {
    typed_constant(i64::from(value), ValueType::Int16)
}

pub fn int32(value: i32) -> ExprRef {
    typed_constant(i64::from(value), ValueType::Int32)
}

pub fn float32(value: f32) -> ExprRef {
    typed_constant(f64::from(value), ValueType::Float32)
}

pub fn typed_constant(value: impl Into<Value>, ty: ValueType) -> ExprRef {
    Arc::new(Expr::Constant {
        value: value.into(),
        ty,
    })
}

/// NULL carrying a declared type.
pub fn null_of(ty: ValueType) -> ExprRef {
    Arc::new(Expr::Constant {
        value: Value::Null,
        ty,
    })
}

pub fn param(name: impl Into<String>, ty: ValueType) -> ExprRef {
    Arc::new(Expr::Param {
        name: name.into(),
        ty,
    })
}

pub fn operation<I, E>(op: Operator, args: I, ty: ValueType) -> ExprRef
where
    I: IntoIterator<Item = E>,
    E: IntoExpr,
{
    Arc::new(Expr::Operation {
        op,
        args: args.into_iter().map(IntoExpr::into_expr).collect(),
        ty,
    })
}

/// Operation typed as a filter condition.
pub fn predicate<I, E>(op: Operator, args: I) -> ExprRef
where
    I: IntoIterator<Item = E>,
    E: IntoExpr,
{
    operation(op, args, ValueType::Predicate)
}

fn binary(op: Operator, left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    predicate(op, [left.into_expr(), right.into_expr()])
}

pub fn eq(left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    binary(Operator::Eq, left, right)
}

pub fn ne(left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    binary(Operator::Ne, left, right)
}

pub fn gt(left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    binary(Operator::Gt, left, right)
}

pub fn gte(left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    binary(Operator::Gte, left, right)
}

pub fn lt(left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    binary(Operator::Lt, left, right)
}

pub fn lte(left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    binary(Operator::Lte, left, right)
}

pub fn like(left: impl IntoExpr, pattern: impl IntoExpr) -> ExprRef {
    binary(Operator::Like, left, pattern)
}

/// `left IN right` where `right` is a list or a sub-query.
pub fn in_(left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    binary(Operator::In, left, right)
}

pub fn not_in(left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    binary(Operator::NotIn, left, right)
}

pub fn and(left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    binary(Operator::And, left, right)
}

pub fn or(left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    binary(Operator::Or, left, right)
}

pub fn not(arg: impl IntoExpr) -> ExprRef {
    predicate(Operator::Not, [arg.into_expr()])
}

pub fn is_null(arg: impl IntoExpr) -> ExprRef {
    predicate(Operator::IsNull, [arg.into_expr()])
}

pub fn is_not_null(arg: impl IntoExpr) -> ExprRef {
    predicate(Operator::IsNotNull, [arg.into_expr()])
}

/// `CAST(arg AS ty)`
pub fn cast(arg: impl IntoExpr, ty: ValueType) -> ExprRef {
    operation(Operator::Cast, [arg.into_expr()], ty)
}

pub fn lower(arg: impl IntoExpr) -> ExprRef {
    operation(Operator::Lower, [arg.into_expr()], ValueType::String)
}

pub fn concat(left: impl IntoExpr, right: impl IntoExpr) -> ExprRef {
    operation(
        Operator::Concat,
        [left.into_expr(), right.into_expr()],
        ValueType::String,
    )
}

/// Build a record (or tuple) from the given arguments.
pub fn projection<I, E>(target: ValueType, args: I) -> ExprRef
where
    I: IntoIterator<Item = E>,
    E: IntoExpr,
{
    Arc::new(Expr::Projection {
        args: args.into_iter().map(IntoExpr::into_expr).collect(),
        target,
    })
}

pub fn template<I, E>(template: impl Into<String>, args: I, ty: ValueType) -> ExprRef
where
    I: IntoIterator<Item = E>,
    E: IntoExpr,
{
    Arc::new(Expr::Template {
        template: template.into(),
        args: args.into_iter().map(IntoExpr::into_expr).collect(),
        ty,
    })
}
