//! Converters between the model representation of a value and its stored form.
//!
//! A [`ValueConverter`] works on runtime values and is applied to constants.
//! An [`ExprConverter`] works on expressions and is applied to anything else,
//! including the read side of a redirected path.

use crate::ast::builders::{cast, null_of, typed_constant};
use crate::ast::{Expr, ExprRef, Value, ValueType};
use crate::config::RewriteConfig;
use crate::error::{RewriteError, RewriteResult};
use rust_decimal::Decimal;
use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;

pub trait ValueConverter: Send + Sync + Debug {
    /// Type seen by query code.
    fn model_type(&self) -> ValueType;

    /// Type persisted by the backend.
    fn stored_type(&self) -> ValueType;

    fn to_stored(&self, value: &Value) -> RewriteResult<Value>;

    fn to_model(&self, value: &Value) -> RewriteResult<Value>;
}

pub trait ExprConverter: Send + Sync + Debug {
    fn model_type(&self) -> ValueType;

    fn stored_type(&self) -> ValueType;

    fn to_stored(&self, expr: &ExprRef) -> RewriteResult<ExprRef>;

    fn to_model(&self, expr: &ExprRef) -> RewriteResult<ExprRef>;
}

/// Stores values unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityConverter {
    ty: ValueType,
}

impl IdentityConverter {
    pub fn new(ty: ValueType) -> Self {
        Self { ty }
    }
}

impl ValueConverter for IdentityConverter {
    fn model_type(&self) -> ValueType {
        self.ty.clone()
    }

    fn stored_type(&self) -> ValueType {
        self.ty.clone()
    }

    fn to_stored(&self, value: &Value) -> RewriteResult<Value> {
        Ok(value.clone())
    }

    fn to_model(&self, value: &Value) -> RewriteResult<Value> {
        Ok(value.clone())
    }
}

/// Booleans stored as a pair of flag strings, `'Y'`/`'N'` by default.
#[derive(Debug, Clone, PartialEq)]
pub struct BoolFlagConverter {
    flag_true: String,
    flag_false: String,
}

impl Default for BoolFlagConverter {
    fn default() -> Self {
        Self {
            flag_true: "Y".to_string(),
            flag_false: "N".to_string(),
        }
    }
}

impl BoolFlagConverter {
    pub fn new(flag_true: impl Into<String>, flag_false: impl Into<String>) -> RewriteResult<Self> {
        let (flag_true, flag_false) = (flag_true.into(), flag_false.into());
        if flag_true == flag_false {
            return Err(RewriteError::invalid(format!(
                "boolean flags must differ, both are '{}'",
                flag_true
            )));
        }
        Ok(Self {
            flag_true,
            flag_false,
        })
    }

    /// Flags from `config`, held to the same rules as [`BoolFlagConverter::new`].
    pub fn from_config(config: &RewriteConfig) -> RewriteResult<Self> {
        Self::new(config.flag_true.clone(), config.flag_false.clone())
    }
}

impl ValueConverter for BoolFlagConverter {
    fn model_type(&self) -> ValueType {
        ValueType::Boolean
    }

    fn stored_type(&self) -> ValueType {
        ValueType::String
    }

    fn to_stored(&self, value: &Value) -> RewriteResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(true) => Ok(Value::String(self.flag_true.clone())),
            Value::Bool(false) => Ok(Value::String(self.flag_false.clone())),
            other => Err(RewriteError::conversion(other, &ValueType::String)),
        }
    }

    fn to_model(&self, value: &Value) -> RewriteResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) if *s == self.flag_true => Ok(Value::Bool(true)),
            Value::String(s) if *s == self.flag_false => Ok(Value::Bool(false)),
            other => Err(RewriteError::conversion(other, &ValueType::Boolean)),
        }
    }
}

/// A numeric value of fixed width stored as its decimal text.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericStringConverter {
    ty: ValueType,
}

impl NumericStringConverter {
    pub fn new(ty: ValueType) -> RewriteResult<Self> {
        if !ty.is_numeric() {
            return Err(RewriteError::invalid(format!(
                "{} is not a numeric type",
                ty
            )));
        }
        Ok(Self { ty })
    }

    pub fn int8() -> Self {
        Self { ty: ValueType::Int8 }
    }

    pub fn int16() -> Self {
        Self { ty: ValueType::Int16 }
    }

    pub fn int32() -> Self {
        Self { ty: ValueType::Int32 }
    }

    pub fn int64() -> Self {
        Self { ty: ValueType::Int64 }
    }

    pub fn float32() -> Self {
        Self {
            ty: ValueType::Float32,
        }
    }

    pub fn float64() -> Self {
        Self {
            ty: ValueType::Float64,
        }
    }

    pub fn decimal() -> Self {
        Self {
            ty: ValueType::Decimal,
        }
    }

    fn parse(&self, text: &str) -> Option<Value> {
        let text = text.trim();
        let value = match self.ty {
            ValueType::Float32 | ValueType::Float64 => Value::Float(text.parse().ok()?),
            ValueType::Decimal => Value::Decimal(Decimal::from_str(text).ok()?),
            _ => Value::Int(text.parse().ok()?),
        };
        value.conforms_to(&self.ty).then_some(value)
    }
}

impl ValueConverter for NumericStringConverter {
    fn model_type(&self) -> ValueType {
        self.ty.clone()
    }

    fn stored_type(&self) -> ValueType {
        ValueType::String
    }

    fn to_stored(&self, value: &Value) -> RewriteResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Int(_) | Value::Float(_) | Value::Decimal(_) if value.conforms_to(&self.ty) => {
                Ok(Value::String(value.to_string()))
            }
            other => Err(RewriteError::conversion(other, &ValueType::String)),
        }
    }

    fn to_model(&self, value: &Value) -> RewriteResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) => self
                .parse(s)
                .ok_or_else(|| RewriteError::conversion(value, &self.ty)),
            other => Err(RewriteError::conversion(other, &self.ty)),
        }
    }
}

/// Converts expressions with a `CAST` in either direction.
#[derive(Debug, Clone, PartialEq)]
pub struct CastConverter {
    model: ValueType,
    stored: ValueType,
}

impl CastConverter {
    pub fn new(model: ValueType, stored: ValueType) -> Self {
        Self { model, stored }
    }
}

impl ExprConverter for CastConverter {
    fn model_type(&self) -> ValueType {
        self.model.clone()
    }

    fn stored_type(&self) -> ValueType {
        self.stored.clone()
    }

    fn to_stored(&self, expr: &ExprRef) -> RewriteResult<ExprRef> {
        Ok(cast(expr, self.stored.clone()))
    }

    fn to_model(&self, expr: &ExprRef) -> RewriteResult<ExprRef> {
        Ok(cast(expr, self.model.clone()))
    }
}

/// How values cross between a redirected source and its target.
#[derive(Debug, Clone, Default)]
pub enum Conversion {
    #[default]
    Identity,
    Value(Arc<dyn ValueConverter>),
    Expr(Arc<dyn ExprConverter>),
}

impl Conversion {
    pub fn is_identity(&self) -> bool {
        matches!(self, Conversion::Identity)
    }

    /// `None` for identity.
    pub fn model_type(&self) -> Option<ValueType> {
        match self {
            Conversion::Identity => None,
            Conversion::Value(c) => Some(c.model_type()),
            Conversion::Expr(c) => Some(c.model_type()),
        }
    }

    pub fn stored_type(&self) -> Option<ValueType> {
        match self {
            Conversion::Identity => None,
            Conversion::Value(c) => Some(c.stored_type()),
            Conversion::Expr(c) => Some(c.stored_type()),
        }
    }

    /// Convert a value about to be written.
    ///
    /// Constants go through a value converter directly; any other expression
    /// is cast to the stored type.
    pub fn store(&self, expr: &ExprRef) -> RewriteResult<ExprRef> {
        match self {
            Conversion::Identity => Ok(expr.clone()),
            Conversion::Expr(c) => c.to_stored(expr),
            Conversion::Value(c) => match expr.as_ref() {
                Expr::Constant {
                    value: Value::Null, ..
                } => Ok(null_of(c.stored_type())),
                Expr::Constant { value, .. } => {
                    Ok(typed_constant(c.to_stored(value)?, c.stored_type()))
                }
                _ => Ok(cast(expr, c.stored_type())),
            },
        }
    }

    /// Expression reading the stored `target` back as `model`.
    pub fn load(&self, target: &ExprRef, model: &ValueType) -> RewriteResult<ExprRef> {
        match self {
            Conversion::Identity => Ok(target.clone()),
            Conversion::Expr(c) => c.to_model(target),
            Conversion::Value(_) => Ok(cast(target, model.clone())),
        }
    }
}
