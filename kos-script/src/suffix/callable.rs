use std::{fmt, rc::Rc};

use crate::{
    error::{KosError, Result},
    suffix::Structure,
    value::Value,
};

/// Declared type of a callable parameter or a settable suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Any,
    Int,
    Double,
    Bool,
    String,
    Structure,
}

impl ParamType {
    pub fn name(self) -> &'static str {
        match self {
            ParamType::Any => "Any",
            ParamType::Int => "Integer",
            ParamType::Double => "Double",
            ParamType::Bool => "Boolean",
            ParamType::String => "String",
            ParamType::Structure => "Structure",
        }
    }

    /// Convert `value` to this type, widening or parsing where that is lossless enough.
    pub fn coerce(self, value: Value) -> Result<Value> {
        let value = value.promote();
        let cast = |v: &Value| v.cast_error(self.name());
        match self {
            ParamType::Any => Ok(value),
            ParamType::Int => match &value {
                Value::Int(_) => Ok(value),
                Value::Double(_) => value.to_int().map(Value::Int),
                Value::Bool(b) => Ok(Value::Int(*b as i32)),
                Value::String(s) => {
                    let s = s.trim();
                    if let Ok(i) = s.parse::<i32>() {
                        Ok(Value::Int(i))
                    } else if let Ok(d) = s.parse::<f64>() {
                        Value::Double(d).to_int().map(Value::Int).map_err(|_| cast(&value))
                    } else {
                        Err(cast(&value))
                    }
                }
                _ => Err(cast(&value)),
            },
            ParamType::Double => match &value {
                Value::Double(_) => Ok(value),
                Value::Int(i) => Ok(Value::Double(*i as f64)),
                Value::Bool(b) => Ok(Value::Double(if *b { 1.0 } else { 0.0 })),
                Value::String(s) => s.trim().parse::<f64>().map(Value::Double).map_err(|_| cast(&value)),
                _ => Err(cast(&value)),
            },
            ParamType::Bool => value.to_bool().map(Value::Bool).map_err(|_| cast(&value)),
            ParamType::String => match &value {
                Value::String(_) => Ok(value),
                Value::Bool(_) | Value::Int(_) | Value::Double(_) => Ok(Value::String(value.to_string())),
                _ => Err(cast(&value)),
            },
            ParamType::Structure => match &value {
                Value::Structure(_) => Ok(value),
                _ => Err(cast(&value)),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: &'static str,
    pub ty: ParamType,
    pub default: Option<Value>,
}

impl Param {
    pub fn required(name: &'static str, ty: ParamType) -> Self {
        Self { name, ty, default: None }
    }

    pub fn optional(name: &'static str, ty: ParamType, default: impl Into<Value>) -> Self {
        Self {
            name,
            ty,
            default: Some(default.into()),
        }
    }
}

/// Parameter list of a callable: fixed parameters, optionally with defaults,
/// and an optional variadic tail.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    params: Vec<Param>,
    variadic: Option<ParamType>,
}

impl Signature {
    pub fn new(params: Vec<Param>) -> Self {
        Self { params, variadic: None }
    }

    pub fn fixed(types: &[ParamType]) -> Self {
        Self::new(types.iter().map(|ty| Param::required("arg", *ty)).collect())
    }

    pub fn with_variadic(mut self, ty: ParamType) -> Self {
        self.variadic = Some(ty);
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    pub fn takes_no_arguments(&self) -> bool {
        self.params.is_empty() && self.variadic.is_none()
    }

    fn has_defaults(&self) -> bool {
        self.params.iter().any(|p| p.default.is_some())
    }

    /// Check `args` against the declaration and coerce them.
    ///
    /// The result holds one value per fixed parameter, followed by the variadic
    /// tail if there is one.
    pub fn bind(&self, args: Vec<Value>) -> Result<Vec<Value>> {
        let expected = self.params.len();
        let actual = args.len();

        if actual > expected && self.variadic.is_none() {
            return Err(KosError::ArgumentMismatch { expected, actual });
        }
        if actual < expected && !self.has_defaults() {
            return Err(KosError::ArgumentMismatch { expected, actual });
        }

        let mut bound = Vec::with_capacity(actual.max(expected));
        let mut args = args.into_iter();
        for (index, param) in self.params.iter().enumerate() {
            let value = match args.next() {
                Some(v) => v,
                None => match &param.default {
                    Some(d) => d.clone(),
                    None => {
                        return Err(KosError::MissingArgument {
                            index,
                            name: param.name,
                        })
                    }
                },
            };
            bound.push(param.ty.coerce(value)?);
        }
        if let Some(ty) = self.variadic {
            for rest in args {
                bound.push(ty.coerce(rest)?);
            }
        }
        Ok(bound)
    }
}

type Body = dyn Fn(Vec<Value>) -> Result<Value>;

/// A native function with a declared signature.
#[derive(Clone)]
pub struct Callable {
    signature: Rc<Signature>,
    body: Rc<Body>,
}

impl Callable {
    pub fn new<F>(signature: Signature, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value> + 'static,
    {
        Self {
            signature: Rc::new(signature),
            body: Rc::new(body),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn invoke(&self, args: Vec<Value>) -> Result<Value> {
        let args = self.signature.bind(args)?;
        (self.body)(args)
    }

    pub(crate) fn same_body(&self, other: &Callable) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.body), Rc::as_ptr(&other.body))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable").field("signature", &self.signature).finish_non_exhaustive()
    }
}

/// Extraction of a typed argument from an already coerced value.
pub trait FromValue: Sized {
    const TYPE: ParamType;

    fn from_value(value: Value) -> Result<Self>;
}

impl FromValue for Value {
    const TYPE: ParamType = ParamType::Any;

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for i32 {
    const TYPE: ParamType = ParamType::Int;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(other.cast_error("Integer")),
        }
    }
}

impl FromValue for f64 {
    const TYPE: ParamType = ParamType::Double;

    fn from_value(value: Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| value.cast_error("Double"))
    }
}

impl FromValue for bool {
    const TYPE: ParamType = ParamType::Bool;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other.cast_error("Boolean")),
        }
    }
}

impl FromValue for String {
    const TYPE: ParamType = ParamType::String;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(other.cast_error("String")),
        }
    }
}

impl FromValue for Rc<dyn Structure> {
    const TYPE: ParamType = ParamType::Structure;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Structure(s) => Ok(s),
            other => Err(other.cast_error("Structure")),
        }
    }
}

/// Conversion of a native return value. `()` becomes [`Value::NEUTRAL`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::NEUTRAL
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Double(self)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for Rc<dyn Structure> {
    fn into_value(self) -> Value {
        Value::Structure(self)
    }
}

/// Take the next bound argument as `A`.
pub fn take<A: FromValue>(args: &mut impl Iterator<Item = Value>) -> Result<A> {
    A::from_value(args.next().ok_or(KosError::StackUnderflow)?)
}
