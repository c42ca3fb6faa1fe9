use std::{fmt, rc::Rc};

use crate::{
    error::{KosError, Result},
    suffix::{Callable, Structure},
};

/// A dynamically typed script value.
///
/// Everything the VM moves around lives in one of these: operands on the
/// evaluation stack, variable contents, suffix arguments and results.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i32),
    /// Only ever produced by hosts; the stack promotes it to `Double` on push.
    Float(f32),
    Double(f64),
    String(String),
    /// A variable reference (`$name` in listings). Resolved when popped as a value.
    Identifier(String),
    Structure(Rc<dyn Structure>),
    /// A suffix method detached from its object, waiting for `callmethod`.
    Delegate(Callable),
    /// Delimits the start of a call's argument run.
    ArgMarker,
    /// Return record pushed by `call`: the instruction to resume at.
    ReturnAddress(usize),
}

impl Value {
    /// The result a void callable leaves on the stack.
    pub const NEUTRAL: Value = Value::Int(0);

    pub fn structure<S: Structure + 'static>(s: S) -> Value {
        Value::Structure(Rc::new(s))
    }

    pub fn identifier(name: impl Into<String>) -> Value {
        let name = name.into();
        Value::Identifier(name.trim_start_matches('$').to_string())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "None",
            Value::Bool(_) => "Boolean",
            Value::Int(_) => "Integer",
            Value::Float(_) => "Single",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::Identifier(_) => "Identifier",
            Value::Structure(s) => s.type_name(),
            Value::Delegate(_) => "Delegate",
            Value::ArgMarker => "ArgMarker",
            Value::ReturnAddress(_) => "SubroutineContext",
        }
    }

    /// Single precision never survives past this point.
    pub fn promote(self) -> Value {
        match self {
            Value::Float(f) => Value::Double(f as f64),
            other => other,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Double(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_structure(&self) -> Option<&Rc<dyn Structure>> {
        match self {
            Value::Structure(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean conversion used by `br.false`, `bool`, `and` and `or`.
    pub fn to_bool(&self) -> Result<bool> {
        match self {
            Value::Nil => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            Value::Double(d) => Ok(*d != 0.0),
            Value::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(self.cast_error("Boolean"))
                }
            }
            _ => Err(self.cast_error("Boolean")),
        }
    }

    /// Integer conversion for indexes and `Int` parameters. Doubles round half to even.
    pub fn to_int(&self) -> Result<i32> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Float(_) | Value::Double(_) => {
                let d = self.as_f64().unwrap_or_default().round_ties_even();
                if d.is_finite() && d >= i32::MIN as f64 && d <= i32::MAX as f64 {
                    Ok(d as i32)
                } else {
                    Err(self.cast_error("Integer"))
                }
            }
            _ => Err(self.cast_error("Integer")),
        }
    }

    pub(crate) fn cast_error(&self, to: &str) -> KosError {
        KosError::Cast {
            from: self.type_name().to_string(),
            to: to.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) | (Value::ArgMarker, Value::ArgMarker) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Identifier(a), Value::Identifier(b)) => a.eq_ignore_ascii_case(b),
            (Value::Structure(a), Value::Structure(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            (Value::Delegate(a), Value::Delegate(b)) => a.same_body(b),
            (Value::ReturnAddress(a), Value::ReturnAddress(b)) => a == b,
            _ => false,
        }
    }
}

fn fmt_double(d: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if d.is_infinite() {
        f.write_str(if d > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{d}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => fmt_double(*x as f64, f),
            Value::Double(d) => fmt_double(*d, f),
            Value::String(s) => f.write_str(s),
            Value::Identifier(name) => write!(f, "${name}"),
            Value::Structure(s) => write!(f, "{s}"),
            Value::Delegate(c) => write!(f, "Delegate({} args)", c.signature().arity()),
            Value::ArgMarker => f.write_str("ArgMarker"),
            Value::ReturnAddress(ip) => write!(f, "SubroutineContext: {{CameFromInstPtr {ip}}}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Rc<dyn Structure>> for Value {
    fn from(v: Rc<dyn Structure>) -> Self {
        Value::Structure(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_promotes_to_double() {
        assert_eq!(Value::Float(1.5).promote(), Value::Double(1.5));
        assert_eq!(Value::Int(3).promote(), Value::Int(3));
    }

    #[test]
    fn boolean_conversion() {
        assert!(Value::Int(2).to_bool().unwrap());
        assert!(!Value::Double(0.0).to_bool().unwrap());
        assert!(Value::from(" TRUE ").to_bool().unwrap());
        assert!(!Value::Nil.to_bool().unwrap());
        let err = Value::from("maybe").to_bool().unwrap_err();
        assert_eq!(err.to_string(), "Cannot cast String to Boolean");
    }

    #[test]
    fn int_conversion_rounds_half_to_even() {
        assert_eq!(Value::Double(15.1234).to_int().unwrap(), 15);
        assert_eq!(Value::Double(2.5).to_int().unwrap(), 2);
        assert_eq!(Value::Double(3.5).to_int().unwrap(), 4);
        assert!(Value::Double(f64::NAN).to_int().is_err());
    }

    #[test]
    fn display_matches_terminal_output() {
        assert_eq!(Value::Double(3.5).to_string(), "3.5");
        assert_eq!(Value::Double(4_000_000_000.0).to_string(), "4000000000");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::identifier("$Speed").to_string(), "$Speed");
        assert_eq!(Value::Double(f64::INFINITY).to_string(), "Infinity");
    }
}
