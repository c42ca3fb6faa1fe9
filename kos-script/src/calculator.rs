//! Binary operators over dynamically typed operands.
//!
//! [`Calculator::for_operands`] picks a strategy from the runtime types of both
//! operands, then [`Calculator::apply`] runs one [`Operator`] with it.

use crate::{
    error::{KosError, Result},
    value::Value,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::IntoStaticStr, strum::EnumIter)]
pub enum Operator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "^")]
    Power,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = ">=")]
    GreaterOrEqual,
    #[strum(serialize = "<=")]
    LessOrEqual,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "<>")]
    NotEqual,
    #[strum(serialize = "min")]
    Min,
    #[strum(serialize = "max")]
    Max,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        self.into()
    }
}

/// Operand strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Calculator {
    IntInt,
    DoubleDouble,
    IntDouble,
    String,
    Bool,
    /// At least one operand is a structure with its own operator protocol.
    SpecialValue,
}

impl Calculator {
    /// Operands are expected to be promoted already (no `Float`).
    pub fn for_operands(a: &Value, b: &Value) -> Result<Calculator> {
        use Value::*;

        let calc = match (a, b) {
            (Int(_), Int(_)) => Calculator::IntInt,
            (Double(_), Double(_)) => Calculator::DoubleDouble,
            (Int(_), Double(_)) | (Double(_), Int(_)) => Calculator::IntDouble,
            (String(_), _) | (_, String(_)) => Calculator::String,
            (Bool(_), _) | (_, Bool(_)) => Calculator::Bool,
            (Structure(_), _) | (_, Structure(_)) => Calculator::SpecialValue,
            _ => return Err(unsupported(a, b)),
        };
        Ok(calc)
    }

    pub fn apply(self, op: Operator, a: Value, b: Value) -> Result<Value> {
        match self {
            Calculator::IntInt => match (&a, &b) {
                (Value::Int(x), Value::Int(y)) => Ok(int_int(op, *x, *y)),
                _ => Err(unsupported(&a, &b)),
            },
            Calculator::DoubleDouble | Calculator::IntDouble => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(double_double(op, x, y)),
                _ => Err(unsupported(&a, &b)),
            },
            Calculator::String => string(op, &a, &b),
            Calculator::Bool => boolean(op, a.to_bool()?, b.to_bool()?),
            Calculator::SpecialValue => special(op, &a, &b),
        }
    }
}

/// Pick a strategy and apply `op` in one go.
pub fn calculate(op: Operator, a: Value, b: Value) -> Result<Value> {
    let a = a.promote();
    let b = b.promote();
    Calculator::for_operands(&a, &b)?.apply(op, a, b)
}

fn unsupported(a: &Value, b: &Value) -> KosError {
    KosError::UnsupportedOperands {
        left: a.type_name().to_string(),
        right: b.type_name().to_string(),
    }
}

fn int_or_double(result: Option<i32>, fallback: f64) -> Value {
    match result {
        Some(i) => Value::Int(i),
        None => Value::Double(fallback),
    }
}

fn int_int(op: Operator, x: i32, y: i32) -> Value {
    let (fx, fy) = (x as f64, y as f64);
    match op {
        Operator::Add => int_or_double(x.checked_add(y), fx + fy),
        Operator::Subtract => int_or_double(x.checked_sub(y), fx - fy),
        Operator::Multiply => int_or_double(x.checked_mul(y), fx * fy),
        Operator::Divide => Value::Double(fx / fy),
        Operator::Power => match u32::try_from(y) {
            Ok(exp) => int_or_double(x.checked_pow(exp), fx.powf(fy)),
            Err(_) => Value::Double(fx.powf(fy)),
        },
        Operator::GreaterThan => Value::Bool(x > y),
        Operator::LessThan => Value::Bool(x < y),
        Operator::GreaterOrEqual => Value::Bool(x >= y),
        Operator::LessOrEqual => Value::Bool(x <= y),
        Operator::Equal => Value::Bool(x == y),
        Operator::NotEqual => Value::Bool(x != y),
        Operator::Min => Value::Int(x.min(y)),
        Operator::Max => Value::Int(x.max(y)),
    }
}

fn double_double(op: Operator, x: f64, y: f64) -> Value {
    match op {
        Operator::Add => Value::Double(x + y),
        Operator::Subtract => Value::Double(x - y),
        Operator::Multiply => Value::Double(x * y),
        Operator::Divide => Value::Double(x / y),
        Operator::Power => Value::Double(x.powf(y)),
        Operator::GreaterThan => Value::Bool(x > y),
        Operator::LessThan => Value::Bool(x < y),
        Operator::GreaterOrEqual => Value::Bool(x >= y),
        Operator::LessOrEqual => Value::Bool(x <= y),
        Operator::Equal => Value::Bool(x == y),
        Operator::NotEqual => Value::Bool(x != y),
        Operator::Min => Value::Double(x.min(y)),
        Operator::Max => Value::Double(x.max(y)),
    }
}

/// Ordering compares lengths, not contents. Scripts rely on it.
fn string(op: Operator, a: &Value, b: &Value) -> Result<Value> {
    let (x, y) = (a.to_string(), b.to_string());
    let (lx, ly) = (x.chars().count(), y.chars().count());
    let v = match op {
        Operator::Add => Value::String(x + &y),
        Operator::Subtract => return Err(invalid("subtract", "strings")),
        Operator::Multiply => return Err(invalid("multiply", "strings")),
        Operator::Divide => return Err(invalid("divide", "strings")),
        Operator::Power => return Err(invalid("power", "strings")),
        Operator::GreaterThan => Value::Bool(lx > ly),
        Operator::LessThan => Value::Bool(lx < ly),
        Operator::GreaterOrEqual => Value::Bool(lx >= ly),
        Operator::LessOrEqual => Value::Bool(lx <= ly),
        Operator::Equal => Value::Bool(x.to_lowercase() == y.to_lowercase()),
        Operator::NotEqual => Value::Bool(x.to_lowercase() != y.to_lowercase()),
        Operator::Min => Value::String(if lx < ly { x } else { y }),
        Operator::Max => Value::String(if lx > ly { x } else { y }),
    };
    Ok(v)
}

fn boolean(op: Operator, x: bool, y: bool) -> Result<Value> {
    let v = match op {
        Operator::Add => x | y,
        Operator::Multiply => x & y,
        Operator::Subtract => return Err(invalid("subtract", "booleans")),
        Operator::Divide => return Err(invalid("divide", "booleans")),
        Operator::Power => return Err(invalid("power", "booleans")),
        Operator::GreaterThan => x & !y,
        Operator::LessThan => !x & y,
        Operator::GreaterOrEqual => x | !y,
        Operator::LessOrEqual => !x | y,
        Operator::Equal => x == y,
        Operator::NotEqual => x != y,
        Operator::Min => x & y,
        Operator::Max => x | y,
    };
    Ok(Value::Bool(v))
}

fn special(op: Operator, a: &Value, b: &Value) -> Result<Value> {
    let attempt = match (a, b) {
        (Value::Structure(s), other) => s.try_operation(op, other, false),
        (other, Value::Structure(s)) => s.try_operation(op, other, true),
        _ => None,
    };
    attempt.unwrap_or_else(|| Err(unsupported(a, b)))
}

fn invalid(verb: &'static str, kind: &'static str) -> KosError {
    KosError::InvalidOperation { verb, kind }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::suffix::Vector;

    #[test]
    fn int_addition_stays_int_in_range() {
        assert_eq!(calculate(Operator::Add, 2.into(), 40.into()).unwrap(), Value::Int(42));
        assert_eq!(calculate(Operator::Subtract, (-5).into(), 7.into()).unwrap(), Value::Int(-12));
    }

    #[test]
    fn int_overflow_promotes_to_double() {
        let v = calculate(Operator::Add, 2_000_000_000.into(), 2_000_000_000.into()).unwrap();
        assert_eq!(v, Value::Double(4_000_000_000.0));
        let v = calculate(Operator::Multiply, 65_536.into(), 65_536.into()).unwrap();
        assert_eq!(v, Value::Double(4_294_967_296.0));
        let v = calculate(Operator::Power, 2.into(), 40.into()).unwrap();
        assert_eq!(v, Value::Double(1_099_511_627_776.0));
        assert_eq!(calculate(Operator::Power, 2.into(), 10.into()).unwrap(), Value::Int(1024));
    }

    #[test]
    fn int_division_never_truncates() {
        assert_eq!(calculate(Operator::Divide, 7.into(), 2.into()).unwrap(), Value::Double(3.5));
        assert_eq!(calculate(Operator::Divide, 8.into(), 2.into()).unwrap(), Value::Double(4.0));
    }

    #[test]
    fn mixed_numeric_and_float_promotion() {
        assert_eq!(
            Calculator::for_operands(&Value::Int(1), &Value::Double(1.0)).unwrap(),
            Calculator::IntDouble
        );
        assert_eq!(calculate(Operator::Add, 1.into(), 0.5f32.into()).unwrap(), Value::Double(1.5));
        assert_eq!(calculate(Operator::GreaterThan, 2.5.into(), 2.into()).unwrap(), Value::Bool(true));
        assert_eq!(calculate(Operator::Max, 2.into(), 2.5.into()).unwrap(), Value::Double(2.5));
        assert_eq!(calculate(Operator::Min, 3.into(), 9.into()).unwrap(), Value::Int(3));
    }

    #[test]
    fn strings_order_by_length() {
        assert_eq!(calculate(Operator::LessThan, "ab".into(), "abcd".into()).unwrap(), Value::Bool(true));
        assert_eq!(calculate(Operator::LessThan, "xyz".into(), "ab".into()).unwrap(), Value::Bool(false));
        assert_eq!(calculate(Operator::GreaterOrEqual, "ab".into(), "zz".into()).unwrap(), Value::Bool(true));
        assert_eq!(calculate(Operator::Min, "abc".into(), "z".into()).unwrap(), Value::from("z"));
    }

    #[test]
    fn strings_concatenate_and_compare_case_insensitively() {
        assert_eq!(calculate(Operator::Add, "v".into(), 2.into()).unwrap(), Value::from("v2"));
        assert_eq!(calculate(Operator::Add, 1.5.into(), "x".into()).unwrap(), Value::from("1.5x"));
        assert_eq!(calculate(Operator::Equal, "Kerbin".into(), "KERBIN".into()).unwrap(), Value::Bool(true));
        assert_eq!(calculate(Operator::NotEqual, "Mun".into(), "Minmus".into()).unwrap(), Value::Bool(true));
        let err = calculate(Operator::Subtract, "a".into(), "b".into()).unwrap_err();
        assert_eq!(err.to_string(), "Can't subtract two strings");
    }

    #[test]
    fn booleans_are_logical() {
        assert_eq!(calculate(Operator::Add, false.into(), true.into()).unwrap(), Value::Bool(true));
        assert_eq!(calculate(Operator::Multiply, true.into(), false.into()).unwrap(), Value::Bool(false));
        assert_eq!(calculate(Operator::GreaterThan, true.into(), false.into()).unwrap(), Value::Bool(true));
        assert_eq!(calculate(Operator::LessOrEqual, true.into(), true.into()).unwrap(), Value::Bool(true));
        assert_eq!(calculate(Operator::Equal, true.into(), 1.into()).unwrap(), Value::Bool(true));
        assert!(calculate(Operator::Divide, true.into(), true.into()).is_err());
    }

    #[test]
    fn special_values_get_operand_order() {
        let a = Value::structure(Vector::new(5.0, 5.0, 5.0));
        let b = Value::structure(Vector::new(1.0, 2.0, 3.0));
        let diff = calculate(Operator::Subtract, a.clone(), b.clone()).unwrap();
        assert_eq!(diff.to_string(), "V(4, 3, 2)");
        let reversed = calculate(Operator::Subtract, b, a.clone()).unwrap();
        assert_eq!(reversed.to_string(), "V(-4, -3, -2)");
        let scaled = calculate(Operator::Multiply, 2.into(), a).unwrap();
        assert_eq!(scaled.to_string(), "V(10, 10, 10)");
    }

    #[test]
    fn unsupported_combination_names_both_types() {
        let err = calculate(Operator::Add, Value::Nil, 1.into()).unwrap_err();
        assert_eq!(err.to_string(), "Can't operate types None and Integer");
        let v = Value::structure(Vector::new(1.0, 0.0, 0.0));
        let err = calculate(Operator::Power, v, 2.into()).unwrap_err();
        assert_eq!(err.to_string(), "Can't operate types Vector and Integer");
    }

    #[test]
    fn operator_symbols() {
        use strum::IntoEnumIterator;
        let symbols: Vec<_> = Operator::iter().map(Operator::symbol).collect();
        assert_eq!(symbols[..5], ["+", "-", "*", "/", "^"]);
    }
}
