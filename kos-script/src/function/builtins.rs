//! Functions every scheduler starts with.

use crate::{
    calculator::{calculate, Operator},
    error::{KosError, Result},
    function::FunctionRegistry,
    suffix::{take, ListValue, Param, ParamType, Signature, Vector},
    value::Value,
    vm::cpu::Cpu,
};

fn unary(registry: &mut FunctionRegistry, name: &str, f: fn(f64) -> f64) {
    registry.register(name, Signature::fixed(&[ParamType::Double]), move |_, args| {
        let x: f64 = take(&mut args.into_iter())?;
        Ok(Value::Double(f(x)))
    });
}

fn binary_op(registry: &mut FunctionRegistry, name: &str, op: Operator) {
    registry.register(name, Signature::fixed(&[ParamType::Any, ParamType::Any]), move |_, args| {
        let mut args = args.into_iter();
        let a: Value = take(&mut args)?;
        let b: Value = take(&mut args)?;
        calculate(op, a, b)
    });
}

/// Round half to even at `digits` decimal places.
fn round_to(x: f64, digits: i32) -> f64 {
    if digits <= 0 {
        return x.round_ties_even();
    }
    let scale = 10f64.powi(digits.min(15));
    (x * scale).round_ties_even() / scale
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register("print", Signature::fixed(&[ParamType::Any]), |cpu: &mut Cpu, args| {
        let value: Value = take(&mut args.into_iter())?;
        cpu.print(&value.to_string());
        Ok(Value::NEUTRAL)
    });

    registry.register("error", Signature::fixed(&[ParamType::String]), |_, args| {
        let message: String = take(&mut args.into_iter())?;
        Err(KosError::Script(message))
    });

    unary(registry, "abs", f64::abs);
    unary(registry, "floor", f64::floor);
    unary(registry, "ceiling", f64::ceil);
    unary(registry, "sqrt", f64::sqrt);

    registry.register("mod", Signature::fixed(&[ParamType::Double, ParamType::Double]), |_, args| {
        let mut args = args.into_iter();
        let a: f64 = take(&mut args)?;
        let b: f64 = take(&mut args)?;
        Ok(Value::Double(a % b))
    });

    registry.register(
        "round",
        Signature::new(vec![
            Param::required("value", ParamType::Double),
            Param::optional("digits", ParamType::Int, 0),
        ]),
        |_, args| {
            let mut args = args.into_iter();
            let x: f64 = take(&mut args)?;
            let digits: i32 = take(&mut args)?;
            Ok(Value::Double(round_to(x, digits)))
        },
    );

    binary_op(registry, "min", Operator::Min);
    binary_op(registry, "max", Operator::Max);

    registry.register("list", Signature::default().with_variadic(ParamType::Any), |_, args| {
        Ok(Value::structure(ListValue::new(args)))
    });

    registry.register(
        "v",
        Signature::fixed(&[ParamType::Double, ParamType::Double, ParamType::Double]),
        |_, args| {
            let mut args = args.into_iter();
            let x = take(&mut args)?;
            let y = take(&mut args)?;
            let z = take(&mut args)?;
            Ok(Vector::new(x, y, z).into_value())
        },
    );

    registry.register(
        "toggleflybywire",
        Signature::fixed(&[ParamType::String, ParamType::Bool]),
        |cpu, args| {
            let mut args = args.into_iter();
            let channel: String = take(&mut args)?;
            let enabled: bool = take(&mut args)?;
            cpu.toggle_fly_by_wire(&channel, enabled)?;
            Ok(Value::NEUTRAL)
        },
    );
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::output::BufferedOutput;

    fn call(cpu: &mut Cpu, name: &str, args: Vec<Value>) -> Result<Value> {
        let registry = FunctionRegistry::with_builtins();
        registry.get(name)?.invoke(cpu, args)
    }

    #[test]
    fn math_functions() {
        let mut cpu = Cpu::builder().build();
        assert_eq!(call(&mut cpu, "abs", vec![(-3).into()]).unwrap(), Value::Double(3.0));
        assert_eq!(call(&mut cpu, "mod", vec![7.into(), 3.into()]).unwrap(), Value::Double(1.0));
        assert_eq!(call(&mut cpu, "round", vec![2.5.into()]).unwrap(), Value::Double(2.0));
        assert_eq!(call(&mut cpu, "round", vec![1.23456.into(), 2.into()]).unwrap(), Value::Double(1.23));
        assert_eq!(call(&mut cpu, "max", vec![2.into(), 7.into()]).unwrap(), Value::Int(7));
    }

    #[test]
    fn arity_is_checked() {
        let mut cpu = Cpu::builder().build();
        let err = call(&mut cpu, "mod", vec![1.into()]).unwrap_err();
        assert_eq!(err.to_string(), "Argument mismatch: expected 2 argument(s), got 1");
    }

    #[test]
    fn print_goes_to_the_sink() {
        let out = BufferedOutput::new();
        let mut cpu = Cpu::builder().output(out.clone()).build();
        call(&mut cpu, "print", vec!["hello".into()]).unwrap();
        assert_eq!(out.lines(), vec!["hello".to_string()]);
    }

    #[test]
    fn error_raises_a_script_error() {
        let mut cpu = Cpu::builder().build();
        let err = call(&mut cpu, "error", vec!["fuel low".into()]).unwrap_err();
        assert!(matches!(err, KosError::Script(_)));
        assert_eq!(err.to_string(), "fuel low");
    }

    #[test]
    fn constructors() {
        let mut cpu = Cpu::builder().build();
        let list = call(&mut cpu, "list", vec![1.into(), 2.into()]).unwrap();
        assert_eq!(list.to_string(), "LIST(2)");
        let v = call(&mut cpu, "v", vec![1.into(), 2.into(), 3.into()]).unwrap();
        assert_eq!(v.to_string(), "V(1, 2, 3)");
    }
}
