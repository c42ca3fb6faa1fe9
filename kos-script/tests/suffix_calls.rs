use std::{cell::Cell, fmt, rc::Rc};

use anyhow::Result;
use pretty_assertions::assert_eq;

use kos_script::{BufferedOutput, CodePart, Cpu, Op, Opcode, Structure, Suffix, SuffixTable, Value};

#[derive(Debug)]
struct Engine {
    thrust: Rc<Cell<f64>>,
    shutdowns: Rc<Cell<u32>>,
    table: SuffixTable,
}

impl Engine {
    fn new() -> Self {
        let thrust = Rc::new(Cell::new(0.0));
        let shutdowns = Rc::new(Cell::new(0));
        let table = SuffixTable::new()
            .with(
                "THRUST",
                Suffix::get_set(
                    {
                        let thrust = Rc::clone(&thrust);
                        move || Ok(thrust.get())
                    },
                    {
                        let thrust = Rc::clone(&thrust);
                        move |v: f64| {
                            thrust.set(v);
                            Ok(())
                        }
                    },
                ),
            )
            .with(
                "SHUTDOWN",
                Suffix::method0({
                    let shutdowns = Rc::clone(&shutdowns);
                    move || {
                        shutdowns.set(shutdowns.get() + 1);
                        Ok(())
                    }
                }),
            )
            .with("GIMBAL", Suffix::method2(|pitch: f64, yaw: f64| Ok(pitch + yaw)))
            .with("LABEL", Suffix::get(|| Ok("LV-T45".to_string())));
        Self {
            thrust,
            shutdowns,
            table,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ENGINE({})", self.thrust.get())
    }
}

impl Structure for Engine {
    fn type_name(&self) -> &'static str {
        "Engine"
    }

    fn suffixes(&self) -> &SuffixTable {
        &self.table
    }
}

struct Fixture {
    cpu: Cpu,
    out: BufferedOutput,
    thrust: Rc<Cell<f64>>,
    shutdowns: Rc<Cell<u32>>,
}

fn fixture() -> Result<Fixture> {
    let out = BufferedOutput::new();
    let mut cpu = Cpu::builder()
        .output(out.clone())
        .suffix("Engine", "DOUBLETHRUST", |recv| {
            Suffix::get(move || {
                let thrust = recv.to_string();
                Ok(thrust.len() as i32 * 2)
            })
        })
        .build();
    let engine = Engine::new();
    let thrust = Rc::clone(&engine.thrust);
    let shutdowns = Rc::clone(&engine.shutdowns);
    cpu.variables_mut().set("engine", Value::structure(engine))?;
    Ok(Fixture {
        cpu,
        out,
        thrust,
        shutdowns,
    })
}

/// Run `ops` as one interpreter statement.
fn run(cpu: &mut Cpu, ops: Vec<Op>) -> Result<()> {
    let main = ops.into_iter().map(|op| Opcode::new(op).with_instruction_id(1)).collect();
    cpu.run_command(vec![CodePart::with_main(main)])?;
    cpu.update(0.02);
    Ok(())
}

fn engine_suffix(name: &str) -> Vec<Op> {
    vec![Op::Push(Value::identifier("engine")), Op::Push(name.into())]
}

#[test]
fn void_member_access_leaves_one_neutral_value() -> Result<()> {
    let mut f = fixture()?;
    let mut ops = engine_suffix("shutdown");
    ops.push(Op::GetMember);
    run(&mut f.cpu, ops)?;

    assert_eq!(f.shutdowns.get(), 1);
    assert_eq!(f.cpu.stack().depth(), 1);
    assert_eq!(f.cpu.stack().peek(), Some(&Value::NEUTRAL));
    assert!(f.out.lines().is_empty());
    Ok(())
}

#[test]
fn void_method_call_leaves_one_neutral_value() -> Result<()> {
    let mut f = fixture()?;
    let mut ops = engine_suffix("shutdown");
    ops.extend([Op::GetMethod, Op::Push(Value::ArgMarker), Op::CallMethod]);
    run(&mut f.cpu, ops)?;

    assert_eq!(f.shutdowns.get(), 1);
    assert_eq!(f.cpu.stack().depth(), 1);
    assert_eq!(f.cpu.stack().peek(), Some(&Value::NEUTRAL));
    Ok(())
}

#[test]
fn method_with_arguments_is_called_through_a_delegate() -> Result<()> {
    let mut f = fixture()?;
    let mut ops = engine_suffix("gimbal");
    ops.extend([
        Op::GetMember,
        Op::Push(Value::ArgMarker),
        Op::Push(2.into()),
        Op::Push(0.5.into()),
        Op::CallMethod,
    ]);
    run(&mut f.cpu, ops)?;
    assert_eq!(f.cpu.stack().peek(), Some(&Value::Double(2.5)));
    Ok(())
}

#[test]
fn arity_mismatch_reports_expected_and_actual() -> Result<()> {
    let mut f = fixture()?;
    let mut too_few = engine_suffix("gimbal");
    too_few.extend([Op::GetMethod, Op::Push(Value::ArgMarker), Op::Push(1.into()), Op::CallMethod]);
    run(&mut f.cpu, too_few)?;

    let mut too_many = engine_suffix("gimbal");
    too_many.extend([
        Op::GetMethod,
        Op::Push(Value::ArgMarker),
        Op::Push(1.into()),
        Op::Push(2.into()),
        Op::Push(3.into()),
        Op::CallMethod,
    ]);
    run(&mut f.cpu, too_many)?;

    assert_eq!(
        f.out.lines(),
        vec![
            "Argument mismatch: expected 2 argument(s), got 1",
            "Argument mismatch: expected 2 argument(s), got 3",
        ]
    );
    assert_eq!(f.cpu.stack().depth(), 0);
    Ok(())
}

#[test]
fn set_member_coerces_and_respects_read_only() -> Result<()> {
    let mut f = fixture()?;
    let mut ops = engine_suffix("thrust");
    ops.extend([Op::Push("12.5".into()), Op::SetMember]);
    run(&mut f.cpu, ops)?;
    assert_eq!(f.thrust.get(), 12.5);

    let mut ops = engine_suffix("label");
    ops.extend([Op::Push("other".into()), Op::SetMember]);
    run(&mut f.cpu, ops)?;
    assert_eq!(f.out.lines(), vec!["Suffix LABEL is read-only"]);
    Ok(())
}

#[test]
fn shared_and_default_suffixes_resolve_after_instance_ones() -> Result<()> {
    let mut f = fixture()?;
    let mut ops = engine_suffix("typename");
    ops.push(Op::GetMember);
    ops.extend(engine_suffix("doublethrust"));
    ops.push(Op::GetMember);
    run(&mut f.cpu, ops)?;

    // "ENGINE(0)" is nine characters long.
    assert_eq!(f.cpu.stack().peek(), Some(&Value::Int(18)));
    f.cpu.stack_mut().pop()?;
    assert_eq!(f.cpu.stack().peek(), Some(&Value::from("Engine")));
    Ok(())
}

#[test]
fn suffix_errors_are_reported() -> Result<()> {
    let mut f = fixture()?;
    let mut ops = engine_suffix("warp");
    ops.push(Op::GetMember);
    run(&mut f.cpu, ops)?;
    run(&mut f.cpu, vec![Op::Push(3.into()), Op::Push("length".into()), Op::GetMember])?;

    assert_eq!(
        f.out.lines(),
        vec!["Suffix WARP not found on object", "Values of type Integer cannot have suffixes"]
    );
    Ok(())
}

#[test]
fn lists_are_indexable_from_scripts() -> Result<()> {
    let mut f = fixture()?;
    run(
        &mut f.cpu,
        vec![
            Op::Push(Value::identifier("parts")),
            Op::Push(Value::ArgMarker),
            Op::Push(1.into()),
            Op::Push(2.into()),
            Op::Push(3.into()),
            Op::Call("list()".into()),
            Op::Store,
        ],
    )?;
    run(
        &mut f.cpu,
        vec![
            Op::Push(Value::identifier("parts")),
            Op::Push(1.into()),
            Op::Push(20.into()),
            Op::SetIndex,
            Op::Push(Value::identifier("parts")),
            Op::Push(1.into()),
            Op::GetIndex,
        ],
    )?;
    assert_eq!(f.cpu.stack_mut().pop()?, Value::Int(20));

    run(
        &mut f.cpu,
        vec![Op::Push(Value::identifier("parts")), Op::Push("a".into()), Op::GetIndex],
    )?;
    run(&mut f.cpu, vec![Op::Push(4.into()), Op::Push(0.into()), Op::GetIndex])?;
    run(
        &mut f.cpu,
        vec![Op::Push(Value::identifier("parts")), Op::Push(7.into()), Op::GetIndex],
    )?;
    assert_eq!(
        f.out.lines(),
        vec![
            "The index must be an integer number",
            "Can't iterate on an object of type Integer",
            "Index 7 is out of range (count=3)",
        ]
    );
    Ok(())
}

#[test]
fn vector_arithmetic_goes_through_the_operator_protocol() -> Result<()> {
    let mut f = fixture()?;
    let v = |x: i32, y: i32, z: i32| {
        vec![
            Op::Push(Value::ArgMarker),
            Op::Push(x.into()),
            Op::Push(y.into()),
            Op::Push(z.into()),
            Op::Call("v()".into()),
        ]
    };
    let mut ops = v(1, 2, 3);
    ops.extend(v(4, 5, 6));
    ops.push(Op::Mult);
    ops.extend(v(1, 0, 0));
    ops.push(Op::Negate);
    ops.extend([Op::Push("x".into()), Op::GetMember]);
    run(&mut f.cpu, ops)?;

    assert_eq!(f.cpu.stack_mut().pop()?, Value::Double(-1.0));
    assert_eq!(f.cpu.stack_mut().pop()?, Value::Double(32.0));
    Ok(())
}
