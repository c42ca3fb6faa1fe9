use anyhow::Result;
use pretty_assertions::assert_eq;

use kos_script::{BufferedOutput, CodePart, Cpu, CpuConfig, KosError, Op, Opcode, Value};

fn print(id: usize, text: &str) -> Vec<Opcode> {
    [
        Op::Push(Value::ArgMarker),
        Op::Push(text.into()),
        Op::Call("print()".into()),
        Op::Pop,
    ]
    .into_iter()
    .map(|op| Opcode::new(op).with_instruction_id(id))
    .collect()
}

fn run_until_idle(cpu: &mut Cpu) {
    for _ in 0..20 {
        if cpu.is_idle() {
            return;
        }
        cpu.update(0.02);
    }
}

#[test]
fn each_command_runs_exactly_once() -> Result<()> {
    let out = BufferedOutput::new();
    let mut cpu = Cpu::builder().output(out.clone()).build();

    cpu.run_command(vec![CodePart::with_main(print(1, "one"))])?;
    cpu.update(0.02);
    cpu.run_command(vec![CodePart::with_main(print(2, "two"))])?;
    cpu.update(0.02);
    cpu.update(0.02);

    assert_eq!(out.lines(), vec!["one", "two"]);
    Ok(())
}

#[test]
fn relink_mid_statement_keeps_the_pointer_on_its_opcode() -> Result<()> {
    let out = BufferedOutput::new();
    let mut cpu = Cpu::builder()
        .config(CpuConfig::default().with_instructions_per_update(3))
        .output(out.clone())
        .build();

    let mut main = print(1, "a");
    main.extend(print(2, "b"));
    cpu.run_command(vec![CodePart::with_main(main)])?;
    cpu.update(0.02);

    let ctx = cpu.current_context()?;
    assert_eq!(ctx.ip, 3);
    let tracked = ctx.current().map(Opcode::id);

    let part = CodePart {
        initialization: vec![],
        functions: vec![
            Opcode::new(Op::Push(9.into())).with_label("@nine"),
            Opcode::new(Op::Return),
        ],
        main: [
            Opcode::new(Op::Push(Value::ArgMarker)),
            Opcode::new(Op::Call(Value::Nil)).with_destination("@nine"),
            Opcode::new(Op::Call("print".into())),
            Opcode::new(Op::Pop),
        ]
        .into_iter()
        .map(|op| op.with_instruction_id(3))
        .collect(),
    };
    cpu.run_command(vec![part])?;

    let ctx = cpu.current_context()?;
    assert_eq!(ctx.ip, 5);
    assert_eq!(ctx.current().map(Opcode::id), tracked);

    run_until_idle(&mut cpu);
    assert_eq!(out.lines(), vec!["a", "b", "9"]);
    assert_eq!(cpu.stack().depth(), 0);
    Ok(())
}

#[test]
fn failed_link_keeps_the_running_code() -> Result<()> {
    let out = BufferedOutput::new();
    let mut cpu = Cpu::builder().output(out.clone()).build();
    cpu.run_command(vec![CodePart::with_main(print(1, "kept"))])?;
    let len = cpu.current_context()?.len();

    let broken = CodePart::with_main(vec![Opcode::new(Op::Jump(0)).with_destination("@nowhere")]);
    let err = cpu.run_command(vec![broken]).unwrap_err();
    assert!(matches!(err, KosError::UnresolvedLabel(ref label) if label == "@nowhere"));
    assert_eq!(cpu.current_context()?.len(), len);

    cpu.update(0.02);
    assert_eq!(out.lines(), vec!["kept"]);
    Ok(())
}

#[test]
fn program_context_is_created_on_demand() -> Result<()> {
    let out = BufferedOutput::new();
    let mut cpu = Cpu::builder().output(out.clone()).build();

    cpu.program_context()?
        .add_parts([CodePart::with_main(print(1, "first"))])?;
    assert_eq!(cpu.context_count(), 2);
    cpu.program_context()?
        .add_parts([CodePart::with_main(print(2, "second"))])?;
    assert_eq!(cpu.context_count(), 2);

    cpu.update(0.02);
    assert_eq!(out.lines(), vec!["first", "second", "Program ended."]);
    assert_eq!(cpu.context_count(), 1);
    Ok(())
}
