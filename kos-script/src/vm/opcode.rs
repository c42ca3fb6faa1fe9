use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::value::Value;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Instruction kinds, with their operands.
///
/// The strum name is the listing mnemonic.
#[derive(Clone, Debug, PartialEq, strum::IntoStaticStr, strum::EnumDiscriminants)]
#[strum_discriminants(name(Mnemonic), derive(strum::EnumString, strum::IntoStaticStr, strum::EnumIter))]
pub enum Op {
    /// End of the interpreter program or of a trigger body.
    #[strum(serialize = "EOF")]
    #[strum_discriminants(strum(serialize = "EOF"))]
    Eof,
    /// End of a program context.
    #[strum(serialize = "EOP")]
    #[strum_discriminants(strum(serialize = "EOP"))]
    Eop,
    #[strum(serialize = "nop")]
    #[strum_discriminants(strum(serialize = "nop"))]
    Nop,
    #[strum(serialize = "store")]
    #[strum_discriminants(strum(serialize = "store"))]
    Store,
    #[strum(serialize = "unset")]
    #[strum_discriminants(strum(serialize = "unset"))]
    Unset,
    #[strum(serialize = "getmember")]
    #[strum_discriminants(strum(serialize = "getmember"))]
    GetMember,
    #[strum(serialize = "getmethod")]
    #[strum_discriminants(strum(serialize = "getmethod"))]
    GetMethod,
    #[strum(serialize = "setmember")]
    #[strum_discriminants(strum(serialize = "setmember"))]
    SetMember,
    #[strum(serialize = "getindex")]
    #[strum_discriminants(strum(serialize = "getindex"))]
    GetIndex,
    #[strum(serialize = "setindex")]
    #[strum_discriminants(strum(serialize = "setindex"))]
    SetIndex,
    /// Relative distance, filled in at link time when a destination label is set.
    #[strum(serialize = "br.false")]
    #[strum_discriminants(strum(serialize = "br.false"))]
    BranchFalse(isize),
    #[strum(serialize = "jump")]
    #[strum_discriminants(strum(serialize = "jump"))]
    Jump(isize),
    #[strum(serialize = "add")]
    #[strum_discriminants(strum(serialize = "add"))]
    Add,
    #[strum(serialize = "sub")]
    #[strum_discriminants(strum(serialize = "sub"))]
    Sub,
    #[strum(serialize = "mult")]
    #[strum_discriminants(strum(serialize = "mult"))]
    Mult,
    #[strum(serialize = "div")]
    #[strum_discriminants(strum(serialize = "div"))]
    Div,
    #[strum(serialize = "pow")]
    #[strum_discriminants(strum(serialize = "pow"))]
    Pow,
    #[strum(serialize = "gt")]
    #[strum_discriminants(strum(serialize = "gt"))]
    Gt,
    #[strum(serialize = "lt")]
    #[strum_discriminants(strum(serialize = "lt"))]
    Lt,
    #[strum(serialize = "gte")]
    #[strum_discriminants(strum(serialize = "gte"))]
    Gte,
    #[strum(serialize = "lte")]
    #[strum_discriminants(strum(serialize = "lte"))]
    Lte,
    #[strum(serialize = "eq")]
    #[strum_discriminants(strum(serialize = "eq"))]
    Eq,
    #[strum(serialize = "ne")]
    #[strum_discriminants(strum(serialize = "ne"))]
    Ne,
    #[strum(serialize = "min")]
    #[strum_discriminants(strum(serialize = "min"))]
    Min,
    #[strum(serialize = "max")]
    #[strum_discriminants(strum(serialize = "max"))]
    Max,
    #[strum(serialize = "negate")]
    #[strum_discriminants(strum(serialize = "negate"))]
    Negate,
    #[strum(serialize = "bool")]
    #[strum_discriminants(strum(serialize = "bool"))]
    Bool,
    #[strum(serialize = "not")]
    #[strum_discriminants(strum(serialize = "not"))]
    Not,
    #[strum(serialize = "and")]
    #[strum_discriminants(strum(serialize = "and"))]
    And,
    #[strum(serialize = "or")]
    #[strum_discriminants(strum(serialize = "or"))]
    Or,
    /// Int destination: same-program subroutine. String: host function.
    /// Identifier: resolved through the variable table first.
    #[strum(serialize = "call")]
    #[strum_discriminants(strum(serialize = "call"))]
    Call(Value),
    #[strum(serialize = "callmethod")]
    #[strum_discriminants(strum(serialize = "callmethod"))]
    CallMethod,
    #[strum(serialize = "return")]
    #[strum_discriminants(strum(serialize = "return"))]
    Return,
    #[strum(serialize = "push")]
    #[strum_discriminants(strum(serialize = "push"))]
    Push(Value),
    #[strum(serialize = "pop")]
    #[strum_discriminants(strum(serialize = "pop"))]
    Pop,
    #[strum(serialize = "dup")]
    #[strum_discriminants(strum(serialize = "dup"))]
    Dup,
    #[strum(serialize = "swap")]
    #[strum_discriminants(strum(serialize = "swap"))]
    Swap,
    /// `true` makes the main stream wait until the trigger ends it.
    #[strum(serialize = "addtrigger")]
    #[strum_discriminants(strum(serialize = "addtrigger"))]
    AddTrigger(bool),
    #[strum(serialize = "removetrigger")]
    #[strum_discriminants(strum(serialize = "removetrigger"))]
    RemoveTrigger,
    #[strum(serialize = "wait")]
    #[strum_discriminants(strum(serialize = "wait"))]
    Wait,
    #[strum(serialize = "endwait")]
    #[strum_discriminants(strum(serialize = "endwait"))]
    EndWait,
}

impl Op {
    pub fn mnemonic(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.mnemonic();
        match self {
            Op::BranchFalse(d) | Op::Jump(d) => write!(f, "{name} {d}"),
            Op::Call(Value::String(s)) => write!(f, "{name} {s}"),
            Op::Call(v) | Op::Push(v) => match v {
                Value::String(s) => write!(f, "{name} \"{s}\""),
                v => write!(f, "{name} {v}"),
            },
            Op::AddTrigger(wait) => write!(f, "{name} {wait}"),
            _ => f.write_str(name),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub line: usize,
}

/// One instruction in a program.
///
/// `id` is unique for the process lifetime and survives relinking, which is
/// how a context finds its place again after new code is appended.
/// `instruction_id` groups every opcode emitted for one source statement.
#[derive(Clone, Debug)]
pub struct Opcode {
    id: u64,
    pub instruction_id: usize,
    pub op: Op,
    pub label: Option<String>,
    pub destination_label: Option<String>,
    pub source: Option<SourceLocation>,
}

impl Opcode {
    pub fn new(op: Op) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            instruction_id: 0,
            op,
            label: None,
            destination_label: None,
            source: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_destination(mut self, label: impl Into<String>) -> Self {
        self.destination_label = Some(label.into());
        self
    }

    pub fn with_instruction_id(mut self, id: usize) -> Self {
        self.instruction_id = id;
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.source = Some(SourceLocation { file: None, line });
        self
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.op.fmt(f)
    }
}

/// Result of executing one opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Move the instruction pointer by this much and keep going.
    Step(isize),
    /// Stop here: end of program or trigger body. The pointer does not move.
    Halt,
    /// Advance by one, then give the rest of the tick back.
    Yield,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn ids_are_unique_and_survive_clone() {
        let a = Opcode::new(Op::Nop);
        let b = Opcode::new(Op::Nop);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn mnemonics_round_trip_through_discriminants() {
        assert_eq!(Op::BranchFalse(3).mnemonic(), "br.false");
        assert_eq!(Mnemonic::from_str("callmethod").unwrap(), Mnemonic::CallMethod);
        assert_eq!(Mnemonic::from(&Op::Push(1.into())), Mnemonic::Push);
        assert!(Mnemonic::from_str("jz").is_err());
    }

    #[test]
    fn listing_display() {
        assert_eq!(Op::Push("hi".into()).to_string(), "push \"hi\"");
        assert_eq!(Op::Call("print()".into()).to_string(), "call print()");
        assert_eq!(Op::Push(Value::identifier("x")).to_string(), "push $x");
        assert_eq!(Op::Jump(-4).to_string(), "jump -4");
    }
}
