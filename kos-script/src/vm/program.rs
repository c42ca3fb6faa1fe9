use std::collections::HashMap;

use crate::{
    error::{KosError, Result},
    value::Value,
    vm::opcode::{Op, Opcode},
};

/// Compiler output for one chunk of source.
#[derive(Clone, Debug, Default)]
pub struct CodePart {
    pub initialization: Vec<Opcode>,
    pub functions: Vec<Opcode>,
    pub main: Vec<Opcode>,
}

impl CodePart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_main(main: Vec<Opcode>) -> Self {
        Self {
            main,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.initialization.is_empty() && self.functions.is_empty() && self.main.is_empty()
    }

    pub fn len(&self) -> usize {
        self.initialization.len() + self.functions.len() + self.main.len()
    }
}

/// Accumulates code parts and links them into one flat program.
///
/// Layout: initialization, then a jump over the functions, then functions,
/// then main code and the end marker. Interpreted builds run initialization
/// code inline with main code instead.
#[derive(Debug)]
pub struct ProgramBuilder {
    parts: Vec<CodePart>,
    interpreted: bool,
    entry_jump: Opcode,
}

impl ProgramBuilder {
    pub fn new(interpreted: bool) -> Self {
        Self {
            parts: Vec::new(),
            interpreted,
            entry_jump: Opcode::new(Op::Jump(1)),
        }
    }

    pub fn is_interpreted(&self) -> bool {
        self.interpreted
    }

    pub fn add(&mut self, part: CodePart) {
        self.parts.push(part);
    }

    pub fn add_range(&mut self, parts: impl IntoIterator<Item = CodePart>) {
        self.parts.extend(parts);
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Drop parts added after the first `count`.
    pub fn truncate(&mut self, count: usize) {
        self.parts.truncate(count);
    }

    pub fn build(&self) -> Result<Vec<Opcode>> {
        let mut init = Vec::new();
        let mut functions = Vec::new();
        let mut main = Vec::new();

        for part in &self.parts {
            if self.interpreted {
                main.extend(part.initialization.iter().cloned());
            } else {
                init.extend(part.initialization.iter().cloned());
            }
            functions.extend(part.functions.iter().cloned());
            main.extend(part.main.iter().cloned());
        }

        let has_main = !main.is_empty();
        main.push(Opcode::new(if self.interpreted { Op::Eof } else { Op::Eop }));

        let jump_at = init.len();
        let mut program = init;
        if has_main {
            let mut jump = self.entry_jump.clone();
            jump.op = Op::Jump(functions.len() as isize + 1);
            program.push(jump);
        }
        program.extend(functions);
        program.extend(main);

        log::trace!("linked {} opcodes (entry jump at {jump_at})", program.len());
        resolve_labels(&mut program)?;
        Ok(program)
    }
}

fn resolve_labels(program: &mut [Opcode]) -> Result<()> {
    let mut labels = HashMap::new();
    for (index, opcode) in program.iter().enumerate() {
        if let Some(label) = &opcode.label {
            if labels.insert(label.clone(), index).is_some() {
                return Err(KosError::DuplicateLabel(label.clone()));
            }
        }
    }

    for (index, opcode) in program.iter_mut().enumerate() {
        let Some(dest) = &opcode.destination_label else { continue };
        let target = *labels.get(dest).ok_or_else(|| KosError::UnresolvedLabel(dest.clone()))?;
        let distance = target as isize - index as isize;
        match &mut opcode.op {
            Op::BranchFalse(d) | Op::Jump(d) => *d = distance,
            Op::Push(v) | Op::Call(v) => *v = Value::Int(target as i32),
            other => log::warn!("destination label {dest} on {} ignored", other.mnemonic()),
        }
    }
    Ok(())
}
