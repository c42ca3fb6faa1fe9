use std::{collections::BTreeMap, rc::Rc};

use crate::{
    binding::BindingManager,
    error::Result,
    value::Value,
    vm::{
        opcode::Opcode,
        program::{CodePart, ProgramBuilder},
    },
};

/// One running program: its linked opcodes, instruction pointer and triggers.
///
/// Context 0 of a scheduler is always the interpreter; program contexts are
/// pushed above it and only the topmost one executes.
#[derive(Debug)]
pub struct ProgramContext {
    program: Rc<Vec<Opcode>>,
    pub ip: usize,
    triggers: Vec<usize>,
    pub silent: bool,
    fly_by_wire: BTreeMap<String, bool>,
    builder: ProgramBuilder,
    /// Pointer variables of the context below, put back when this one is popped.
    pub(crate) saved_pointers: Vec<(String, Value)>,
}

impl ProgramContext {
    pub fn new(interpreter: bool) -> Self {
        Self {
            program: Rc::new(Vec::new()),
            ip: 0,
            triggers: Vec::new(),
            silent: false,
            fly_by_wire: BTreeMap::new(),
            builder: ProgramBuilder::new(interpreter),
            saved_pointers: Vec::new(),
        }
    }

    pub fn is_interpreter(&self) -> bool {
        self.builder.is_interpreted()
    }

    pub fn program(&self) -> &Rc<Vec<Opcode>> {
        &self.program
    }

    pub fn len(&self) -> usize {
        self.program.len()
    }

    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }

    pub fn current(&self) -> Option<&Opcode> {
        self.program.get(self.ip)
    }

    /// Append compiled code and relink, keeping the pointer on the same opcode.
    ///
    /// Nothing changes when linking fails.
    pub fn add_parts(&mut self, parts: impl IntoIterator<Item = CodePart>) -> Result<()> {
        let before = self.builder.part_count();
        self.builder.add_range(parts);
        let program = match self.builder.build() {
            Ok(p) => p,
            Err(e) => {
                self.builder.truncate(before);
                return Err(e);
            }
        };
        let old = std::mem::replace(&mut self.program, Rc::new(program));
        self.relocate_ip(&old);
        Ok(())
    }

    /// Find the opcode the pointer referenced in `old` by id. A pointer on the
    /// old end marker keys off the opcode before it and lands one past it, so
    /// newly appended code runs next.
    fn relocate_ip(&mut self, old: &[Opcode]) {
        if old.len() <= 1 {
            return;
        }
        self.ip = self.ip.min(old.len() - 1);
        let delta = usize::from(self.ip == old.len() - 1);
        let Some(current) = self.ip.checked_sub(delta).and_then(|i| old.get(i)) else {
            return;
        };
        let id = current.id();
        if let Some(index) = self.program.iter().position(|op| op.id() == id) {
            log::trace!("relinked ip {} -> {}", self.ip, index + delta);
            self.ip = index + delta;
        }
    }

    /// Move past every opcode of the statement under the pointer. The pointer
    /// never moves past the end marker.
    pub fn skip_current_statement(&mut self) {
        let Some(end) = self.program.len().checked_sub(1) else {
            return;
        };
        if self.ip >= end {
            self.ip = end;
            return;
        }
        let statement = self.program[self.ip].instruction_id;
        while self.ip < end && self.program[self.ip].instruction_id == statement {
            self.ip += 1;
        }
    }

    pub fn triggers(&self) -> &[usize] {
        &self.triggers
    }

    pub fn add_trigger(&mut self, pointer: usize) {
        if !self.triggers.contains(&pointer) {
            self.triggers.push(pointer);
        }
    }

    pub fn remove_trigger(&mut self, pointer: usize) -> bool {
        let before = self.triggers.len();
        self.triggers.retain(|t| *t != pointer);
        self.triggers.len() != before
    }

    pub fn clear_triggers(&mut self) {
        self.triggers.clear();
    }

    pub fn toggle_fly_by_wire(&mut self, channel: &str, enabled: bool) {
        self.fly_by_wire.insert(channel.to_lowercase(), enabled);
    }

    pub fn fly_by_wire(&self) -> &BTreeMap<String, bool> {
        &self.fly_by_wire
    }

    pub fn disable_active_fly_by_wire(&self, manager: &mut BindingManager) {
        for (channel, _) in self.fly_by_wire.iter().filter(|(_, on)| **on) {
            manager.toggle_fly_by_wire(channel, false);
        }
    }

    pub fn enable_active_fly_by_wire(&self, manager: &mut BindingManager) {
        for (channel, on) in &self.fly_by_wire {
            manager.toggle_fly_by_wire(channel, *on);
        }
    }

    pub fn clear_fly_by_wire(&mut self) {
        self.fly_by_wire.clear();
    }

    /// Listing of the opcodes within `lines` of the pointer.
    pub fn code_fragment(&self, lines: usize) -> Vec<String> {
        let start = self.ip.saturating_sub(lines);
        let stop = (self.ip + lines + 1).min(self.program.len());
        (start..stop)
            .map(|index| {
                let marker = if index == self.ip { "    <<" } else { "" };
                format!("{index:04}    {}{marker}", self.program[index])
            })
            .collect()
    }
}
