//! Saving live variables and replaying them on load.

use serde::{Deserialize, Serialize};

use crate::{
    value::Value,
    variable::{is_pointer, Variable},
    vm::{
        cpu::Cpu,
        opcode::{Op, Opcode},
        program::CodePart,
    },
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SavedValue {
    Int(i32),
    Double(f64),
    Bool(bool),
    String(String),
}

impl SavedValue {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(SavedValue::Int(*i)),
            Value::Float(f) => Some(SavedValue::Double(*f as f64)),
            Value::Double(d) => Some(SavedValue::Double(*d)),
            Value::Bool(b) => Some(SavedValue::Bool(*b)),
            Value::String(s) => Some(SavedValue::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            SavedValue::Int(i) => Value::Int(*i),
            SavedValue::Double(d) => Value::Double(*d),
            SavedValue::Bool(b) => Value::Bool(*b),
            SavedValue::String(s) => Value::String(s.clone()),
        }
    }

    /// Literal form in a `set` statement.
    fn literal(&self) -> String {
        match self {
            SavedValue::String(s) => format!("\"{s}\""),
            other => other.to_value().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedVariable {
    pub name: String,
    pub value: SavedValue,
}

/// Lock pointers and compiler-generated names.
pub fn is_internal(name: &str) -> bool {
    is_pointer(name) || name.contains('-')
}

/// Plain variables worth keeping across a reload, sorted by name.
///
/// Bound variables belong to the host, and structures have no literal form.
pub fn save_variables(cpu: &Cpu) -> Vec<SavedVariable> {
    let mut saved: Vec<SavedVariable> = cpu
        .variables()
        .iter()
        .filter(|(name, _)| !is_internal(name))
        .filter_map(|(name, var)| match var {
            Variable::Plain(value) => SavedValue::from_value(value).map(|value| SavedVariable {
                name: name.to_string(),
                value,
            }),
            Variable::Bound(_) => None,
        })
        .collect();
    saved.sort_by(|a, b| a.name.cmp(&b.name));
    saved
}

/// The script equivalent of `saved`, one `set NAME to VALUE.` per line.
pub fn restore_script(saved: &[SavedVariable]) -> String {
    saved
        .iter()
        .map(|v| format!("set {} to {}.\n", v.name, v.value.literal()))
        .collect()
}

/// The compiled form of [`restore_script`]: push name, push value, store.
pub fn restore_program(saved: &[SavedVariable]) -> CodePart {
    let main = saved
        .iter()
        .enumerate()
        .flat_map(|(statement, v)| {
            [
                Op::Push(Value::identifier(v.name.as_str())),
                Op::Push(v.value.to_value()),
                Op::Store,
            ]
            .into_iter()
            .map(move |op| Opcode::new(op).with_instruction_id(statement + 1))
        })
        .collect();
    CodePart::with_main(main)
}
