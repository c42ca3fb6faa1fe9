use std::{path::Path, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use kos_script::{
    vm::{Mnemonic, SourceLocation},
    CodePart, Op, Opcode, Value,
};
use serde::{Deserialize, Serialize};

/// One compiled chunk as written in a listing file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartListing {
    pub init: Vec<InstListing>,
    pub functions: Vec<InstListing>,
    pub main: Vec<InstListing>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InstListing {
    pub mnemonic: String,
    #[serde(default)]
    pub operands: Vec<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub dest: Option<String>,
    #[serde(default)]
    pub stmt: usize,
    #[serde(default)]
    pub line: Option<usize>,
}

/// Operand text to a value.
///
/// `$name` is an identifier, quoted text a string, `argmarker` the argument
/// marker and `null` nothing. Other bare words are strings, so `call print()`
/// needs no quotes.
pub fn parse_operand(text: &str) -> Value {
    let text = text.trim();
    if let Some(name) = text.strip_prefix('$') {
        return Value::identifier(name);
    }
    if let Some(s) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return Value::String(s.to_string());
    }
    if let Ok(i) = text.parse::<i32>() {
        return Value::Int(i);
    }
    if let Ok(d) = text.parse::<f64>() {
        return Value::Double(d);
    }
    match text.to_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" | "nil" => Value::Nil,
        "argmarker" => Value::ArgMarker,
        _ => Value::String(text.to_string()),
    }
}

impl InstListing {
    fn operand(&self, index: usize) -> Result<&str> {
        self.operands
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("missing operand {index} for {}", self.mnemonic))
    }

    /// Branch distance, or 0 when a destination label fills it in at link time.
    fn distance(&self) -> Result<isize> {
        match (self.operands.first(), &self.dest) {
            (Some(d), _) => d.trim().parse().with_context(|| format!("bad distance {d}")),
            (None, Some(_)) => Ok(0),
            (None, None) => bail!("{} needs a distance or a destination label", self.mnemonic),
        }
    }

    fn value_or_nil(&self) -> Result<Value> {
        if self.dest.is_some() && self.operands.is_empty() {
            return Ok(Value::Nil);
        }
        Ok(parse_operand(self.operand(0)?))
    }

    pub fn to_op(&self) -> Result<Op> {
        let mnemonic = Mnemonic::from_str(self.mnemonic.trim())
            .map_err(|_| anyhow!("invalid mnemonic {}", self.mnemonic))?;
        let op = match mnemonic {
            Mnemonic::Eof => Op::Eof,
            Mnemonic::Eop => Op::Eop,
            Mnemonic::Nop => Op::Nop,
            Mnemonic::Store => Op::Store,
            Mnemonic::Unset => Op::Unset,
            Mnemonic::GetMember => Op::GetMember,
            Mnemonic::GetMethod => Op::GetMethod,
            Mnemonic::SetMember => Op::SetMember,
            Mnemonic::GetIndex => Op::GetIndex,
            Mnemonic::SetIndex => Op::SetIndex,
            Mnemonic::BranchFalse => Op::BranchFalse(self.distance()?),
            Mnemonic::Jump => Op::Jump(self.distance()?),
            Mnemonic::Add => Op::Add,
            Mnemonic::Sub => Op::Sub,
            Mnemonic::Mult => Op::Mult,
            Mnemonic::Div => Op::Div,
            Mnemonic::Pow => Op::Pow,
            Mnemonic::Gt => Op::Gt,
            Mnemonic::Lt => Op::Lt,
            Mnemonic::Gte => Op::Gte,
            Mnemonic::Lte => Op::Lte,
            Mnemonic::Eq => Op::Eq,
            Mnemonic::Ne => Op::Ne,
            Mnemonic::Min => Op::Min,
            Mnemonic::Max => Op::Max,
            Mnemonic::Negate => Op::Negate,
            Mnemonic::Bool => Op::Bool,
            Mnemonic::Not => Op::Not,
            Mnemonic::And => Op::And,
            Mnemonic::Or => Op::Or,
            Mnemonic::Call => Op::Call(self.value_or_nil()?),
            Mnemonic::CallMethod => Op::CallMethod,
            Mnemonic::Return => Op::Return,
            Mnemonic::Push => Op::Push(self.value_or_nil()?),
            Mnemonic::Pop => Op::Pop,
            Mnemonic::Dup => Op::Dup,
            Mnemonic::Swap => Op::Swap,
            Mnemonic::AddTrigger => match self.operands.first() {
                Some(wait) => Op::AddTrigger(parse_operand(wait).to_bool()?),
                None => Op::AddTrigger(false),
            },
            Mnemonic::RemoveTrigger => Op::RemoveTrigger,
            Mnemonic::Wait => Op::Wait,
            Mnemonic::EndWait => Op::EndWait,
        };
        Ok(op)
    }

    pub fn to_opcode(&self) -> Result<Opcode> {
        let mut opcode = Opcode::new(self.to_op()?).with_instruction_id(self.stmt);
        opcode.label = self.label.clone();
        opcode.destination_label = self.dest.clone();
        opcode.source = self.line.map(|line| SourceLocation { file: None, line });
        Ok(opcode)
    }
}

fn convert(section: &str, insts: &[InstListing]) -> Result<Vec<Opcode>> {
    insts
        .iter()
        .enumerate()
        .map(|(i, inst)| inst.to_opcode().with_context(|| format!("{section}[{i}]")))
        .collect()
}

impl PartListing {
    pub fn to_code_part(&self) -> Result<CodePart> {
        Ok(CodePart {
            initialization: convert("init", &self.init)?,
            functions: convert("functions", &self.functions)?,
            main: convert("main", &self.main)?,
        })
    }
}

pub fn parse(text: &str) -> Result<Vec<CodePart>> {
    let parts: Vec<PartListing> = serde_yaml::from_str(text)?;
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| part.to_code_part().with_context(|| format!("part {i}")))
        .collect()
}

pub fn load(path: impl AsRef<Path>) -> Result<Vec<CodePart>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse(&text).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn operands() {
        assert_eq!(parse_operand("$speed"), Value::identifier("speed"));
        assert_eq!(parse_operand("\"12\""), Value::from("12"));
        assert_eq!(parse_operand("12"), Value::Int(12));
        assert_eq!(parse_operand("0.5"), Value::Double(0.5));
        assert_eq!(parse_operand("True"), Value::Bool(true));
        assert_eq!(parse_operand("argmarker"), Value::ArgMarker);
        assert_eq!(parse_operand("null"), Value::Nil);
        assert_eq!(parse_operand("print()"), Value::from("print()"));
    }

    #[test]
    fn parts_convert_with_labels_and_statements() {
        let parts = parse(
            r#"
- functions:
    - { mnemonic: push, operands: ["5"], label: "@five" }
    - { mnemonic: return }
  main:
    - { mnemonic: push, operands: [argmarker], stmt: 1 }
    - { mnemonic: call, dest: "@five", stmt: 1, line: 3 }
    - { mnemonic: call, operands: [print()], stmt: 1 }
    - { mnemonic: br.false, dest: "@end", stmt: 2 }
    - { mnemonic: addtrigger, operands: ["true"], stmt: 2 }
"#,
        )
        .unwrap();
        assert_eq!(parts.len(), 1);
        let part = &parts[0];
        assert_eq!(part.functions[0].label.as_deref(), Some("@five"));
        assert_eq!(part.main[1].op, Op::Call(Value::Nil));
        assert_eq!(part.main[1].source.as_ref().map(|s| s.line), Some(3));
        assert_eq!(part.main[2].to_string(), "call print()");
        assert_eq!(part.main[3].op, Op::BranchFalse(0));
        assert_eq!(part.main[4].op, Op::AddTrigger(true));
        assert_eq!(part.main[4].instruction_id, 2);
    }

    #[test]
    fn bad_listing_names_the_instruction() {
        let err = parse("- main:\n    - { mnemonic: jz }\n").unwrap_err();
        assert_eq!(format!("{err:#}"), "part 0: main[0]: invalid mnemonic jz");

        let err = parse("- main:\n    - { mnemonic: jump }\n").unwrap_err();
        assert!(format!("{err:#}").contains("needs a distance"));
    }
}
