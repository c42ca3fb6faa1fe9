use std::{collections::HashMap, fmt, rc::Rc};

use crate::{
    error::{KosError, Result},
    suffix::Signature,
    value::Value,
    vm::cpu::Cpu,
};

pub type FunctionBody = Rc<dyn Fn(&mut Cpu, Vec<Value>) -> Result<Value>>;

/// A host function reachable through `call "name()"`.
#[derive(Clone)]
pub struct Function {
    signature: Signature,
    body: FunctionBody,
}

impl Function {
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Bind `args` against the signature, then run the body.
    pub fn invoke(&self, cpu: &mut Cpu, args: Vec<Value>) -> Result<Value> {
        let args = self.signature.bind(args)?;
        (self.body)(cpu, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("signature", &self.signature).finish_non_exhaustive()
    }
}

/// Function table, keyed by lower-case name without the trailing `()`.
///
/// Filled by registration before the scheduler is built and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    fns: HashMap<String, Function>,
}

fn key(name: &str) -> String {
    name.trim().trim_end_matches("()").to_lowercase()
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::builtins::register(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, name: &str, signature: Signature, body: F)
    where
        F: Fn(&mut Cpu, Vec<Value>) -> Result<Value> + 'static,
    {
        let name = key(name);
        if self.fns.contains_key(&name) {
            log::warn!("function {name} registered twice, keeping the latest");
        }
        self.fns.insert(
            name,
            Function {
                signature,
                body: Rc::new(body),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(&key(name))
    }

    pub fn get(&self, name: &str) -> Result<&Function> {
        let name = key(name);
        self.fns.get(&name).ok_or(KosError::UndefinedFunction(name))
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }
}
