use std::{collections::HashMap, fmt, rc::Rc};

use crate::{
    error::{KosError, Result},
    value::Value,
};

pub type BoundGetter = Rc<dyn Fn() -> anyhow::Result<Value>>;
pub type BoundSetter = Rc<dyn Fn(Value) -> anyhow::Result<()>>;

/// A variable backed by host callbacks.
///
/// The value is cached for one tick: the first read calls the getter, writes
/// are held until [`VariableTable::flush`] hands them to the setter.
#[derive(Clone)]
pub struct BoundVariable {
    get: Option<BoundGetter>,
    set: Option<BoundSetter>,
    cache: Option<Value>,
    dirty: bool,
}

impl BoundVariable {
    pub fn new(get: Option<BoundGetter>, set: Option<BoundSetter>) -> Self {
        Self {
            get,
            set,
            cache: None,
            dirty: false,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.set.is_none()
    }
}

impl fmt::Debug for BoundVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundVariable")
            .field("readable", &self.get.is_some())
            .field("writable", &self.set.is_some())
            .field("cache", &self.cache)
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub enum Variable {
    Plain(Value),
    Bound(BoundVariable),
}

/// Names are case-insensitive and may be written with a leading `$`.
pub fn normalize(name: &str) -> String {
    name.trim_start_matches('$').to_lowercase()
}

/// Pointer variables hold the entry point of a lock's trigger.
pub fn is_pointer(name: &str) -> bool {
    name.contains('*')
}

#[derive(Clone, Debug, Default)]
pub struct VariableTable {
    vars: HashMap<String, Variable>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(&normalize(name))
    }

    pub fn is_bound(&self, name: &str) -> bool {
        matches!(self.vars.get(&normalize(name)), Some(Variable::Bound(_)))
    }

    pub fn get(&mut self, name: &str) -> Result<Value> {
        let key = normalize(name);
        match self.vars.get_mut(&key) {
            None => Err(KosError::UndefinedVariable(key)),
            Some(Variable::Plain(v)) => Ok(v.clone()),
            Some(Variable::Bound(b)) => {
                if let Some(v) = &b.cache {
                    return Ok(v.clone());
                }
                let getter = b.get.as_ref().ok_or_else(|| KosError::WriteOnlyVariable(key.clone()))?;
                let v = getter()?;
                b.cache = Some(v.clone());
                Ok(v)
            }
        }
    }

    /// Assign, creating a plain variable when the name is unknown.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let key = normalize(name);
        match self.vars.get_mut(&key) {
            Some(Variable::Bound(b)) => {
                if b.is_read_only() {
                    return Err(KosError::ReadOnlyVariable(key));
                }
                b.cache = Some(value);
                b.dirty = true;
            }
            Some(Variable::Plain(v)) => *v = value,
            None => {
                self.vars.insert(key, Variable::Plain(value));
            }
        }
        Ok(())
    }

    pub fn bind(&mut self, name: &str, get: Option<BoundGetter>, set: Option<BoundSetter>) {
        self.vars.insert(normalize(name), Variable::Bound(BoundVariable::new(get, set)));
    }

    /// Bound variables are never removed this way.
    pub fn remove(&mut self, name: &str) -> bool {
        let key = normalize(name);
        match self.vars.get(&key) {
            Some(Variable::Plain(_)) => self.vars.remove(&key).is_some(),
            _ => false,
        }
    }

    pub fn remove_all_plain(&mut self) {
        self.vars.retain(|_, v| matches!(v, Variable::Bound(_)));
    }

    /// Remove bound variables too. Used on reboot.
    pub fn clear(&mut self) {
        self.vars.clear();
    }

    /// Forget cached bound values so the next read asks the host again.
    pub fn refresh_bound(&mut self) {
        for var in self.vars.values_mut() {
            if let Variable::Bound(b) = var {
                if !b.dirty {
                    b.cache = None;
                }
            }
        }
    }

    /// Hand every written bound value to its setter.
    ///
    /// All dirty values are flushed; the first failure is returned.
    pub fn flush(&mut self) -> Result<()> {
        let mut first_err = None;
        for (name, var) in self.vars.iter_mut() {
            let Variable::Bound(b) = var else { continue };
            if !b.dirty {
                continue;
            }
            b.dirty = false;
            let (Some(set), Some(value)) = (&b.set, b.cache.take()) else {
                continue;
            };
            if let Err(e) = set(value) {
                log::error!("flushing bound variable {name}: {e:#}");
                first_err.get_or_insert(KosError::Host(e));
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Pointer variables currently defined, with their values.
    pub fn pointers(&self) -> Vec<(String, Value)> {
        self.vars
            .iter()
            .filter(|(name, _)| is_pointer(name))
            .filter_map(|(name, var)| match var {
                Variable::Plain(v) => Some((name.clone(), v.clone())),
                Variable::Bound(_) => None,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
