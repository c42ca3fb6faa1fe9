//! Named members ("suffixes") on host-facing values.
//!
//! A [`Structure`] owns a [`SuffixTable`] built once in its constructor.
//! Handlers close over the structure's shared state rather than the structure
//! itself, so tables never form reference cycles. Suffixes shared by every
//! instance of a type live in the [`SuffixRegistry`] instead.

use std::{collections::HashMap, fmt, rc::Rc};

use crate::{
    calculator::Operator,
    error::{KosError, Result},
    value::Value,
};

mod callable;
mod list;
mod vector;

pub use callable::{take, Callable, FromValue, IntoValue, Param, ParamType, Signature};
pub use list::ListValue;
pub use vector::Vector;

/// A host value scripts can reach into with `:NAME`.
pub trait Structure: fmt::Debug + fmt::Display {
    fn type_name(&self) -> &'static str;

    fn suffixes(&self) -> &SuffixTable;

    fn as_indexable(&self) -> Option<&dyn Indexable> {
        None
    }

    /// Operator protocol. `reversed` is set when this value was the right operand.
    /// `None` means the operator is not supported for `other`.
    fn try_operation(&self, _op: Operator, _other: &Value, _reversed: bool) -> Option<Result<Value>> {
        None
    }
}

/// Integer-indexed access for `getindex`/`setindex`.
pub trait Indexable {
    fn get_index(&self, index: i32) -> Result<Value>;

    fn set_index(&self, index: i32, value: Value) -> Result<()>;
}

pub type Getter = Rc<dyn Fn() -> Result<Value>>;
pub type Setter = Rc<dyn Fn(Value) -> Result<()>>;

#[derive(Clone)]
pub enum Suffix {
    Get(Getter),
    GetSet { get: Getter, set: Setter, ty: ParamType },
    Method(Callable),
}

impl Suffix {
    pub fn get<R, F>(f: F) -> Self
    where
        R: IntoValue,
        F: Fn() -> Result<R> + 'static,
    {
        Suffix::Get(Rc::new(move || f().map(IntoValue::into_value)))
    }

    pub fn get_set<R, A, G, S>(get: G, set: S) -> Self
    where
        R: IntoValue,
        A: FromValue,
        G: Fn() -> Result<R> + 'static,
        S: Fn(A) -> Result<()> + 'static,
    {
        Suffix::GetSet {
            get: Rc::new(move || get().map(IntoValue::into_value)),
            set: Rc::new(move |v| set(A::from_value(v)?)),
            ty: A::TYPE,
        }
    }

    pub fn method0<R, F>(f: F) -> Self
    where
        R: IntoValue,
        F: Fn() -> Result<R> + 'static,
    {
        Suffix::Method(Callable::new(Signature::default(), move |_| f().map(IntoValue::into_value)))
    }

    pub fn method1<A, R, F>(f: F) -> Self
    where
        A: FromValue,
        R: IntoValue,
        F: Fn(A) -> Result<R> + 'static,
    {
        Suffix::Method(Callable::new(Signature::fixed(&[A::TYPE]), move |args| {
            let mut args = args.into_iter();
            f(take(&mut args)?).map(IntoValue::into_value)
        }))
    }

    pub fn method2<A, B, R, F>(f: F) -> Self
    where
        A: FromValue,
        B: FromValue,
        R: IntoValue,
        F: Fn(A, B) -> Result<R> + 'static,
    {
        Suffix::Method(Callable::new(Signature::fixed(&[A::TYPE, B::TYPE]), move |args| {
            let mut args = args.into_iter();
            let a = take(&mut args)?;
            let b = take(&mut args)?;
            f(a, b).map(IntoValue::into_value)
        }))
    }

    pub fn method3<A, B, C, R, F>(f: F) -> Self
    where
        A: FromValue,
        B: FromValue,
        C: FromValue,
        R: IntoValue,
        F: Fn(A, B, C) -> Result<R> + 'static,
    {
        Suffix::Method(Callable::new(Signature::fixed(&[A::TYPE, B::TYPE, C::TYPE]), move |args| {
            let mut args = args.into_iter();
            let a = take(&mut args)?;
            let b = take(&mut args)?;
            let c = take(&mut args)?;
            f(a, b, c).map(IntoValue::into_value)
        }))
    }

    /// Every argument is collected into one list.
    pub fn variadic<R, F>(ty: ParamType, f: F) -> Self
    where
        R: IntoValue,
        F: Fn(Vec<Value>) -> Result<R> + 'static,
    {
        Suffix::Method(Callable::new(Signature::default().with_variadic(ty), move |args| {
            f(args).map(IntoValue::into_value)
        }))
    }

    /// Parameters may carry defaults; the handler always sees one value per parameter.
    pub fn optional<R, F>(params: Vec<Param>, f: F) -> Self
    where
        R: IntoValue,
        F: Fn(Vec<Value>) -> Result<R> + 'static,
    {
        Suffix::Method(Callable::new(Signature::new(params), move |args| f(args).map(IntoValue::into_value)))
    }

    pub fn is_read_only(&self) -> bool {
        !matches!(self, Suffix::GetSet { .. })
    }

    /// Value of a member access. Methods that need arguments come back as delegates.
    pub fn read(&self) -> Result<Value> {
        match self {
            Suffix::Get(get) | Suffix::GetSet { get, .. } => get(),
            Suffix::Method(c) if c.signature().takes_no_arguments() => c.invoke(Vec::new()),
            Suffix::Method(c) => Ok(Value::Delegate(c.clone())),
        }
    }

    pub fn write(&self, name: &str, value: Value) -> Result<()> {
        match self {
            Suffix::GetSet { set, ty, .. } => set(ty.coerce(value)?),
            _ => Err(KosError::ReadOnlySuffix {
                suffix: name.to_string(),
            }),
        }
    }

    pub fn into_callable(self) -> Callable {
        match self {
            Suffix::Method(c) => c,
            Suffix::Get(get) | Suffix::GetSet { get, .. } => Callable::new(Signature::default(), move |_| get()),
        }
    }
}

impl fmt::Debug for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suffix::Get(_) => f.write_str("Suffix::Get"),
            Suffix::GetSet { ty, .. } => write!(f, "Suffix::GetSet({})", ty.name()),
            Suffix::Method(c) => write!(f, "Suffix::Method({:?})", c.signature()),
        }
    }
}

/// Case-insensitive name to handler map, fixed once the owning structure is built.
#[derive(Clone, Debug, Default)]
pub struct SuffixTable {
    entries: HashMap<String, Suffix>,
}

impl SuffixTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, suffix: Suffix) -> Self {
        self.entries.insert(name.to_uppercase(), suffix);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Suffix> {
        self.entries.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Builds a suffix bound to a particular receiver.
pub type GlobalSuffix = Rc<dyn Fn(Rc<dyn Structure>) -> Suffix>;

/// Type name under which suffixes apply to every structure.
pub const ANY_TYPE: &str = "*";

/// Suffixes shared by all instances of a type.
#[derive(Clone, Default)]
pub struct SuffixRegistry {
    by_type: HashMap<String, HashMap<String, GlobalSuffix>>,
}

impl SuffixRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `TYPENAME` and `TOSTRING` on every structure.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ANY_TYPE, "TYPENAME", |recv| {
            Suffix::get(move || Ok(recv.type_name().to_string()))
        });
        registry.register(ANY_TYPE, "TOSTRING", |recv| Suffix::method0(move || Ok(recv.to_string())));
        registry
    }

    pub fn register<F>(&mut self, type_name: &str, suffix: &str, f: F)
    where
        F: Fn(Rc<dyn Structure>) -> Suffix + 'static,
    {
        self.by_type
            .entry(type_name.to_uppercase())
            .or_default()
            .insert(suffix.to_uppercase(), Rc::new(f));
    }

    /// Find `name` on `receiver`: its own table first, then its type's shared
    /// suffixes, then the ones every structure has.
    pub fn resolve(&self, receiver: &Rc<dyn Structure>, name: &str) -> Result<Suffix> {
        let upper = name.to_uppercase();
        if let Some(suffix) = receiver.suffixes().get(&upper) {
            return Ok(suffix.clone());
        }
        let shared = [receiver.type_name().to_uppercase(), ANY_TYPE.to_string()]
            .into_iter()
            .find_map(|ty| self.by_type.get(&ty).and_then(|t| t.get(&upper)).cloned());
        match shared {
            Some(make) => Ok(make(Rc::clone(receiver))),
            None => Err(KosError::SuffixNotFound { suffix: upper }),
        }
    }
}

impl fmt::Debug for SuffixRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (ty, entries) in &self.by_type {
            map.entry(ty, &entries.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}
