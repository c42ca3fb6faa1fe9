use std::{cell::RefCell, fmt, rc::Rc};

use itertools::Itertools;

use crate::{
    error::{KosError, Result},
    suffix::{Indexable, Param, ParamType, Structure, Suffix, SuffixTable},
    value::Value,
};

type Items = Rc<RefCell<Vec<Value>>>;

/// Mutable, shared list of values. Copies share nothing; clones of the
/// structure handle share everything.
#[derive(Debug)]
pub struct ListValue {
    items: Items,
    table: SuffixTable,
}

fn checked(index: i32, count: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < count)
        .ok_or(KosError::IndexOutOfRange { index, count })
}

impl ListValue {
    pub fn new(items: Vec<Value>) -> Self {
        let items: Items = Rc::new(RefCell::new(items));

        let length = Rc::clone(&items);
        let empty = Rc::clone(&items);
        let add = Rc::clone(&items);
        let insert = Rc::clone(&items);
        let remove = Rc::clone(&items);
        let clear = Rc::clone(&items);
        let contains = Rc::clone(&items);
        let copy = Rc::clone(&items);
        let sublist = Rc::clone(&items);
        let join = Rc::clone(&items);

        let table = SuffixTable::new()
            .with("LENGTH", Suffix::get(move || Ok(length.borrow().len() as i32)))
            .with("EMPTY", Suffix::get(move || Ok(empty.borrow().is_empty())))
            .with(
                "ADD",
                Suffix::method1(move |item: Value| {
                    add.borrow_mut().push(item);
                    Ok(())
                }),
            )
            .with(
                "INSERT",
                Suffix::method2(move |index: i32, item: Value| {
                    let mut items = insert.borrow_mut();
                    // Inserting at the end is allowed.
                    let at = checked(index, items.len() + 1)?;
                    items.insert(at, item);
                    Ok(())
                }),
            )
            .with(
                "REMOVE",
                Suffix::method1(move |index: i32| {
                    let mut items = remove.borrow_mut();
                    let at = checked(index, items.len())?;
                    items.remove(at);
                    Ok(())
                }),
            )
            .with(
                "CLEAR",
                Suffix::method0(move || {
                    clear.borrow_mut().clear();
                    Ok(())
                }),
            )
            .with(
                "CONTAINS",
                Suffix::method1(move |item: Value| Ok(contains.borrow().contains(&item))),
            )
            .with(
                "COPY",
                Suffix::get(move || {
                    let items = copy.borrow().clone();
                    Ok(Value::structure(ListValue::new(items)))
                }),
            )
            .with(
                "SUBLIST",
                Suffix::method2(move |start: i32, count: i32| {
                    let items = sublist.borrow();
                    let from = checked(start, items.len() + 1)?;
                    let len = usize::try_from(count).map_err(|_| KosError::IndexOutOfRange {
                        index: count,
                        count: items.len(),
                    })?;
                    let to = (from + len).min(items.len());
                    Ok(Value::structure(ListValue::new(items[from..to].to_vec())))
                }),
            )
            .with(
                "JOIN",
                Suffix::optional(vec![Param::optional("separator", ParamType::String, ",")], move |args| {
                    let separator = args.first().map(Value::to_string).unwrap_or_default();
                    Ok(join.borrow().iter().join(&separator))
                }),
            );

        Self { items, table }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }
}

impl fmt::Display for ListValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LIST({})", self.len())
    }
}

impl Structure for ListValue {
    fn type_name(&self) -> &'static str {
        "List"
    }

    fn suffixes(&self) -> &SuffixTable {
        &self.table
    }

    fn as_indexable(&self) -> Option<&dyn Indexable> {
        Some(self)
    }
}

impl Indexable for ListValue {
    fn get_index(&self, index: i32) -> Result<Value> {
        let items = self.items.borrow();
        let at = checked(index, items.len())?;
        Ok(items[at].clone())
    }

    fn set_index(&self, index: i32, value: Value) -> Result<()> {
        let mut items = self.items.borrow_mut();
        let at = checked(index, items.len())?;
        items[at] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::suffix::SuffixRegistry;

    fn call(list: &Rc<dyn Structure>, name: &str, args: Vec<Value>) -> Result<Value> {
        SuffixRegistry::new().resolve(list, name)?.into_callable().invoke(args)
    }

    #[test]
    fn add_insert_remove() {
        let list: Rc<dyn Structure> = Rc::new(ListValue::new(vec![]));
        call(&list, "add", vec![1.into()]).unwrap();
        call(&list, "add", vec![3.into()]).unwrap();
        call(&list, "insert", vec![1.into(), 2.into()]).unwrap();
        assert_eq!(call(&list, "length", vec![]).unwrap(), Value::Int(3));
        assert_eq!(call(&list, "join", vec![]).unwrap(), Value::from("1,2,3"));
        call(&list, "remove", vec![0.into()]).unwrap();
        assert_eq!(call(&list, "join", vec![" ".into()]).unwrap(), Value::from("2 3"));
        assert_eq!(list.to_string(), "LIST(2)");
    }

    #[test]
    fn indexing_is_bounds_checked() {
        let list = ListValue::new(vec!["a".into(), "b".into()]);
        assert_eq!(list.get_index(1).unwrap(), Value::from("b"));
        list.set_index(0, "z".into()).unwrap();
        assert_eq!(list.get_index(0).unwrap(), Value::from("z"));
        let err = list.get_index(2).unwrap_err();
        assert_eq!(err.to_string(), "Index 2 is out of range (count=2)");
        assert!(list.get_index(-1).is_err());
    }

    #[test]
    fn copy_is_independent() {
        let list: Rc<dyn Structure> = Rc::new(ListValue::new(vec![1.into()]));
        let Value::Structure(copy) = call(&list, "copy", vec![]).unwrap() else {
            panic!("expected a list");
        };
        call(&copy, "add", vec![2.into()]).unwrap();
        assert_eq!(list.to_string(), "LIST(1)");
        assert_eq!(copy.to_string(), "LIST(2)");
    }

    #[test]
    fn sublist_and_contains() {
        let list: Rc<dyn Structure> = Rc::new(ListValue::new((0..5).map(Value::Int).collect()));
        let Value::Structure(sub) = call(&list, "sublist", vec![1.into(), 2.into()]).unwrap() else {
            panic!("expected a list");
        };
        assert_eq!(call(&sub, "join", vec![";".into()]).unwrap(), Value::from("1;2"));
        assert_eq!(call(&list, "contains", vec![4.into()]).unwrap(), Value::Bool(true));
        assert_eq!(call(&list, "contains", vec![9.into()]).unwrap(), Value::Bool(false));
    }
}
