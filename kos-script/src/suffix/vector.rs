use std::{cell::Cell, fmt, rc::Rc};

use crate::{
    calculator::Operator,
    error::Result,
    suffix::{Structure, Suffix, SuffixTable},
    value::Value,
};

type Components = Rc<Cell<(f64, f64, f64)>>;

/// Three component vector with settable components.
#[derive(Debug)]
pub struct Vector {
    xyz: Components,
    table: SuffixTable,
}

fn component<F>(xyz: &Components, read: fn((f64, f64, f64)) -> f64, write: F) -> Suffix
where
    F: Fn((f64, f64, f64), f64) -> (f64, f64, f64) + 'static,
{
    let (get, set) = (Rc::clone(xyz), Rc::clone(xyz));
    Suffix::get_set(
        move || Ok(read(get.get())),
        move |v: f64| {
            set.set(write(set.get(), v));
            Ok(())
        },
    )
}

fn magnitude((x, y, z): (f64, f64, f64)) -> f64 {
    (x * x + y * y + z * z).sqrt()
}

impl Vector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        let xyz: Components = Rc::new(Cell::new((x, y, z)));
        let vec = Rc::clone(&xyz);
        let normalized = Rc::clone(&xyz);
        let sqr = Rc::clone(&xyz);

        let table = SuffixTable::new()
            .with("X", component(&xyz, |c| c.0, |c, v| (v, c.1, c.2)))
            .with("Y", component(&xyz, |c| c.1, |c, v| (c.0, v, c.2)))
            .with("Z", component(&xyz, |c| c.2, |c, v| (c.0, c.1, v)))
            .with(
                "MAG",
                component(&xyz, magnitude, |c, v| {
                    let m = magnitude(c);
                    if m == 0.0 {
                        c
                    } else {
                        (c.0 * v / m, c.1 * v / m, c.2 * v / m)
                    }
                }),
            )
            .with("SQRMAGNITUDE", Suffix::get(move || Ok(magnitude(sqr.get()).powi(2))))
            .with("VEC", Suffix::get(move || Ok(Vector::from_tuple(vec.get()).into_value())))
            .with(
                "NORMALIZED",
                Suffix::get(move || {
                    let c = normalized.get();
                    let m = magnitude(c);
                    let n = if m == 0.0 { c } else { (c.0 / m, c.1 / m, c.2 / m) };
                    Ok(Vector::from_tuple(n).into_value())
                }),
            );

        Self { xyz, table }
    }

    fn from_tuple((x, y, z): (f64, f64, f64)) -> Self {
        Self::new(x, y, z)
    }

    pub fn components(&self) -> (f64, f64, f64) {
        self.xyz.get()
    }

    pub fn into_value(self) -> Value {
        Value::structure(self)
    }

    fn other_vector(other: &Value) -> Option<(f64, f64, f64)> {
        let s = other.as_structure()?;
        if s.type_name() != "Vector" {
            return None;
        }
        // Read back through the component suffixes; the trait object can't be downcast.
        let read = |name: &str| s.suffixes().get(name).and_then(|sx| sx.read().ok()).and_then(|v| v.as_f64());
        Some((read("X")?, read("Y")?, read("Z")?))
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, z) = self.components();
        write!(f, "V({x}, {y}, {z})")
    }
}

impl Structure for Vector {
    fn type_name(&self) -> &'static str {
        "Vector"
    }

    fn suffixes(&self) -> &SuffixTable {
        &self.table
    }

    fn try_operation(&self, op: Operator, other: &Value, reversed: bool) -> Option<Result<Value>> {
        let (x, y, z) = self.components();
        let vector = |c: (f64, f64, f64)| Some(Ok(Vector::from_tuple(c).into_value()));

        if let Some((ox, oy, oz)) = Self::other_vector(other) {
            return match op {
                Operator::Add => vector((x + ox, y + oy, z + oz)),
                Operator::Subtract if reversed => vector((ox - x, oy - y, oz - z)),
                Operator::Subtract => vector((x - ox, y - oy, z - oz)),
                Operator::Multiply => Some(Ok(Value::Double(x * ox + y * oy + z * oz))),
                Operator::Equal => Some(Ok(Value::Bool((x, y, z) == (ox, oy, oz)))),
                Operator::NotEqual => Some(Ok(Value::Bool((x, y, z) != (ox, oy, oz)))),
                _ => None,
            };
        }

        let n = other.as_f64()?;
        match op {
            Operator::Multiply => vector((x * n, y * n, z * n)),
            Operator::Divide if !reversed => vector((x / n, y / n, z / n)),
            _ => None,
        }
    }
}
