use std::fmt::Write as _;

use crate::{
    error::{KosError, Result},
    value::Value,
};

pub const MAX_STACK_SIZE: usize = 1000;

/// Evaluation stack with a movable logical top.
///
/// `pointer` is the index of the logical top (-1 when empty). Values can sit
/// above it: `call` parks its return record there so the callee's pushes are
/// inserted underneath, and `return` moves the pointer up again to reach it.
#[derive(Debug)]
pub struct Stack {
    items: Vec<Value>,
    pointer: isize,
    limit: usize,
    safe_mode: bool,
}

/// Saved shape of the stack, used to undo a failed trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackMark {
    len: usize,
    pointer: isize,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new(MAX_STACK_SIZE, true)
    }
}

impl Stack {
    pub fn new(limit: usize, safe_mode: bool) -> Self {
        Self {
            items: Vec::with_capacity(64),
            pointer: -1,
            limit,
            safe_mode,
        }
    }

    pub fn set_safe_mode(&mut self, enabled: bool) {
        self.safe_mode = enabled;
    }

    pub fn push(&mut self, value: Value) -> Result<()> {
        let value = value.promote();
        if self.safe_mode {
            if let Value::Double(d) = value {
                if d.is_nan() {
                    return Err(KosError::NonFinitePush { kind: "NaN" });
                }
                if d.is_infinite() {
                    return Err(KosError::NonFinitePush { kind: "Infinity" });
                }
            }
        }
        if self.items.len() >= self.limit {
            return Err(KosError::StackOverflow { limit: self.limit });
        }
        let at = (self.pointer + 1) as usize;
        if at > self.items.len() {
            return Err(KosError::StackMisalignment);
        }
        self.items.insert(at, value);
        self.pointer += 1;
        Ok(())
    }

    /// Push a value just above the logical top without making it visible.
    pub fn push_above(&mut self, value: Value) -> Result<()> {
        self.push(value)?;
        self.move_pointer(-1);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value> {
        if self.pointer < 0 || self.pointer as usize >= self.items.len() {
            return Err(KosError::StackUnderflow);
        }
        let value = self.items.remove(self.pointer as usize);
        self.pointer -= 1;
        Ok(value)
    }

    pub fn peek(&self) -> Option<&Value> {
        if self.pointer < 0 {
            return None;
        }
        self.items.get(self.pointer as usize)
    }

    pub fn move_pointer(&mut self, delta: isize) {
        self.pointer += delta;
    }

    /// Pop values down to the nearest argument marker (consumed), in call order.
    pub fn pop_arguments(&mut self) -> Result<Vec<Value>> {
        let mut args = Vec::new();
        loop {
            match self.pop()? {
                Value::ArgMarker => break,
                v => args.push(v),
            }
        }
        args.reverse();
        Ok(args)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.pointer = -1;
    }

    /// Number of values below and at the logical top.
    pub fn depth(&self) -> usize {
        (self.pointer + 1).max(0) as usize
    }

    /// Total number of stored values, including parked ones.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn mark(&self) -> StackMark {
        StackMark {
            len: self.items.len(),
            pointer: self.pointer,
        }
    }

    /// Drop whatever was inserted since `mark`, keeping values parked above it.
    pub fn restore(&mut self, mark: StackMark) {
        let start = (mark.pointer + 1).max(0) as usize;
        if self.items.len() > mark.len {
            let extra = self.items.len() - mark.len;
            let end = (start + extra).min(self.items.len());
            self.items.drain(start..end);
        }
        self.pointer = mark.pointer.min(self.items.len() as isize - 1);
    }

    pub fn dump(&self, line_count: usize) -> String {
        let mut out = String::from("Stack dump:\n");
        let start = self.items.len().saturating_sub(line_count);
        for (index, item) in self.items.iter().enumerate().skip(start) {
            let _ = writeln!(out, "{index:03}    {item}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_order() {
        let mut stack = Stack::default();
        stack.push(1.into()).unwrap();
        stack.push("two".into()).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::from("two"));
        assert_eq!(stack.pop().unwrap(), Value::Int(1));
        assert!(matches!(stack.pop(), Err(KosError::StackUnderflow)));
    }

    #[test]
    fn floats_are_promoted() {
        let mut stack = Stack::default();
        stack.push(Value::Float(0.25)).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::Double(0.25));
    }

    #[test]
    fn safe_mode_rejects_non_finite_values() {
        let mut stack = Stack::default();
        let err = stack.push(f64::NAN.into()).unwrap_err();
        assert_eq!(err.to_string(), "Tried to push NaN into the stack.");
        let err = stack.push(f64::NEG_INFINITY.into()).unwrap_err();
        assert_eq!(err.to_string(), "Tried to push Infinity into the stack.");
        assert!(stack.is_empty());

        stack.set_safe_mode(false);
        stack.push(f64::NAN.into()).unwrap();
        stack.push(f64::INFINITY.into()).unwrap();
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn overflow_is_checked_before_mutation() {
        let mut stack = Stack::new(3, true);
        for i in 0..3 {
            stack.push(i.into()).unwrap();
        }
        assert!(matches!(stack.push(3.into()), Err(KosError::StackOverflow { limit: 3 })));
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.peek(), Some(&Value::Int(2)));
    }

    #[test]
    fn parked_value_stays_above_pushes() {
        let mut stack = Stack::default();
        stack.push(10.into()).unwrap();
        stack.push_above(Value::ReturnAddress(7)).unwrap();
        stack.push(20.into()).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::Int(20));
        stack.push(30.into()).unwrap();
        stack.move_pointer(1);
        assert_eq!(stack.pop().unwrap(), Value::ReturnAddress(7));
        assert_eq!(stack.pop().unwrap(), Value::Int(30));
        assert_eq!(stack.pop().unwrap(), Value::Int(10));
    }

    #[test]
    fn arguments_come_back_in_call_order() {
        let mut stack = Stack::default();
        stack.push("below".into()).unwrap();
        stack.push(Value::ArgMarker).unwrap();
        stack.push(1.into()).unwrap();
        stack.push(2.into()).unwrap();
        assert_eq!(stack.pop_arguments().unwrap(), vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(stack.pop().unwrap(), Value::from("below"));
    }

    #[test]
    fn restore_discards_inserted_values_only() {
        let mut stack = Stack::default();
        stack.push(1.into()).unwrap();
        stack.push_above(Value::ReturnAddress(3)).unwrap();
        let mark = stack.mark();
        stack.push(2.into()).unwrap();
        stack.push(3.into()).unwrap();
        stack.restore(mark);
        assert_eq!(stack.mark(), mark);
        stack.move_pointer(1);
        assert_eq!(stack.pop().unwrap(), Value::ReturnAddress(3));
    }

    #[test]
    fn dump_lists_the_tail() {
        let mut stack = Stack::default();
        for i in 0..4 {
            stack.push(i.into()).unwrap();
        }
        assert_eq!(stack.dump(2), "Stack dump:\n002    2\n003    3\n");
    }
}
