use std::{cell::RefCell, rc::Rc};

/// Where `print` and error reports go.
pub trait OutputSink {
    fn print(&mut self, line: &str);
}

/// Writes to stdout.
#[derive(Debug, Default)]
pub struct ConsoleOutput;

impl OutputSink for ConsoleOutput {
    fn print(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Collects lines in memory. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct BufferedOutput {
    lines: Rc<RefCell<Vec<String>>>,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.borrow_mut())
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|l| l.contains(needle))
    }
}

impl OutputSink for BufferedOutput {
    fn print(&mut self, line: &str) {
        log::trace!("output: {line}");
        self.lines.borrow_mut().push(line.to_string());
    }
}
