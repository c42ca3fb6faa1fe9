//! kos-script
//!
//! Runtime for the kOS scripting language: a stack based bytecode VM, the
//! scheduler that drives program contexts, triggers and waits once per host
//! tick, and the suffix model through which scripts reach host objects.
//!
//! Compiling source text is out of scope; code arrives as [`CodePart`]s.

pub mod binding;
pub mod calculator;
pub mod config;
pub mod error;
pub mod function;
pub mod output;
pub mod persist;
pub mod suffix;
pub mod value;
pub mod variable;
pub mod vm;

pub use binding::{Binding, BindingManager, ClosureBinding, FlightControlBinding};
pub use calculator::{calculate, Calculator, Operator};
pub use config::{CpuConfig, LoggerConfig};
pub use error::{KosError, Result};
pub use function::FunctionRegistry;
pub use output::{BufferedOutput, ConsoleOutput, OutputSink};
pub use suffix::{ListValue, Structure, Suffix, SuffixRegistry, SuffixTable, Vector};
pub use value::Value;
pub use variable::VariableTable;
pub use vm::{CodePart, Cpu, CpuBuilder, CpuStatus, Op, Opcode, ProgramContext};
