pub mod context;
pub mod cpu;
pub mod opcode;
pub mod program;
pub mod stack;

pub use context::ProgramContext;
pub use cpu::{Cpu, CpuBuilder, CpuStatus, Statistics};
pub use opcode::{ExecOutcome, Mnemonic, Op, Opcode, SourceLocation};
pub use program::{CodePart, ProgramBuilder};
pub use stack::{Stack, StackMark, MAX_STACK_SIZE};
