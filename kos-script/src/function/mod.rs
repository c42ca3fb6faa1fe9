pub mod builtins;
mod registry;

pub use registry::{Function, FunctionBody, FunctionRegistry};
