/// Everything that can go wrong while a script runs.
///
/// Messages keep the wording scripts have always seen in the terminal.
#[derive(thiserror::Error, Debug)]
pub enum KosError {
    #[error("Stack overflow!! (limit={limit})")]
    StackOverflow { limit: usize },

    #[error("stack underflow")]
    StackUnderflow,

    #[error("Tried to push {kind} into the stack.")]
    NonFinitePush { kind: &'static str },

    #[error("Can't operate types {left} and {right}")]
    UnsupportedOperands { left: String, right: String },

    #[error("Can't {verb} two {kind}")]
    InvalidOperation { verb: &'static str, kind: &'static str },

    #[error("Can't negate object {value} of type {type_name}")]
    CannotNegate { value: String, type_name: String },

    #[error("Cannot cast {from} to {to}")]
    Cast { from: String, to: String },

    #[error("Can't iterate on an object of type {0}")]
    NotIndexable(String),

    #[error("The index must be an integer number")]
    IndexNotInteger,

    #[error("Index {index} is out of range (count={count})")]
    IndexOutOfRange { index: i32, count: usize },

    #[error("Values of type {0} cannot have suffixes")]
    NotSuffixed(String),

    #[error("Suffix {suffix} not found on object")]
    SuffixNotFound { suffix: String },

    #[error("Suffix {suffix} is read-only")]
    ReadOnlySuffix { suffix: String },

    #[error("Value of type {0} is not callable")]
    NotCallable(String),

    #[error("Argument mismatch: expected {expected} argument(s), got {actual}")]
    ArgumentMismatch { expected: usize, actual: usize },

    #[error("Missing required argument {index} ({name})")]
    MissingArgument { index: usize, name: &'static str },

    #[error("Variable {0} is not defined")]
    UndefinedVariable(String),

    #[error("Variable {0} is read-only")]
    ReadOnlyVariable(String),

    #[error("Variable {0} is write-only and has not been assigned this update")]
    WriteOnlyVariable(String),

    #[error("Call to non-existent function {0}")]
    UndefinedFunction(String),

    #[error("Expected an identifier, got {0}")]
    ExpectedIdentifier(String),

    #[error("Expected a function pointer, got {0}")]
    ExpectedFunctionPointer(String),

    #[error("kOS internal error: Stack misalignment detected when returning from routine.")]
    StackMisalignment,

    #[error("instruction pointer out of range: ip={ip}, program_len={len}")]
    IpOutOfRange { ip: usize, len: usize },

    #[error("label {0} is defined more than once")]
    DuplicateLabel(String),

    #[error("unresolved destination label {0}")]
    UnresolvedLabel(String),

    #[error("no program context is active")]
    NoContext,

    /// Raised by the `error` built-in.
    #[error("{0}")]
    Script(String),

    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, KosError>;
