use thiserror::Error;

/// Syntax error raised while compiling filter source text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid escape sequence \\{0}")]
    InvalidEscape(char),

    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),

    #[error("unexpected token {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of query")]
    UnexpectedEof,
}

/// Runtime fault raised while running a compiled filter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A function name/arity pair the evaluator does not know.
    ///
    /// Bare identifiers parse as zero-argument calls, so this is the fault a
    /// plain word like `rx_bytes` produces when run as a query.
    #[error("function {name}/{arity} is not defined")]
    Undefined { name: String, arity: usize },

    #[error("cannot {op} {got}")]
    TypeMismatch { op: &'static str, got: &'static str },

    #[error("division by zero")]
    DivideByZero,

    /// Raised by the `error(..)` built-in.
    #[error("{0}")]
    Raised(String),

    /// The caller's cancellation token fired mid-evaluation.
    #[error("evaluation cancelled")]
    Cancelled,
}
