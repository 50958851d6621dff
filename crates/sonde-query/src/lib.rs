//! A small jq-flavoured filter language over [`serde_json::Value`].
//!
//! A filter is compiled from its source text and run against one input value;
//! running yields a *stream* of zero or more output values. The stream ends in
//! one of three ways: normally, via the `halt` built-in (outputs emitted
//! before the halt are kept), or with a runtime fault.
//!
//! Syntax errors are reported at [`compile`] time. Unknown function names are
//! deliberately *not*: a bare identifier parses as a zero-argument call and
//! only fails when run, which lets callers substitute the query text itself
//! as a constant when evaluation fails.
//!
//! ```
//! use tokio_util::sync::CancellationToken;
//!
//! let filter = sonde_query::compile(".peers[] | @.rx").unwrap();
//! let input = serde_json::json!({"peers": [{"rx": 10}, {"rx": 0}]});
//! let outcome = filter.run(&input, &CancellationToken::new());
//! assert_eq!(outcome.outputs, vec![serde_json::json!(10), serde_json::json!(0)]);
//! ```

mod error;
pub use error::{EvalError, ParseError};

mod lexer;

mod parser;

mod eval;
pub use eval::{End, Filter, Outcome};

/// Compile filter source text into a runnable [`Filter`].
pub fn compile(src: &str) -> Result<Filter, ParseError> {
    parser::parse(src).map(Filter::new)
}
