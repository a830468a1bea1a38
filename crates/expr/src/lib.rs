//! Compiled boolean predicates over event data
//!
//! Route filters and block conditions are small CEL-style expressions
//! (`event.Topic == 'Job' && has(event.Payload.Job)`). They are compiled once
//! at configuration load and evaluated per event against a JSON environment.
//!
//! # Design
//!
//! - Compilation produces an immutable expression tree; evaluation is a pure
//!   function of the environment, carries no state, and performs no I/O.
//! - Absent paths resolve to a `Missing` sentinel that compares non-equal to
//!   everything rather than raising.
//! - Type mismatches (ordering a string against a number, a non-boolean
//!   operand to `&&`) are evaluation errors. Callers decide what an error
//!   means: the router demotes it to "no match", the block builder to
//!   "keep the block".
//!
//! # Example
//!
//! ```
//! use nev_expr::Program;
//! use serde_json::json;
//!
//! let program = Program::compile("event.Topic == 'Node' && event.Index > 10").unwrap();
//! let env = json!({"event": {"Topic": "Node", "Index": 42}});
//! assert!(program.eval(&env).unwrap());
//! ```

mod eval;
mod parser;

use serde_json::Value;
use thiserror::Error;

use parser::Expr;

/// Errors from compiling or evaluating a predicate
#[derive(Debug, Error)]
pub enum ExprError {
    /// The source text does not parse
    #[error("parse error at offset {offset}: {message}")]
    Parse {
        /// Byte offset of the failure in the source
        offset: usize,
        /// What the parser expected or found
        message: String,
    },

    /// The expression evaluated to something other than a usable value
    #[error("evaluation error: {0}")]
    Eval(String),
}

/// A compiled predicate
///
/// Cheap to clone and safe to share across threads; a route tree holds one
/// per node for the lifetime of the tree.
#[derive(Debug, Clone)]
pub struct Program {
    source: String,
    expr: Expr,
}

impl Program {
    /// Compile a predicate from source text
    ///
    /// Blank source compiles to the constant-true program, matching the
    /// "empty filter matches everything" configuration contract.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::Parse`] when the source does not parse; this is
    /// surfaced at configuration load, never at dispatch.
    pub fn compile(source: &str) -> Result<Self, ExprError> {
        let trimmed = source.trim();
        let expr = if trimmed.is_empty() {
            Expr::Literal(Value::Bool(true))
        } else {
            parser::parse(trimmed)?
        };

        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The constant-true program
    pub fn always_true() -> Self {
        Self {
            source: String::new(),
            expr: Expr::Literal(Value::Bool(true)),
        }
    }

    /// Evaluate against an environment
    ///
    /// The environment is a JSON map whose keys are the path roots the
    /// expression may reference (`event`, `diff`).
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::Eval`] on type mismatches or a non-boolean
    /// result. Missing paths are not errors.
    pub fn eval(&self, env: &Value) -> Result<bool, ExprError> {
        eval::eval_bool(&self.expr, env)
    }

    /// The original source text
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }
}
