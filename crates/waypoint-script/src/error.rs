//! Script host errors.

use smol_str::SmolStr;
use thiserror::Error;
use waypoint_engine::EngineError;
use waypoint_lang::{EvalError, ParseError};

/// Errors reported while loading or running scripts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// Source has no `fn name(params):` header.
    #[error("script has no function header")]
    MissingHeader,

    /// Header line is present but malformed.
    #[error("malformed function header at line {0}")]
    MalformedHeader(u32),

    /// A body line failed to parse as a statement.
    #[error("invalid statement at line {line}: {source}")]
    Statement {
        /// Absolute line number.
        line: u32,
        /// Parse failure.
        source: ParseError,
    },

    /// A unit with this name is already loaded.
    #[error("unit '{0}' is already loaded")]
    DuplicateUnit(SmolStr),

    /// Call target is not loaded.
    #[error("no unit named '{0}'")]
    UnknownUnit(SmolStr),

    /// Call supplied the wrong number of arguments.
    #[error("'{unit}' takes {expected} arguments, got {got}")]
    ArityMismatch {
        /// Unit name.
        unit: SmolStr,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        got: usize,
    },

    /// A requested jump target is not an executable line of the unit.
    #[error("jump target line {0} is not executable")]
    JumpTarget(u32),

    /// Script statement evaluation failed.
    #[error("evaluation failed at line {line}: {source}")]
    Eval {
        /// Absolute line number.
        line: u32,
        /// Evaluation failure.
        source: EvalError,
    },

    /// Instrumentation engine failure surfaced at the call site.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
