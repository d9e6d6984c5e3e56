//! Engine errors.
//!
//! Registration-time failures (resolution, syntax, stale fingerprints, empty
//! location sets) are detected eagerly at the user's registration call.
//! Fire-time failures (argument binding, evaluation) propagate to the
//! instrumented execution context, surfacing exactly where the instrumented
//! code would have raised.

use smol_str::SmolStr;
use thiserror::Error;
use waypoint_lang::{EvalError, ParseError};

/// Errors reported by the instrumentation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// No executable line matched the location specifier.
    #[error("no executable line in '{unit}' matches {spec}")]
    NoMatch {
        /// Unit name.
        unit: SmolStr,
        /// Human-readable rendering of the failed specifier.
        spec: String,
    },

    /// A symbolic identifier (`<start>`/`<return>`) used where a concrete
    /// location is required.
    #[error("symbolic identifier is not a location")]
    SymbolicLocation,

    /// A line trigger constructed with an explicit but empty location set.
    #[error("trigger has no resolved locations")]
    EmptyLocations,

    /// A goto destination resolved to more than one line.
    #[error("goto destination is ambiguous ({matches} lines match)")]
    AmbiguousGoto {
        /// Number of matching lines.
        matches: usize,
    },

    /// Recorded source fingerprint no longer matches the unit's source.
    #[error("source of '{unit}' changed (expected {expected}, found {actual})")]
    StaleSource {
        /// Unit name.
        unit: SmolStr,
        /// Fingerprint supplied at registration.
        expected: String,
        /// Fingerprint of the current source.
        actual: String,
    },

    /// Fingerprint or text matching requested against a unit without source.
    #[error("unit '{0}' has no source text")]
    NoSource(SmolStr),

    /// Malformed condition string, rejected at registration.
    #[error("invalid condition: {0}")]
    ConditionSyntax(ParseError),

    /// Malformed callback string, rejected at registration.
    #[error("invalid callback: {0}")]
    CallbackSyntax(ParseError),

    /// A condition evaluated to something other than a boolean.
    #[error("condition did not evaluate to a boolean")]
    ConditionNotBool,

    /// Condition evaluation failed (other than an undefined name, which is
    /// treated as "does not fire").
    #[error("condition evaluation failed: {0}")]
    Condition(EvalError),

    /// Injected statement execution failed in the live scope.
    #[error("callback execution failed: {0}")]
    Callback(EvalError),

    /// A callback parameter names a variable absent from the live scope.
    #[error("argument '{0}' not found in frame locals")]
    UnboundArgument(SmolStr),

    /// `_retval` used on a trigger that is not a return trigger.
    #[error("'_retval' is only available in return callbacks")]
    RetvalOutsideReturn,

    /// `_frame` declared more than once in a callback parameter list.
    #[error("'_frame' may appear at most once in a parameter list")]
    DuplicateFrameArgument,

    /// Enable or disable attempted on a removed handler.
    #[error("cannot enable a removed handler")]
    HandlerRemoved,
}
