//! Parse and evaluation errors.

use smol_str::SmolStr;
use thiserror::Error;

/// Syntax errors reported while parsing an expression or statement string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Empty input where an expression or statement was required.
    #[error("empty input")]
    EmptyInput,

    /// Unexpected token in the input.
    #[error("unexpected token '{found}' at offset {offset}")]
    UnexpectedToken {
        /// Token text as it appears in the source.
        found: SmolStr,
        /// Byte offset of the token.
        offset: usize,
    },

    /// Input ended in the middle of an expression or statement.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Numeric literal that does not fit the value model.
    #[error("invalid numeric literal '{0}'")]
    InvalidNumber(SmolStr),

    /// String literal without a closing quote.
    #[error("unterminated string literal")]
    UnterminatedString,
}

/// Runtime errors reported while evaluating against a live scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Name not bound in the current scope.
    ///
    /// Trigger conditions treat exactly this variant as "does not fire";
    /// every other variant propagates.
    #[error("undefined variable '{0}'")]
    UndefinedVariable(SmolStr),

    /// Operand types not supported by the operator.
    #[error("type mismatch")]
    TypeMismatch,

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Modulo by zero.
    #[error("modulo by zero")]
    ModuloByZero,
}
