//! Operator implementations.

use crate::error::EvalError;
use crate::value::Value;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Boolean negation.
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Apply a unary operator to a value.
pub fn apply_unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Neg => match value {
            Value::Int(v) => Ok(Value::Int(-v)),
            Value::Float(v) => Ok(Value::Float(-v)),
            _ => Err(EvalError::TypeMismatch),
        },
        UnaryOp::Not => match value {
            Value::Bool(v) => Ok(Value::Bool(!v)),
            _ => Err(EvalError::TypeMismatch),
        },
    }
}

/// Apply a binary operator to two values.
///
/// Mixed int/float arithmetic promotes to float. `And`/`Or` are evaluated
/// non-short-circuit here; the evaluator short-circuits before calling in.
pub fn apply_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::And | BinaryOp::Or => logical(op, left, right),
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arith(op, left, right)
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, left, right),
    }
}

fn logical(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => {
            let result = match op {
                BinaryOp::And => a && b,
                BinaryOp::Or => a || b,
                _ => return Err(EvalError::TypeMismatch),
            };
            Ok(Value::Bool(result))
        }
        _ => Err(EvalError::TypeMismatch),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        _ => left == right,
    }
}

fn arith(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_arith(op, a, b),
        (Value::Float(a), Value::Float(b)) => float_arith(op, a, b),
        (Value::Int(a), Value::Float(b)) => float_arith(op, a as f64, b),
        (Value::Float(a), Value::Int(b)) => float_arith(op, a, b as f64),
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => {
            Ok(Value::Str(smol_str::SmolStr::new(format!("{a}{b}"))))
        }
        _ => Err(EvalError::TypeMismatch),
    }
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(EvalError::ModuloByZero);
            }
            a.wrapping_rem(b)
        }
        _ => return Err(EvalError::TypeMismatch),
    };
    Ok(Value::Int(result))
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(EvalError::ModuloByZero);
            }
            a % b
        }
        _ => return Err(EvalError::TypeMismatch),
    };
    Ok(Value::Float(result))
}

fn compare(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    let ordering = match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => return Err(EvalError::TypeMismatch),
    };
    let Some(ordering) = ordering else {
        // NaN comparisons are never true.
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => return Err(EvalError::TypeMismatch),
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        let result = apply_binary(BinaryOp::Add, Value::Int(1), Value::Float(0.5)).unwrap();
        assert_eq!(result, Value::Float(1.5));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let err = apply_binary(BinaryOp::Div, Value::Int(1), Value::Int(0)).unwrap_err();
        assert_eq!(err, EvalError::DivisionByZero);
    }

    #[test]
    fn logical_ops_require_booleans() {
        let err = apply_binary(BinaryOp::And, Value::Int(1), Value::Bool(true)).unwrap_err();
        assert_eq!(err, EvalError::TypeMismatch);
    }

    #[test]
    fn string_concatenation() {
        let result = apply_binary(BinaryOp::Add, Value::from("a"), Value::from("b")).unwrap();
        assert_eq!(result, Value::from("ab"));
    }
}
