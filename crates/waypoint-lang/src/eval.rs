//! Evaluation of expressions and statements against a live scope.

use crate::ast::{Expr, Stmt};
use crate::error::EvalError;
use crate::ops::{apply_binary, apply_unary, BinaryOp};
use crate::value::Value;

/// Read/write view into a set of live variable bindings.
///
/// Injected statements write through this trait into the actual bindings of
/// the running frame; implementations must not hand out a snapshot copy.
pub trait Scope {
    /// Read a variable by name.
    fn get(&self, name: &str) -> Option<Value>;

    /// Write a variable by name, creating or rebinding it.
    fn set(&mut self, name: &str, value: Value);

    /// Whether a variable is currently bound.
    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Effect of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtEffect {
    /// Execution continues normally.
    None,
    /// A `return` statement produced a value (`Null` for a bare `return`).
    Return(Value),
}

/// Evaluate an expression to a value.
pub fn eval_expr<S: Scope + ?Sized>(scope: &S, expr: &Expr) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => scope
            .get(name)
            .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
        Expr::Unary { op, expr } => {
            let value = eval_expr(scope, expr)?;
            apply_unary(*op, value)
        }
        Expr::Binary { op, left, right } => {
            if *op == BinaryOp::And {
                let left_value = eval_expr(scope, left)?;
                if matches!(left_value, Value::Bool(false)) {
                    return Ok(Value::Bool(false));
                }
                let right_value = eval_expr(scope, right)?;
                return apply_binary(*op, left_value, right_value);
            }
            if *op == BinaryOp::Or {
                let left_value = eval_expr(scope, left)?;
                if matches!(left_value, Value::Bool(true)) {
                    return Ok(Value::Bool(true));
                }
                let right_value = eval_expr(scope, right)?;
                return apply_binary(*op, left_value, right_value);
            }
            let left_value = eval_expr(scope, left)?;
            let right_value = eval_expr(scope, right)?;
            apply_binary(*op, left_value, right_value)
        }
    }
}

/// Execute a statement against a scope.
pub fn exec_stmt<S: Scope + ?Sized>(scope: &mut S, stmt: &Stmt) -> Result<StmtEffect, EvalError> {
    match stmt {
        Stmt::Assign { target, op, value } => {
            let value = eval_expr(scope, value)?;
            let value = match op.binary_op() {
                None => value,
                Some(binary) => {
                    let current = scope
                        .get(target)
                        .ok_or_else(|| EvalError::UndefinedVariable(target.clone()))?;
                    apply_binary(binary, current, value)?
                }
            };
            scope.set(target, value);
            Ok(StmtEffect::None)
        }
        Stmt::Expr(expr) => {
            let _ = eval_expr(scope, expr)?;
            Ok(StmtEffect::None)
        }
        Stmt::Return(expr) => {
            let value = match expr {
                Some(expr) => eval_expr(scope, expr)?,
                None => Value::Null,
            };
            Ok(StmtEffect::Return(value))
        }
        Stmt::Pass => Ok(StmtEffect::None),
    }
}
