//! Expression and statement language for injected debugging behavior.
//!
//! This crate is the textual half of the waypoint instrumentation engine:
//! trigger conditions (`"x == 0"`) and injected callbacks (`"x = 1"`,
//! `"total += 1; hits = hits + 1"`) are parsed eagerly at registration and
//! evaluated later against the live locals of a suspended frame through the
//! [`Scope`] trait.
//!
//! The language is deliberately tiny: literals, names, arithmetic,
//! comparisons, short-circuit boolean operators, assignment (plain and
//! augmented), `return`, and `pass`. There are no calls, no control flow and
//! no declarations; injected behavior that needs more uses a native function
//! callback instead.

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod value;

pub use ast::{AssignOp, Expr, Stmt};
pub use error::{EvalError, ParseError};
pub use eval::{eval_expr, exec_stmt, Scope, StmtEffect};
pub use ops::{BinaryOp, UnaryOp};
pub use parser::{parse_expr, parse_stmts};
pub use value::Value;
