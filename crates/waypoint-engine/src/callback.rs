//! Injected behavior and argument binding.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;
use waypoint_lang::{exec_stmt, parse_stmts, EvalError, Stmt, Value};

use crate::error::EngineError;
use crate::instrument::Frame;
use crate::trigger::EventKind;

/// Reserved parameter name bound to the live execution frame.
pub const FRAME_PARAM: &str = "_frame";
/// Reserved parameter name bound to the pending return value.
pub const RETVAL_PARAM: &str = "_retval";

/// An argument resolved for one declared callback parameter.
pub enum BoundArg<'a> {
    /// The live frame, bound to the `_frame` parameter.
    Frame(&'a mut dyn Frame),
    /// A plain value: `_retval` or a local looked up by name.
    Value(Value),
}

impl BoundArg<'_> {
    /// The value payload, if this argument is not the frame.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            BoundArg::Value(value) => Some(value),
            BoundArg::Frame(_) => None,
        }
    }

    /// The frame payload, if this argument is the frame.
    pub fn frame(&mut self) -> Option<&mut dyn Frame> {
        match self {
            BoundArg::Frame(frame) => Some(&mut **frame),
            BoundArg::Value(_) => None,
        }
    }
}

impl fmt::Debug for BoundArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundArg::Frame(_) => f.write_str("Frame"),
            BoundArg::Value(value) => write!(f, "Value({value:?})"),
        }
    }
}

/// Native callback function.
///
/// Conditions reuse the same shape: a condition returns `Some(Value::Bool)`,
/// a plain callback returns `None`.
pub type CallbackFn =
    Arc<dyn Fn(&mut [BoundArg<'_>]) -> Result<Option<Value>, EngineError> + Send + Sync>;

/// A native function callback with an explicit ordered parameter-name list.
///
/// Argument binding happens by name at fire time: reserved names first
/// (`_frame`, `_retval`), then lookup among the live locals of the frame.
/// An absent local is a binding error that propagates to the instrumented
/// call site.
#[derive(Clone)]
pub struct FuncCallback {
    params: Vec<SmolStr>,
    bound: usize,
    func: CallbackFn,
}

impl FuncCallback {
    /// Create a callback with its declared parameter names.
    pub fn new<I, S, F>(params: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
        F: Fn(&mut [BoundArg<'_>]) -> Result<Option<Value>, EngineError> + Send + Sync + 'static,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            bound: 0,
            func: Arc::new(func),
        }
    }

    /// Mark the first `bound` declared parameters as already applied.
    ///
    /// Pre-bound leading parameters (a method receiver) are excluded from the
    /// binding search; only the remaining free parameters participate.
    #[must_use]
    pub fn with_bound(mut self, bound: usize) -> Self {
        self.bound = bound.min(self.params.len());
        self
    }

    /// Declared parameter names, including pre-bound ones.
    #[must_use]
    pub fn params(&self) -> &[SmolStr] {
        &self.params
    }

    /// Bind arguments from the frame and invoke the function.
    pub(crate) fn invoke(
        &self,
        frame: &mut dyn Frame,
        kind: EventKind,
        retval: Option<&Value>,
    ) -> Result<Option<Value>, EngineError> {
        let free = &self.params[self.bound..];
        let mut args: Vec<BoundArg<'_>> = Vec::with_capacity(free.len());
        let mut frame_slot = None;
        for name in free {
            match name.as_str() {
                FRAME_PARAM => {
                    if frame_slot.is_some() {
                        return Err(EngineError::DuplicateFrameArgument);
                    }
                    frame_slot = Some(args.len());
                    args.push(BoundArg::Value(Value::Null));
                }
                RETVAL_PARAM => {
                    if kind != EventKind::Return {
                        return Err(EngineError::RetvalOutsideReturn);
                    }
                    let value = retval.cloned().unwrap_or(Value::Null);
                    args.push(BoundArg::Value(value));
                }
                _ => {
                    let value = frame
                        .get(name)
                        .ok_or_else(|| EngineError::UnboundArgument(name.clone()))?;
                    args.push(BoundArg::Value(value));
                }
            }
        }
        if let Some(slot) = frame_slot {
            args[slot] = BoundArg::Frame(frame);
        }
        (self.func)(&mut args)
    }
}

impl fmt::Debug for FuncCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncCallback")
            .field("params", &self.params)
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}

/// The injected behavior attached to a trigger.
#[derive(Debug, Clone)]
pub enum Callback {
    /// Statements executed in the live scope of the frame.
    Statement(Vec<Stmt>),
    /// Native function invoked with by-name argument binding.
    Func(FuncCallback),
    /// Unconditional control transfer to a resolved line.
    Goto(u32),
}

impl Callback {
    /// Parse a code string into a statement callback, eagerly.
    pub fn statement(code: &str) -> Result<Self, EngineError> {
        parse_stmts(code)
            .map(Callback::Statement)
            .map_err(EngineError::CallbackSyntax)
    }

    /// Invoke the callback against a live frame.
    ///
    /// `retval` carries the pending return value for `return` events.
    pub fn invoke(
        &self,
        frame: &mut dyn Frame,
        kind: EventKind,
        retval: Option<&Value>,
    ) -> Result<(), EngineError> {
        match self {
            Callback::Statement(stmts) => {
                for stmt in stmts {
                    // Injected code runs for effect; a stray `return` inside
                    // it has nothing to return from and is ignored.
                    exec_stmt(frame, stmt).map_err(eval_to_callback_error)?;
                }
                Ok(())
            }
            Callback::Func(func) => {
                func.invoke(frame, kind, retval)?;
                Ok(())
            }
            Callback::Goto(line) => {
                frame.request_jump(*line);
                Ok(())
            }
        }
    }
}

fn eval_to_callback_error(err: EvalError) -> EngineError {
    match err {
        EvalError::UndefinedVariable(name) => EngineError::UnboundArgument(name),
        other => EngineError::Callback(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestFrame;
    use waypoint_lang::Scope;

    #[test]
    fn statement_callback_rewrites_live_locals() {
        let mut frame = TestFrame::at(3, &[("x", Value::Int(2))]);
        let callback = Callback::statement("x = 1").unwrap();
        callback.invoke(&mut frame, EventKind::Line, None).unwrap();
        assert_eq!(frame.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn statement_syntax_is_checked_eagerly() {
        let err = Callback::statement("x ==").unwrap_err();
        assert!(matches!(err, EngineError::CallbackSyntax(_)));
    }

    #[test]
    fn func_callback_binds_locals_by_name() {
        let mut frame = TestFrame::at(3, &[("x", Value::Int(5)), ("y", Value::Int(7))]);
        let callback = FuncCallback::new(["y", "x"], |args| {
            assert_eq!(args[0].value(), Some(&Value::Int(7)));
            assert_eq!(args[1].value(), Some(&Value::Int(5)));
            Ok(None)
        });
        Callback::Func(callback)
            .invoke(&mut frame, EventKind::Line, None)
            .unwrap();
    }

    #[test]
    fn missing_local_is_a_binding_error() {
        let mut frame = TestFrame::at(3, &[]);
        let callback = Callback::Func(FuncCallback::new(["missing"], |_| Ok(None)));
        let err = callback
            .invoke(&mut frame, EventKind::Line, None)
            .unwrap_err();
        assert_eq!(err, EngineError::UnboundArgument("missing".into()));
    }

    #[test]
    fn frame_param_receives_the_live_frame() {
        let mut frame = TestFrame::at(9, &[("x", Value::Int(1))]);
        let callback = FuncCallback::new(["_frame", "x"], |args| {
            assert_eq!(args[1].value(), Some(&Value::Int(1)));
            let frame = args[0].frame().unwrap();
            assert_eq!(frame.line(), 9);
            frame.set("x", Value::Int(2));
            Ok(None)
        });
        Callback::Func(callback)
            .invoke(&mut frame, EventKind::Line, None)
            .unwrap();
        assert_eq!(frame.get("x"), Some(Value::Int(2)));
    }

    #[test]
    fn retval_param_requires_a_return_event() {
        let mut frame = TestFrame::at(3, &[]);
        let callback = Callback::Func(FuncCallback::new(["_retval"], |_| Ok(None)));
        let err = callback
            .invoke(&mut frame, EventKind::Line, None)
            .unwrap_err();
        assert_eq!(err, EngineError::RetvalOutsideReturn);

        let seen = std::sync::Arc::new(std::sync::Mutex::new(None));
        let seen_inner = std::sync::Arc::clone(&seen);
        let callback = Callback::Func(FuncCallback::new(["_retval"], move |args| {
            *seen_inner.lock().unwrap() = args[0].value().cloned();
            Ok(None)
        }));
        callback
            .invoke(&mut frame, EventKind::Return, Some(&Value::Int(42)))
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(Value::Int(42)));
    }

    #[test]
    fn bound_receiver_is_excluded_from_binding() {
        // `self` is pre-applied; only `x` participates in the lookup.
        let mut frame = TestFrame::at(3, &[("x", Value::Int(3))]);
        let callback = FuncCallback::new(["self", "x"], |args| {
            assert_eq!(args.len(), 1);
            assert_eq!(args[0].value(), Some(&Value::Int(3)));
            Ok(None)
        })
        .with_bound(1);
        Callback::Func(callback)
            .invoke(&mut frame, EventKind::Line, None)
            .unwrap();
    }

    #[test]
    fn goto_requests_a_jump() {
        let mut frame = TestFrame::at(3, &[]);
        Callback::Goto(14)
            .invoke(&mut frame, EventKind::Line, None)
            .unwrap();
        assert_eq!(frame.jump_requested(), Some(14));
    }
}
