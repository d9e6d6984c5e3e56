//! Script execution with instrumentation delivery.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::{debug, trace};
use waypoint_engine::{
    Backend, EventKind, ExecutableUnit, Frame, HookToken, Instrumenter, Scope, UnitId, Value, When,
};
use waypoint_lang::{exec_stmt, Stmt, StmtEffect};

use crate::error::ScriptError;
use crate::unit::ScriptUnit;

struct Hook {
    token: HookToken,
    unit: UnitId,
    kind: EventKind,
    lines: Option<Vec<u32>>,
}

/// Backend bookkeeping: which events the instrumenter asked to see.
#[derive(Default)]
struct HookTable {
    next_token: u64,
    hooks: Vec<Hook>,
}

impl HookTable {
    fn wants(&self, unit: UnitId, kind: EventKind) -> bool {
        self.hooks.iter().any(|h| h.unit == unit && h.kind == kind)
    }

    fn wants_line(&self, unit: UnitId, line: u32) -> bool {
        self.hooks
            .iter()
            .filter(|h| h.unit == unit && h.kind == EventKind::Line)
            .any(|h| match &h.lines {
                None => true,
                Some(lines) => lines.binary_search(&line).is_ok(),
            })
    }
}

impl Backend for HookTable {
    fn install(&mut self, unit: UnitId, kind: EventKind, lines: Option<&[u32]>) -> HookToken {
        let token = HookToken(self.next_token);
        self.next_token += 1;
        self.hooks.push(Hook {
            token,
            unit,
            kind,
            lines: lines.map(<[u32]>::to_vec),
        });
        token
    }

    fn uninstall(&mut self, token: HookToken) {
        self.hooks.retain(|h| h.token != token);
    }
}

/// Execution frame: current line, ordered locals, pending jump.
struct ScriptFrame {
    line: u32,
    locals: IndexMap<SmolStr, Value>,
    jump: Option<u32>,
}

impl ScriptFrame {
    fn take_jump(&mut self) -> Option<u32> {
        self.jump.take()
    }
}

impl Scope for ScriptFrame {
    fn get(&self, name: &str) -> Option<Value> {
        self.locals.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) {
        self.locals.insert(SmolStr::new(name), value);
    }
}

impl Frame for ScriptFrame {
    fn line(&self) -> u32 {
        self.line
    }

    fn request_jump(&mut self, line: u32) {
        self.jump = Some(line);
    }
}

/// Owns loaded scripts and runs them with instrumentation delivery.
pub struct ScriptHost {
    instrumenter: Instrumenter,
    hooks: Arc<Mutex<HookTable>>,
    units: IndexMap<SmolStr, ScriptUnit>,
    next_unit: u32,
}

impl ScriptHost {
    /// A host delivering events to the given instrumenter.
    #[must_use]
    pub fn new(instrumenter: &Instrumenter) -> Self {
        Self {
            instrumenter: instrumenter.clone(),
            hooks: Arc::new(Mutex::new(HookTable::default())),
            units: IndexMap::new(),
            next_unit: 1,
        }
    }

    /// A host delivering events to the process-wide instrumenter.
    #[must_use]
    pub fn global() -> Self {
        Self::new(Instrumenter::global())
    }

    /// Load a script, numbering its lines from `first_line`. Returns the
    /// unit name from the header.
    pub fn load(&mut self, source: &str, first_line: u32) -> Result<SmolStr, ScriptError> {
        let id = UnitId(self.next_unit);
        let script = ScriptUnit::parse(id, source, first_line)?;
        let name = script.name().clone();
        if self.units.contains_key(&name) {
            return Err(ScriptError::DuplicateUnit(name));
        }
        self.next_unit += 1;
        debug!(unit = %name, id = id.0, first_line, "script loaded");
        self.units.insert(name.clone(), script);
        Ok(name)
    }

    /// The engine-facing unit behind a loaded script.
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&Arc<ExecutableUnit>> {
        self.units.get(name).map(ScriptUnit::unit)
    }

    /// Start a registration against a loaded script.
    pub fn when(&self, name: &str) -> Result<When, ScriptError> {
        let unit = self
            .unit(name)
            .ok_or_else(|| ScriptError::UnknownUnit(SmolStr::new(name)))?;
        let backend: Arc<Mutex<dyn Backend>> = self.hooks.clone();
        Ok(When::new(&self.instrumenter, backend, Arc::clone(unit)))
    }

    /// Run a loaded script to completion.
    ///
    /// Arguments bind to the declared parameters in order. The return value
    /// of a `return` statement is computed before the `return` event is
    /// delivered, so callbacks observe it but cannot alter it.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
        let script = self
            .units
            .get(name)
            .ok_or_else(|| ScriptError::UnknownUnit(SmolStr::new(name)))?;
        if args.len() != script.params().len() {
            return Err(ScriptError::ArityMismatch {
                unit: script.name().clone(),
                expected: script.params().len(),
                got: args.len(),
            });
        }

        let unit = script.unit();
        let id = unit.id();
        let body: Vec<(u32, &[Stmt])> = script.body().collect();
        let mut frame = ScriptFrame {
            line: unit.first_line(),
            locals: script
                .params()
                .iter()
                .cloned()
                .zip(args.iter().cloned())
                .collect(),
            jump: None,
        };

        if self.wants(id, EventKind::Start) {
            self.instrumenter.dispatch_start(id, &mut frame)?;
        }

        let mut index = 0;
        while index < body.len() {
            let (line, stmts) = body[index];
            frame.line = line;
            if self.wants_line(id, line) {
                trace!(unit = %name, line, "line event");
                self.instrumenter.dispatch_line(id, &mut frame)?;
                if let Some(target) = frame.take_jump() {
                    index = body
                        .binary_search_by_key(&target, |(line, _)| *line)
                        .map_err(|_| ScriptError::JumpTarget(target))?;
                    continue;
                }
            }
            for stmt in stmts {
                match exec_stmt(&mut frame, stmt)
                    .map_err(|source| ScriptError::Eval { line, source })?
                {
                    StmtEffect::None => {}
                    StmtEffect::Return(value) => {
                        return self.finish_return(id, &mut frame, value);
                    }
                }
            }
            index += 1;
        }

        // Fell off the end of the body.
        self.finish_return(id, &mut frame, Value::Null)
    }

    fn finish_return(
        &self,
        id: UnitId,
        frame: &mut ScriptFrame,
        value: Value,
    ) -> Result<Value, ScriptError> {
        if self.wants(id, EventKind::Return) {
            self.instrumenter.dispatch_return(id, frame, &value)?;
        }
        Ok(value)
    }

    fn wants(&self, unit: UnitId, kind: EventKind) -> bool {
        self.lock_hooks().wants(unit, kind)
    }

    fn wants_line(&self, unit: UnitId, line: u32) -> bool {
        self.lock_hooks().wants_line(unit, line)
    }

    fn lock_hooks(&self) -> std::sync::MutexGuard<'_, HookTable> {
        match self.hooks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninstrumented_call_runs_to_the_return_value() {
        let mut host = ScriptHost::new(&Instrumenter::new());
        host.load("fn add(x, y):\n    total = x + y\n    return total", 1)
            .unwrap();
        let result = host
            .call("add", &[Value::Int(2), Value::Int(3)])
            .unwrap();
        assert_eq!(result, Value::Int(5));
    }

    #[test]
    fn falling_off_the_end_returns_null() {
        let mut host = ScriptHost::new(&Instrumenter::new());
        host.load("fn noop(x):\n    x = x + 1", 1).unwrap();
        assert_eq!(host.call("noop", &[Value::Int(0)]).unwrap(), Value::Null);
    }

    #[test]
    fn body_lines_execute_in_order_across_gaps() {
        let mut host = ScriptHost::new(&Instrumenter::new());
        host.load(
            "fn f(x):\n    x = x + 1\n\n    # gap\n    x = x * 10\n    return x",
            1,
        )
        .unwrap();
        assert_eq!(host.call("f", &[Value::Int(2)]).unwrap(), Value::Int(30));
    }

    #[test]
    fn arity_is_checked() {
        let mut host = ScriptHost::new(&Instrumenter::new());
        host.load("fn f(x):\n    return x", 1).unwrap();
        let err = host.call("f", &[]).unwrap_err();
        assert_eq!(
            err,
            ScriptError::ArityMismatch {
                unit: SmolStr::new("f"),
                expected: 1,
                got: 0,
            }
        );
    }

    #[test]
    fn unknown_unit_is_reported() {
        let host = ScriptHost::new(&Instrumenter::new());
        let err = host.call("ghost", &[]).unwrap_err();
        assert_eq!(err, ScriptError::UnknownUnit(SmolStr::new("ghost")));
    }

    #[test]
    fn duplicate_load_is_rejected() {
        let mut host = ScriptHost::new(&Instrumenter::new());
        host.load("fn f(x):\n    return x", 1).unwrap();
        let err = host.load("fn f(y):\n    return y", 1).unwrap_err();
        assert_eq!(err, ScriptError::DuplicateUnit(SmolStr::new("f")));
    }
}
