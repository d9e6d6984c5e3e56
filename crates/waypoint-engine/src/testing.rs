//! Shared test fixtures.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use waypoint_lang::eval::Scope;
use waypoint_lang::Value;

use crate::instrument::{Backend, Frame, HookToken};
use crate::trigger::EventKind;
use crate::unit::{ExecutableUnit, UnitId};

/// A small unit with a header, two executable lines, a comment, and a
/// return line. First line 10; executable lines 11, 12 and 14.
pub(crate) fn test_unit() -> Arc<ExecutableUnit> {
    let source = "\
fn double_plus(x):
    x = x + 1
    y = x * 2
    # checkpoint
    return y";
    Arc::new(ExecutableUnit::new(
        UnitId(1),
        "double_plus",
        source,
        10,
        BTreeSet::from([11, 12, 14]),
    ))
}

/// Frame fixture over an in-memory variable map.
pub(crate) struct TestFrame {
    line: u32,
    locals: FxHashMap<SmolStr, Value>,
    jump: Option<u32>,
}

impl TestFrame {
    pub(crate) fn at(line: u32, vars: &[(&str, Value)]) -> Self {
        Self {
            line,
            locals: vars
                .iter()
                .map(|(name, value)| (SmolStr::new(name), value.clone()))
                .collect(),
            jump: None,
        }
    }

    pub(crate) fn jump_requested(&self) -> Option<u32> {
        self.jump
    }
}

impl Scope for TestFrame {
    fn get(&self, name: &str) -> Option<Value> {
        self.locals.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) {
        self.locals.insert(SmolStr::new(name), value);
    }
}

impl Frame for TestFrame {
    fn line(&self) -> u32 {
        self.line
    }

    fn request_jump(&mut self, line: u32) {
        self.jump = Some(line);
    }
}

/// Backend fixture that only counts live hooks.
#[derive(Default)]
pub(crate) struct RecordingBackend {
    next_token: u64,
    live: Vec<HookToken>,
}

impl RecordingBackend {
    pub(crate) fn shared() -> Arc<Mutex<RecordingBackend>> {
        Arc::new(Mutex::new(Self::default()))
    }

    pub(crate) fn installed(backend: &Arc<Mutex<RecordingBackend>>) -> usize {
        backend.lock().unwrap().live.len()
    }
}

impl Backend for RecordingBackend {
    fn install(&mut self, _unit: UnitId, _kind: EventKind, _lines: Option<&[u32]>) -> HookToken {
        let token = HookToken(self.next_token);
        self.next_token += 1;
        self.live.push(token);
        token
    }

    fn uninstall(&mut self, token: HookToken) {
        self.live.retain(|t| *t != token);
    }
}
