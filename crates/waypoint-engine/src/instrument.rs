//! Instrumentation core: handler registry and event dispatch.
//!
//! The [`Instrumenter`] owns every registered handler. An execution host
//! implements [`Backend`] (so the instrumenter can tell it which lines and
//! events to report) and [`Frame`] (the live state it hands back when an
//! event fires), then forwards events through the `dispatch_*` methods.

use std::sync::{Arc, Mutex, OnceLock};

use tracing::debug;
use waypoint_lang::eval::Scope;
use waypoint_lang::Value;

use crate::callback::Callback;
use crate::error::EngineError;
use crate::handler::{Handler, HandlerId, HandlerState};
use crate::ident::LocationSpec;
use crate::resolve::Resolver;
use crate::trigger::{EventKind, Trigger};
use crate::unit::{ExecutableUnit, UnitId};

/// Live execution state delivered with an event.
///
/// The `Scope` supertrait exposes the frame's locals to conditions and
/// statement callbacks.
pub trait Frame: Scope {
    /// The line about to execute.
    fn line(&self) -> u32;

    /// Ask the host to continue execution at `line` instead of the current
    /// line. Honored for line events only.
    fn request_jump(&mut self, line: u32);
}

/// Opaque receipt for one installed hook, issued by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookToken(pub u64);

/// Host-side hook installation.
///
/// The backend decides how events are produced; the instrumenter only
/// tells it what to report. `lines: None` on a `Line` install means every
/// executable line of the unit.
pub trait Backend: Send {
    /// Start reporting `kind` events for `unit`.
    fn install(&mut self, unit: UnitId, kind: EventKind, lines: Option<&[u32]>) -> HookToken;

    /// Stop reporting the events behind a previously issued token.
    fn uninstall(&mut self, token: HookToken);
}

type SharedBackend = Arc<Mutex<dyn Backend>>;

struct Entry {
    id: HandlerId,
    state: Arc<Mutex<HandlerState>>,
    trigger: Trigger,
    callback: Callback,
    backend: SharedBackend,
    token: HookToken,
}

#[derive(Default)]
pub(crate) struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    pub(crate) fn remove(&mut self, id: HandlerId) {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return;
        };
        let entry = self.entries.remove(pos);
        lock_unpoisoned(&entry.backend).uninstall(entry.token);
        debug!(handler = entry.id.0, "handler removed");
    }
}

fn lock_unpoisoned<T: ?Sized>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Registry of triggers and their callbacks, plus the dispatch path.
///
/// Cloning is cheap and every clone controls the same registry. A host
/// usually goes through [`Instrumenter::global`]; tests construct isolated
/// instances with [`Instrumenter::new`].
#[derive(Clone, Default)]
pub struct Instrumenter {
    inner: Arc<Mutex<Registry>>,
    resolver: Arc<Mutex<Resolver>>,
}

impl Instrumenter {
    /// A fresh, empty instrumenter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instrumenter.
    pub fn global() -> &'static Instrumenter {
        static GLOBAL: OnceLock<Instrumenter> = OnceLock::new();
        GLOBAL.get_or_init(Instrumenter::new)
    }

    /// Resolve a location spec through this instrumenter's memo cache.
    ///
    /// Registrations repeat the same specs against the same units, so the
    /// cache lives here and survives across them.
    pub fn resolve_locations(
        &self,
        unit: &ExecutableUnit,
        spec: &LocationSpec,
    ) -> Result<Vec<u32>, EngineError> {
        lock_unpoisoned(&self.resolver).resolve(unit, spec)
    }

    #[cfg(test)]
    pub(crate) fn cached_locations(&self) -> usize {
        lock_unpoisoned(&self.resolver).cached_entries()
    }

    /// Attach a callback to a trigger, installing the backend hook.
    ///
    /// The returned handler starts enabled and stays live until
    /// [`Handler::remove`] or [`Instrumenter::clear_all`].
    pub fn register(
        &self,
        backend: SharedBackend,
        trigger: Trigger,
        callback: Callback,
    ) -> Handler {
        let id = HandlerId::next();
        let state = Arc::new(Mutex::new(HandlerState::default()));
        let token = lock_unpoisoned(&backend).install(
            trigger.unit().id(),
            trigger.kind(),
            trigger.locations(),
        );
        debug!(
            handler = id.0,
            unit = %trigger.unit().name(),
            kind = %trigger.kind(),
            "handler registered"
        );
        let handler = Handler::new(id, Arc::clone(&state), Arc::downgrade(&self.inner));
        lock_unpoisoned(&self.inner).entries.push(Entry {
            id,
            state,
            trigger,
            callback,
            backend,
            token,
        });
        handler
    }

    /// Deliver a line event.
    pub fn dispatch_line(&self, unit: UnitId, frame: &mut dyn Frame) -> Result<(), EngineError> {
        self.dispatch(unit, frame, EventKind::Line, None)
    }

    /// Deliver a unit-entry event.
    pub fn dispatch_start(&self, unit: UnitId, frame: &mut dyn Frame) -> Result<(), EngineError> {
        self.dispatch(unit, frame, EventKind::Start, None)
    }

    /// Deliver a unit-return event carrying the computed return value.
    pub fn dispatch_return(
        &self,
        unit: UnitId,
        frame: &mut dyn Frame,
        retval: &Value,
    ) -> Result<(), EngineError> {
        self.dispatch(unit, frame, EventKind::Return, Some(retval))
    }

    /// Run every enabled handler matching the event, in registration order.
    ///
    /// The registry lock is held only while snapshotting the matching
    /// handlers, never across user callbacks, so a callback may register
    /// or remove handlers without deadlocking.
    fn dispatch(
        &self,
        unit: UnitId,
        frame: &mut dyn Frame,
        kind: EventKind,
        retval: Option<&Value>,
    ) -> Result<(), EngineError> {
        let snapshot: Vec<(Trigger, Callback)> = {
            let registry = lock_unpoisoned(&self.inner);
            registry
                .entries
                .iter()
                .filter(|entry| entry.trigger.unit().id() == unit)
                .filter(|entry| lock_unpoisoned(&entry.state).enabled)
                .map(|entry| (entry.trigger.clone(), entry.callback.clone()))
                .collect()
        };
        for (trigger, callback) in snapshot {
            if trigger.should_fire(frame, kind, retval)? {
                callback.invoke(frame, kind, retval)?;
            }
        }
        Ok(())
    }

    /// Remove every handler and uninstall its hook.
    pub fn clear_all(&self) {
        let entries = std::mem::take(&mut lock_unpoisoned(&self.inner).entries);
        for entry in entries {
            lock_unpoisoned(&entry.state).removed = true;
            lock_unpoisoned(&entry.backend).uninstall(entry.token);
        }
        debug!("all handlers cleared");
    }

    /// Number of live handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        lock_unpoisoned(&self.inner).entries.len()
    }
}
