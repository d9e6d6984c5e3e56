//! Handler lifecycle: enable, disable, remove.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::error::EngineError;
use crate::instrument::Registry;

/// Process-unique handler identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

impl HandlerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
pub(crate) struct HandlerState {
    pub(crate) enabled: bool,
    pub(crate) removed: bool,
}

impl Default for HandlerState {
    fn default() -> Self {
        Self {
            enabled: true,
            removed: false,
        }
    }
}

/// Control handle for one registered trigger/callback pair.
///
/// Clones share the same underlying state. Dropping a handler does not
/// remove the registration; call [`Handler::remove`] for that.
#[derive(Debug, Clone)]
pub struct Handler {
    id: HandlerId,
    state: Arc<Mutex<HandlerState>>,
    registry: Weak<Mutex<Registry>>,
}

impl Handler {
    pub(crate) fn new(
        id: HandlerId,
        state: Arc<Mutex<HandlerState>>,
        registry: Weak<Mutex<Registry>>,
    ) -> Self {
        Self {
            id,
            state,
            registry,
        }
    }

    /// This handler's identity.
    #[must_use]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Whether the handler currently fires.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        let state = self.lock_state();
        state.enabled && !state.removed
    }

    /// Resume firing. Fails once the handler has been removed.
    pub fn enable(&self) -> Result<(), EngineError> {
        self.set_enabled(true)
    }

    /// Stop firing without uninstalling. Fails once the handler has been
    /// removed.
    pub fn disable(&self) -> Result<(), EngineError> {
        self.set_enabled(false)
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), EngineError> {
        let mut state = self.lock_state();
        if state.removed {
            return Err(EngineError::HandlerRemoved);
        }
        state.enabled = enabled;
        Ok(())
    }

    /// Permanently remove the registration and uninstall its hook.
    ///
    /// Removing twice is a no-op.
    pub fn remove(&self) {
        {
            let mut state = self.lock_state();
            if state.removed {
                return;
            }
            state.removed = true;
            state.enabled = false;
        }
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = match registry.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry.remove(self.id);
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, HandlerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
