//! Dynamic instrumentation engine.
//!
//! The engine attaches injected behavior to locations in executable units.
//! A host describes its units as [`ExecutableUnit`]s, implements the
//! [`Backend`] and [`Frame`] traits, and forwards line/start/return events
//! to an [`Instrumenter`]. Users register behavior through the [`When`]
//! builder: identifiers (line numbers, offsets, text prefixes, patterns,
//! or the symbolic `<start>`/`<return>` markers) resolve to concrete
//! locations eagerly, and the attached callback runs whenever the matching
//! event fires.

pub mod callback;
pub mod error;
pub mod handler;
pub mod ident;
pub mod instrument;
pub mod register;
pub mod resolve;
pub mod trigger;
pub mod unit;

#[cfg(test)]
mod testing;

pub use callback::{BoundArg, Callback, FuncCallback, FRAME_PARAM, RETVAL_PARAM};
pub use error::EngineError;
pub use handler::{Handler, HandlerId};
pub use ident::{Identifier, LocationSpec};
pub use instrument::{Backend, Frame, HookToken, Instrumenter};
pub use register::When;
pub use resolve::Resolver;
pub use trigger::{Condition, EventKind, Trigger};
pub use unit::{ExecutableUnit, UnitId};

pub use waypoint_lang::{Scope, Value};
