//! Reference script host for the waypoint instrumentation engine.
//!
//! Scripts are line-oriented functions (`@decorator` lines, a
//! `fn name(params):` header, one statement per body line). The host runs
//! them while delivering line, start and return events to an
//! [`Instrumenter`](waypoint_engine::Instrumenter), which makes every
//! engine behavior observable end to end: identifier resolution against
//! real line numbers, conditional firing, callback mutation of live
//! locals, and goto control transfer.

pub mod error;
pub mod host;
pub mod unit;

pub use error::ScriptError;
pub use host::ScriptHost;
pub use unit::ScriptUnit;
