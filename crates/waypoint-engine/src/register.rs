//! Registration builder.
//!
//! [`When`] ties the pieces together: it resolves identifiers against a
//! unit, builds one trigger per identifier (several identifiers mean
//! "fire at each of them"), and registers the chosen callback with the
//! instrumenter.

use std::sync::{Arc, Mutex};

use crate::callback::{Callback, FuncCallback};
use crate::error::EngineError;
use crate::handler::Handler;
use crate::ident::{Identifier, LocationSpec};
use crate::instrument::{Backend, Instrumenter};
use crate::trigger::{Condition, Trigger};
use crate::unit::ExecutableUnit;

enum Target {
    /// One identifier, one trigger.
    One(Identifier),
    /// Several identifiers that must agree on the same lines.
    All(Vec<Identifier>),
}

/// Builder for attaching behavior to locations in a unit.
///
/// With no `at` calls the trigger fires on every executable line.
/// Each `at` call adds an independent trigger; `at_all` adds a single
/// trigger on the lines its identifiers agree on.
pub struct When {
    instrumenter: Instrumenter,
    backend: Arc<Mutex<dyn Backend>>,
    unit: Arc<ExecutableUnit>,
    targets: Vec<Target>,
    condition: Option<Condition>,
    source_hash: Option<String>,
}

impl When {
    /// Start a registration against a specific instrumenter.
    #[must_use]
    pub fn new(
        instrumenter: &Instrumenter,
        backend: Arc<Mutex<dyn Backend>>,
        unit: Arc<ExecutableUnit>,
    ) -> Self {
        Self {
            instrumenter: instrumenter.clone(),
            backend,
            unit,
            targets: Vec::new(),
            condition: None,
            source_hash: None,
        }
    }

    /// Start a registration against the process-wide instrumenter.
    #[must_use]
    pub fn global(backend: Arc<Mutex<dyn Backend>>, unit: Arc<ExecutableUnit>) -> Self {
        Self::new(Instrumenter::global(), backend, unit)
    }

    /// Add one identifier as an independent trigger.
    #[must_use]
    pub fn at(mut self, identifier: impl Into<Identifier>) -> Self {
        self.targets.push(Target::One(identifier.into()));
        self
    }

    /// Add a single trigger on the lines where all identifiers agree.
    #[must_use]
    pub fn at_all<I>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Identifier>,
    {
        self.targets
            .push(Target::All(identifiers.into_iter().map(Into::into).collect()));
        self
    }

    /// Gate firing on a condition expression over the frame's locals.
    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Gate firing on a condition string, parsed at registration.
    pub fn condition_str(self, source: &str) -> Result<Self, EngineError> {
        Ok(self.condition(Condition::parse(source)?))
    }

    /// Gate firing on a predicate with callback-style argument binding.
    #[must_use]
    pub fn condition_fn(self, predicate: FuncCallback) -> Self {
        self.condition(Condition::Func(predicate))
    }

    /// Reject registration if the unit's source no longer matches the
    /// recorded fingerprint.
    #[must_use]
    pub fn verify_source(mut self, hash: impl Into<String>) -> Self {
        self.source_hash = Some(hash.into());
        self
    }

    /// Register injected statements, parsed at registration.
    pub fn run(self, code: &str) -> Result<Vec<Handler>, EngineError> {
        let callback = Callback::statement(code)?;
        self.finish(callback)
    }

    /// Register a function callback.
    pub fn call(self, callback: FuncCallback) -> Result<Vec<Handler>, EngineError> {
        self.finish(Callback::Func(callback))
    }

    /// Register a control transfer to the line `destination` resolves to.
    ///
    /// The destination must resolve to exactly one line.
    pub fn goto(self, destination: impl Into<Identifier>) -> Result<Vec<Handler>, EngineError> {
        let destination = destination.into();
        if destination.is_symbolic() {
            return Err(EngineError::SymbolicLocation);
        }
        let lines = self
            .instrumenter
            .resolve_locations(&self.unit, &LocationSpec::from(destination))?;
        if lines.len() > 1 {
            return Err(EngineError::AmbiguousGoto {
                matches: lines.len(),
            });
        }
        self.finish(Callback::Goto(lines[0]))
    }

    fn finish(self, callback: Callback) -> Result<Vec<Handler>, EngineError> {
        let mut triggers = Vec::new();

        if self.targets.is_empty() {
            triggers.push(Trigger::every_line(Arc::clone(&self.unit)));
        }
        for target in &self.targets {
            triggers.push(match target {
                Target::One(Identifier::Start) => Trigger::on_start(Arc::clone(&self.unit)),
                Target::One(Identifier::Return) => Trigger::on_return(Arc::clone(&self.unit)),
                Target::One(ident) => {
                    let spec = LocationSpec::from(ident.clone());
                    let lines = self.instrumenter.resolve_locations(&self.unit, &spec)?;
                    Trigger::on_lines(Arc::clone(&self.unit), lines)?
                }
                Target::All(idents) => {
                    if idents.iter().any(Identifier::is_symbolic) {
                        return Err(EngineError::SymbolicLocation);
                    }
                    let spec = LocationSpec::new(idents.clone())
                        .ok_or(EngineError::EmptyLocations)?;
                    let lines = self.instrumenter.resolve_locations(&self.unit, &spec)?;
                    Trigger::on_lines(Arc::clone(&self.unit), lines)?
                }
            });
        }

        let mut handlers = Vec::with_capacity(triggers.len());
        for mut trigger in triggers {
            if let Some(condition) = &self.condition {
                trigger = trigger.with_condition(condition.clone());
            }
            if let Some(hash) = &self.source_hash {
                trigger = trigger.with_source_hash(hash)?;
            }
            handlers.push(self.instrumenter.register(
                Arc::clone(&self.backend),
                trigger,
                callback.clone(),
            ));
        }
        Ok(handlers)
    }
}
