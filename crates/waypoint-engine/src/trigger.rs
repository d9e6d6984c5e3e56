//! Triggers: the per-event fire decision.

use std::sync::Arc;

use waypoint_lang::{eval_expr, parse_expr, EvalError, Expr, Value};

use crate::callback::FuncCallback;
use crate::error::EngineError;
use crate::instrument::Frame;
use crate::unit::ExecutableUnit;

/// The event kinds a trigger can fire on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// An executable line is about to run.
    Line,
    /// The unit was entered.
    Start,
    /// The unit is about to return.
    Return,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Line => f.write_str("line"),
            EventKind::Start => f.write_str("start"),
            EventKind::Return => f.write_str("return"),
        }
    }
}

/// Optional fire condition.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Expression evaluated against the live locals of the frame.
    Expr(Expr),
    /// Predicate invoked with callback-style argument binding; must return
    /// a boolean.
    Func(FuncCallback),
}

impl Condition {
    /// Parse a condition string, eagerly rejecting bad syntax.
    pub fn parse(source: &str) -> Result<Self, EngineError> {
        parse_expr(source)
            .map(Condition::Expr)
            .map_err(EngineError::ConditionSyntax)
    }
}

/// An immutable description of when injected behavior fires.
///
/// `start`/`return` triggers carry no locations and fire on event-kind
/// match; `line` triggers fire when the frame's current line is one of the
/// resolved locations, or on every executable line when registered without
/// an identifier.
#[derive(Debug, Clone)]
pub struct Trigger {
    unit: Arc<ExecutableUnit>,
    kind: EventKind,
    locations: Option<Vec<u32>>,
    condition: Option<Condition>,
}

impl Trigger {
    /// Line trigger on an explicit sorted set of resolved locations.
    ///
    /// The location list must come from resolution against the same unit;
    /// an empty list is rejected so a trigger that can never fire is never
    /// constructed.
    pub fn on_lines(unit: Arc<ExecutableUnit>, locations: Vec<u32>) -> Result<Self, EngineError> {
        if locations.is_empty() {
            return Err(EngineError::EmptyLocations);
        }
        let mut locations = locations;
        locations.sort_unstable();
        Ok(Self {
            unit,
            kind: EventKind::Line,
            locations: Some(locations),
            condition: None,
        })
    }

    /// Line trigger matching every executable line of the unit.
    #[must_use]
    pub fn every_line(unit: Arc<ExecutableUnit>) -> Self {
        Self {
            unit,
            kind: EventKind::Line,
            locations: None,
            condition: None,
        }
    }

    /// Trigger on unit entry.
    #[must_use]
    pub fn on_start(unit: Arc<ExecutableUnit>) -> Self {
        Self {
            unit,
            kind: EventKind::Start,
            locations: None,
            condition: None,
        }
    }

    /// Trigger on unit return.
    #[must_use]
    pub fn on_return(unit: Arc<ExecutableUnit>) -> Self {
        Self {
            unit,
            kind: EventKind::Return,
            locations: None,
            condition: None,
        }
    }

    /// Attach a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Attach a string condition, parsed eagerly.
    pub fn with_condition_str(self, source: &str) -> Result<Self, EngineError> {
        Ok(self.with_condition(Condition::parse(source)?))
    }

    /// Verify a source fingerprint recorded at registration time.
    ///
    /// A stale fingerprint is rejected here, at registration, so line
    /// numbers resolved against outdated source never reach fire time.
    pub fn with_source_hash(self, expected: &str) -> Result<Self, EngineError> {
        let actual = self
            .unit
            .source_hash()
            .ok_or_else(|| EngineError::NoSource(self.unit.name().clone()))?;
        if actual != expected {
            return Err(EngineError::StaleSource {
                unit: self.unit.name().clone(),
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(self)
    }

    /// The unit this trigger is attached to.
    #[must_use]
    pub fn unit(&self) -> &Arc<ExecutableUnit> {
        &self.unit
    }

    /// The event kind this trigger fires on.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Resolved locations for line triggers (`None` = every executable line).
    #[must_use]
    pub fn locations(&self) -> Option<&[u32]> {
        self.locations.as_deref()
    }

    /// Decide whether this trigger fires for a delivered event.
    ///
    /// An undefined name inside the condition makes the decision "does not
    /// fire" (a condition written for one reachable state may be evaluated
    /// transiently in another); every other evaluation failure propagates to
    /// the instrumented call site.
    pub fn should_fire(
        &self,
        frame: &mut dyn Frame,
        kind: EventKind,
        retval: Option<&Value>,
    ) -> Result<bool, EngineError> {
        if kind != self.kind {
            return Ok(false);
        }
        if self.kind == EventKind::Line {
            let line = frame.line();
            let at_location = match &self.locations {
                Some(locations) => locations.binary_search(&line).is_ok(),
                None => self.unit.is_executable(line),
            };
            if !at_location {
                return Ok(false);
            }
        }
        match &self.condition {
            None => Ok(true),
            Some(Condition::Expr(expr)) => match eval_expr(frame, expr) {
                Ok(Value::Bool(fire)) => Ok(fire),
                Ok(_) => Err(EngineError::ConditionNotBool),
                Err(EvalError::UndefinedVariable(_)) => Ok(false),
                Err(err) => Err(EngineError::Condition(err)),
            },
            Some(Condition::Func(predicate)) => {
                match predicate.invoke(frame, kind, retval) {
                    Ok(Some(Value::Bool(fire))) => Ok(fire),
                    Ok(_) => Err(EngineError::ConditionNotBool),
                    // Same scoping tolerance as string conditions.
                    Err(EngineError::UnboundArgument(_)) => Ok(false),
                    Err(err) => Err(err),
                }
            }
        }
    }
}
