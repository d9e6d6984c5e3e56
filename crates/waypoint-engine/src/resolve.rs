//! Identifier-to-location resolution.
//!
//! Maps a [`LocationSpec`] against one unit's source text and line-table to
//! a sorted set of concrete line numbers. Resolution never guesses: a text
//! or pattern identifier that only matches non-executable source (blanks,
//! comments, decorators, continuations) is a hard failure, not a fallback to
//! the nearest executable line.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::EngineError;
use crate::ident::{Identifier, LocationSpec};
use crate::unit::{ExecutableUnit, UnitId};

/// Bound on the memo cache; the cache is cleared wholesale when reached.
const CACHE_CAPACITY: usize = 256;

/// Memoizing location resolver.
///
/// Resolution is a pure function of `(unit identity, spec, base start line)`
/// and re-scans source text, so results are cached on that key.
#[derive(Debug, Default)]
pub struct Resolver {
    cache: FxHashMap<(UnitId, LocationSpec, u32), Option<Vec<u32>>>,
}

impl Resolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a spec against a unit, using the unit's own base start line.
    pub fn resolve(
        &mut self,
        unit: &ExecutableUnit,
        spec: &LocationSpec,
    ) -> Result<Vec<u32>, EngineError> {
        self.resolve_with_base(unit, spec, None)
    }

    /// Resolve with an explicit base start line for relative offsets.
    ///
    /// Callers that resolve inside a containing entity (a class body, a
    /// module) pass the container's base so offsets stay anchored to it.
    pub fn resolve_with_base(
        &mut self,
        unit: &ExecutableUnit,
        spec: &LocationSpec,
        base_start_line: Option<u32>,
    ) -> Result<Vec<u32>, EngineError> {
        let base = base_start_line.unwrap_or_else(|| unit.base_start_line());
        let key = (unit.id(), spec.clone(), base);
        if let Some(cached) = self.cache.get(&key) {
            return match cached {
                Some(lines) => Ok(lines.clone()),
                None => Err(no_match(unit, spec)),
            };
        }

        let resolved = resolve_spec(unit, spec, base);
        if self.cache.len() >= CACHE_CAPACITY {
            self.cache.clear();
        }
        self.cache.insert(key, resolved.clone());

        match resolved {
            Some(lines) => {
                trace!(unit = %unit.name(), %spec, ?lines, "resolved locations");
                Ok(lines)
            }
            None => Err(no_match(unit, spec)),
        }
    }

    /// Number of memoized entries, for diagnostics.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

fn no_match(unit: &ExecutableUnit, spec: &LocationSpec) -> EngineError {
    EngineError::NoMatch {
        unit: unit.name().clone(),
        spec: spec.to_string(),
    }
}

/// Uncached resolution; `None` means "no match".
fn resolve_spec(unit: &ExecutableUnit, spec: &LocationSpec, base: u32) -> Option<Vec<u32>> {
    let mut agreed: Option<BTreeSet<u32>> = None;

    for ident in spec.identifiers() {
        let candidates = candidate_lines(unit, ident, base)?;
        if candidates.is_empty() {
            return None;
        }
        agreed = Some(match agreed {
            None => candidates,
            Some(agreed) => agreed.intersection(&candidates).copied().collect(),
        });
    }

    let agreed = agreed?;
    let executable: Vec<u32> = agreed
        .into_iter()
        .filter(|line| unit.is_executable(*line))
        .collect();
    if executable.is_empty() {
        None
    } else {
        Some(executable)
    }
}

/// Candidate lines for a single identifier; `None` means "cannot match".
fn candidate_lines(unit: &ExecutableUnit, ident: &Identifier, base: u32) -> Option<BTreeSet<u32>> {
    match ident {
        Identifier::Line(n) => Some([*n].into_iter().collect()),
        Identifier::Offset(k) => {
            let target = base.checked_add_signed(*k)?;
            if unit.is_executable(target) {
                Some([target].into_iter().collect())
            } else {
                None
            }
        }
        Identifier::Prefix(prefix) => {
            let lines = unit.numbered_lines()?;
            Some(
                lines
                    .filter(|(_, text)| text.trim().starts_with(prefix.as_str()))
                    .map(|(line, _)| line)
                    .collect(),
            )
        }
        Identifier::Pattern(pattern) => {
            let lines = unit.numbered_lines()?;
            Some(
                lines
                    .filter(|(_, text)| {
                        pattern
                            .find(text.trim())
                            .is_some_and(|found| found.start() == 0)
                    })
                    .map(|(line, _)| line)
                    .collect(),
            )
        }
        // Start/return are event kinds, resolved by trigger construction.
        Identifier::Start | Identifier::Return => None,
    }
}
