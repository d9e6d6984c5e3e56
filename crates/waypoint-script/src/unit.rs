//! Script parsing.
//!
//! The script format is line-oriented: optional `@decorator` lines, a
//! `fn name(params):` header, then an indented body where every statement
//! line is executable and blank or `#` comment lines are not.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use waypoint_engine::{ExecutableUnit, UnitId};
use waypoint_lang::{parse_stmts, Stmt};

use crate::error::ScriptError;

/// A parsed script function: the engine-facing unit plus the statements
/// behind each executable line.
#[derive(Debug)]
pub struct ScriptUnit {
    unit: Arc<ExecutableUnit>,
    params: Vec<SmolStr>,
    body: IndexMap<u32, Vec<Stmt>>,
}

impl ScriptUnit {
    /// Parse a script, numbering its lines from `first_line`.
    pub fn parse(id: UnitId, source: &str, first_line: u32) -> Result<Self, ScriptError> {
        let mut lines = source.lines().zip(first_line..);

        let (name, params) = loop {
            let Some((text, line)) = lines.next() else {
                return Err(ScriptError::MissingHeader);
            };
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('@') || trimmed.starts_with('#') {
                continue;
            }
            break parse_header(trimmed).ok_or(ScriptError::MalformedHeader(line))?;
        };

        let mut body = IndexMap::new();
        for (text, line) in lines {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let stmts = parse_stmts(trimmed)
                .map_err(|source| ScriptError::Statement { line, source })?;
            body.insert(line, stmts);
        }

        let executable: BTreeSet<u32> = body.keys().copied().collect();
        let unit = Arc::new(ExecutableUnit::new(id, name, source, first_line, executable));
        Ok(Self { unit, params, body })
    }

    /// The engine-facing unit.
    #[must_use]
    pub fn unit(&self) -> &Arc<ExecutableUnit> {
        &self.unit
    }

    /// Unit name from the header.
    #[must_use]
    pub fn name(&self) -> &SmolStr {
        self.unit.name()
    }

    /// Declared parameter names, in order.
    #[must_use]
    pub fn params(&self) -> &[SmolStr] {
        &self.params
    }

    /// The statements behind one executable line.
    #[must_use]
    pub fn statements(&self, line: u32) -> Option<&[Stmt]> {
        self.body.get(&line).map(Vec::as_slice)
    }

    /// Every executable line with its statements, in line order.
    pub fn body(&self) -> impl ExactSizeIterator<Item = (u32, &[Stmt])> {
        self.body
            .iter()
            .map(|(line, stmts)| (*line, stmts.as_slice()))
    }
}

/// Split `fn name(a, b):` into its name and parameter list.
fn parse_header(trimmed: &str) -> Option<(SmolStr, Vec<SmolStr>)> {
    let rest = trimmed.strip_prefix("fn ")?;
    let rest = rest.strip_suffix("):")?;
    let (name, params) = rest.split_once('(')?;
    let name = name.trim();
    if name.is_empty() || !is_ident(name) {
        return None;
    }
    let params = params.trim();
    let params: Vec<SmolStr> = if params.is_empty() {
        Vec::new()
    } else {
        let mut out = Vec::new();
        for param in params.split(',') {
            let param = param.trim();
            if !is_ident(param) {
                return None;
            }
            out.push(SmolStr::new(param));
        }
        out
    };
    Some((SmolStr::new(name), params))
}

fn is_ident(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "\
@traced
fn add(x, y):
    total = x + y

    # accumulate
    return total";

    #[test]
    fn parses_header_body_and_executable_lines() {
        let script = ScriptUnit::parse(UnitId(1), SCRIPT, 10).unwrap();
        assert_eq!(script.name(), "add");
        assert_eq!(script.params(), ["x", "y"]);

        let unit = script.unit();
        assert_eq!(unit.first_line(), 10);
        // Decorator, header, blank and comment lines are not executable.
        let lines: Vec<u32> = unit.executable_lines().iter().copied().collect();
        assert_eq!(lines, [12, 15]);
        assert!(script.statements(12).is_some());
        assert!(script.statements(11).is_none());
    }

    #[test]
    fn decorator_shifts_the_base_start_line() {
        let script = ScriptUnit::parse(UnitId(1), SCRIPT, 10).unwrap();
        // Base skips the decorator and lands on the header.
        assert_eq!(script.unit().base_start_line(), 11);
    }

    #[test]
    fn header_without_params() {
        let script = ScriptUnit::parse(UnitId(1), "fn tick():\n    return 1", 1).unwrap();
        assert_eq!(script.name(), "tick");
        assert!(script.params().is_empty());
    }

    #[test]
    fn missing_header_is_rejected() {
        let err = ScriptUnit::parse(UnitId(1), "# nothing here\n", 1).unwrap_err();
        assert_eq!(err, ScriptError::MissingHeader);
    }

    #[test]
    fn malformed_header_is_rejected() {
        let err = ScriptUnit::parse(UnitId(1), "fn 3bad(:\n", 4).unwrap_err();
        assert_eq!(err, ScriptError::MalformedHeader(4));
    }

    #[test]
    fn bad_statement_reports_its_line() {
        let err = ScriptUnit::parse(UnitId(1), "fn f(x):\n    x = = 1", 7).unwrap_err();
        assert!(matches!(err, ScriptError::Statement { line: 8, .. }));
    }
}
