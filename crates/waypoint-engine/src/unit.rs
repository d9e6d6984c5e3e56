//! Executable units.

use std::collections::BTreeSet;

use smol_str::SmolStr;

/// Stable identity of an executable unit within one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

/// An addressable block of instrumentable code.
///
/// A unit carries its source text (when available), the line number its
/// source starts at, and the line-table: the set of line numbers the host
/// runtime considers independently steppable. Resolution only ever returns
/// members of that set.
#[derive(Debug, Clone)]
pub struct ExecutableUnit {
    id: UnitId,
    name: SmolStr,
    source: Option<String>,
    first_line: u32,
    executable_lines: BTreeSet<u32>,
}

impl ExecutableUnit {
    /// Create a unit with source text.
    #[must_use]
    pub fn new(
        id: UnitId,
        name: impl Into<SmolStr>,
        source: impl Into<String>,
        first_line: u32,
        executable_lines: BTreeSet<u32>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source: Some(source.into()),
            first_line,
            executable_lines,
        }
    }

    /// Create a unit without source text (native/builtin units).
    ///
    /// Text and pattern identifiers cannot resolve against such a unit;
    /// line numbers and symbolic markers still work.
    #[must_use]
    pub fn sourceless(
        id: UnitId,
        name: impl Into<SmolStr>,
        first_line: u32,
        executable_lines: BTreeSet<u32>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source: None,
            first_line,
            executable_lines,
        }
    }

    /// Unit identity.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Unit name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    /// Source text, if available.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Line number of the first source line.
    #[must_use]
    pub fn first_line(&self) -> u32 {
        self.first_line
    }

    /// The set of executable line numbers.
    #[must_use]
    pub fn executable_lines(&self) -> &BTreeSet<u32> {
        &self.executable_lines
    }

    /// Whether a line is in the unit's executable-line set.
    #[must_use]
    pub fn is_executable(&self, line: u32) -> bool {
        self.executable_lines.contains(&line)
    }

    /// Numbered source lines, if source is available.
    pub fn numbered_lines(&self) -> Option<impl Iterator<Item = (u32, &str)>> {
        let source = self.source.as_deref()?;
        let first = self.first_line;
        Some(
            source
                .lines()
                .enumerate()
                .map(move |(i, text)| (first + i as u32, text)),
        )
    }

    /// First line number after any leading decorator lines.
    ///
    /// Relative offsets are measured from this line, so a decorator added
    /// above the unit never shifts user-specified offsets. Falls back to the
    /// nominal first line when source is unavailable.
    #[must_use]
    pub fn base_start_line(&self) -> u32 {
        let Some(source) = self.source.as_deref() else {
            return self.first_line;
        };
        let mut line = self.first_line;
        for text in source.lines() {
            if text.trim_start().starts_with('@') {
                line += 1;
            } else {
                break;
            }
        }
        line
    }

    /// Fingerprint of the unit's source text: crc32 as 8 lowercase hex chars.
    ///
    /// `None` when the unit has no source.
    #[must_use]
    pub fn source_hash(&self) -> Option<String> {
        let source = self.source.as_deref()?;
        let crc = crc32fast::hash(source.as_bytes());
        Some(format!("{crc:08x}"))
    }
}
