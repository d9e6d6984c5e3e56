//! Location identifiers.
//!
//! An identifier is the user's way of naming a point inside an executable
//! unit: an absolute line, an offset from the unit's first body line, a
//! source-text prefix, an anchored regex, or a symbolic event marker.

use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;
use smol_str::SmolStr;

/// A user-supplied location identifier.
#[derive(Debug, Clone)]
pub enum Identifier {
    /// Absolute line number, taken verbatim.
    Line(u32),
    /// Signed offset from the unit's base start line.
    Offset(i32),
    /// Matches lines whose trimmed source text starts with this prefix.
    Prefix(SmolStr),
    /// Matches lines whose trimmed source text matches this regex at the
    /// start (anchored, not full-match).
    Pattern(Regex),
    /// Symbolic marker for unit entry; an event kind, not a location.
    Start,
    /// Symbolic marker for unit return; an event kind, not a location.
    Return,
}

impl Identifier {
    /// Parse the textual identifier forms.
    ///
    /// `"<start>"` and `"<return>"` are symbolic markers, `"+N"`/`"-N"` are
    /// relative offsets, everything else is a source-text prefix. Line
    /// numbers and regex patterns enter through `From` conversions instead.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text {
            "<start>" => return Identifier::Start,
            "<return>" => return Identifier::Return,
            _ => {}
        }
        if let Some(digits) = text.strip_prefix('+') {
            if let Ok(offset) = digits.parse::<i32>() {
                if digits.chars().all(|c| c.is_ascii_digit()) {
                    return Identifier::Offset(offset);
                }
            }
        }
        if let Some(digits) = text.strip_prefix('-') {
            if digits.chars().all(|c| c.is_ascii_digit()) && !digits.is_empty() {
                if let Ok(offset) = digits.parse::<i32>() {
                    return Identifier::Offset(-offset);
                }
            }
        }
        Identifier::Prefix(SmolStr::new(text))
    }

    /// Whether this identifier names an event kind rather than a location.
    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Identifier::Start | Identifier::Return)
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Identifier::Line(a), Identifier::Line(b)) => a == b,
            (Identifier::Offset(a), Identifier::Offset(b)) => a == b,
            (Identifier::Prefix(a), Identifier::Prefix(b)) => a == b,
            (Identifier::Pattern(a), Identifier::Pattern(b)) => a.as_str() == b.as_str(),
            (Identifier::Start, Identifier::Start) | (Identifier::Return, Identifier::Return) => {
                true
            }
            _ => false,
        }
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Identifier::Line(n) => n.hash(state),
            Identifier::Offset(k) => k.hash(state),
            Identifier::Prefix(p) => p.hash(state),
            Identifier::Pattern(re) => re.as_str().hash(state),
            Identifier::Start | Identifier::Return => {}
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Line(n) => write!(f, "line {n}"),
            Identifier::Offset(k) if *k >= 0 => write!(f, "offset +{k}"),
            Identifier::Offset(k) => write!(f, "offset {k}"),
            Identifier::Prefix(p) => write!(f, "prefix '{p}'"),
            Identifier::Pattern(re) => write!(f, "pattern /{}/", re.as_str()),
            Identifier::Start => write!(f, "<start>"),
            Identifier::Return => write!(f, "<return>"),
        }
    }
}

impl From<u32> for Identifier {
    fn from(line: u32) -> Self {
        Identifier::Line(line)
    }
}

impl From<&str> for Identifier {
    fn from(text: &str) -> Self {
        Identifier::parse(text)
    }
}

impl From<Regex> for Identifier {
    fn from(pattern: Regex) -> Self {
        Identifier::Pattern(pattern)
    }
}

/// A conjunctive tuple of identifiers.
///
/// Every identifier in the tuple must independently match, and the resolved
/// set is the intersection across all of them. This lets a user disambiguate
/// a common prefix like `"x +="` by adding a second identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationSpec(Vec<Identifier>);

impl LocationSpec {
    /// Build a spec from one or more identifiers.
    ///
    /// Returns `None` for an empty tuple.
    #[must_use]
    pub fn new(identifiers: Vec<Identifier>) -> Option<Self> {
        if identifiers.is_empty() {
            None
        } else {
            Some(Self(identifiers))
        }
    }

    /// The identifiers in declaration order.
    #[must_use]
    pub fn identifiers(&self) -> &[Identifier] {
        &self.0
    }
}

impl fmt::Display for LocationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for ident in &self.0 {
            if !first {
                write!(f, " & ")?;
            }
            write!(f, "{ident}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<Identifier> for LocationSpec {
    fn from(identifier: Identifier) -> Self {
        Self(vec![identifier])
    }
}
