
use std::fmt;

/// Literal marker for junction-table segments.
pub const PIVOT: &str = "pivot";

///
/// PathSegment
///
/// One dot-separated component of a field path.
///
/// Empty  → produced only by a trailing "." and signals that the final
///          field accepts a set of values, not a scalar.
/// Item   → an item identifier inside a relation enumeration. `suppressed`
///          records a parenthesized ordinal, meaning the index must not be
///          surfaced in the public field name. The marker is write-once:
///          `decode` strips it, `encode` never re-adds it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathSegment {
    Empty,
    Field(String),
    Item { id: u64, suppressed: bool },
    Pivot,
}

impl PathSegment {
    /// Classify one raw path component.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::Empty;
        }
        if raw == PIVOT {
            return Self::Pivot;
        }

        let (digits, suppressed) = match raw.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            Some(inner) => (inner, true),
            None => (raw, false),
        };

        match digits.parse::<u64>() {
            Ok(id) => Self::Item { id, suppressed },
            Err(_) => Self::Field(raw.to_string()),
        }
    }

    /// Returns true for the trailing multi-value marker.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The key this segment contributes to a nested structure.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Field(name) => write!(f, "{name}"),
            Self::Item { id, .. } => write!(f, "{id}"),
            Self::Pivot => write!(f, "{PIVOT}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(raw: &str) -> Self {
        Self::classify(raw)
    }
}

impl From<u64> for PathSegment {
    fn from(id: u64) -> Self {
        Self::Item {
            id,
            suppressed: false,
        }
    }
}

/// Split a dot-delimited path into classified segments.
///
/// A path ending in "." yields a final `Empty` segment. Parenthesized
/// index-suppression markers are stripped here and never restored.
#[must_use]
pub fn decode(path: &str) -> Vec<PathSegment> {
    path.split('.').map(PathSegment::classify).collect()
}

/// Join segments back into a dot-delimited path.
///
/// Item identifiers render as their literal text; a trailing `Empty`
/// segment renders as the trailing-dot multi-value notation.
#[must_use]
pub fn encode(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Render `a.b.c` as `a[b][c]` for collaborators that expect bracketed
/// array syntax. Boundary translation only; brackets carry no meaning
/// inside the core.
#[must_use]
pub fn bracketize(path: &str) -> String {
    let mut parts = path.split('.');
    let Some(head) = parts.next() else {
        return String::new();
    };

    let mut out = String::from(head);
    for part in parts {
        out.push('[');
        out.push_str(part);
        out.push(']');
    }

    out
}
