use crate::value::Value;
use derive_more::{Deref, IntoIterator};
use indexmap::IndexMap;
use serde::Serialize;

///
/// PathMap
///
/// Ordered mapping from a dot-delimited path to a leaf value.
///
/// Invariants:
/// - no two paths are structurally identical (`insert` replaces)
/// - paths are case-sensitive
/// - a trailing "." on the final segment marks a multi-value field whose
///   value is a list, not a scalar
///
/// Instances are created per form-population operation and caller-owned;
/// no shared state.
///

#[repr(transparent)]
#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PathMap(IndexMap<String, Value>);

impl PathMap {
    /// Create an empty path map.
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Insert a leaf value, replacing any previous value at `path`.
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(path.into(), value.into());
    }

    /// Return the leaf value at `path`, if present.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.0.get(path)
    }

    /// Returns true if a value exists at `path`.
    #[must_use]
    pub fn contains_path(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Append a scalar to the positional list at `path`, creating the
    /// list on first use. Used by single-field relation flattening.
    pub fn push_at(&mut self, path: &str, value: Value) {
        match self.0.get_mut(path) {
            Some(Value::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Value::List(vec![first, value]);
            }
            None => {
                self.0.insert(path.to_string(), Value::List(vec![value]));
            }
        }
    }
}

impl FromIterator<(String, Value)> for PathMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
