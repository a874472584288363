//! Effective-value resolution for one field path.
//!
//! The resolver consults collaborators that are already materialized in
//! memory; nothing here blocks or performs I/O.

use crate::{pathmap::PathMap, tree, value::Value};

///
/// RequestDataProvider
///
/// Current submitted values. `get` must return `None` for absent paths
/// and never panic; implementations are expected to consult query
/// parameters for the exact path even when the submitted body is empty.
///

pub trait RequestDataProvider {
    fn get(&self, path: &str) -> Option<Value>;

    fn all(&self) -> Value;
}

///
/// EchoProvider
///
/// Values from the previous request, redisplayed after a failed
/// submission. Same shape as the request provider; used only as a
/// fallback.
///

pub trait EchoProvider {
    fn get(&self, path: &str) -> Option<Value>;

    fn all(&self) -> Value;
}

///
/// ValidationLookup
///
/// Validation messages keyed by the same path scheme. Consulted by
/// label/error collaborators outside this crate.
///

pub trait ValidationLookup {
    fn message_for(&self, path: &str) -> Option<String>;
}

///
/// ResolveOptions
///

#[derive(Clone, Copy, Debug, Default)]
pub struct ResolveOptions {
    /// Coerce the resolved value to a boolean: non-empty/non-null → true.
    pub checkbox: bool,
}

///
/// ValueResolver
///
/// Priority order, first match wins:
/// 1. submitted request data (skipped when `reset` is set)
/// 2. non-empty previous-request echo data
/// 3. the stored default path map, navigated as a tree
/// 4. empty string (or a coerced boolean under checkbox semantics)
///

pub struct ValueResolver<'a> {
    request: &'a dyn RequestDataProvider,
    echo: &'a dyn EchoProvider,
    defaults: Value,
    reset: bool,
    debug: bool,
}

impl<'a> ValueResolver<'a> {
    #[must_use]
    pub fn new(
        request: &'a dyn RequestDataProvider,
        echo: &'a dyn EchoProvider,
        defaults: &PathMap,
    ) -> Self {
        Self {
            request,
            echo,
            defaults: tree::unflatten(defaults),
            reset: false,
            debug: false,
        }
    }

    /// Ignore submitted data and fall through to defaults.
    #[must_use]
    pub const fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The effective value at `path`.
    #[must_use]
    pub fn value(&self, path: &str) -> Value {
        self.value_with(path, ResolveOptions::default())
    }

    #[must_use]
    pub fn value_with(&self, path: &str, options: ResolveOptions) -> Value {
        let resolved = self.resolve(path);

        if options.checkbox {
            return Value::Bool(resolved.as_ref().is_some_and(Value::is_truthy));
        }

        resolved.unwrap_or_else(|| Value::Text(String::new()))
    }

    fn resolve(&self, path: &str) -> Option<Value> {
        if !self.reset
            && let Some(value) = self.request.get(path)
        {
            self.debug_log(|| format!("resolve {path}: submitted"));
            return Some(value);
        }

        if let Some(value) = self.echo.get(path)
            && value.is_empty() != Some(true)
        {
            self.debug_log(|| format!("resolve {path}: echo"));
            return Some(value);
        }

        let stored = tree::extract_at(&self.defaults, path);
        if !stored.is_null() {
            self.debug_log(|| format!("resolve {path}: default"));
            return Some(stored.clone());
        }

        self.debug_log(|| format!("resolve {path}: empty"));
        None
    }

    fn debug_log(&self, s: impl Fn() -> String) {
        if self.debug {
            println!("[debug] {}", s());
        }
    }
}

///
/// TESTS
///
