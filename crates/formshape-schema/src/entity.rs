//! Entity-type capability surface and the injectable type registry.
//!
//! Declarations are made once, at the application's composition root, and
//! are immutable afterwards. Cross-type `class:` dereferencing goes
//! through the registry rather than any language-level static.

use indexmap::IndexMap;
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, RwLock},
};
use thiserror::Error as ThisError;

///
/// RegistryError
///

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("entity type already registered: {0}")]
    DuplicateEntityType(String),
}

///
/// SetSpec
///
/// Raw, per-entity-type attribute-set declaration.
///
/// Tokens  → ordered attribute token list (`name`, `select:name`,
///           `attribute:name`, `set:name`, `class:Type;name`).
/// Related → relation name → token describing nested field selection,
///           used to narrow eager-loaded relations.
///

#[derive(Clone, Debug, Serialize)]
pub enum SetSpec {
    Tokens(Vec<String>),
    Related(IndexMap<String, String>),
}

///
/// EntityKind
///
/// Capability surface an entity type exposes to the resolution engine.
/// Implementers register themselves in an [`EntityTypeRegistry`] at
/// startup.
///

pub trait EntityKind: Send + Sync {
    /// Schema identity of the type.
    fn type_name(&self) -> &str;

    /// Storage prefix used to qualify column names.
    fn storage_prefix(&self) -> &str;

    /// Raw declaration for `(set name, related flag)`, if any.
    fn attribute_set(&self, name: &str, related: bool) -> Option<&SetSpec>;

    /// Whether `name` is a registered computed/included method.
    fn has_method(&self, name: &str) -> bool;

    /// Target entity-type name of a relation accessor.
    fn relation_target(&self, relation: &str) -> Option<&str>;

    /// Whether `name` is a declared relation accessor.
    fn is_relation(&self, name: &str) -> bool {
        self.relation_target(name).is_some()
    }
}

///
/// EntityType
///
/// Builder-declared entity type. Most applications declare their types
/// with this; anything implementing [`EntityKind`] works equally.
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EntityType {
    name: String,
    storage_prefix: String,
    sets: BTreeMap<String, SetSpec>,
    related_sets: BTreeMap<String, SetSpec>,
    methods: BTreeSet<String>,
    relations: BTreeMap<String, String>,
}

impl EntityType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();

        Self {
            storage_prefix: name.to_lowercase(),
            name,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = prefix.into();
        self
    }

    /// Declare an ordered attribute set.
    #[must_use]
    pub fn with_set<I, S>(mut self, name: impl Into<String>, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sets.insert(
            name.into(),
            SetSpec::Tokens(tokens.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Declare a related set used to narrow eager-loaded relations.
    #[must_use]
    pub fn with_related_set<I, K, V>(mut self, name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.related_sets.insert(
            name.into(),
            SetSpec::Related(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        );
        self
    }

    /// Register a computed/included method name.
    #[must_use]
    pub fn with_method(mut self, name: impl Into<String>) -> Self {
        self.methods.insert(name.into());
        self
    }

    /// Declare a relation accessor and its target entity type.
    #[must_use]
    pub fn with_relation(
        mut self,
        accessor: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.relations.insert(accessor.into(), target.into());
        self
    }
}

impl EntityKind for EntityType {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn storage_prefix(&self) -> &str {
        &self.storage_prefix
    }

    fn attribute_set(&self, name: &str, related: bool) -> Option<&SetSpec> {
        if related {
            self.related_sets.get(name)
        } else {
            self.sets.get(name)
        }
    }

    fn has_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }

    fn relation_target(&self, relation: &str) -> Option<&str> {
        self.relations.get(relation).map(String::as_str)
    }
}

///
/// EntityTypeRegistry
///
/// Injectable table of registered entity types, owned by the composition
/// root. Populated at startup; reads afterwards are lock-cheap and the
/// table never changes during a process lifetime except through the
/// explicit test hooks.
///

#[derive(Default)]
pub struct EntityTypeRegistry {
    types: RwLock<BTreeMap<String, Arc<dyn EntityKind>>>,
}

impl EntityTypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type. Duplicate names are a configuration
    /// error surfaced at startup.
    pub fn register(&self, kind: Arc<dyn EntityKind>) -> Result<(), RegistryError> {
        let name = kind.type_name().to_string();
        let mut types = self
            .types
            .write()
            .expect("entity registry poisoned while registering");

        if types.contains_key(&name) {
            return Err(RegistryError::DuplicateEntityType(name));
        }
        types.insert(name, kind);

        Ok(())
    }

    /// Look up a registered type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn EntityKind>> {
        self.types
            .read()
            .expect("entity registry poisoned while reading")
            .get(name)
            .cloned()
    }

    /// Drop every registration. Test hook.
    pub fn clear(&self) {
        self.types
            .write()
            .expect("entity registry poisoned while clearing")
            .clear();
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_declares_capabilities() {
        let order = EntityType::new("Order")
            .with_storage_prefix("orders")
            .with_set("mini", ["id", "status"])
            .with_method("total_display")
            .with_relation("lines", "OrderLine");

        assert_eq!(order.type_name(), "Order");
        assert_eq!(order.storage_prefix(), "orders");
        assert!(order.attribute_set("mini", false).is_some());
        assert!(order.attribute_set("mini", true).is_none());
        assert!(order.has_method("total_display"));
        assert_eq!(order.relation_target("lines"), Some("OrderLine"));
        assert!(order.is_relation("lines"));
        assert!(!order.is_relation("status"));
    }

    #[test]
    fn storage_prefix_defaults_to_lowercased_name() {
        assert_eq!(EntityType::new("Order").storage_prefix(), "order");
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let registry = EntityTypeRegistry::new();
        registry
            .register(Arc::new(EntityType::new("Order")))
            .unwrap();

        let err = registry
            .register(Arc::new(EntityType::new("Order")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateEntityType(_)));
    }

    #[test]
    fn clear_drops_registrations() {
        let registry = EntityTypeRegistry::new();
        registry
            .register(Arc::new(EntityType::new("Order")))
            .unwrap();
        registry.clear();

        assert!(registry.get("Order").is_none());
    }
}
