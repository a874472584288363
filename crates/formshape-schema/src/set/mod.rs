
use crate::entity::{EntityKind, EntityTypeRegistry, SetSpec};
use formshape_core::trace::{ShapeTraceEvent, ShapeTraceSink, emit};
use indexmap::IndexMap;
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, RwLock},
};

///
/// AttributeDescriptor
///
/// Resolved unit of an attribute set.
///
/// select_only   → fetch but never expose.
/// has_method    → computed/derived value rather than a stored column.
/// ignore_method → forced stored-column treatment even when a same-named
///                 computed value exists.
/// is_relation   → placeholder for a declared relation accessor; never a
///                 column.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AttributeDescriptor {
    pub bare_name: String,
    pub qualified_name: String,
    pub select_only: bool,
    pub has_method: bool,
    pub ignore_method: bool,
    pub is_relation: bool,
}

/// Resolved attribute entries keyed by bare name, in declaration order.
pub type DescriptorMap = IndexMap<String, AttributeDescriptor>;

/// Resolved related-set entries keyed by relation name.
pub type RelatedMap = IndexMap<String, RelatedSelection>;

///
/// RelatedSelection
///
/// What an eager-loaded relation is narrowed to: a resolved field set on
/// the target type, or one field per item (single-field mode).
///

#[derive(Clone, Debug, PartialEq)]
pub enum RelatedSelection {
    Fields(DescriptorMap),
    Single(String),
}

///
/// ResolvedSet
///

#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedSet {
    Attributes(DescriptorMap),
    Related(RelatedMap),
}

impl ResolvedSet {
    fn empty(related: bool) -> Self {
        if related {
            Self::Related(RelatedMap::new())
        } else {
            Self::Attributes(DescriptorMap::new())
        }
    }

    #[must_use]
    pub const fn as_attributes(&self) -> Option<&DescriptorMap> {
        if let Self::Attributes(map) = self {
            Some(map)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_related(&self) -> Option<&RelatedMap> {
        if let Self::Related(map) = self {
            Some(map)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Attributes(map) => map.is_empty(),
            Self::Related(map) => map.is_empty(),
        }
    }
}

///
/// SetKey
/// Memoization key: one cache slot per (type, set, related flag).
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct SetKey {
    pub entity: String,
    pub set: String,
    pub related: bool,
}

impl SetKey {
    #[must_use]
    pub fn new(entity: impl Into<String>, set: impl Into<String>, related: bool) -> Self {
        Self {
            entity: entity.into(),
            set: set.into(),
            related,
        }
    }
}

///
/// AttributeToken
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttributeToken {
    /// Ordinary stored attribute.
    Bare(String),
    /// Stored attribute, fetch-only.
    Select(String),
    /// Forced plain-attribute treatment.
    Attribute(String),
    /// Splice of another set, optionally through relation hops.
    Set { hops: Vec<String>, name: String },
    /// Splice of a set declared on another entity type.
    Class { entity: String, name: String },
}

impl AttributeToken {
    /// Classify one raw set-declaration entry.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if let Some(name) = raw.strip_prefix("select:") {
            return Self::Select(name.to_string());
        }
        if let Some(name) = raw.strip_prefix("attribute:") {
            return Self::Attribute(name.to_string());
        }
        if let Some(rest) = raw.strip_prefix("class:") {
            // a class token without its `;` separator degrades to a bare name
            if let Some((entity, name)) = rest.split_once(';') {
                return Self::Class {
                    entity: entity.to_string(),
                    name: name.to_string(),
                };
            }
            return Self::Bare(raw.to_string());
        }
        if let Some(idx) = raw.find("set:")
            && (idx == 0 || raw.as_bytes()[idx - 1] == b'.')
        {
            let hops = raw[..idx]
                .split('.')
                .filter(|hop| !hop.is_empty())
                .map(ToString::to_string)
                .collect();

            return Self::Set {
                hops,
                name: raw[idx + 4..].to_string(),
            };
        }

        Self::Bare(raw.to_string())
    }
}

///
/// AttributeSetRegistry
///
/// Read-mostly memoization table over the entity-type registry. The
/// first resolution of a key expands every `set:`/`class:` reference,
/// then stores the fully expanded result; later resolutions are pure
/// reads. Population is compute-once: the write lock guards only the
/// store step, and the first writer wins under concurrent first-access.
///
/// Unknown references contribute zero entries. A reference that
/// re-enters a set currently being expanded contributes zero entries as
/// well, so cyclic declarations terminate. Cycle-tainted results are
/// recomputed per call instead of cached — only fully expanded sets
/// enter the cache, and each resolution root sees a deterministic
/// result. Both conditions surface on the trace sink.
///

pub struct AttributeSetRegistry {
    types: Arc<EntityTypeRegistry>,
    cache: RwLock<BTreeMap<SetKey, Arc<ResolvedSet>>>,
    trace: Option<Arc<dyn ShapeTraceSink>>,
}

impl AttributeSetRegistry {
    #[must_use]
    pub fn new(types: Arc<EntityTypeRegistry>) -> Self {
        Self {
            types,
            cache: RwLock::new(BTreeMap::new()),
            trace: None,
        }
    }

    #[must_use]
    pub fn with_trace(mut self, sink: Arc<dyn ShapeTraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Resolve a named set for an entity type, memoized.
    #[must_use]
    pub fn resolve(&self, entity: &str, set: &str, related: bool) -> Arc<ResolvedSet> {
        let mut in_flight = BTreeSet::new();
        let mut tainted = false;
        self.resolve_key(&SetKey::new(entity, set, related), &mut in_flight, &mut tainted)
    }

    /// Drop every cached resolution. Test hook.
    pub fn clear(&self) {
        self.cache
            .write()
            .expect("set cache poisoned while clearing")
            .clear();
    }

    /// Drop one cached resolution.
    pub fn invalidate(&self, entity: &str, set: &str, related: bool) {
        self.cache
            .write()
            .expect("set cache poisoned while invalidating")
            .remove(&SetKey::new(entity, set, related));
    }

    fn resolve_key(
        &self,
        key: &SetKey,
        in_flight: &mut BTreeSet<SetKey>,
        tainted: &mut bool,
    ) -> Arc<ResolvedSet> {
        if let Some(hit) = self
            .cache
            .read()
            .expect("set cache poisoned while reading")
            .get(key)
        {
            self.emit_resolved(key, true);
            return hit.clone();
        }

        if in_flight.contains(key) {
            emit(
                self.trace.as_deref(),
                ShapeTraceEvent::CyclicSetReference {
                    entity: key.entity.clone(),
                    set: key.set.clone(),
                },
            );
            // the re-entered edge contributes nothing
            *tainted = true;
            return Arc::new(ResolvedSet::empty(key.related));
        }

        in_flight.insert(key.clone());
        let mut local_taint = false;
        let resolved = Arc::new(self.expand(key, in_flight, &mut local_taint));
        in_flight.remove(key);

        self.emit_resolved(key, false);

        // only fully expanded results enter the cache
        if local_taint {
            *tainted = true;
            return resolved;
        }

        let mut cache = self
            .cache
            .write()
            .expect("set cache poisoned while populating");
        cache.entry(key.clone()).or_insert(resolved).clone()
    }

    fn expand(
        &self,
        key: &SetKey,
        in_flight: &mut BTreeSet<SetKey>,
        tainted: &mut bool,
    ) -> ResolvedSet {
        let Some(kind) = self.types.get(&key.entity) else {
            self.emit_unknown(&key.entity, &key.set);
            return ResolvedSet::empty(key.related);
        };
        let Some(spec) = kind.attribute_set(&key.set, key.related).cloned() else {
            self.emit_unknown(&key.entity, &key.set);
            return ResolvedSet::empty(key.related);
        };

        match (key.related, spec) {
            (false, SetSpec::Tokens(tokens)) => ResolvedSet::Attributes(self.expand_tokens(
                kind.as_ref(),
                &tokens,
                in_flight,
                tainted,
            )),
            (true, SetSpec::Related(entries)) => ResolvedSet::Related(self.expand_related(
                kind.as_ref(),
                &entries,
                in_flight,
                tainted,
            )),
            // declaration shape does not match the requested flag
            _ => {
                self.emit_unknown(&key.entity, &key.set);
                ResolvedSet::empty(key.related)
            }
        }
    }

    fn expand_tokens(
        &self,
        kind: &dyn EntityKind,
        tokens: &[String],
        in_flight: &mut BTreeSet<SetKey>,
        tainted: &mut bool,
    ) -> DescriptorMap {
        let mut out = DescriptorMap::new();

        for raw in tokens {
            match AttributeToken::parse(raw) {
                AttributeToken::Bare(name) => {
                    Self::splice_one(&mut out, Self::descriptor(kind, name, false, false));
                }
                AttributeToken::Select(name) => {
                    Self::splice_one(&mut out, Self::descriptor(kind, name, true, false));
                }
                AttributeToken::Attribute(name) => {
                    Self::splice_one(&mut out, Self::descriptor(kind, name, false, true));
                }
                AttributeToken::Set { hops, name } => {
                    let target = if hops.is_empty() {
                        Some(kind.type_name().to_string())
                    } else {
                        self.follow(kind, &hops)
                    };

                    match target {
                        Some(target) => {
                            let sub = self.resolve_key(
                                &SetKey::new(target, name, false),
                                in_flight,
                                tainted,
                            );
                            Self::splice_all(&mut out, sub.as_attributes());
                        }
                        None => self.emit_unknown(kind.type_name(), raw),
                    }
                }
                AttributeToken::Class { entity, name } => {
                    let sub =
                        self.resolve_key(&SetKey::new(entity, name, false), in_flight, tainted);
                    Self::splice_all(&mut out, sub.as_attributes());
                }
            }
        }

        out
    }

    fn expand_related(
        &self,
        kind: &dyn EntityKind,
        entries: &IndexMap<String, String>,
        in_flight: &mut BTreeSet<SetKey>,
        tainted: &mut bool,
    ) -> RelatedMap {
        let mut out = RelatedMap::new();

        for (relation, raw) in entries {
            match AttributeToken::parse(raw) {
                AttributeToken::Set { hops, name } => {
                    // the relation accessor is the first hop
                    let mut chain = vec![relation.clone()];
                    chain.extend(hops);

                    match self.follow(kind, &chain) {
                        Some(target) => {
                            let sub = self.resolve_key(
                                &SetKey::new(target, name, false),
                                in_flight,
                                tainted,
                            );
                            let fields = sub.as_attributes().cloned().unwrap_or_default();
                            out.insert(relation.clone(), RelatedSelection::Fields(fields));
                        }
                        None => self.emit_unknown(kind.type_name(), raw),
                    }
                }
                AttributeToken::Class { entity, name } => {
                    let sub =
                        self.resolve_key(&SetKey::new(entity, name, false), in_flight, tainted);
                    let fields = sub.as_attributes().cloned().unwrap_or_default();
                    out.insert(relation.clone(), RelatedSelection::Fields(fields));
                }
                AttributeToken::Bare(field)
                | AttributeToken::Select(field)
                | AttributeToken::Attribute(field) => {
                    out.insert(relation.clone(), RelatedSelection::Single(field));
                }
            }
        }

        out
    }

    /// Walk relation accessors to the entity type they land on.
    fn follow(&self, kind: &dyn EntityKind, chain: &[String]) -> Option<String> {
        let (first, rest) = chain.split_first()?;
        let mut target = kind.relation_target(first)?.to_string();

        for hop in rest {
            let next = self.types.get(&target)?;
            target = next.relation_target(hop)?.to_string();
        }

        Some(target)
    }

    fn descriptor(
        kind: &dyn EntityKind,
        bare: String,
        select_only: bool,
        ignore_method: bool,
    ) -> AttributeDescriptor {
        AttributeDescriptor {
            qualified_name: format!("{}.{}", kind.storage_prefix(), bare),
            has_method: !ignore_method && kind.has_method(&bare),
            is_relation: kind.is_relation(&bare),
            bare_name: bare,
            select_only,
            ignore_method,
        }
    }

    // first declaration wins; splices never duplicate an existing entry
    fn splice_one(out: &mut DescriptorMap, descriptor: AttributeDescriptor) {
        out.entry(descriptor.bare_name.clone()).or_insert(descriptor);
    }

    fn splice_all(out: &mut DescriptorMap, sub: Option<&DescriptorMap>) {
        if let Some(sub) = sub {
            for descriptor in sub.values() {
                Self::splice_one(out, descriptor.clone());
            }
        }
    }

    fn emit_resolved(&self, key: &SetKey, cached: bool) {
        emit(
            self.trace.as_deref(),
            ShapeTraceEvent::SetResolved {
                entity: key.entity.clone(),
                set: key.set.clone(),
                related: key.related,
                cached,
            },
        );
    }

    fn emit_unknown(&self, entity: &str, token: &str) {
        emit(
            self.trace.as_deref(),
            ShapeTraceEvent::UnknownSetReference {
                entity: entity.to_string(),
                token: token.to_string(),
            },
        );
    }
}
