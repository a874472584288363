//! Output projection: restricted column lists for query construction and
//! attribute pruning of serialized records.

use crate::set::{AttributeDescriptor, DescriptorMap, RelatedMap, RelatedSelection};
use convert_case::{Case, Casing};
use formshape_core::value::Value;

///
/// QueryCollaborator
///
/// Boundary contract for the database/query side. Implementations accept
/// a qualified column list to restrict a fetch, and a relation name plus
/// the narrowed column list for each eager load.
///

pub trait QueryCollaborator {
    fn select_columns(&mut self, columns: Vec<String>);

    fn eager_load(&mut self, relation: &str, columns: Vec<String>);
}

/// Qualified names of every stored column in the set.
///
/// Computed attributes and relation placeholders carry no column and are
/// skipped.
#[must_use]
pub fn restricted_columns(descriptors: &DescriptorMap) -> Vec<String> {
    descriptors
        .values()
        .filter(|d| !d.has_method && !d.is_relation)
        .map(|d| d.qualified_name.clone())
        .collect()
}

/// Remove every top-level key not present in the active set.
///
/// Matching is case/separator-insensitive. Fetch-only (`select_only`)
/// attributes never appear in the output. An empty descriptor map means
/// "no attribute set": the record passes through unchanged.
#[must_use]
pub fn prune(serialized: &Value, descriptors: &DescriptorMap) -> Value {
    if descriptors.is_empty() {
        return serialized.clone();
    }
    let Some(map) = serialized.as_map() else {
        return serialized.clone();
    };

    let kept = map
        .iter()
        .filter(|(key, _)| {
            lookup(descriptors, key).is_some_and(|descriptor| !descriptor.select_only)
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Value::Map(kept)
}

/// Apply [`prune`] to each item of a related collection (or to a single
/// related record) before it is embedded in the parent's serialized form.
#[must_use]
pub fn narrow_relation(related_descriptors: &DescriptorMap, relation_value: &Value) -> Value {
    match relation_value {
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| prune(item, related_descriptors))
                .collect(),
        ),
        Value::Map(_) => prune(relation_value, related_descriptors),
        other => other.clone(),
    }
}

/// Restrict a fetch to a resolved set and narrow its eager loads.
pub fn restrict_query(
    query: &mut dyn QueryCollaborator,
    attributes: &DescriptorMap,
    related: Option<&RelatedMap>,
) {
    query.select_columns(restricted_columns(attributes));

    if let Some(related) = related {
        for (relation, selection) in related {
            match selection {
                RelatedSelection::Fields(fields) => {
                    query.eager_load(relation, restricted_columns(fields));
                }
                RelatedSelection::Single(field) => {
                    query.eager_load(relation, vec![field.clone()]);
                }
            }
        }
    }
}

fn lookup<'a>(descriptors: &'a DescriptorMap, key: &str) -> Option<&'a AttributeDescriptor> {
    if let Some(found) = descriptors.get(key) {
        return Some(found);
    }

    // fold camelCase / snake_case / kebab-case spellings together
    let folded = key.to_case(Case::Flat);
    descriptors
        .iter()
        .find(|(name, _)| name.to_case(Case::Flat) == folded)
        .map(|(_, descriptor)| descriptor)
}

///
/// TESTS
///
