#[cfg(test)]
mod tests;

use crate::{
    pathmap::PathMap,
    sniff::{Classification, LiteralSniffer, ValueSniffer},
    trace::{ShapeTraceEvent, ShapeTraceSink, emit},
    value::{Value, ValueMap},
};
use std::sync::Arc;

/// Maximum number of hops the number-field locator may take.
pub const MAX_LOCATOR_HOPS: usize = 3;

///
/// FlattenConfig
///
/// Startup-time configuration for the flattener. Immutable once built.
///

#[derive(Clone, Debug)]
pub struct FlattenConfig {
    /// Display-only duplicate suffix stripped before paths are formed,
    /// so the duplicate collapses onto the canonical path.
    pub formatted_suffix: Option<String>,

    /// Field-name prefix that triggers clock expansion.
    pub time_prefix: String,

    /// Locator walked into a related item to find its identifier when no
    /// explicit `id` attribute exists. Ignored when empty or longer than
    /// [`MAX_LOCATOR_HOPS`].
    pub number_field: Vec<String>,
}

impl FlattenConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_formatted_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.formatted_suffix = Some(suffix.into());
        self
    }

    #[must_use]
    pub fn without_formatted_suffix(mut self) -> Self {
        self.formatted_suffix = None;
        self
    }

    #[must_use]
    pub fn with_time_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.time_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_number_field<I, S>(mut self, hops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.number_field = hops.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            formatted_suffix: Some("_formatted".to_string()),
            time_prefix: "time".to_string(),
            number_field: Vec::new(),
        }
    }
}

///
/// RelationSelect
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RelationSelect {
    /// Flatten every field of each related item under `relation.id.`.
    FullRecord,
    /// Append one field per item to a positional list at `relation`.
    SingleField(String),
}

///
/// RelatedItem
///
/// One loaded item of a relation: its own fields plus, when the relation
/// goes through a junction table, the pivot fields for this link.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelatedItem {
    pub fields: ValueMap,
    pub pivot: Option<ValueMap>,
}

impl RelatedItem {
    #[must_use]
    pub fn new(fields: ValueMap) -> Self {
        Self {
            fields,
            pivot: None,
        }
    }

    #[must_use]
    pub fn with_pivot(mut self, pivot: ValueMap) -> Self {
        self.pivot = Some(pivot);
        self
    }
}

///
/// Relation
///

#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub name: String,
    pub select: RelationSelect,
    pub items: Vec<RelatedItem>,
}

impl Relation {
    #[must_use]
    pub fn full(name: impl Into<String>, items: Vec<RelatedItem>) -> Self {
        Self {
            name: name.into(),
            select: RelationSelect::FullRecord,
            items,
        }
    }

    #[must_use]
    pub fn single_field(
        name: impl Into<String>,
        field: impl Into<String>,
        items: Vec<RelatedItem>,
    ) -> Self {
        Self {
            name: name.into(),
            select: RelationSelect::SingleField(field.into()),
            items,
        }
    }
}

///
/// Flattener
///
/// Walks a nested record plus its declared relations and produces a flat
/// [`PathMap`]. Flattening never rejects a record: malformed JSON-looking
/// literals are kept as opaque scalars and everything else has a defined
/// path.
///

pub struct Flattener {
    config: FlattenConfig,
    sniffer: Box<dyn ValueSniffer>,
    trace: Option<Arc<dyn ShapeTraceSink>>,
}

impl Flattener {
    #[must_use]
    pub fn new(config: FlattenConfig) -> Self {
        Self {
            config,
            sniffer: Box::new(LiteralSniffer),
            trace: None,
        }
    }

    /// Substitute a stricter literal classifier.
    #[must_use]
    pub fn with_sniffer(mut self, sniffer: Box<dyn ValueSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    /// Install a trace sink for recovered-literal events.
    #[must_use]
    pub fn with_trace(mut self, sink: Arc<dyn ShapeTraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Flatten a record's own fields and its relations into a path map.
    #[must_use]
    pub fn flatten(&self, fields: &ValueMap, relations: &[Relation]) -> PathMap {
        self.flatten_with_prefix(fields, relations, "")
    }

    /// Flatten under an explicit path prefix.
    #[must_use]
    pub fn flatten_with_prefix(
        &self,
        fields: &ValueMap,
        relations: &[Relation],
        prefix: &str,
    ) -> PathMap {
        let mut out = PathMap::new();
        self.flatten_fields(&mut out, fields, prefix);

        for relation in relations {
            self.flatten_relation(&mut out, relation, prefix);
        }

        out
    }

    ///
    /// OWN FIELDS
    ///

    fn flatten_fields(&self, out: &mut PathMap, fields: &ValueMap, prefix: &str) {
        for (name, value) in fields.iter() {
            let name = self.canonical_name(name);
            let path = join(prefix, name);

            match value {
                Value::Map(_) | Value::List(_) => self.flatten_value(out, &path, value),
                _ => self.flatten_leaf(out, &path, name, value),
            }
        }
    }

    /// Strip the display-only duplicate suffix so the duplicate collapses
    /// onto the canonical path.
    fn canonical_name<'a>(&self, name: &'a str) -> &'a str {
        match &self.config.formatted_suffix {
            Some(suffix) if !suffix.is_empty() => name.strip_suffix(suffix.as_str()).unwrap_or(name),
            _ => name,
        }
    }

    fn flatten_leaf(&self, out: &mut PathMap, path: &str, name: &str, value: &Value) {
        match self.sniffer.classify(value) {
            Classification::Scalar => {
                out.insert(path, value.clone());
                self.expand_time(out, path, name, value);
            }
            kind => {
                let text = value.as_text().unwrap_or_default();
                match self.sniffer.parse(text, kind) {
                    // the raw literal is not emitted alongside the expansion
                    Ok(parsed) => self.flatten_value(out, path, &parsed),
                    Err(_) => {
                        emit(
                            self.trace.as_deref(),
                            ShapeTraceEvent::MalformedLiteral {
                                path: path.to_string(),
                            },
                        );
                        out.insert(path, value.clone());
                    }
                }
            }
        }
    }

    fn flatten_value(&self, out: &mut PathMap, path: &str, value: &Value) {
        match value {
            Value::Map(map) => {
                for (key, nested) in map.iter() {
                    self.flatten_value(out, &format!("{path}.{key}"), nested);
                }
            }
            Value::List(items) if items.iter().all(Value::is_scalar) => {
                // multi-value field: trailing-dot path holding the list
                out.insert(format!("{path}."), Value::List(items.clone()));
            }
            Value::List(items) => {
                for (position, item) in items.iter().enumerate() {
                    self.flatten_value(out, &format!("{path}.{}", position + 1), item);
                }
            }
            leaf => {
                let name = path.rsplit('.').next().unwrap_or(path);
                self.flatten_leaf(out, path, name, leaf);
            }
        }
    }

    ///
    /// TIME EXPANSION
    ///
    /// Additive: the original path keeps its value; three synthetic
    /// sibling paths carry the 12-hour rendering.
    ///

    /// A field participates in clock expansion when its name begins with
    /// the configured prefix or carries it as an underscore-separated
    /// component (`time_open`, `meeting_time`).
    fn is_time_field(&self, name: &str) -> bool {
        let prefix = self.config.time_prefix.as_str();
        if prefix.is_empty() {
            return false;
        }

        name.starts_with(prefix) || name.contains(&format!("_{prefix}"))
    }

    fn expand_time(&self, out: &mut PathMap, path: &str, name: &str, value: &Value) {
        if !self.is_time_field(name) {
            return;
        }
        let Some(text) = value.as_text() else {
            return;
        };
        if !text.contains(':') {
            return;
        }

        let mut parts = text.split(':');
        let Some(hour) = parts.next().and_then(|h| h.parse::<u32>().ok()) else {
            return;
        };
        let minutes = parts.next().unwrap_or("");

        let meridiem = if hour >= 12 { "pm" } else { "am" };
        let display_hour = match hour % 12 {
            0 => 12,
            h => h,
        };

        out.insert(format!("{path}_hour"), display_hour.to_string());
        out.insert(format!("{path}_minutes"), minutes.to_string());
        out.insert(format!("{path}_meridiem"), meridiem.to_string());
    }

    ///
    /// RELATIONS
    ///

    fn flatten_relation(&self, out: &mut PathMap, relation: &Relation, prefix: &str) {
        let path = join(prefix, &relation.name);

        match &relation.select {
            RelationSelect::SingleField(field) => {
                for item in &relation.items {
                    if let Some(value) = item.fields.get(field) {
                        out.push_at(&path, value.clone());
                    }
                }
            }
            RelationSelect::FullRecord => {
                for (position, item) in relation.items.iter().enumerate() {
                    let id = self.item_id(item, position);
                    let item_prefix = format!("{path}.{id}");

                    self.flatten_fields(out, &item.fields, &item_prefix);

                    // junction fields live under a single `pivot` segment
                    if let Some(pivot) = &item.pivot {
                        self.flatten_fields(out, pivot, &format!("{item_prefix}.pivot"));
                    }
                }
            }
        }
    }

    /// Identifier priority: explicit `id` attribute, then the number-field
    /// locator, then the 1-based position.
    fn item_id(&self, item: &RelatedItem, position: usize) -> u64 {
        if let Some(id) = item.fields.get("id").and_then(Value::as_item_id) {
            return id;
        }
        if let Some(id) = self.locate_number(&item.fields) {
            return id;
        }

        (position as u64) + 1
    }

    fn locate_number(&self, fields: &ValueMap) -> Option<u64> {
        let hops = &self.config.number_field;
        if hops.is_empty() || hops.len() > MAX_LOCATOR_HOPS {
            return None;
        }

        let mut current = fields.get(hops[0].as_str())?;
        for hop in &hops[1..] {
            current = current.as_map()?.get(hop.as_str())?;
        }

        current.as_item_id()
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
