use crate::value::Value;
use thiserror::Error as ThisError;

///
/// MalformedLiteral
///
/// A string looked like a JSON array/object per the heuristic but failed
/// to decode. Always recovered locally by the caller, which keeps the
/// value as an opaque scalar; never surfaced further.
///

#[derive(Debug, ThisError)]
#[error("malformed {kind:?} literal: {source}")]
pub struct MalformedLiteral {
    pub kind: Classification,
    #[source]
    pub source: serde_json::Error,
}

///
/// Classification
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Classification {
    Scalar,
    JsonArray,
    JsonObject,
}

///
/// ValueSniffer
///
/// Heuristic classifier for leaf values arriving from a record or a
/// posted form. A string starting `["` and ending `"]` is taken for a
/// JSON array; one wrapped in `{` `}` for a JSON object. This is a
/// deliberate prefix/suffix check, not a grammar check — a plain string
/// that merely looks the part classifies as a literal and is rescued by
/// the parse step failing over to `Classification::Scalar` handling.
///
/// The trait seam exists so a stricter classifier can replace the
/// heuristic without touching the flattener.
///

pub trait ValueSniffer {
    fn classify(&self, value: &Value) -> Classification;

    fn parse(&self, text: &str, kind: Classification) -> Result<Value, MalformedLiteral>;
}

///
/// LiteralSniffer
/// The default heuristic implementation.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct LiteralSniffer;

impl ValueSniffer for LiteralSniffer {
    fn classify(&self, value: &Value) -> Classification {
        let Some(text) = value.as_text() else {
            return Classification::Scalar;
        };

        if text.starts_with("[\"") && text.ends_with("\"]") {
            Classification::JsonArray
        } else if text.starts_with('{') && text.ends_with('}') {
            Classification::JsonObject
        } else {
            Classification::Scalar
        }
    }

    fn parse(&self, text: &str, kind: Classification) -> Result<Value, MalformedLiteral> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|source| MalformedLiteral { kind, source })?;

        Ok(Value::from_json(json))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn v_txt(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn classifies_array_and_object_literals() {
        let sniffer = LiteralSniffer;

        assert_eq!(
            sniffer.classify(&v_txt(r#"["a","b"]"#)),
            Classification::JsonArray
        );
        assert_eq!(
            sniffer.classify(&v_txt(r#"{"a":1}"#)),
            Classification::JsonObject
        );
        assert_eq!(sniffer.classify(&v_txt("plain")), Classification::Scalar);
        assert_eq!(sniffer.classify(&Value::Int(3)), Classification::Scalar);
    }

    #[test]
    fn heuristic_false_positive_fails_parse() {
        // looks like an array literal, is not JSON
        let sniffer = LiteralSniffer;
        let text = r#"["a" or "b"]"#;

        assert_eq!(sniffer.classify(&v_txt(text)), Classification::JsonArray);
        // the caller recovers by keeping the opaque scalar
        sniffer.parse(text, Classification::JsonArray).unwrap_err();
    }

    #[test]
    fn parse_decodes_into_value_union() {
        let sniffer = LiteralSniffer;

        let parsed = sniffer
            .parse(r#"{"a":1,"b":["x"]}"#, Classification::JsonObject)
            .unwrap();
        let map = parsed.as_map().unwrap();

        assert_eq!(map.get("a"), Some(&Value::Uint(1)));
        assert_eq!(
            map.get("b"),
            Some(&Value::List(vec![Value::Text("x".to_string())]))
        );
    }
}
