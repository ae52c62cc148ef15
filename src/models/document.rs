//! Loosely typed document values as they come back from the preference store.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

pub type Document = BTreeMap<String, DocValue>;

/// A single stored field value.
///
/// Mirrors the value kinds a document database hands back, including the ones plain JSON
/// has no notion of. Serializing never fails: timestamps become RFC 3339 strings, and values
/// JSON cannot represent fall back to their textual form.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<DocValue>),
    Map(Document),
    /// A kind with no JSON counterpart (reference, geo point, bytes), kept as text.
    Opaque(String),
}

impl DocValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => DocValue::Null,
            Value::Bool(b) => DocValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DocValue::Integer(i),
                None => DocValue::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => DocValue::String(s),
            Value::Array(items) => DocValue::Array(items.into_iter().map(Self::from_json).collect()),
            Value::Object(fields) => DocValue::Map(
                fields.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            DocValue::Null => Value::Null,
            DocValue::Bool(b) => Value::Bool(*b),
            DocValue::Integer(i) => Value::from(*i),
            DocValue::Double(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            DocValue::String(s) => Value::String(s.clone()),
            DocValue::Timestamp(ts) => Value::String(format_timestamp(ts)),
            DocValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            DocValue::Map(fields) => {
                Value::Object(fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
            DocValue::Opaque(text) => Value::String(text.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integers as-is; doubles truncated, since counters written by other clients may
    /// arrive as floating point.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DocValue::Integer(i) => Some(*i),
            DocValue::Double(f) if f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Document> {
        match self {
            DocValue::Map(fields) => Some(fields),
            _ => None,
        }
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl Serialize for DocValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DocValue::Null => serializer.serialize_unit(),
            DocValue::Bool(b) => serializer.serialize_bool(*b),
            DocValue::Integer(i) => serializer.serialize_i64(*i),
            DocValue::Double(f) if f.is_finite() => serializer.serialize_f64(*f),
            DocValue::Double(f) => serializer.serialize_str(&f.to_string()),
            DocValue::String(s) => serializer.serialize_str(s),
            DocValue::Timestamp(ts) => serializer.serialize_str(&format_timestamp(ts)),
            DocValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DocValue::Map(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            DocValue::Opaque(text) => serializer.serialize_str(text),
        }
    }
}

impl From<&str> for DocValue {
    fn from(value: &str) -> Self {
        DocValue::String(value.to_string())
    }
}

impl From<String> for DocValue {
    fn from(value: String) -> Self {
        DocValue::String(value)
    }
}

impl From<i64> for DocValue {
    fn from(value: i64) -> Self {
        DocValue::Integer(value)
    }
}

impl From<DateTime<Utc>> for DocValue {
    fn from(value: DateTime<Utc>) -> Self {
        DocValue::Timestamp(value)
    }
}

/// Merges `update` into `target` the way a merge-write does: nested maps are combined key by
/// key, every other value replaces what was there.
pub fn merge_document(target: &mut Document, update: Document) {
    for (key, value) in update {
        match (target.get_mut(&key), value) {
            (Some(DocValue::Map(existing)), DocValue::Map(incoming)) if !incoming.is_empty() => {
                merge_document(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn timestamps_serialize_as_rfc3339_and_repeat_identically() {
        let mut doc = Document::new();
        doc.insert("last_updated".into(), DocValue::Timestamp(sample_ts()));

        let first = serde_json::to_string(&doc).unwrap();
        let second = serde_json::to_string(&doc).unwrap();
        assert_eq!(first, r#"{"last_updated":"2024-05-01T12:30:00Z"}"#);
        assert_eq!(first, second);
    }

    #[test]
    fn non_json_values_fall_back_to_text() {
        let value = DocValue::Array(vec![
            DocValue::Double(f64::NAN),
            DocValue::Opaque("projects/p/databases/(default)/documents/x/y".into()),
        ]);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!(["NaN", "projects/p/databases/(default)/documents/x/y"])
        );
        assert_eq!(value.to_json(), serde_json::to_value(&value).unwrap());
    }

    #[test]
    fn json_conversion_keeps_shape() {
        let source = json!({
            "tone": "humorous",
            "length_in_words": 120,
            "ratio": 0.5,
            "tags": ["a", null, true],
        });
        let value = DocValue::from_json(source.clone());
        assert_eq!(value.as_map().unwrap()["length_in_words"], DocValue::Integer(120));
        assert_eq!(value.as_map().unwrap()["ratio"], DocValue::Double(0.5));
        assert_eq!(value.to_json(), source);
    }

    #[test]
    fn merge_combines_nested_maps_and_replaces_scalars() {
        let mut target = Document::new();
        target.insert("preferred_tone".into(), "neutral".into());
        target.insert(
            "feedback_counts".into(),
            DocValue::Map(Document::from([
                ("love".to_string(), DocValue::Integer(2)),
                ("meh".to_string(), DocValue::Integer(1)),
            ])),
        );

        let mut update = Document::new();
        update.insert("preferred_tone".into(), "adventurous".into());
        update.insert(
            "feedback_counts".into(),
            DocValue::Map(Document::from([("love".to_string(), DocValue::Integer(3))])),
        );
        merge_document(&mut target, update);

        assert_eq!(target["preferred_tone"], DocValue::from("adventurous"));
        let counts = target["feedback_counts"].as_map().unwrap();
        assert_eq!(counts["love"], DocValue::Integer(3));
        assert_eq!(counts["meh"], DocValue::Integer(1));
    }

    #[test]
    fn double_counters_read_as_integers() {
        assert_eq!(DocValue::Double(4.0).as_i64(), Some(4));
        assert_eq!(DocValue::Double(f64::INFINITY).as_i64(), None);
        assert_eq!(DocValue::from("4").as_i64(), None);
    }
}
