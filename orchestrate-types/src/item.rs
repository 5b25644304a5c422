//! Tagged item and list body shapes.
//!
//! Every result returned by a list, search, history or graph query has the
//! same envelope: a `path` object identifying the record (and carrying the
//! `kind` discriminant) plus a `value` object with the payload.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One end of a graph edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEnd {
    pub collection: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl EdgeEnd {
    /// Creates an edge end pointing at a key-value item.
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
            kind: None,
        }
    }
}

/// The `path` object of a tagged item.
///
/// `kind` is kept as a raw string: unknown kinds must survive parsing so the
/// caller can count and skip them instead of failing the whole page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPath {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reftime: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tombstone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EdgeEnd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<EdgeEnd>,
}

/// A raw tagged item as it appears in a `results` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub path: ItemPath,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reftime: Option<i64>,
}

impl RawItem {
    /// Parses one entry of a `results` array.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::InvalidPayload(format!(
                "result item must be an object, got {value}"
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Returns the discriminant, if any.
    pub fn kind(&self) -> Option<&str> {
        self.path.kind.as_deref()
    }
}

// Tombstones in ref histories carry `"value": null`.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The body of a list-shaped response.
///
/// Results are left as raw JSON so that a single malformed entry can be
/// skipped without rejecting the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListBody {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregates: Vec<Value>,
}

impl ListBody {
    /// Parses a list body. A missing or `null` body yields an empty list.
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(v @ Value::Object(_)) => Ok(serde_json::from_value(v.clone())?),
            Some(other) => Err(Error::InvalidPayload(format!(
                "list body must be an object, got {other}"
            ))),
        }
    }

    /// The next-page cursor, with empty strings treated as absent.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next.as_deref().filter(|s| !s.is_empty())
    }

    /// The previous-page cursor, with empty strings treated as absent.
    pub fn prev_cursor(&self) -> Option<&str> {
        self.prev.as_deref().filter(|s| !s.is_empty())
    }
}
