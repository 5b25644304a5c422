//! Patch operation lists.
//!
//! A patch body is an ordered array of operations applied atomically by the
//! server. Field paths use dot notation (`"address.city"`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One structural patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// Builder for an ordered list of patch operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchBuilder {
    operations: Vec<PatchOp>,
}

impl PatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, creating intermediate objects as needed.
    #[must_use]
    pub fn add(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push("add", path, Some(value.into()), None)
    }

    #[must_use]
    pub fn remove(self, path: impl Into<String>) -> Self {
        self.push("remove", path, None, None)
    }

    /// Replaces an existing field; fails server-side if it is missing.
    #[must_use]
    pub fn replace(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push("replace", path, Some(value.into()), None)
    }

    #[must_use]
    pub fn move_field(self, from: impl Into<String>, path: impl Into<String>) -> Self {
        self.push("move", path, None, Some(from.into()))
    }

    #[must_use]
    pub fn copy_field(self, from: impl Into<String>, path: impl Into<String>) -> Self {
        self.push("copy", path, None, Some(from.into()))
    }

    /// Aborts the whole patch unless the field equals `value`.
    #[must_use]
    pub fn test(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push("test", path, Some(value.into()), None)
    }

    /// Increments (or decrements, with a negative amount) a numeric field.
    #[must_use]
    pub fn inc(self, path: impl Into<String>, amount: impl Into<Value>) -> Self {
        self.push("inc", path, Some(amount.into()), None)
    }

    /// Sets a field only if it does not exist yet.
    #[must_use]
    pub fn init(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push("init", path, Some(value.into()), None)
    }

    /// Deep-merges an object into a field.
    #[must_use]
    pub fn merge(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push("merge", path, Some(value.into()), None)
    }

    /// Appends to an array field.
    #[must_use]
    pub fn append(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push("append", path, Some(value.into()), None)
    }

    pub fn operations(&self) -> &[PatchOp] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The JSON body sent with the request.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.operations).unwrap_or(Value::Array(Vec::new()))
    }

    fn push(
        mut self,
        op: &str,
        path: impl Into<String>,
        value: Option<Value>,
        from: Option<String>,
    ) -> Self {
        self.operations.push(PatchOp {
            op: op.to_string(),
            path: path.into(),
            value,
            from,
        });
        self
    }
}
