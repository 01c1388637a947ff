//! Records held by the stores.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Filter bar state: field -> value.
///
/// Stores hold `Option<Filter>`; `None` means the filter bar is hidden,
/// an empty map means it is open with no constraints.
pub type Filter = Map<String, Value>;

/// A server record. Only `id` is interpreted; every other field is kept
/// verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceItem {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Shared, immutable record handed out by store getters
pub type Item = Arc<ResourceItem>;

impl ResourceItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }
}
