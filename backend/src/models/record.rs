//! Dynamic record model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the record id is exposed.
pub const ID_KEY: &str = "id";

/// A stored record: system-assigned id plus open field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Owner id recorded under `owner_field`.
    ///
    /// Missing keys and JSON `null` are absent. An empty string is present.
    /// Non-string values are compared by their JSON rendering.
    pub fn owner(&self, owner_field: &str) -> Option<String> {
        match self.data.get(owner_field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Apply a partial update, overwriting only the keys present in `patch`.
    pub fn merged_with(&self, patch: &Map<String, Value>) -> Map<String, Value> {
        let mut merged = self.data.clone();
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    pub fn to_value(&self) -> Value {
        let mut object = self.data.clone();
        object.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        Value::Object(object)
    }
}
