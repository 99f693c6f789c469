use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Captured;

/// Token accounting for one call or one assistant turn.
///
/// `input_tokens`/`output_tokens` are coalesced into `prompt_tokens`/
/// `completion_tokens`; every other key, the originals included, is kept as
/// the SDK reported it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Usage(Map<String, Value>);

impl Usage {
    /// Normalize a captured usage block. Anything that is not a mapping or
    /// typed object yields `None`.
    pub fn normalize(raw: &Captured) -> Option<Self> {
        match raw.to_json() {
            Value::Object(map) => Some(Self::from_map(map)),
            _ => None,
        }
    }

    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let prompt = coalesce(&map, "prompt_tokens", "input_tokens");
        let completion = coalesce(&map, "completion_tokens", "output_tokens");
        if let Some(prompt) = prompt {
            map.insert("prompt_tokens".to_string(), prompt);
        }
        if let Some(completion) = completion {
            map.insert("completion_tokens".to_string(), completion);
        }
        Self(map)
    }

    pub fn total_only(total: Value) -> Self {
        Self(Map::from_iter([("total_tokens".to_string(), total)]))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn prompt_tokens(&self) -> Option<&Value> {
        self.get("prompt_tokens")
    }

    pub fn completion_tokens(&self) -> Option<&Value> {
        self.get("completion_tokens")
    }

    pub fn total_tokens(&self) -> Option<&Value> {
        self.get("total_tokens")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

fn coalesce(map: &Map<String, Value>, primary: &str, synonym: &str) -> Option<Value> {
    [primary, synonym]
        .into_iter()
        .filter_map(|key| map.get(key))
        .find(|value| !value.is_null())
        .cloned()
}
