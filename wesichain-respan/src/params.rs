use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-call logging options supplied alongside a wrapped SDK call.
///
/// Empty strings are treated the same as absent values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogParams {
    /// Skip interception entirely for this call.
    pub disable_log: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_workflow_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_unique_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_unique_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_identifier: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl LogParams {
    pub fn disabled() -> Self {
        Self {
            disable_log: true,
            ..Self::default()
        }
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}
