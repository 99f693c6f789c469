use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::params::non_empty;
use crate::{Integration, LogParams, PayloadError, Usage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Error => "error",
        }
    }
}

/// One log record as accepted by the ingest endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogPayload {
    pub span_workflow_name: String,
    pub span_name: String,
    pub log_type: String,
    pub start_time: DateTime<Utc>,
    /// End of the call, or of the stream for streamed results.
    pub timestamp: DateTime<Utc>,
    /// Seconds between `start_time` and `timestamp`.
    pub latency: f64,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_request_tokens: Option<u64>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Everything [`build_payload`] needs for one logical message.
#[derive(Clone, Debug)]
pub struct PayloadInput<'a> {
    pub integration: &'a Integration,
    pub operation: &'a str,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: Status,
    pub input: Option<&'a Value>,
    pub output: Option<&'a Value>,
    pub error_message: Option<&'a str>,
    pub params: &'a LogParams,
    /// Takes precedence over `params.span_name`.
    pub span_name: Option<&'a str>,
    /// Takes precedence over `params.session_identifier`.
    pub session_identifier: Option<&'a str>,
    pub usage: Option<&'a Usage>,
    /// Merged over the integration/method tags.
    pub metadata_extra: Map<String, Value>,
}

pub fn build_payload(input: PayloadInput<'_>) -> Result<LogPayload, PayloadError> {
    let params = input.params;
    let integration = input.integration;

    let span_workflow_name = non_empty(&params.span_workflow_name)
        .unwrap_or(&integration.name)
        .to_string();
    let span_name = input
        .span_name
        .filter(|name| !name.is_empty())
        .or_else(|| non_empty(&params.span_name))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}.{}", integration.name, input.operation));
    let log_type = non_empty(&params.log_type)
        .unwrap_or(&integration.log_type)
        .to_string();

    let trace_unique_id = non_empty(&params.trace_unique_id).map(str::to_string);
    let trace_name = trace_unique_id.as_ref().map(|_| {
        non_empty(&params.trace_name)
            .unwrap_or(&span_workflow_name)
            .to_string()
    });

    let session_identifier = input
        .session_identifier
        .filter(|session| !session.is_empty())
        .or_else(|| non_empty(&params.session_identifier))
        .map(str::to_string);

    let usage = input.usage.filter(|usage| !usage.is_empty()).cloned();
    let (prompt_tokens, completion_tokens, total_request_tokens) = match &usage {
        Some(usage) => (
            token_count("prompt_tokens", usage.prompt_tokens())?,
            token_count("completion_tokens", usage.completion_tokens())?,
            token_count("total_request_tokens", usage.total_tokens())?,
        ),
        None => (None, None, None),
    };

    let mut metadata = params.metadata.clone();
    metadata.insert(
        "integration".to_string(),
        Value::String(integration.name.clone()),
    );
    metadata.insert(
        "method".to_string(),
        Value::String(input.operation.to_string()),
    );
    metadata.extend(input.metadata_extra);

    Ok(LogPayload {
        span_workflow_name,
        span_name,
        log_type,
        start_time: input.start_time,
        timestamp: input.end_time,
        latency: latency_seconds(input.start_time, input.end_time),
        status: input.status,
        input: input.input.map(encode),
        output: input.output.map(encode),
        error_message: input
            .error_message
            .filter(|message| !message.is_empty())
            .map(str::to_string),
        trace_unique_id,
        trace_name,
        span_unique_id: non_empty(&params.span_unique_id).map(str::to_string),
        span_parent_id: non_empty(&params.span_parent_id).map(str::to_string),
        session_identifier,
        customer_identifier: non_empty(&params.customer_identifier).map(str::to_string),
        usage,
        prompt_tokens,
        completion_tokens,
        total_request_tokens,
        metadata,
    })
}

impl LogPayload {
    /// Check the record against the ingest schema before it is queued.
    pub fn validate(&self) -> Result<(), PayloadError> {
        require("span_workflow_name", &self.span_workflow_name)?;
        require("span_name", &self.span_name)?;
        require("log_type", &self.log_type)?;

        if !self.latency.is_finite() || self.latency < 0.0 {
            return Err(PayloadError::InvalidField {
                field: "latency",
                reason: format!("expected a non-negative number of seconds, got {}", self.latency),
            });
        }
        if self.timestamp < self.start_time {
            return Err(PayloadError::InvalidField {
                field: "timestamp",
                reason: "ends before start_time".to_string(),
            });
        }
        if self.status == Status::Success && self.error_message.is_some() {
            return Err(PayloadError::InvalidField {
                field: "error_message",
                reason: "set on a successful record".to_string(),
            });
        }
        for key in ["integration", "method"] {
            if !matches!(self.metadata.get(key), Some(Value::String(tag)) if !tag.is_empty()) {
                return Err(PayloadError::MissingField(if key == "integration" {
                    "metadata.integration"
                } else {
                    "metadata.method"
                }));
            }
        }
        Ok(())
    }
}

/// JSON-encode a value unless it is already a plain string.
pub fn encode(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn latency_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start)
        .num_microseconds()
        .map(|micros| micros as f64 / 1_000_000.0)
        .unwrap_or(f64::NAN)
}

fn token_count(field: &'static str, value: Option<&Value>) -> Result<Option<u64>, PayloadError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if let Some(count) = value.as_u64() {
        return Ok(Some(count));
    }
    match value.as_f64() {
        Some(count) if count >= 0.0 && count.fract() == 0.0 && count <= u64::MAX as f64 => {
            Ok(Some(count as u64))
        }
        _ => Err(PayloadError::InvalidField {
            field,
            reason: format!("expected a non-negative integer token count, got {value}"),
        }),
    }
}

fn require(field: &'static str, value: &str) -> Result<(), PayloadError> {
    if value.trim().is_empty() {
        return Err(PayloadError::MissingField(field));
    }
    Ok(())
}
