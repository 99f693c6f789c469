use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::extract::extract_messages;
use crate::params::non_empty;
use crate::payload::{build_payload, PayloadInput};
use crate::{
    CallArgs, Captured, Deliverer, DeliveryStats, Extraction, FlushError, IngestClient,
    IngestError, Integration, LogParams, LogPayload, RespanConfig, Status,
};

/// What was known when the wrapped call started.
#[derive(Clone, Debug)]
pub struct CallContext {
    pub operation: String,
    pub start_time: DateTime<Utc>,
    /// Only the arguments the integration retains.
    pub args: CallArgs,
    pub params: LogParams,
}

impl CallContext {
    pub fn new(operation: impl Into<String>, args: CallArgs, params: LogParams) -> Self {
        Self {
            operation: operation.into(),
            start_time: Utc::now(),
            args,
            params,
        }
    }
}

/// How the wrapped call ended.
#[derive(Clone, Debug)]
pub struct CallOutcome {
    pub end_time: DateTime<Utc>,
    pub status: Status,
    pub result: Captured,
    pub error_message: Option<String>,
}

impl CallOutcome {
    pub fn success(result: Captured) -> Self {
        Self {
            end_time: Utc::now(),
            status: Status::Success,
            result,
            error_message: None,
        }
    }

    /// A failed call; `result` holds whatever was produced before the failure.
    pub fn failure(error_message: impl Into<String>, result: Captured) -> Self {
        Self {
            end_time: Utc::now(),
            status: Status::Error,
            result,
            error_message: Some(error_message.into()),
        }
    }
}

/// Turns finished calls into payload batches and hands them to the deliverer.
#[derive(Clone)]
pub struct Exporter {
    integration: Arc<Integration>,
    deliverer: Option<Deliverer>,
}

impl Exporter {
    /// Without an API key, or if the delivery worker cannot start, the
    /// exporter is disabled and every export is a no-op.
    pub fn new(integration: Integration, config: &RespanConfig) -> Self {
        let deliverer = match &config.api_key {
            Some(api_key) => match start_deliverer(config, api_key.clone()) {
                Ok(deliverer) => Some(deliverer),
                Err(err) => {
                    tracing::error!(
                        integration = %integration.name,
                        error = %err,
                        "respan export disabled"
                    );
                    None
                }
            },
            None => {
                tracing::debug!(integration = %integration.name, "no respan api key, export disabled");
                None
            }
        };
        Self {
            integration: Arc::new(integration),
            deliverer,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.deliverer.is_some()
    }

    pub fn integration(&self) -> &Integration {
        &self.integration
    }

    /// Build the batch for one finished call and queue it. Never blocks and
    /// never fails the caller.
    pub fn export(&self, context: &CallContext, outcome: &CallOutcome) {
        let Some(deliverer) = &self.deliverer else {
            return;
        };
        let batch = self.build_batch(context, outcome);
        tracing::debug!(
            integration = %self.integration.name,
            operation = %context.operation,
            status = outcome.status.as_str(),
            payloads = batch.len(),
            "queueing respan batch"
        );
        deliverer.submit(batch);
    }

    /// One validated payload per logical message of the call. Payloads that
    /// fail to build or validate are logged and left out.
    pub fn build_batch(&self, context: &CallContext, outcome: &CallOutcome) -> Vec<LogPayload> {
        let integration = self.integration.as_ref();
        let messages = extract_messages(
            integration,
            &context.operation,
            &outcome.result,
            &context.args,
        );

        let mut batch = Vec::with_capacity(messages.len());
        for message in messages {
            let input = json_or_none(&message.input);
            // With no result the content falls back to the request itself.
            let output = if outcome.result.is_null() {
                None
            } else {
                json_or_none(&message.content)
            };

            let mut metadata_extra = Map::new();
            let span_name = match integration.extraction {
                Extraction::Messages => {
                    metadata_extra.insert(
                        "message_type".to_string(),
                        Value::String(message.message_type.clone()),
                    );
                    if let Some(id) = &message.message_id {
                        metadata_extra.insert("message_id".to_string(), Value::String(id.clone()));
                    }
                    non_empty(&context.params.span_name)
                        .map(str::to_string)
                        .or_else(|| Some(format!("{}.{}", integration.name, message.message_type)))
                }
                Extraction::Passthrough => None,
            };

            let built = build_payload(PayloadInput {
                integration,
                operation: &context.operation,
                start_time: context.start_time,
                end_time: outcome.end_time,
                status: outcome.status,
                input: input.as_ref(),
                output: output.as_ref(),
                error_message: outcome.error_message.as_deref(),
                params: &context.params,
                span_name: span_name.as_deref(),
                session_identifier: message.session_id.as_deref(),
                usage: message.usage.as_ref(),
                metadata_extra,
            })
            .and_then(|payload| payload.validate().map(|()| payload));

            match built {
                Ok(payload) => batch.push(payload),
                Err(err) => tracing::warn!(
                    integration = %integration.name,
                    operation = %context.operation,
                    message_type = %message.message_type,
                    error = %err,
                    "dropping invalid respan payload"
                ),
            }
        }
        batch
    }

    /// Wait for queued batches to be delivered. A disabled exporter returns
    /// empty stats immediately.
    pub async fn flush(&self, timeout: Duration) -> Result<DeliveryStats, FlushError> {
        match &self.deliverer {
            Some(deliverer) => deliverer.flush(timeout).await,
            None => Ok(DeliveryStats::default()),
        }
    }

    pub fn stats(&self) -> DeliveryStats {
        self.deliverer
            .as_ref()
            .map(Deliverer::stats)
            .unwrap_or_default()
    }
}

fn start_deliverer(
    config: &RespanConfig,
    api_key: secrecy::SecretString,
) -> Result<Deliverer, IngestError> {
    let client = IngestClient::new(
        config.endpoint.clone(),
        api_key,
        config.timeout,
        config.retry.clone(),
    )?;
    Deliverer::spawn(client, config.queue_capacity)
}

fn json_or_none(value: &Captured) -> Option<Value> {
    (!value.is_null()).then(|| value.to_json())
}
