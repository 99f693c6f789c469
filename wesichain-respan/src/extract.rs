//! Turns an arbitrary SDK result into the logical messages it contains.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::paths::{
    ASSISTANT_CLASS, MESSAGE_ID_PATHS, MESSAGE_TYPE_PATHS, NESTED_MESSAGES_PATHS,
    NESTED_MESSAGE_PATHS, RESPONSE_CONTENT_PATHS, SESSION_ID_PATHS, TOTAL_TOKENS_PATH,
    USAGE_PATHS,
};
use crate::{CallArgs, Captured, Extraction, FieldAccess, Integration, Usage};

/// Canonical facts read from one logical message of a call result.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedMessage {
    pub message_id: Option<String>,
    pub session_id: Option<String>,
    pub message_type: String,
    /// Becomes the record's `output`.
    pub content: Captured,
    pub usage: Option<Usage>,
    /// Becomes the record's `input`.
    pub input: Captured,
    /// A complete assistant turn that carried its own usage block.
    pub assistant_turn: bool,
}

/// Extract the logical messages of one call. Always yields at least one.
pub fn extract_messages(
    integration: &Integration,
    operation: &str,
    result: &Captured,
    args: &CallArgs,
) -> Vec<ExtractedMessage> {
    match integration.extraction {
        Extraction::Messages => fan_out(integration, operation, result, args),
        Extraction::Passthrough => vec![passthrough(integration, operation, result, args)],
    }
}

fn fan_out(
    integration: &Integration,
    operation: &str,
    result: &Captured,
    args: &CallArgs,
) -> Vec<ExtractedMessage> {
    let call_usage = extract_usage(result);
    let request = integration.request(args);
    let session_source: Cow<'_, Captured> = match request {
        Some(request) => Cow::Borrowed(request),
        None => Cow::Owned(Captured::Map(args.clone())),
    };

    let mut seen_turns = HashSet::new();
    let mut extracted = Vec::new();
    for message in sub_messages(operation, result, request) {
        let assistant_turn = is_assistant_turn_with_usage(&message);
        let message_id = message_id(&message);
        if assistant_turn {
            if let Some(id) = &message_id {
                if !seen_turns.insert(id.clone()) {
                    tracing::debug!(operation, message_id = %id, "skipping repeated assistant turn");
                    continue;
                }
            }
        }

        let usage = match message_usage(&message) {
            Some(usage) => Some(usage),
            None if !assistant_turn => call_usage.clone(),
            None => None,
        };
        let session_id = message
            .first_non_empty(SESSION_ID_PATHS)
            .or_else(|| session_source.first_non_empty(SESSION_ID_PATHS))
            .map(Captured::to_text);

        extracted.push(ExtractedMessage {
            message_type: message_type(operation, &message),
            content: response_content(&message, result).clone(),
            message_id,
            session_id,
            usage,
            assistant_turn,
            input: message.into_owned(),
        });
    }
    extracted
}

fn passthrough(
    integration: &Integration,
    operation: &str,
    result: &Captured,
    args: &CallArgs,
) -> ExtractedMessage {
    let input = integration
        .captured_args
        .iter()
        .find_map(|name| args.get(name))
        .cloned()
        .unwrap_or_default();
    ExtractedMessage {
        message_id: None,
        session_id: None,
        message_type: operation.to_string(),
        content: result.clone(),
        usage: None,
        input,
        assistant_turn: false,
    }
}

fn sub_messages<'a>(
    operation: &str,
    result: &'a Captured,
    request: Option<&'a Captured>,
) -> Vec<Cow<'a, Captured>> {
    let messages: Vec<Cow<'a, Captured>> = match result {
        Captured::List(items) => items.iter().map(Cow::Borrowed).collect(),
        _ => nested_messages(result),
    };
    if !messages.is_empty() {
        return messages;
    }
    match request {
        Some(request) => vec![Cow::Borrowed(request)],
        None => vec![Cow::Owned(placeholder(operation))],
    }
}

fn nested_messages(result: &Captured) -> Vec<Cow<'_, Captured>> {
    // The first list found ends the search, even when it is empty.
    let listed = NESTED_MESSAGES_PATHS
        .iter()
        .find_map(|path| result.path(path).and_then(Captured::as_list));
    if let Some(items) = listed.filter(|items| !items.is_empty()) {
        return items.iter().map(Cow::Borrowed).collect();
    }
    if let Some(single) = result.first_non_empty(NESTED_MESSAGE_PATHS) {
        return vec![Cow::Borrowed(single)];
    }
    if result.is_null() {
        return Vec::new();
    }
    vec![Cow::Borrowed(result)]
}

fn placeholder(operation: &str) -> Captured {
    Captured::Map(BTreeMap::from([(
        "event".to_string(),
        Captured::String(operation.to_string()),
    )]))
}

fn message_id(message: &Captured) -> Option<String> {
    message.first_non_empty(MESSAGE_ID_PATHS).map(Captured::to_text)
}

fn message_type(operation: &str, message: &Captured) -> String {
    MESSAGE_TYPE_PATHS
        .iter()
        .filter_map(|path| message.path(path))
        .map(|value| value.to_text().trim().to_string())
        .find(|label| !label.is_empty())
        .unwrap_or_else(|| operation.to_string())
}

fn response_content<'a>(message: &'a Captured, result: &'a Captured) -> &'a Captured {
    message
        .first_non_empty(RESPONSE_CONTENT_PATHS)
        .unwrap_or(if message.is_empty() { result } else { message })
}

/// Call-level usage: the first usage path that normalizes to a non-empty
/// block, else a bare integer `data.total_tokens`.
pub fn extract_usage(value: &Captured) -> Option<Usage> {
    let probed = USAGE_PATHS
        .iter()
        .filter_map(|path| value.path(path))
        .filter_map(Usage::normalize)
        .find(|usage| !usage.is_empty());
    if probed.is_some() {
        return probed;
    }
    match value.path(TOTAL_TOKENS_PATH) {
        Some(Captured::Number(total)) if total.is_i64() || total.is_u64() => {
            Some(Usage::total_only(Value::Number(total.clone())))
        }
        _ => None,
    }
}

fn message_usage(message: &Captured) -> Option<Usage> {
    if is_assistant(message) {
        if let Some(raw) = message.field("usage") {
            return Usage::normalize(raw);
        }
    }
    extract_usage(message)
}

/// A complete assistant turn: an `AssistantMessage` object that carries usage.
pub fn is_assistant_turn_with_usage(message: &Captured) -> bool {
    message.class_name() == Some(ASSISTANT_CLASS) && message.field("usage").is_some()
}

/// Authored by the assistant, judged by class, `role`, or `type`.
pub fn is_assistant(message: &Captured) -> bool {
    if message.class_name() == Some(ASSISTANT_CLASS) {
        return true;
    }
    has_label(message, "role", &["assistant"])
        || has_label(message, "type", &["assistant", "assistant_message"])
}

fn has_label(message: &Captured, field: &str, labels: &[&str]) -> bool {
    matches!(
        message.field(field).map(Captured::unwrap_enum),
        Some(Captured::String(value))
            if labels.iter().any(|label| value.eq_ignore_ascii_case(label))
    )
}
