//! Field paths probed, in order, when reading SDK responses.

pub(crate) const USAGE_PATHS: &[&[&str]] = &[
    &["usage"],
    &["metadata", "usage"],
    &["data", "usage"],
    &["data", "execution_metadata"],
    &["execution_metadata"],
];

pub(crate) const TOTAL_TOKENS_PATH: &[&str] = &["data", "total_tokens"];

pub(crate) const MESSAGE_ID_PATHS: &[&[&str]] = &[&["id"], &["message_id"], &["messageId"], &["uuid"]];

pub(crate) const SESSION_ID_PATHS: &[&[&str]] = &[&["conversation_id"]];

pub(crate) const MESSAGE_TYPE_PATHS: &[&[&str]] = &[
    &["event"],
    &["type"],
    &["mode"],
    &["message_type"],
    &["kind"],
];

pub(crate) const RESPONSE_CONTENT_PATHS: &[&[&str]] = &[
    &["response"],
    &["result"],
    &["answer"],
    &["output"],
    &["outputs"],
    &["content"],
    &["data"],
];

pub(crate) const NESTED_MESSAGES_PATHS: &[&[&str]] = &[
    &["messages"],
    &["all_messages"],
    &["assistant_messages"],
    &["items"],
    &["results"],
];

pub(crate) const NESTED_MESSAGE_PATHS: &[&[&str]] =
    &[&["message"], &["assistant_message"], &["last_message"]];

pub(crate) const RESPONSE_MODE_FIELD: &str = "response_mode";
pub(crate) const STREAMING_MODE: &str = "streaming";

pub(crate) const ASSISTANT_CLASS: &str = "AssistantMessage";
