use crate::{CallArgs, Captured};

pub const LOG_TYPE_GENERATION: &str = "generation";
pub const LOG_TYPE_TOOL: &str = "tool";

/// How a call result is split into logical messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extraction {
    /// Fan out over nested sub-messages, with usage and session probing.
    Messages,
    /// One record per call: first captured argument in, whole result out.
    Passthrough,
}

/// Describes the SDK being wrapped: how its records are labelled and which of
/// its call arguments are worth keeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Integration {
    pub name: String,
    pub log_type: String,
    /// Argument names retained from each call, in lookup order.
    pub captured_args: Vec<String>,
    /// Argument holding the request object, if the SDK takes one.
    pub request_arg: Option<String>,
    pub extraction: Extraction,
}

impl Integration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log_type: LOG_TYPE_GENERATION.to_string(),
            captured_args: vec!["req".to_string()],
            request_arg: Some("req".to_string()),
            extraction: Extraction::Messages,
        }
    }

    pub fn dify() -> Self {
        Self::new("dify")
    }

    pub fn superagent() -> Self {
        Self {
            name: "superagent".to_string(),
            log_type: LOG_TYPE_TOOL.to_string(),
            captured_args: ["input", "text", "repo"].map(String::from).to_vec(),
            request_arg: None,
            extraction: Extraction::Passthrough,
        }
    }

    /// Drop every argument this integration does not read downstream.
    pub fn retain_args(&self, mut args: CallArgs) -> CallArgs {
        args.retain(|name, _| self.captured_args.iter().any(|kept| kept == name));
        args
    }

    pub fn request<'a>(&self, args: &'a CallArgs) -> Option<&'a Captured> {
        let name = self.request_arg.as_deref()?;
        args.get(name).filter(|value| !value.is_null())
    }
}
