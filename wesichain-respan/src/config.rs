use std::time::Duration;

use secrecy::SecretString;

use crate::RetryPolicy;

pub const DEFAULT_ENDPOINT: &str = "https://api.respan.ai/api/v1/traces/ingest";
pub const API_KEY_ENV: &str = "RESPAN_API_KEY";
pub const ENDPOINT_ENV: &str = "RESPAN_ENDPOINT";

/// Process-wide export settings, resolved once when an interceptor is built.
///
/// Without an API key every export is skipped; wrapped calls still run.
#[derive(Clone, Debug)]
pub struct RespanConfig {
    pub api_key: Option<SecretString>,
    pub endpoint: String,
    /// Bound on each delivery attempt.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Batches waiting for the delivery worker before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for RespanConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            queue_capacity: 1000,
        }
    }
}

impl RespanConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key: Some(api_key),
            ..Self::default()
        }
    }

    /// Explicit values win; otherwise fall back to `RESPAN_API_KEY` /
    /// `RESPAN_ENDPOINT`, then the default endpoint.
    pub fn resolve(api_key: Option<String>, endpoint: Option<String>) -> Self {
        Self::resolve_with(api_key, endpoint, |name| std::env::var(name).ok())
    }

    pub fn from_env() -> Self {
        Self::resolve(None, None)
    }

    fn resolve_with(
        api_key: Option<String>,
        endpoint: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let api_key = present(api_key)
            .or_else(|| present(lookup(API_KEY_ENV)))
            .map(SecretString::new);
        let endpoint = present(endpoint)
            .or_else(|| present(lookup(ENDPOINT_ENV)))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Self {
            api_key,
            endpoint,
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn explicit_values_win_over_environment() {
        let config = RespanConfig::resolve_with(
            Some("explicit".to_string()),
            Some("https://explicit.local/ingest".to_string()),
            env(&[(API_KEY_ENV, "from-env"), (ENDPOINT_ENV, "https://env.local")]),
        );
        assert_eq!(
            config.api_key.as_ref().map(|key| key.expose_secret().as_str()),
            Some("explicit")
        );
        assert_eq!(config.endpoint, "https://explicit.local/ingest");
    }

    #[test]
    fn environment_fills_missing_values() {
        let config = RespanConfig::resolve_with(
            None,
            Some("  ".to_string()),
            env(&[(API_KEY_ENV, "from-env"), (ENDPOINT_ENV, "https://env.local")]),
        );
        assert_eq!(
            config.api_key.as_ref().map(|key| key.expose_secret().as_str()),
            Some("from-env")
        );
        assert_eq!(config.endpoint, "https://env.local");
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = RespanConfig::resolve_with(None, None, env(&[]));
        assert!(config.api_key.is_none());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry, RetryPolicy::default());
    }
}
