//! Respan log export for wrapped AI SDK calls.
//!
//! A [`CallInterceptor`] runs an SDK call, hands its result back unchanged and
//! exports one log record per logical message the result contains. Streamed
//! results are exported once the stream ends. Delivery happens on a
//! background worker and never blocks or fails the caller.
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use futures::StreamExt;
//! use serde_json::{json, Value};
//! use wesichain_respan::{Call, CallInterceptor, LogParams, RespanConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let interceptor = CallInterceptor::dify(&RespanConfig::from_env());
//!     let params = LogParams {
//!         customer_identifier: Some("customer-42".to_string()),
//!         ..LogParams::default()
//!     };
//!
//!     let request = json!({"query": "hi", "response_mode": "streaming"});
//!     let call = Call::new("chat_messages").arg("req", &request);
//!     assert!(interceptor.is_streaming(&call));
//!
//!     let chunks = interceptor
//!         .stream_async(call, params, async {
//!             Ok::<_, std::io::Error>(futures::stream::iter(vec![
//!                 Ok::<Value, std::io::Error>(json!({"event": "message", "answer": "he"})),
//!                 Ok(json!({"event": "message", "answer": "llo"})),
//!             ]))
//!         })
//!         .await
//!         .expect("stream opened");
//!     let _: Vec<_> = chunks.collect().await;
//!
//!     let _ = interceptor.flush(Duration::from_secs(5)).await;
//! }
//! ```
mod captured;
mod client;
mod config;
mod deliverer;
mod error;
mod exporter;
mod extract;
mod integration;
mod interceptor;
mod params;
mod paths;
mod payload;
mod retry;
mod stream;
mod usage;

pub use captured::{CallArgs, Capture, Captured, FieldAccess, DEFAULT_MAX_DEPTH};
pub use client::{Delivery, IngestClient, DOGFOOD_HEADER};
pub use config::{RespanConfig, API_KEY_ENV, DEFAULT_ENDPOINT, ENDPOINT_ENV};
pub use deliverer::{Deliverer, DeliveryStats};
pub use error::{FlushError, IngestError, PayloadError};
pub use exporter::{CallContext, CallOutcome, Exporter};
pub use extract::{
    extract_messages, extract_usage, is_assistant, is_assistant_turn_with_usage,
    ExtractedMessage,
};
pub use integration::{Extraction, Integration, LOG_TYPE_GENERATION, LOG_TYPE_TOOL};
pub use interceptor::{Call, CallInterceptor};
pub use params::LogParams;
pub use payload::{build_payload, encode, LogPayload, PayloadInput, Status};
pub use retry::RetryPolicy;
pub use stream::{CapturedIter, CapturedStream};
pub use usage::Usage;
