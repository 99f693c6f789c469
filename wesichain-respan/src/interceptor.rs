use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::paths::{RESPONSE_MODE_FIELD, STREAMING_MODE};
use crate::stream::PendingExport;
use crate::{
    CallArgs, CallContext, CallOutcome, Capture, Captured, CapturedIter, CapturedStream,
    DeliveryStats, Exporter, FieldAccess, FlushError, Integration, LogParams, RespanConfig,
};

/// The name and arguments of one SDK call about to be intercepted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Call {
    pub operation: String,
    pub args: CallArgs,
}

impl Call {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            args: CallArgs::new(),
        }
    }

    pub fn arg<T: Capture + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        self.args.insert(name.into(), value.capture());
        self
    }

    /// Whether the request argument asks for a streamed response
    /// (`response_mode == "streaming"`).
    pub fn declares_streaming(&self, integration: &Integration) -> bool {
        integration
            .request(&self.args)
            .and_then(|request| request.field(RESPONSE_MODE_FIELD))
            .map(Captured::unwrap_enum)
            .and_then(Captured::as_str)
            == Some(STREAMING_MODE)
    }
}

/// Wraps SDK calls so that every completed call is exported as log records.
///
/// The wrapped operation always runs exactly once and its result or error is
/// handed back untouched. Export never fails the caller.
///
/// ```rust,no_run
/// use serde_json::json;
/// use wesichain_respan::{Call, CallInterceptor, LogParams, RespanConfig};
///
/// let interceptor = CallInterceptor::dify(&RespanConfig::from_env());
/// let request = json!({"query": "hi", "conversation_id": "c-1"});
/// let call = Call::new("chat_messages").arg("req", &request);
/// let answer = interceptor.call(call, LogParams::default(), || {
///     Ok::<_, std::io::Error>(json!({"event": "message", "answer": "hello"}))
/// });
/// ```
#[derive(Clone)]
pub struct CallInterceptor {
    exporter: Exporter,
}

impl CallInterceptor {
    pub fn new(integration: Integration, config: &RespanConfig) -> Self {
        Self {
            exporter: Exporter::new(integration, config),
        }
    }

    pub fn dify(config: &RespanConfig) -> Self {
        Self::new(Integration::dify(), config)
    }

    pub fn superagent(config: &RespanConfig) -> Self {
        Self::new(Integration::superagent(), config)
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Routes a call to [`stream`](Self::stream) rather than [`call`](Self::call).
    pub fn is_streaming(&self, call: &Call) -> bool {
        call.declares_streaming(self.exporter.integration())
    }

    pub async fn flush(&self, timeout: Duration) -> Result<DeliveryStats, FlushError> {
        self.exporter.flush(timeout).await
    }

    pub fn call<T, E, F>(&self, call: Call, params: LogParams, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        T: Capture,
        E: Display,
    {
        let Some(context) = self.begin(call, params) else {
            return op();
        };
        let result = op();
        self.finish(&context, &result);
        result
    }

    pub async fn call_async<T, E, Fut>(&self, call: Call, params: LogParams, fut: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        T: Capture,
        E: Display,
    {
        let Some(context) = self.begin(call, params) else {
            return fut.await;
        };
        let result = fut.await;
        self.finish(&context, &result);
        result
    }

    /// Run an operation that returns a chunk iterator. The export happens
    /// when the iterator ends, yields an error, or is dropped after use.
    pub fn stream<I, E, F>(
        &self,
        call: Call,
        params: LogParams,
        op: F,
    ) -> Result<CapturedIter<I>, E>
    where
        F: FnOnce() -> Result<I, E>,
        E: Display,
    {
        let Some(context) = self.begin(call, params) else {
            return op().map(CapturedIter::passthrough);
        };
        match op() {
            Ok(inner) => Ok(CapturedIter::new(inner, self.pending(context))),
            Err(err) => {
                self.fail(&context, &err);
                Err(err)
            }
        }
    }

    pub async fn stream_async<S, E, Fut>(
        &self,
        call: Call,
        params: LogParams,
        fut: Fut,
    ) -> Result<CapturedStream<S>, E>
    where
        Fut: Future<Output = Result<S, E>>,
        E: Display,
    {
        let Some(context) = self.begin(call, params) else {
            return fut.await.map(CapturedStream::passthrough);
        };
        match fut.await {
            Ok(inner) => Ok(CapturedStream::new(inner, self.pending(context))),
            Err(err) => {
                self.fail(&context, &err);
                Err(err)
            }
        }
    }

    fn begin(&self, call: Call, params: LogParams) -> Option<CallContext> {
        if params.disable_log {
            tracing::trace!(operation = %call.operation, "respan logging disabled for call");
            return None;
        }
        if !self.exporter.is_enabled() {
            return None;
        }
        let args = self.exporter.integration().retain_args(call.args);
        Some(CallContext::new(call.operation, args, params))
    }

    fn pending(&self, context: CallContext) -> PendingExport {
        PendingExport {
            exporter: self.exporter.clone(),
            context,
        }
    }

    fn finish<T: Capture, E: Display>(&self, context: &CallContext, result: &Result<T, E>) {
        match result {
            Ok(value) => self
                .exporter
                .export(context, &CallOutcome::success(value.capture())),
            Err(err) => self.fail(context, err),
        }
    }

    fn fail<E: Display>(&self, context: &CallContext, err: &E) {
        self.exporter
            .export(context, &CallOutcome::failure(err.to_string(), Captured::Null));
    }
}
