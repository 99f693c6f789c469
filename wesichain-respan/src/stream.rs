//! Pass-through wrappers that record streamed chunks and export once the
//! stream is finished, fails, or is dropped part-way.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;

use crate::{CallContext, CallOutcome, Capture, Captured, Exporter};

/// An export waiting on the end of a stream.
pub(crate) struct PendingExport {
    pub(crate) exporter: Exporter,
    pub(crate) context: CallContext,
}

impl PendingExport {
    fn finish(self, chunks: Vec<Captured>, error: Option<String>) {
        let result = Captured::List(chunks);
        let outcome = match error {
            Some(message) => CallOutcome::failure(message, result),
            None => CallOutcome::success(result),
        };
        self.exporter.export(&self.context, &outcome);
    }
}

/// Buffer and finalizer shared by the sync and async wrappers.
struct Accumulator {
    pending: Option<PendingExport>,
    chunks: Vec<Captured>,
    started: bool,
}

impl Accumulator {
    fn new(pending: Option<PendingExport>) -> Self {
        Self {
            pending,
            chunks: Vec::new(),
            started: false,
        }
    }

    fn observe<C: Capture, E: Display>(&mut self, item: Option<&Result<C, E>>) {
        self.started = true;
        if self.pending.is_none() {
            return;
        }
        match item {
            Some(Ok(chunk)) => self.chunks.push(chunk.capture()),
            Some(Err(err)) => self.finish(Some(err.to_string())),
            None => self.finish(None),
        }
    }

    fn finish(&mut self, error: Option<String>) {
        if let Some(pending) = self.pending.take() {
            pending.finish(std::mem::take(&mut self.chunks), error);
        }
    }
}

impl Drop for Accumulator {
    fn drop(&mut self) {
        // Closed early by the consumer: export what arrived.
        if self.started {
            self.finish(None);
        }
    }
}

/// Wraps a chunk iterator returned by an intercepted call.
pub struct CapturedIter<I> {
    inner: I,
    accumulator: Accumulator,
}

impl<I> CapturedIter<I> {
    pub(crate) fn new(inner: I, pending: PendingExport) -> Self {
        Self {
            inner,
            accumulator: Accumulator::new(Some(pending)),
        }
    }

    /// A wrapper that records nothing.
    pub(crate) fn passthrough(inner: I) -> Self {
        Self {
            inner,
            accumulator: Accumulator::new(None),
        }
    }
}

impl<I, C, E> Iterator for CapturedIter<I>
where
    I: Iterator<Item = Result<C, E>>,
    C: Capture,
    E: Display,
{
    type Item = Result<C, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next();
        self.accumulator.observe(item.as_ref());
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Wraps a chunk stream returned by an intercepted async call.
pub struct CapturedStream<S> {
    inner: Pin<Box<S>>,
    accumulator: Accumulator,
}

impl<S> CapturedStream<S> {
    pub(crate) fn new(inner: S, pending: PendingExport) -> Self {
        Self {
            inner: Box::pin(inner),
            accumulator: Accumulator::new(Some(pending)),
        }
    }

    pub(crate) fn passthrough(inner: S) -> Self {
        Self {
            inner: Box::pin(inner),
            accumulator: Accumulator::new(None),
        }
    }
}

impl<S, C, E> Stream for CapturedStream<S>
where
    S: Stream<Item = Result<C, E>>,
    C: Capture,
    E: Display,
{
    type Item = Result<C, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Both fields are Unpin: the inner stream is already boxed.
        let this = self.get_mut();
        this.accumulator.started = true;
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(item) => {
                this.accumulator.observe(item.as_ref());
                Poll::Ready(item)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
