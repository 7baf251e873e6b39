//! The interceptor chain wrapped around every call.
//!
//! Each call passes through [`InterceptorChain`], which notifies every
//! registered [`CallObserver`] once when the call starts, once per message in
//! either direction, and once when the call ends. Observers only ever see
//! messages by shared reference, so interception cannot alter a payload.
//!
//! # Ending a call
//!
//! For unary and client-streaming calls the end is reported as soon as the
//! handler returns. For calls with a streamed response the [`CallGuard`]
//! travels inside the response [`ObservedStream`] and reports the end when
//! that stream is exhausted, yields an error, or is dropped early.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use futures_util::Stream;
use pin_project_lite::pin_project;
use tonic::Status;

use crate::call::{CallInfo, CallOutcome, Direction};

/// Observes calls passing through an [`InterceptorChain`].
///
/// All hooks default to no-ops. Hooks run inline on the call's task, so they
/// should be quick.
pub trait CallObserver: Send + Sync + 'static {
    /// Called once, before the handler runs.
    fn on_call_start(&self, _call: &CallInfo) {}

    /// Called for every message received from or sent to the client.
    fn on_message(&self, _call: &CallInfo, _direction: Direction, _message: &dyn fmt::Debug) {}

    /// Called once, after the handler has finished.
    fn on_call_end(&self, _call: &CallInfo, _outcome: &CallOutcome) {}
}

/// An ordered list of observers applied to every call.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    observers: Arc<[Arc<dyn CallObserver>]>,
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl InterceptorChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer. Observers are notified in the order they were added.
    pub fn with(self, observer: impl CallObserver) -> Self {
        self.with_shared(Arc::new(observer))
    }

    /// Append an observer the caller keeps a handle to.
    pub fn with_shared(self, observer: Arc<dyn CallObserver>) -> Self {
        let mut observers = self.observers.to_vec();
        observers.push(observer);
        Self {
            observers: observers.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Start observing a call. The returned guard reports the end of the call
    /// exactly once, either through [`CallGuard::finish`] or when dropped.
    pub fn begin(&self, call: CallInfo) -> CallGuard {
        for observer in self.observers.iter() {
            observer.on_call_start(&call);
        }
        CallGuard {
            tap: CallTap {
                chain: self.clone(),
                call,
            },
            finished: false,
        }
    }

    /// Run a unary handler: one request in, one response out.
    pub async fn unary<Req, Resp, F, Fut>(
        &self,
        call: CallInfo,
        request: Req,
        handler: F,
    ) -> Result<Resp, Status>
    where
        Req: fmt::Debug,
        Resp: fmt::Debug,
        F: FnOnce(CallInfo, Req) -> Fut,
        Fut: Future<Output = Result<Resp, Status>>,
    {
        let guard = self.begin(call.clone());
        guard.observe(Direction::Inbound, &request);

        let result = handler(call, request).await;
        guard.complete(&result);
        result
    }

    /// Run a client-streaming handler: the handler drains an observed view of
    /// the inbound stream and returns one response.
    pub async fn client_streaming<S, Req, Resp, F, Fut>(
        &self,
        call: CallInfo,
        inbound: S,
        handler: F,
    ) -> Result<Resp, Status>
    where
        S: Stream<Item = Result<Req, Status>>,
        Req: fmt::Debug,
        Resp: fmt::Debug,
        F: FnOnce(CallInfo, ObservedStream<S>) -> Fut,
        Fut: Future<Output = Result<Resp, Status>>,
    {
        let guard = self.begin(call.clone());
        let inbound = ObservedStream::new(inbound, guard.tap(), Direction::Inbound, None);

        let result = handler(call, inbound).await;
        guard.complete(&result);
        result
    }

    /// Run a server-streaming handler: one request in, an observed response
    /// stream out. The call ends when the response stream does.
    pub fn server_streaming<Req, S, Resp, F>(
        &self,
        call: CallInfo,
        request: Req,
        handler: F,
    ) -> Result<ObservedStream<S>, Status>
    where
        Req: fmt::Debug,
        S: Stream<Item = Result<Resp, Status>>,
        Resp: fmt::Debug,
        F: FnOnce(CallInfo, Req) -> Result<S, Status>,
    {
        let guard = self.begin(call.clone());
        guard.observe(Direction::Inbound, &request);

        match handler(call, request) {
            Ok(outbound) => {
                let tap = guard.tap();
                Ok(ObservedStream::new(
                    outbound,
                    tap,
                    Direction::Outbound,
                    Some(guard),
                ))
            }
            Err(status) => {
                guard.finish(CallOutcome::Failed(status.clone()));
                Err(status)
            }
        }
    }

    /// Run a bidirectional handler: both directions are observed, and the
    /// call ends when the response stream does.
    pub fn bidi_streaming<In, Req, S, Resp, F>(
        &self,
        call: CallInfo,
        inbound: In,
        handler: F,
    ) -> Result<ObservedStream<S>, Status>
    where
        In: Stream<Item = Result<Req, Status>>,
        Req: fmt::Debug,
        S: Stream<Item = Result<Resp, Status>>,
        Resp: fmt::Debug,
        F: FnOnce(CallInfo, ObservedStream<In>) -> Result<S, Status>,
    {
        let guard = self.begin(call.clone());
        let inbound = ObservedStream::new(inbound, guard.tap(), Direction::Inbound, None);

        match handler(call, inbound) {
            Ok(outbound) => {
                let tap = guard.tap();
                Ok(ObservedStream::new(
                    outbound,
                    tap,
                    Direction::Outbound,
                    Some(guard),
                ))
            }
            Err(status) => {
                guard.finish(CallOutcome::Failed(status.clone()));
                Err(status)
            }
        }
    }

    fn notify_message(&self, call: &CallInfo, direction: Direction, message: &dyn fmt::Debug) {
        for observer in self.observers.iter() {
            observer.on_message(call, direction, message);
        }
    }

    fn notify_end(&self, call: &CallInfo, outcome: &CallOutcome) {
        for observer in self.observers.iter() {
            observer.on_call_end(call, outcome);
        }
    }
}

/// Reports individual messages of one call to the chain.
#[derive(Debug, Clone)]
pub struct CallTap {
    chain: InterceptorChain,
    call: CallInfo,
}

impl CallTap {
    pub fn call(&self) -> &CallInfo {
        &self.call
    }

    pub fn observe(&self, direction: Direction, message: &dyn fmt::Debug) {
        self.chain.notify_message(&self.call, direction, message);
    }
}

/// Owns the end-of-call notification for one call.
#[derive(Debug)]
pub struct CallGuard {
    tap: CallTap,
    finished: bool,
}

impl CallGuard {
    pub fn call(&self) -> &CallInfo {
        &self.tap.call
    }

    pub fn tap(&self) -> CallTap {
        self.tap.clone()
    }

    pub fn observe(&self, direction: Direction, message: &dyn fmt::Debug) {
        self.tap.observe(direction, message);
    }

    /// Report the end of the call.
    pub fn finish(mut self, outcome: CallOutcome) {
        self.finished = true;
        self.tap.chain.notify_end(&self.tap.call, &outcome);
    }

    /// Report a single-response result: the response is observed as an
    /// outbound message before the call is marked completed.
    fn complete<Resp: fmt::Debug>(self, result: &Result<Resp, Status>) {
        match result {
            Ok(response) => {
                self.observe(Direction::Outbound, response);
                self.finish(CallOutcome::Completed);
            }
            Err(status) => self.finish(CallOutcome::Failed(status.clone())),
        }
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.tap
                .chain
                .notify_end(&self.tap.call, &CallOutcome::Abandoned);
        }
    }
}

pin_project! {
    /// A stream whose messages are reported to the chain as they pass.
    ///
    /// When it carries the call's [`CallGuard`], the end of the stream (or
    /// its first error) ends the call.
    pub struct ObservedStream<S> {
        #[pin]
        inner: S,
        tap: CallTap,
        direction: Direction,
        guard: Option<CallGuard>,
    }
}

impl<S> ObservedStream<S> {
    pub fn new(inner: S, tap: CallTap, direction: Direction, guard: Option<CallGuard>) -> Self {
        Self {
            inner,
            tap,
            direction,
            guard,
        }
    }

    pub fn call(&self) -> &CallInfo {
        self.tap.call()
    }
}

impl<S, T> Stream for ObservedStream<S>
where
    S: Stream<Item = Result<T, Status>>,
    T: fmt::Debug,
{
    type Item = Result<T, Status>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let item = ready!(this.inner.poll_next(cx));

        match &item {
            Some(Ok(message)) => this.tap.observe(*this.direction, message),
            Some(Err(status)) => {
                if let Some(guard) = this.guard.take() {
                    guard.finish(CallOutcome::Failed(status.clone()));
                }
            }
            None => {
                if let Some(guard) = this.guard.take() {
                    guard.finish(CallOutcome::Completed);
                }
            }
        }

        Poll::Ready(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> fmt::Debug for ObservedStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedStream")
            .field("call", &self.tap.call.id())
            .field("direction", &self.direction)
            .field("finished", &self.guard.is_none())
            .finish()
    }
}
