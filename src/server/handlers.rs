//! One handler per RPC shape.
//!
//! Handlers know nothing about tonic's transport: inbound streams are any
//! [`Stream`] of `Result<Request, Status>`, and streamed responses are fed
//! through bounded `mpsc` channels and returned as [`ResponseStream`]s. The
//! dispatcher in [`super::service`] adapts them to the generated server trait.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;
use tracing::{debug, info, warn};

use crate::calc::{self, Average, PrimeFactors, RunningMax};
use crate::call::CallInfo;
use crate::server::proto::{
    CalculateWithDeadlineRequest, CalculateWithDeadlineResponse, ComputeAverageRequest,
    ComputeAverageResponse, DecomposeRequest, DecomposeResponse, FindMaximumRequest,
    FindMaximumResponse, TimesTenRequest, TimesTenResponse,
};
use crate::{CalcError, Result};

/// Default number of messages buffered per streamed response.
pub const DEFAULT_STREAM_BUFFER: usize = 128;

/// Default duration of the simulated work in `CalculateWithDeadline`.
pub const DEFAULT_WORK_DURATION: Duration = Duration::from_secs(1);

/// A streamed response produced by a handler task.
pub type ResponseStream<T> = ReceiverStream<std::result::Result<T, Status>>;

/// Tunables for the handlers.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    /// How long `CalculateWithDeadline` pretends to work.
    pub work_duration: Duration,
    /// Capacity of the channel behind each streamed response.
    pub stream_buffer: usize,
    /// Race the simulated work against the deadline instead of only checking
    /// the deadline once the work is done.
    pub preempt_on_deadline: bool,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            work_duration: DEFAULT_WORK_DURATION,
            stream_buffer: DEFAULT_STREAM_BUFFER,
            preempt_on_deadline: false,
        }
    }
}

/// The calculator handlers.
#[derive(Debug, Clone, Default)]
pub struct Handlers {
    settings: HandlerSettings,
}

impl Handlers {
    pub fn new(mut settings: HandlerSettings) -> Self {
        settings.stream_buffer = settings.stream_buffer.max(1);
        Self { settings }
    }

    pub fn settings(&self) -> &HandlerSettings {
        &self.settings
    }

    /// Unary: multiply the number by ten.
    pub fn times_ten(&self, request: TimesTenRequest) -> Result<TimesTenResponse> {
        let result = calc::times_ten(request.number).ok_or_else(|| {
            CalcError::Overflow(format!("{} * 10 does not fit in an int32", request.number))
        })?;
        Ok(TimesTenResponse { result })
    }

    /// Server streaming: stream the prime factors of the number, smallest
    /// first. Numbers `<= 1` produce an empty stream.
    pub fn decompose(
        &self,
        call: CallInfo,
        request: DecomposeRequest,
    ) -> ResponseStream<DecomposeResponse> {
        let (tx, rx) = mpsc::channel(self.settings.stream_buffer);

        tokio::spawn(async move {
            for factor in PrimeFactors::new(request.number) {
                if call.is_cancelled() {
                    debug!(call_id = call.id(), "decomposition cancelled");
                    let err = CalcError::Cancelled("decomposition cancelled".to_string());
                    let _ = tx.send(Err(Status::from(err))).await;
                    return;
                }
                if tx.send(Ok(DecomposeResponse { factor })).await.is_err() {
                    debug!(call_id = call.id(), "response stream dropped");
                    return;
                }
            }
        });

        ReceiverStream::new(rx)
    }

    /// Client streaming: average every number received before the client
    /// closes its side of the stream.
    ///
    /// An empty stream is rejected rather than producing `NaN`.
    pub async fn compute_average<S>(
        &self,
        call: &CallInfo,
        inbound: S,
    ) -> Result<ComputeAverageResponse>
    where
        S: Stream<Item = std::result::Result<ComputeAverageRequest, Status>>,
    {
        let mut inbound = pin!(inbound);
        let mut average = Average::default();

        while let Some(message) = inbound.next().await {
            let request = message?;
            if !request.number.is_finite() {
                return Err(CalcError::InvalidInput(format!(
                    "cannot average non-finite number {}",
                    request.number
                )));
            }
            average.push(request.number);
        }

        if call.is_cancelled() {
            return Err(CalcError::Cancelled(
                "call cancelled before the average was sent".to_string(),
            ));
        }

        let mean = average.mean().ok_or(CalcError::EmptyStream)?;
        debug!(
            call_id = call.id(),
            count = average.count(),
            average = mean,
            "computed average"
        );
        Ok(ComputeAverageResponse { average: mean })
    }

    /// Bidirectional streaming: emit each new running maximum.
    ///
    /// A receive task updates the shared [`RunningMax`] and hands every new
    /// maximum to a send task, which writes it to the response stream. The
    /// response ends once the client closes its side and every maximum has
    /// been sent; if the client drops the response first, the call is
    /// cancelled and the receive task stops at its next message. A call with
    /// a deadline ends with `Cancelled` once the deadline passes, even while
    /// the client is sending nothing.
    pub fn find_maximum<S>(&self, call: CallInfo, inbound: S) -> ResponseStream<FindMaximumResponse>
    where
        S: Stream<Item = std::result::Result<FindMaximumRequest, Status>> + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::channel(self.settings.stream_buffer);
        let (maxima_tx, mut maxima_rx) =
            mpsc::channel::<std::result::Result<i32, Status>>(self.settings.stream_buffer);
        let running = Arc::new(RunningMax::new());

        let receive_call = call.clone();
        let receive_running = running.clone();
        tokio::spawn(async move {
            let call = receive_call;
            let mut inbound = pin!(inbound);

            loop {
                // An idle client must not hold the call open past its deadline.
                let message = tokio::select! {
                    message = inbound.next() => message,
                    _ = call.expired() => {
                        debug!(call_id = call.id(), "deadline passed while waiting for input");
                        let err = CalcError::Cancelled("deadline exceeded".to_string());
                        let _ = maxima_tx.send(Err(Status::from(err))).await;
                        break;
                    }
                };
                let Some(message) = message else {
                    break;
                };
                if call.is_deadline_exceeded() {
                    let err = CalcError::Cancelled("deadline exceeded".to_string());
                    let _ = maxima_tx.send(Err(Status::from(err))).await;
                    break;
                }
                if call.is_cancelled() {
                    break;
                }

                match message {
                    Ok(request) => {
                        if let Some(max) = receive_running.observe(request.number) {
                            if maxima_tx.send(Ok(max)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(status) => {
                        warn!(
                            call_id = call.id(),
                            code = ?status.code(),
                            "inbound stream failed"
                        );
                        let _ = maxima_tx.send(Err(status)).await;
                        break;
                    }
                }
            }

            debug!(call_id = call.id(), "receive loop finished");
        });

        tokio::spawn(async move {
            while let Some(max) = maxima_rx.recv().await {
                let item = max.map(|number| FindMaximumResponse { number });
                if out_tx.send(item).await.is_err() {
                    debug!(call_id = call.id(), "response stream dropped");
                    call.cancel();
                    break;
                }
            }
            debug!(
                call_id = call.id(),
                max = ?running.current(),
                "send loop finished"
            );
        });

        ReceiverStream::new(out_rx)
    }

    /// Unary with a deadline: add two numbers after some simulated work.
    ///
    /// By default the deadline is only checked once the work is done, so a
    /// late call still pays for the whole computation and merely has its
    /// result discarded. With [`HandlerSettings::preempt_on_deadline`] the
    /// work is abandoned as soon as the deadline passes.
    pub async fn calculate_with_deadline(
        &self,
        call: &CallInfo,
        request: CalculateWithDeadlineRequest,
    ) -> Result<CalculateWithDeadlineResponse> {
        info!(
            call_id = call.id(),
            work_ms = self.settings.work_duration.as_millis() as u64,
            "starting simulated work"
        );

        let work = tokio::time::sleep(self.settings.work_duration);
        if self.settings.preempt_on_deadline {
            tokio::select! {
                _ = work => {}
                _ = call.expired() => {
                    return Err(CalcError::Cancelled(
                        "deadline passed before the work finished".to_string(),
                    ));
                }
            }
        } else {
            work.await;
        }

        let result = request.a.checked_add(request.b).ok_or_else(|| {
            CalcError::Overflow(format!(
                "{} + {} does not fit in an int32",
                request.a, request.b
            ))
        })?;

        if call.is_cancelled() {
            warn!(call_id = call.id(), "the client has canceled the request");
            return Err(CalcError::Cancelled(
                "the client has canceled the request".to_string(),
            ));
        }

        Ok(CalculateWithDeadlineResponse { result })
    }
}
