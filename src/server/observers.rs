//! Built-in [`CallObserver`] implementations.

use std::fmt;

use tracing::{debug, info, warn};

use crate::call::{CallInfo, CallOutcome, Direction};
use crate::server::interceptor::CallObserver;
use crate::telemetry;

/// Logs every call through `tracing`.
///
/// Call boundaries are logged at `info`, failures at `warn`, and message
/// bodies at `debug` when `log_messages` is set.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    log_messages: bool,
}

impl TracingObserver {
    pub fn new(log_messages: bool) -> Self {
        Self { log_messages }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CallObserver for TracingObserver {
    fn on_call_start(&self, call: &CallInfo) {
        info!(
            call_id = call.id(),
            method = call.method(),
            shape = %call.shape(),
            peer = ?call.remote_addr(),
            has_deadline = call.deadline().is_some(),
            "call started"
        );
    }

    fn on_message(&self, call: &CallInfo, direction: Direction, message: &dyn fmt::Debug) {
        if self.log_messages {
            debug!(
                call_id = call.id(),
                method = call.method(),
                direction = direction.as_str(),
                ?message,
                "message"
            );
        }
    }

    fn on_call_end(&self, call: &CallInfo, outcome: &CallOutcome) {
        let elapsed_ms = call.elapsed().as_millis() as u64;
        match outcome {
            CallOutcome::Completed => info!(
                call_id = call.id(),
                method = call.method(),
                elapsed_ms,
                "call completed"
            ),
            CallOutcome::Failed(status) => warn!(
                call_id = call.id(),
                method = call.method(),
                code = ?status.code(),
                message = status.message(),
                elapsed_ms,
                "call failed"
            ),
            CallOutcome::Abandoned => info!(
                call_id = call.id(),
                method = call.method(),
                elapsed_ms,
                "call abandoned before completion"
            ),
        }
    }
}

/// Records call and message counts through the `metrics` facade.
///
/// Without an installed recorder every update is a no-op.
#[derive(Debug, Clone, Default)]
pub struct MetricsObserver;

impl CallObserver for MetricsObserver {
    fn on_call_start(&self, call: &CallInfo) {
        metrics::gauge!(telemetry::CALLS_IN_FLIGHT, "method" => call.method()).increment(1.0);
    }

    fn on_message(&self, call: &CallInfo, direction: Direction, _message: &dyn fmt::Debug) {
        metrics::counter!(telemetry::MESSAGES_TOTAL,
            "method" => call.method(),
            "direction" => direction.as_str(),
        )
        .increment(1);
    }

    fn on_call_end(&self, call: &CallInfo, outcome: &CallOutcome) {
        metrics::gauge!(telemetry::CALLS_IN_FLIGHT, "method" => call.method()).decrement(1.0);
        metrics::counter!(telemetry::CALLS_TOTAL,
            "method" => call.method(),
            "shape" => call.shape().as_str(),
            "status" => outcome.status(),
        )
        .increment(1);
        metrics::histogram!(telemetry::CALL_DURATION_SECONDS, "method" => call.method())
            .record(call.elapsed().as_secs_f64());
    }
}
