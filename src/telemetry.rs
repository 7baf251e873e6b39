//! Telemetry metric name constants.
//!
//! Centralised metric names for calcrpc calls. Consumers install their own
//! `metrics` recorder (e.g. prometheus, statsd); without a recorder installed,
//! all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `calculator_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `method`: RPC method name (e.g. "TimesTen", "FindMaximum")
//! - `shape`: call shape: "unary", "server_streaming", "client_streaming"
//!   or "bidi_streaming"
//! - `status`: outcome: "ok", "error" or "abandoned"
//! - `direction`: message direction: "inbound" or "outbound"

/// Total calls finished.
///
/// Labels: `method`, `shape`, `status`.
pub const CALLS_TOTAL: &str = "calculator_calls_total";

/// Call duration in seconds, from dispatch to the end of the response.
///
/// Labels: `method`.
pub const CALL_DURATION_SECONDS: &str = "calculator_call_duration_seconds";

/// Calls currently being handled.
///
/// Labels: `method`.
pub const CALLS_IN_FLIGHT: &str = "calculator_calls_in_flight";

/// Total messages observed on calls.
///
/// Labels: `method`, `direction`.
pub const MESSAGES_TOTAL: &str = "calculator_messages_total";
