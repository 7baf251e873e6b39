//! Per-call metadata shared by the dispatcher, the interceptor chain and the
//! handlers.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// The four gRPC call shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallShape {
    /// One request, one response.
    Unary,
    /// One request, many responses.
    ServerStreaming,
    /// Many requests, one response.
    ClientStreaming,
    /// Independent many-to-many exchange.
    Bidirectional,
}

impl CallShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallShape::Unary => "unary",
            CallShape::ServerStreaming => "server_streaming",
            CallShape::ClientStreaming => "client_streaming",
            CallShape::Bidirectional => "bidi_streaming",
        }
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one method of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub shape: CallShape,
}

/// Every method the calculator service exposes.
pub mod methods {
    use super::{CallShape, MethodDescriptor};

    pub const TIMES_TEN: MethodDescriptor = MethodDescriptor {
        name: "TimesTen",
        shape: CallShape::Unary,
    };

    pub const DECOMPOSE: MethodDescriptor = MethodDescriptor {
        name: "Decompose",
        shape: CallShape::ServerStreaming,
    };

    pub const COMPUTE_AVERAGE: MethodDescriptor = MethodDescriptor {
        name: "ComputeAverage",
        shape: CallShape::ClientStreaming,
    };

    pub const FIND_MAXIMUM: MethodDescriptor = MethodDescriptor {
        name: "FindMaximum",
        shape: CallShape::Bidirectional,
    };

    pub const CALCULATE_WITH_DEADLINE: MethodDescriptor = MethodDescriptor {
        name: "CalculateWithDeadline",
        shape: CallShape::Unary,
    };

    pub const ALL: [MethodDescriptor; 5] = [
        TIMES_TEN,
        DECOMPOSE,
        COMPUTE_AVERAGE,
        FIND_MAXIMUM,
        CALCULATE_WITH_DEADLINE,
    ];
}

/// Direction of a message relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// How a call ended, as reported to post-call observers.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// The handler produced its full response.
    Completed,
    /// The handler or the inbound stream returned an error.
    Failed(tonic::Status),
    /// The response was dropped before it finished, e.g. the client went
    /// away or the server-side timeout fired.
    Abandoned,
}

impl CallOutcome {
    /// Label used in logs and metrics.
    pub fn status(&self) -> &'static str {
        match self {
            CallOutcome::Completed => "ok",
            CallOutcome::Failed(_) => "error",
            CallOutcome::Abandoned => "abandoned",
        }
    }
}

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// One in-flight RPC invocation.
///
/// Cheap to clone; clones share the cancellation flag, so a send loop that
/// notices the client has gone can cancel the receive loop of the same call.
#[derive(Debug, Clone)]
pub struct CallInfo {
    id: u64,
    method: MethodDescriptor,
    deadline: Option<Instant>,
    remote_addr: Option<SocketAddr>,
    started: Instant,
    cancelled: Arc<AtomicBool>,
}

impl CallInfo {
    pub fn new(method: MethodDescriptor) -> Self {
        Self {
            id: NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed),
            method,
            deadline: None,
            remote_addr: None,
            started: Instant::now(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build the call for an incoming request, reading its deadline from the
    /// `grpc-timeout` header.
    pub fn from_request<T>(method: MethodDescriptor, request: &tonic::Request<T>) -> Self {
        let timeout = request
            .metadata()
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_grpc_timeout);

        let mut call = Self::new(method);
        call.remote_addr = request.remote_addr();
        if let Some(timeout) = timeout {
            call = call.with_timeout(timeout);
        }
        call
    }

    /// Set the deadline to `timeout` from when the call started.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(self.started + timeout);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn method(&self) -> &'static str {
        self.method.name
    }

    pub fn shape(&self) -> CallShape {
        self.method.shape
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Mark the call cancelled. Every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Whether the call was cancelled explicitly or its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire) || self.is_deadline_exceeded()
    }

    /// Resolve once the deadline passes; never resolves without one.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

/// Metadata key carrying the caller's deadline.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Parse a `grpc-timeout` header value: at most 8 ASCII digits followed by
/// one of the units `H`, `M`, `S`, `m`, `u`, `n`.
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || !value.is_ascii() {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let duration = match unit {
        "H" => Duration::from_secs(amount * 60 * 60),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(duration)
}
