//! Integration tests for the gRPC service.
//!
//! Starts an in-process calcd server and connects with a [`ServiceClient`],
//! exercising every call shape over a real transport.

#![cfg(all(feature = "server", feature = "client"))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use calcrpc::call::methods;
use calcrpc::client::ServiceClient;
use calcrpc::server::config::Config;
use calcrpc::{
    CalcError, CallInfo, CallObserver, CallOutcome, CalculatorService, HandlerSettings, Handlers,
    InterceptorChain,
};
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tonic::transport::Server;

/// Work duration for the slow call, short enough to keep the suite quick.
const WORK: Duration = Duration::from_millis(300);

/// Counts call starts and ends per method.
#[derive(Default)]
struct CallCounter {
    starts: Mutex<HashMap<&'static str, usize>>,
    ends: Mutex<HashMap<&'static str, Vec<&'static str>>>,
}

impl CallCounter {
    fn starts(&self, method: &str) -> usize {
        self.starts.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    fn ends(&self, method: &str) -> Vec<&'static str> {
        self.ends
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .unwrap_or_default()
    }
}

impl CallObserver for CallCounter {
    fn on_call_start(&self, call: &CallInfo) {
        *self.starts.lock().unwrap().entry(call.method()).or_default() += 1;
    }

    fn on_call_end(&self, call: &CallInfo, outcome: &CallOutcome) {
        self.ends
            .lock()
            .unwrap()
            .entry(call.method())
            .or_default()
            .push(outcome.status());
    }
}

/// Find an available port for testing.
async fn find_available_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start a test server on a random port and return the address string.
async fn start_test_server(chain: InterceptorChain) -> String {
    let addr = find_available_port().await;
    let addr_str = format!("http://{addr}");

    let handlers = Handlers::new(HandlerSettings {
        work_duration: WORK,
        ..HandlerSettings::default()
    });
    let service = CalculatorService::new(handlers, chain);

    tokio::spawn(async move {
        Server::builder()
            .add_service(service.into_server())
            .serve(addr)
            .await
            .unwrap();
    });

    // Give the server a moment to bind.
    tokio::time::sleep(Duration::from_millis(100)).await;

    addr_str
}

async fn connect() -> ServiceClient {
    let addr = start_test_server(InterceptorChain::new()).await;
    ServiceClient::connect(&addr).await.unwrap()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_service_from_config() {
    let mut config = Config::default();
    config.handlers.work_duration_ms = 25;
    config.handlers.stream_buffer = 4;
    config.telemetry.metrics = false;

    let service = CalculatorService::from_config(&config);
    assert_eq!(service.handlers().settings().work_duration, Duration::from_millis(25));
    assert_eq!(service.handlers().settings().stream_buffer, 4);
    // Tracing only; metrics are disabled.
    assert_eq!(service.chain().len(), 1);

    let service = CalculatorService::from_config(&Config::default());
    assert_eq!(service.chain().len(), 2);
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
async fn test_client_connect() {
    let addr = start_test_server(InterceptorChain::new()).await;
    let client = ServiceClient::connect(&addr).await;
    assert!(client.is_ok(), "failed to connect: {:?}", client.err());
}

#[tokio::test]
async fn test_client_connect_invalid_address() {
    let result = ServiceClient::connect("not a uri").await;
    assert!(matches!(result, Err(CalcError::Configuration(_))));
}

#[tokio::test]
async fn test_client_connect_refused() {
    let addr = find_available_port().await;
    let result = ServiceClient::connect(format!("http://{addr}")).await;
    assert!(matches!(result, Err(CalcError::Transport(_))));
}

// ============================================================================
// Unary
// ============================================================================

#[tokio::test]
async fn test_times_ten() {
    let client = connect().await;
    assert_eq!(client.times_ten(100).await.unwrap(), 1000);
    assert_eq!(client.times_ten(-7).await.unwrap(), -70);
}

#[tokio::test]
async fn test_times_ten_overflow() {
    let client = connect().await;
    let err = client.times_ten(i32::MAX).await.unwrap_err();
    assert!(matches!(err, CalcError::Overflow(_)), "got {err:?}");
}

// ============================================================================
// Server streaming
// ============================================================================

#[tokio::test]
async fn test_decompose() {
    let client = connect().await;
    assert_eq!(client.decompose(4780).await.unwrap(), vec![2, 2, 5, 239]);
}

#[tokio::test]
async fn test_decompose_prime() {
    let client = connect().await;
    assert_eq!(client.decompose(239).await.unwrap(), vec![239]);
}

#[tokio::test]
async fn test_decompose_without_factors() {
    let client = connect().await;
    assert!(client.decompose(1).await.unwrap().is_empty());
    assert!(client.decompose(0).await.unwrap().is_empty());
}

// ============================================================================
// Client streaming
// ============================================================================

#[tokio::test]
async fn test_compute_average() {
    let client = connect().await;
    let average = client.compute_average([1.0, 3.0, 5.0, 7.0]).await.unwrap();
    assert_eq!(average, 4.0);
}

#[tokio::test]
async fn test_compute_average_single() {
    let client = connect().await;
    assert_eq!(client.compute_average([2.5]).await.unwrap(), 2.5);
}

#[tokio::test]
async fn test_compute_average_empty() {
    let client = connect().await;
    let err = client.compute_average(Vec::new()).await.unwrap_err();
    assert!(matches!(err, CalcError::InvalidInput(_)), "got {err:?}");
}

// ============================================================================
// Bidirectional streaming
// ============================================================================

#[tokio::test]
async fn test_find_maximum() {
    let client = connect().await;
    let maxima = client
        .find_maximum(vec![1, 5, 2, 53, 532, 64], Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(maxima, vec![1, 5, 53, 532]);
}

#[tokio::test]
async fn test_find_maximum_with_interval() {
    let client = connect().await;
    let maxima = client
        .find_maximum(vec![3, 1, 4, 1, 5], Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(maxima, vec![3, 4, 5]);
}

#[tokio::test]
async fn test_find_maximum_stream_yields_before_sending_finishes() {
    let client = connect().await;
    let interval = Duration::from_millis(300);
    let started = std::time::Instant::now();

    let mut maxima = std::pin::pin!(
        client
            .find_maximum_stream(vec![5, 1, 9], interval)
            .await
            .unwrap()
    );

    assert_eq!(maxima.next().await.unwrap().unwrap(), 5);
    let first_at = started.elapsed();
    // The last number goes out two intervals after the first.
    assert!(
        first_at < interval * 2,
        "first maximum arrived after {first_at:?}"
    );

    assert_eq!(maxima.next().await.unwrap().unwrap(), 9);
    assert!(maxima.next().await.is_none());
    assert!(started.elapsed() >= interval * 2);
}

#[tokio::test]
async fn test_find_maximum_empty() {
    let client = connect().await;
    let maxima = client.find_maximum(Vec::new(), Duration::ZERO).await.unwrap();
    assert!(maxima.is_empty());
}

// ============================================================================
// Deadlines
// ============================================================================

#[tokio::test]
async fn test_deadline_met() {
    let client = connect().await;
    assert_eq!(client.calculate_with_deadline(3, 4).await.unwrap(), 7);
}

#[tokio::test]
async fn test_deadline_missed() {
    let client = connect().await;
    let err = client
        .calculate_with_timeout(3, 4, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_cancellation(), "expected cancellation, got {err:?}");
}

#[tokio::test]
async fn test_missed_deadline_does_not_affect_other_calls() {
    let client = connect().await;

    let late = client.calculate_with_timeout(1, 1, Duration::from_millis(50));
    let on_time = client.times_ten(5);
    let (late, on_time) = tokio::join!(late, on_time);

    assert!(late.unwrap_err().is_cancellation());
    assert_eq!(on_time.unwrap(), 50);
}

// ============================================================================
// Concurrency and interception
// ============================================================================

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let client = connect().await;

    let mut tasks = Vec::new();
    for n in 1..=16 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let maxima = client
                .find_maximum(vec![n, n * 2, n], Duration::ZERO)
                .await
                .unwrap();
            (n, maxima)
        }));
    }

    for task in tasks {
        let (n, maxima) = task.await.unwrap();
        assert_eq!(maxima, vec![n, n * 2]);
    }
}

#[tokio::test]
async fn test_every_call_is_observed_once() {
    let counter = Arc::new(CallCounter::default());
    let addr = start_test_server(InterceptorChain::new().with_shared(counter.clone())).await;
    let client = ServiceClient::connect(&addr).await.unwrap();

    client.times_ten(1).await.unwrap();
    client.decompose(12).await.unwrap();
    client.compute_average([1.0, 2.0]).await.unwrap();
    client.find_maximum(vec![1, 2], Duration::ZERO).await.unwrap();
    client.calculate_with_deadline(1, 2).await.unwrap();
    client.compute_average(Vec::new()).await.unwrap_err();

    assert_eq!(counter.starts(methods::TIMES_TEN.name), 1);
    assert_eq!(counter.ends(methods::TIMES_TEN.name), vec!["ok"]);
    assert_eq!(counter.starts(methods::DECOMPOSE.name), 1);
    assert_eq!(counter.ends(methods::DECOMPOSE.name), vec!["ok"]);
    assert_eq!(counter.starts(methods::FIND_MAXIMUM.name), 1);
    assert_eq!(counter.ends(methods::FIND_MAXIMUM.name), vec!["ok"]);
    assert_eq!(counter.starts(methods::CALCULATE_WITH_DEADLINE.name), 1);
    assert_eq!(counter.ends(methods::CALCULATE_WITH_DEADLINE.name), vec!["ok"]);

    assert_eq!(counter.starts(methods::COMPUTE_AVERAGE.name), 2);
    assert_eq!(counter.ends(methods::COMPUTE_AVERAGE.name), vec!["ok", "error"]);
}
