//! Typed driver for the calculator service.
//!
//! Every call carries an explicit deadline (sent as `grpc-timeout`); statuses
//! coming back are mapped into [`CalcError`] by the shared conversions in
//! [`crate::server::convert`].

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Request;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::server::proto;
use crate::server::proto::calculator_client::CalculatorClient;
use crate::{CalcError, Result};

/// Deadline applied to calls unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// Deadline applied to `CalculateWithDeadline` by [`ServiceClient::calculate_with_deadline`].
pub const DEFAULT_DEADLINE_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// A client for the calculator service.
///
/// Cheap to clone; clones share the underlying connection.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    inner: CalculatorClient<Channel>,
    timeout: Duration,
}

impl ServiceClient {
    /// Connect to a calcd server at the given address.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = ServiceClient::connect("http://127.0.0.1:50051").await?;
    /// ```
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        let endpoint = Endpoint::from_shared(addr.clone())
            .map_err(|e| CalcError::Configuration(format!("invalid address {addr}: {e}")))?;
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| CalcError::Transport(format!("failed to connect to {addr}: {e}")))?;
        Ok(Self::new(channel))
    }

    /// Wrap an existing channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: CalculatorClient::new(channel),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a different default deadline for every call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request.set_timeout(self.timeout);
        request
    }

    /// Unary: multiply a number by ten.
    pub async fn times_ten(&self, number: i32) -> Result<i32> {
        let response = self
            .inner
            .clone()
            .times_ten(self.request(proto::TimesTenRequest { number }))
            .await?;
        Ok(response.into_inner().result)
    }

    /// Server streaming: the prime factors of a number, as they arrive.
    pub async fn decompose_stream(
        &self,
        number: i32,
    ) -> Result<impl Stream<Item = Result<i32>> + Send + 'static> {
        let response = self
            .inner
            .clone()
            .decompose(self.request(proto::DecomposeRequest { number }))
            .await?;
        Ok(response
            .into_inner()
            .map(|item| item.map(|r| r.factor).map_err(CalcError::from)))
    }

    /// Server streaming: collect every prime factor of a number.
    pub async fn decompose(&self, number: i32) -> Result<Vec<i32>> {
        let mut stream = std::pin::pin!(self.decompose_stream(number).await?);
        let mut factors = Vec::new();
        while let Some(factor) = stream.next().await {
            factors.push(factor?);
        }
        Ok(factors)
    }

    /// Client streaming: send every number, then receive their average.
    pub async fn compute_average<I>(&self, numbers: I) -> Result<f32>
    where
        I: IntoIterator<Item = f32>,
        I::IntoIter: Send + 'static,
    {
        let outbound = tokio_stream::iter(numbers)
            .map(|number| proto::ComputeAverageRequest { number });
        let response = self
            .inner
            .clone()
            .compute_average(self.request(outbound))
            .await?;
        Ok(response.into_inner().average)
    }

    /// Bidirectional streaming: send numbers with `interval` between them and
    /// yield every new maximum the server reports as soon as it arrives.
    ///
    /// Sending runs on its own task, so receiving never waits on the send
    /// direction. The stream ends once the server closes its side, which it
    /// does after the last number has been sent. Dropping the stream stops
    /// the sender.
    pub async fn find_maximum_stream(
        &self,
        numbers: Vec<i32>,
        interval: Duration,
    ) -> Result<impl Stream<Item = Result<i32>> + Send + 'static> {
        let (tx, rx) = mpsc::channel(numbers.len().max(1));

        let sender = tokio::spawn(async move {
            for (i, number) in numbers.into_iter().enumerate() {
                if i > 0 && !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                debug!(number, "sending number");
                if tx.send(proto::FindMaximumRequest { number }).await.is_err() {
                    // The call ended early; the receive side reports why.
                    break;
                }
            }
        });
        let sender = AbortOnDrop(sender.abort_handle());

        let response = self
            .inner
            .clone()
            .find_maximum(self.request(ReceiverStream::new(rx)))
            .await?;

        Ok(response.into_inner().map(move |item| {
            let _sender = &sender;
            item.map(|response| {
                debug!(max = response.number, "received new maximum");
                response.number
            })
            .map_err(CalcError::from)
        }))
    }

    /// Bidirectional streaming: collect every new maximum.
    pub async fn find_maximum(&self, numbers: Vec<i32>, interval: Duration) -> Result<Vec<i32>> {
        let mut stream = std::pin::pin!(self.find_maximum_stream(numbers, interval).await?);
        let mut maxima = Vec::new();
        while let Some(max) = stream.next().await {
            maxima.push(max?);
        }
        Ok(maxima)
    }

    /// Unary with a short deadline: add two numbers on a server that takes
    /// its time. Uses [`DEFAULT_DEADLINE_CALL_TIMEOUT`].
    pub async fn calculate_with_deadline(&self, a: i32, b: i32) -> Result<i32> {
        self.calculate_with_timeout(a, b, DEFAULT_DEADLINE_CALL_TIMEOUT)
            .await
    }

    /// Like [`calculate_with_deadline`](Self::calculate_with_deadline) with
    /// an explicit deadline.
    pub async fn calculate_with_timeout(&self, a: i32, b: i32, timeout: Duration) -> Result<i32> {
        let mut request = Request::new(proto::CalculateWithDeadlineRequest { a, b });
        request.set_timeout(timeout);
        let response = self
            .inner
            .clone()
            .calculate_with_deadline(request)
            .await?;
        Ok(response.into_inner().result)
    }
}

/// Aborts a background task when dropped.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
