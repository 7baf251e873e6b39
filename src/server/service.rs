//! gRPC service implementation.
//!
//! [`CalculatorService`] is the dispatcher: every generated trait method
//! builds the [`CallInfo`] for its method, then hands the call to the
//! [`InterceptorChain`] entry point matching the method's shape, with the
//! matching handler as the terminal step. Each call runs on its own task, so
//! a failing call never affects another.

use std::sync::Arc;

use async_trait::async_trait;
use tonic::{Request, Response, Status, Streaming};

use crate::call::{CallInfo, methods};
use crate::server::handlers::{Handlers, ResponseStream};
use crate::server::interceptor::{InterceptorChain, ObservedStream};
use crate::server::proto::calculator_server::{Calculator, CalculatorServer};
use crate::server::proto::{
    CalculateWithDeadlineRequest, CalculateWithDeadlineResponse, ComputeAverageRequest,
    ComputeAverageResponse, DecomposeRequest, DecomposeResponse, FindMaximumRequest,
    FindMaximumResponse, TimesTenRequest, TimesTenResponse,
};

/// gRPC service that routes calls through the interceptor chain to the
/// handlers.
#[derive(Debug, Clone)]
pub struct CalculatorService {
    handlers: Arc<Handlers>,
    chain: InterceptorChain,
}

impl CalculatorService {
    /// Create a new service from handlers and the chain wrapped around them.
    pub fn new(handlers: Handlers, chain: InterceptorChain) -> Self {
        Self {
            handlers: Arc::new(handlers),
            chain,
        }
    }

    /// Build the service described by a configuration: handler settings
    /// from `[handlers]`, observers from `[telemetry]`.
    #[cfg(feature = "server")]
    pub fn from_config(config: &crate::server::config::Config) -> Self {
        use crate::server::observers::{MetricsObserver, TracingObserver};

        let mut chain = InterceptorChain::new()
            .with(TracingObserver::new(config.telemetry.log_messages));
        if config.telemetry.metrics {
            chain = chain.with(MetricsObserver);
        }
        Self::new(Handlers::new(config.handlers.settings()), chain)
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    /// Wrap the service in the generated tonic server.
    pub fn into_server(self) -> CalculatorServer<Self> {
        CalculatorServer::new(self)
    }
}

impl Default for CalculatorService {
    fn default() -> Self {
        Self::new(Handlers::default(), InterceptorChain::new())
    }
}

#[async_trait]
impl Calculator for CalculatorService {
    async fn times_ten(
        &self,
        request: Request<TimesTenRequest>,
    ) -> Result<Response<TimesTenResponse>, Status> {
        let call = CallInfo::from_request(methods::TIMES_TEN, &request);
        let handlers = &self.handlers;

        self.chain
            .unary(call, request.into_inner(), |_call, req| async move {
                handlers.times_ten(req).map_err(Status::from)
            })
            .await
            .map(Response::new)
    }

    type DecomposeStream = ObservedStream<ResponseStream<DecomposeResponse>>;

    async fn decompose(
        &self,
        request: Request<DecomposeRequest>,
    ) -> Result<Response<Self::DecomposeStream>, Status> {
        let call = CallInfo::from_request(methods::DECOMPOSE, &request);

        self.chain
            .server_streaming(call, request.into_inner(), |call, req| {
                Ok(self.handlers.decompose(call, req))
            })
            .map(Response::new)
    }

    async fn compute_average(
        &self,
        request: Request<Streaming<ComputeAverageRequest>>,
    ) -> Result<Response<ComputeAverageResponse>, Status> {
        let call = CallInfo::from_request(methods::COMPUTE_AVERAGE, &request);
        let handlers = &self.handlers;

        self.chain
            .client_streaming(call, request.into_inner(), |call, inbound| async move {
                handlers
                    .compute_average(&call, inbound)
                    .await
                    .map_err(Status::from)
            })
            .await
            .map(Response::new)
    }

    type FindMaximumStream = ObservedStream<ResponseStream<FindMaximumResponse>>;

    async fn find_maximum(
        &self,
        request: Request<Streaming<FindMaximumRequest>>,
    ) -> Result<Response<Self::FindMaximumStream>, Status> {
        let call = CallInfo::from_request(methods::FIND_MAXIMUM, &request);

        self.chain
            .bidi_streaming(call, request.into_inner(), |call, inbound| {
                Ok(self.handlers.find_maximum(call, inbound))
            })
            .map(Response::new)
    }

    async fn calculate_with_deadline(
        &self,
        request: Request<CalculateWithDeadlineRequest>,
    ) -> Result<Response<CalculateWithDeadlineResponse>, Status> {
        let call = CallInfo::from_request(methods::CALCULATE_WITH_DEADLINE, &request);
        let handlers = &self.handlers;

        self.chain
            .unary(call, request.into_inner(), |call, req| async move {
                handlers
                    .calculate_with_deadline(&call, req)
                    .await
                    .map_err(Status::from)
            })
            .await
            .map(Response::new)
    }
}
