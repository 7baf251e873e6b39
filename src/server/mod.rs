//! gRPC server and shared proto types.
//!
//! This module provides:
//! - Wire messages and generated stubs (`proto`) used by both server and client
//! - Conversions between [`CalcError`](crate::CalcError) and `tonic::Status` (`convert`)
//! - The interceptor chain and its built-in observers (`interceptor`, `observers`)
//! - The handlers for each call shape (`handlers`)
//! - The dispatcher implementing the generated service trait (`service`)
//! - Configuration types (`config`, server-only)
//!
//! # Transport
//!
//! Only TCP is supported. Connection management, HTTP/2 framing and the
//! `grpc-timeout` deadline header are handled by tonic.

#[cfg(feature = "server")]
pub mod config;
pub mod convert;
pub mod handlers;
pub mod interceptor;
pub mod observers;
pub mod proto;
pub mod service;

pub use handlers::{HandlerSettings, Handlers};
pub use interceptor::{CallObserver, InterceptorChain};
pub use service::CalculatorService;
