//! Client library for connecting to calcd.
//!
//! Provides [`ServiceClient`], which issues each call shape against a remote
//! calcd instance over gRPC and returns native values.

mod service_client;

pub use service_client::{DEFAULT_DEADLINE_CALL_TIMEOUT, DEFAULT_TIMEOUT, ServiceClient};
