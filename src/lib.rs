//! calcrpc - a calculator service demonstrating every gRPC call shape
//!
//! The calculator itself is a placeholder; the crate is about wiring each
//! kind of call correctly:
//!
//! | Method | Shape |
//! |---|---|
//! | `TimesTen` | unary |
//! | `Decompose` | server streaming |
//! | `ComputeAverage` | client streaming |
//! | `FindMaximum` | bidirectional streaming |
//! | `CalculateWithDeadline` | unary, deadline-aware |
//!
//! Every call is dispatched through an [`InterceptorChain`] that reports the
//! start and end of the call, and every message in between, to pluggable
//! [`CallObserver`]s.
//!
//! # Server Example
//!
//! ```rust,no_run
//! use calcrpc::server::observers::TracingObserver;
//! use calcrpc::{CalculatorService, Handlers, InterceptorChain};
//! use tonic::transport::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let chain = InterceptorChain::new().with(TracingObserver::default());
//!     let service = CalculatorService::new(Handlers::default(), chain);
//!
//!     Server::builder()
//!         .add_service(service.into_server())
//!         .serve("127.0.0.1:50051".parse()?)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Client Example
//!
//! ```rust,no_run
//! use calcrpc::client::ServiceClient;
//!
//! #[tokio::main]
//! async fn main() -> calcrpc::Result<()> {
//!     let client = ServiceClient::connect("http://127.0.0.1:50051").await?;
//!     assert_eq!(client.times_ten(100).await?, 1000);
//!     assert_eq!(client.decompose(4780).await?, vec![2, 2, 5, 239]);
//!     Ok(())
//! }
//! ```

pub mod calc;
pub mod call;
pub mod client;
pub mod error;
pub mod server;
pub mod telemetry;
mod version;

// Re-export main types at crate root
pub use call::{CallInfo, CallOutcome, CallShape, Direction, MethodDescriptor};
pub use error::{CalcError, Result};
pub use server::{CalculatorService, CallObserver, HandlerSettings, Handlers, InterceptorChain};
pub use version::{PKG_VERSION, version_string};
