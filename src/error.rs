//! calcrpc error types

/// calcrpc error types
#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    // Transport errors
    #[error("transport error: {0}")]
    Transport(String),

    // Cancellation
    #[error("call cancelled: {0}")]
    Cancelled(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    // Handler errors
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    /// A client stream closed before sending a single message.
    #[error("cannot average an empty stream")]
    EmptyStream,

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Any other status returned by the peer.
    #[error("rpc failed ({code:?}): {message}")]
    Rpc { code: tonic::Code, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl CalcError {
    /// Whether the call ended because it was cancelled or ran out of time,
    /// as opposed to failing in the handler or the transport.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            CalcError::Cancelled(_) | CalcError::DeadlineExceeded(_)
        )
    }
}

impl From<tonic::transport::Error> for CalcError {
    fn from(err: tonic::transport::Error) -> Self {
        CalcError::Transport(err.to_string())
    }
}

/// Result type alias for calcrpc operations
pub type Result<T> = std::result::Result<T, CalcError>;
