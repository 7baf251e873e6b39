//! Conversions between [`CalcError`] and [`tonic::Status`].
//!
//! Both directions live here so the server and the client agree on which
//! error kind travels as which status code.

use tonic::{Code, Status};

use crate::CalcError;

impl From<CalcError> for Status {
    fn from(err: CalcError) -> Self {
        let message = err.to_string();
        match err {
            CalcError::Transport(_) => Status::unavailable(message),
            CalcError::Cancelled(_) => Status::cancelled(message),
            CalcError::DeadlineExceeded(_) => Status::deadline_exceeded(message),
            CalcError::InvalidInput(_) | CalcError::EmptyStream => {
                Status::invalid_argument(message)
            }
            CalcError::Overflow(_) => Status::out_of_range(message),
            CalcError::Configuration(_) | CalcError::Internal(_) => Status::internal(message),
            CalcError::Rpc { code, message } => Status::new(code, message),
        }
    }
}

impl From<Status> for CalcError {
    fn from(status: Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            Code::Cancelled => CalcError::Cancelled(message),
            Code::DeadlineExceeded => CalcError::DeadlineExceeded(message),
            Code::InvalidArgument => CalcError::InvalidInput(message),
            Code::OutOfRange => CalcError::Overflow(message),
            Code::Unavailable => CalcError::Transport(message),
            code => CalcError::Rpc { code, message },
        }
    }
}
