use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverClientError>;

#[derive(Error, Debug)]
pub enum DriverClientError {
    #[error("failed to write data in offset {:?}", offset)]
    WriteError {
        offset: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read data from offset {:?}", offset)]
    ReadError {
        offset: String,
        #[source]
        source: io::Error,
    },
    #[error("device {:?} is unavailable", path)]
    DeviceUnavailable {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },
    #[error("device did not leave reset after {polls} polls")]
    Timeout { polls: usize },
    #[error("operation not allowed in reset state {state}")]
    InvalidState { state: String },
    #[error("failed to pack register {register}: {reason}")]
    PackingError { register: String, reason: String },
    #[error("unknown driver client error")]
    Unknown,
}

impl DriverClientError {
    pub(crate) fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }
}

/// Tri-state result code exposed to orchestration code that only cares
/// whether a call succeeded, failed, or was rejected for its arguments.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    GenericFailure = -1,
    InvalidParam = -2,
}

impl From<&DriverClientError> for ErrorCode {
    fn from(err: &DriverClientError) -> Self {
        match err {
            DriverClientError::InvalidParameter { .. } => ErrorCode::InvalidParam,
            _ => ErrorCode::GenericFailure,
        }
    }
}

impl ErrorCode {
    pub fn of<T>(res: &Result<T>) -> Self {
        match res {
            Ok(_) => ErrorCode::Success,
            Err(e) => e.into(),
        }
    }

    pub fn value(&self) -> i32 {
        *self as i32
    }
}
