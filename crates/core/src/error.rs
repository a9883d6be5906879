//! Error taxonomy shared by every channel and the state engine.

use std::fmt;

use thiserror::Error;

/// Boxed error produced by the underlying network primitive.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Canonical gRPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// Not an error; returned on success.
    Ok,
    /// The operation was cancelled.
    Cancelled,
    /// Unknown error.
    Unknown,
    /// Client specified an invalid argument.
    InvalidArgument,
    /// Deadline expired before the operation could complete.
    DeadlineExceeded,
    /// Some requested entity was not found.
    NotFound,
    /// The entity a client attempted to create already exists.
    AlreadyExists,
    /// The caller does not have permission to execute the operation.
    PermissionDenied,
    /// Some resource has been exhausted.
    ResourceExhausted,
    /// The system is not in a state required for the operation.
    FailedPrecondition,
    /// The operation was aborted.
    Aborted,
    /// Operation was attempted past the valid range.
    OutOfRange,
    /// Operation is not implemented or not supported.
    Unimplemented,
    /// Internal error.
    Internal,
    /// The service is currently unavailable.
    Unavailable,
    /// Unrecoverable data loss or corruption.
    DataLoss,
    /// The request does not have valid authentication credentials.
    Unauthenticated,
}

impl Code {
    /// Map a numeric wire value to a code. Unrecognised values become `Unknown`.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Code::Ok,
            1 => Code::Cancelled,
            2 => Code::Unknown,
            3 => Code::InvalidArgument,
            4 => Code::DeadlineExceeded,
            5 => Code::NotFound,
            6 => Code::AlreadyExists,
            7 => Code::PermissionDenied,
            8 => Code::ResourceExhausted,
            9 => Code::FailedPrecondition,
            10 => Code::Aborted,
            11 => Code::OutOfRange,
            12 => Code::Unimplemented,
            13 => Code::Internal,
            14 => Code::Unavailable,
            15 => Code::DataLoss,
            16 => Code::Unauthenticated,
            _ => Code::Unknown,
        }
    }

    /// Parse the textual `grpc-status` value carried in metadata.
    pub fn from_metadata(value: &str) -> Self {
        value
            .trim()
            .parse::<i32>()
            .map(Code::from_i32)
            .unwrap_or(Code::Unknown)
    }

    /// Code used when an HTTP error arrives without any gRPC status.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Code::Internal,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::Unimplemented,
            429 | 502 | 503 | 504 => Code::Unavailable,
            _ => Code::Unknown,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Code::Ok => "ok",
            Code::Cancelled => "cancelled",
            Code::Unknown => "unknown",
            Code::InvalidArgument => "invalid argument",
            Code::DeadlineExceeded => "deadline exceeded",
            Code::NotFound => "not found",
            Code::AlreadyExists => "already exists",
            Code::PermissionDenied => "permission denied",
            Code::ResourceExhausted => "resource exhausted",
            Code::FailedPrecondition => "failed precondition",
            Code::Aborted => "aborted",
            Code::OutOfRange => "out of range",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::DataLoss => "data loss",
            Code::Unauthenticated => "unauthenticated",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client error
#[derive(Debug, Error)]
pub enum Error {
    /// A privileged call was attempted without a session credential.
    /// Raised before any request leaves the process.
    #[error("not logged in")]
    Unauthenticated,

    /// The backend answered with a non-OK status.
    #[error("{code}: {message}")]
    Status {
        /// Status code from `grpc-status` (or mapped from the HTTP status).
        code: Code,
        /// Percent-decoded `grpc-message`.
        message: String,
    },

    /// The network primitive produced no response at all.
    #[error("network failure: {0}")]
    Network(#[source] BoxError),

    /// Response payload was not a valid protobuf message
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Response violated the gRPC-web framing rules
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Durable credential slot could not be read or written
    #[error("credential storage error: {0}")]
    Credential(#[source] std::io::Error),
}

impl Error {
    /// Status code for backend rejections, `None` for local failures.
    pub fn code(&self) -> Option<Code> {
        match self {
            Error::Status { code, .. } => Some(*code),
            Error::Unauthenticated => Some(Code::Unauthenticated),
            _ => None,
        }
    }

    /// Whether the error came from the network primitive rather than the backend.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    pub(crate) fn status(code: Code, message: impl Into<String>) -> Self {
        Error::Status {
            code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(Box::new(err))
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;
