use std::io;
use thiserror::Error;
use tonic::Code;

/// Client-specific error type
#[derive(Error, Debug)]
pub enum ClientError {
    /// The client was closed; no I/O was attempted.
    #[error("client has been closed")]
    Closed,

    /// The server rejected or failed the call. The original gRPC status is
    /// kept whole so callers can branch on its code.
    #[error("server error: {0}")]
    Server(#[from] tonic::Status),

    #[error("gRPC transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Client-specific result type
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// The gRPC status code for server errors, `None` otherwise.
    pub fn status_code(&self) -> Option<Code> {
        match self {
            ClientError::Server(status) => Some(status.code()),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ClientError::Closed)
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(Code::NotFound)
    }

    pub fn is_already_exists(&self) -> bool {
        self.status_code() == Some(Code::AlreadyExists)
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        self.status_code() == Some(Code::DeadlineExceeded)
    }
}

impl From<tonic::transport::Error> for ClientError {
    fn from(err: tonic::transport::Error) -> Self {
        ClientError::Transport(format!("Transport error: {}", err))
    }
}
