//! Error types for the scan client.

use std::fmt;

/// Result type alias for client and cursor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the server or driving a scan cursor.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred during communication.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The server returned a RESP error response.
    #[error("server error: {0}")]
    Server(String),

    /// The RESP data, or a scan reply built from it, was malformed.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The response type did not match what was expected.
    #[error("unexpected response type: expected {expected}, got {actual}")]
    UnexpectedResponse {
        /// The expected type description.
        expected: &'static str,
        /// The actual type description.
        actual: String,
    },

    /// The connection to the server was closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// No connection permit could be acquired from the pool.
    #[error("connection pool exhausted (max size: {max_size})")]
    PoolExhausted {
        /// The maximum pool size.
        max_size: usize,
    },

    /// An invalid argument was provided to a command or option builder.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not supported in the connection's current mode,
    /// e.g. scanning inside `MULTI` or while pipelining.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A cursor was used outside of its lifecycle (not opened, or closed).
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The client configuration could not be loaded or is invalid.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` if this error came from the transport rather than from
    /// misuse of the client API.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::ConnectionClosed | Error::Server(_) | Error::Protocol(_)
        )
    }
}

/// Describes the shape of a RESP value for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A bulk string.
    Bulk,
    /// A simple status string.
    Status,
    /// An integer value.
    Integer,
    /// An array value.
    Array,
    /// A null value.
    Nil,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bulk => write!(f, "bulk string"),
            ValueKind::Status => write!(f, "status"),
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Array => write!(f, "array"),
            ValueKind::Nil => write!(f, "nil"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_classified() {
        assert!(Error::ConnectionClosed.is_transport());
        assert!(Error::Server("ERR boom".into()).is_transport());
        assert!(!Error::IllegalState("closed".into()).is_transport());
        assert!(!Error::InvalidOperation("multi".into()).is_transport());
    }

    #[test]
    fn messages_carry_context() {
        let err = Error::UnexpectedResponse {
            expected: "array",
            actual: ValueKind::Integer.to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected response type: expected array, got integer"
        );
    }
}
