//! Error types for jdwp-client.

use thiserror::Error;

/// Main error type for all JDWP client operations.
///
/// The enum is `Clone` because a single reader-loop fault must be delivered
/// to every caller that still has a command in flight. `Transport` therefore
/// carries the underlying I/O error's message rather than the
/// (non-cloneable) `std::io::Error` itself.
#[derive(Debug, Clone, Error)]
pub enum JdwpError {
    /// The underlying stream failed. Terminal for the session.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Wire malformation: bad handshake, length out of range, truncated
    /// packet, invalid UTF-8, ID sizes not yet negotiated. Terminal for the
    /// session when seen in the reader loop.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A command was issued against a closed session.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A caller-supplied argument could not be satisfied (e.g. a class
    /// signature matching zero or several loaded classes).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The VM replied with a non-zero JDWP error code.
    #[error("Command failed: {0}")]
    CommandFailed(u16),

    /// The caller's cancellation token fired. The session stays healthy.
    #[error("Cancelled")]
    Cancelled,
}

impl From<std::io::Error> for JdwpError {
    fn from(err: std::io::Error) -> Self {
        JdwpError::Transport(err.to_string())
    }
}

/// Result type alias using JdwpError.
pub type Result<T> = std::result::Result<T, JdwpError>;
