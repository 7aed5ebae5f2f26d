//! Error types for the control-channel client.

use std::io;
use thiserror::Error;

/// The error type for all control-channel operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error on the control connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TCP connection to the control port could not be established.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// Unparseable reply line or unexpected terminal code.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No supported authentication method was offered with usable credentials.
    #[error("authentication unavailable: {0}")]
    AuthenticationUnavailable(String),

    /// Tor rejected the AUTHENTICATE command.
    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// Cookie file missing, unreadable, or not the expected length.
    #[error("cookie unreadable: {0}")]
    CookieUnreadable(String),

    /// ADD_ONION or SETCONF hidden-service publication failed.
    #[error("publication failed: {0}")]
    PublicationFailed(String),

    /// torrc path was rejected or the write failed.
    #[error("configuration write failed: {0}")]
    ConfigurationWrite(String),

    /// Key material had an unknown type tag or a malformed payload.
    #[error("bad key material: {0}")]
    KeyFormat(String),
}

/// Result type alias for control-channel operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn display_includes_detail() {
        let err = Error::AuthenticationRejected("515 Bad authentication".into());
        assert!(err.to_string().contains("515"));
    }
}
