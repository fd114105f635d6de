//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into context-rich `NetError` variants.

use crate::base::neterror::NetError;
use std::io;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use rawnet::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect_timeout(&addr, timeout)
    ///     .connection_context("example.com", 443)?;
    /// // Error: "Connection to example.com:443 failed: connection refused"
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Add DNS resolution context to an IO error.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;

    /// Add exchange-stage context to an IO error on an open stream.
    ///
    /// Timeouts map to [`NetError::ConnectionTimedOut`], EOF and resets to
    /// [`NetError::ConnectionClosed`] / [`NetError::ConnectionReset`].
    fn stream_context(self, stage: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => NetError::ConnectionTimedOut,
            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            _ => NetError::connection_failed_to(host, port, e),
        })
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|_| NetError::NameNotResolved {
            domain: domain.to_string(),
        })
    }

    fn stream_context(self, stage: &str) -> Result<T, NetError> {
        self.map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => NetError::ConnectionTimedOut,
            io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe => NetError::ConnectionClosed,
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                NetError::ConnectionReset
            }
            _ => NetError::stream_failed(stage, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_connection_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::Other, "no route"));
        let err = result.connection_context("example.com", 443).unwrap_err();

        match err {
            NetError::ConnectionFailedTo { host, port, .. } => {
                assert_eq!(host, "example.com");
                assert_eq!(port, 443);
            }
            _ => panic!("Expected ConnectionFailedTo"),
        }
    }

    #[test]
    fn test_connection_refused_maps_directly() {
        let result: Result<(), io::Error> =
            Err(Error::new(ErrorKind::ConnectionRefused, "refused"));
        let err = result.connection_context("example.com", 80).unwrap_err();
        assert_eq!(err, NetError::ConnectionRefused);
    }

    #[test]
    fn test_dns_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::NotFound, "no such host"));
        let err = result.dns_context("unknown.example.com").unwrap_err();

        match err {
            NetError::NameNotResolved { domain } => {
                assert_eq!(domain, "unknown.example.com");
            }
            _ => panic!("Expected NameNotResolved"),
        }
    }

    #[test]
    fn test_stream_context_timeout() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::WouldBlock, "timed out"));
        assert_eq!(
            result.stream_context("reading headers").unwrap_err(),
            NetError::ConnectionTimedOut
        );
    }

    #[test]
    fn test_stream_context_eof() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::UnexpectedEof, "eof"));
        assert_eq!(
            result.stream_context("reading body").unwrap_err(),
            NetError::ConnectionClosed
        );
    }
}
