//! Socket abstraction for plain and TLS byte streams.
//!
//! This module provides a `StreamSocket` trait that allows uniform handling of
//! different socket types: plain TCP, TLS over TCP, and in-memory sockets in tests.
//!
//! Based on Chromium's `StreamSocket` interface which provides polymorphism
//! for `TcpClientSocket` and `SSLClientSocket`.

use boring::ssl::SslStream;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

/// A blocking, bidirectional byte stream.
///
/// Chromium equivalent: `net::StreamSocket`
pub trait StreamSocket: Read + Write + Send + 'static {
    /// Check if the socket is connected.
    fn is_connected(&self) -> bool {
        true
    }

    /// Shut the stream down. Called once when the owning connection closes.
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl StreamSocket for TcpStream {
    fn is_connected(&self) -> bool {
        self.peer_addr().is_ok()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

// TLS over any StreamSocket
impl<S: StreamSocket> StreamSocket for SslStream<S> {
    fn is_connected(&self) -> bool {
        self.get_ref().is_connected()
    }

    fn close(&mut self) -> io::Result<()> {
        if let Err(e) = self.shutdown() {
            tracing::debug!(error = %e, "tls close_notify failed");
        }
        self.get_mut().close()
    }
}

/// A boxed dynamic StreamSocket.
pub struct BoxedSocket {
    inner: Box<dyn StreamSocket>,
}

impl BoxedSocket {
    /// Create a new BoxedSocket from any StreamSocket.
    pub fn new<S: StreamSocket>(socket: S) -> Self {
        Self {
            inner: Box::new(socket),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}

impl fmt::Debug for BoxedSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedSocket")
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Read for BoxedSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for BoxedSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
