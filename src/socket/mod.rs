//! Socket and connection establishment.
//!
//! Mirrors the parts of Chromium's `net/socket/` a one-shot session needs:
//! - [`stream`]: blocking byte-stream abstraction (plain TCP, TLS, test doubles)
//! - [`connectjob`]: DNS → TCP → proxy tunnel → TLS connection flow
//! - [`proxy`]: HTTP proxy settings, tunnel and forward modes
//! - [`tls`]: TLS configuration with BoringSSL

pub mod connectjob;
pub mod proxy;
pub mod stream;
pub mod tls;
