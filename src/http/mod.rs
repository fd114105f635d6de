//! HTTP/1.1 message layer.
//!
//! - [`headers`]: case-insensitive, ordered header store
//! - [`request`] / [`requestbody`] / [`multipart`]: outgoing messages
//! - [`framing`]: status line, header block and body framing of responses
//! - [`response`]: parsed response with a lazily read body
//! - [`transaction`]: raw-socket exchange ([`TransportSession`])
//! - [`delegate`]: exchange driven by `hyper` ([`DelegatingTransporter`])

pub mod delegate;
pub mod framing;
pub mod headers;
pub mod multipart;
pub mod request;
pub mod requestbody;
pub mod response;
pub mod transaction;

// Re-exports for convenience
pub use delegate::DelegatingTransporter;
pub use framing::{BodyFraming, ResponseHead};
pub use headers::HeaderStore;
pub use multipart::{DiskFileField, Form, PlainField, PreparableField, RawBytesField};
pub use request::Request;
pub use requestbody::RequestBody;
pub use response::Response;
pub use transaction::{SessionState, TransportSession, Transporter};
