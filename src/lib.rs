//! # rawnet
//!
//! A blocking HTTP/1.1 client engine that owns its sockets.
//!
//! `rawnet` writes requests byte for byte, frames responses itself (status-line
//! recovery, `Content-Length`, chunked transfer coding, gzip/deflate), streams
//! multipart uploads straight from disk with an exact up-front
//! `Content-Length`, and keeps a cookie jar across requests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rawnet::Client;
//!
//! # fn main() -> Result<(), rawnet::NetError> {
//! let client = Client::builder().timeout(10).build();
//! let mut response = client.get("http://example.com/").send()?;
//! println!("{} {}", response.status_code(), response.reason());
//! println!("{}", response.text()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Errors, options, load states and URL helpers
//! - [`cookies`] - Cookie parsing, matching, storage and persistence
//! - [`http`] - Headers, requests, multipart, response framing and sessions
//! - [`socket`] - TCP, TLS and proxy connection setup
//! - [`client`] - High-level entry point

pub mod base;
pub mod client;
pub mod cookies;
pub mod http;
pub mod socket;

pub use base::neterror::NetError;
pub use base::options::TransportOptions;
pub use client::{Backend, Client, ClientBuilder, RequestBuilder};
pub use cookies::jar::CookieJar;
pub use crate::http::{Request, Response, TransportSession, Transporter};
