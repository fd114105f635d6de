//! Base types and error handling.
//!
//! Provides foundational types mirroring Chromium's `net/base/`:
//! - [`NetError`](neterror::NetError): error taxonomy for the whole exchange
//! - [`LoadState`](loadstate::LoadState): stage of a request/response exchange
//! - [`TransportOptions`](options::TransportOptions): construction-time options
//! - [`UrlExt`](urlext::UrlExt): authority / path views over `url::Url`

pub mod context;
pub mod loadstate;
pub mod neterror;
pub mod options;
pub mod urlext;

#[cfg(test)]
mod tests;
