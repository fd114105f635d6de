//! URL accessors used across the exchange.
//!
//! The `url` crate is the URL value object; this trait adds the few derived
//! views the wire format and the cookie jar need.

use crate::base::neterror::NetError;
use url::Url;

pub trait UrlExt {
    /// Lowercased host plus `:port` when the URL carries a non-default port.
    fn authority(&self) -> String;

    /// `host:port` with the scheme's default port filled in.
    fn host_and_port(&self) -> Result<(String, u16), NetError>;

    /// Path plus `?query`, as written on the request line.
    fn path_and_query(&self) -> String;

    /// True for schemes carried over TLS.
    fn is_encrypted(&self) -> bool;
}

impl UrlExt for Url {
    fn authority(&self) -> String {
        let host = self.host_str().unwrap_or("").to_ascii_lowercase();
        match self.port() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        }
    }

    fn host_and_port(&self) -> Result<(String, u16), NetError> {
        let host = self.host_str().ok_or(NetError::InvalidUrl)?;
        let port = self
            .port_or_known_default()
            .ok_or(NetError::UnknownUrlScheme)?;
        Ok((host.to_string(), port))
    }

    fn path_and_query(&self) -> String {
        let path = if self.path().is_empty() {
            "/"
        } else {
            self.path()
        };
        match self.query() {
            Some(q) => format!("{path}?{q}"),
            None => path.to_string(),
        }
    }

    fn is_encrypted(&self) -> bool {
        matches!(self.scheme(), "https" | "wss")
    }
}
