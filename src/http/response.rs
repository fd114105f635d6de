//! HTTP Response with lazily read body.

use crate::base::context::IoResultExt;
use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::http::framing::{decode_content, read_body, BodyFraming, ResponseHead};
use crate::http::headers::HeaderStore;
use crate::http::transaction::Connection;
use bytes::Bytes;
use http::Method;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use url::Url;

/// A parsed response. The head is read eagerly, the body on first access.
///
/// The body is materialized at most once: [`body`](Self::body) caches the
/// decoded bytes and later calls return the cache without touching the
/// connection. [`copy_body_to`](Self::copy_body_to) is the alternative raw
/// mode; the two cannot be mixed on one response.
#[derive(Debug)]
pub struct Response {
    head: ResponseHead,
    method: Method,
    url: Url,
    framing: BodyFraming,
    /// `None` for responses produced by a delegating backend.
    connection: Option<Connection>,
    body: Option<Bytes>,
    streamed: bool,
}

impl Response {
    pub(crate) fn new(
        head: ResponseHead,
        method: Method,
        url: Url,
        framing: BodyFraming,
        connection: Connection,
    ) -> Self {
        Self {
            head,
            method,
            url,
            framing,
            connection: Some(connection),
            body: None,
            streamed: false,
        }
    }

    /// A response whose body is already decoded and in memory.
    pub fn from_parts(head: ResponseHead, method: Method, url: Url, body: Bytes) -> Self {
        Self {
            head,
            method,
            url,
            framing: BodyFraming::Length(body.len() as u64),
            connection: None,
            body: Some(body),
            streamed: false,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.head.status
    }

    pub fn reason(&self) -> &str {
        &self.head.reason
    }

    /// Version digits from the status line, e.g. `1.1`.
    pub fn http_version(&self) -> &str {
        &self.head.version
    }

    pub fn headers(&self) -> &HeaderStore {
        &self.head.headers
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn framing(&self) -> BodyFraming {
        self.framing
    }

    /// Header block from the recovered status line onward.
    pub fn raw_headers(&self) -> &str {
        &self.head.raw
    }

    /// `Content-Type`, defaulting to `text/html`.
    pub fn content_type(&self) -> &str {
        self.head
            .headers
            .get_single("Content-Type")
            .unwrap_or("text/html")
    }

    pub fn location(&self) -> Option<&str> {
        self.head.headers.get_single("Location")
    }

    pub fn transfer_encoding(&self) -> Option<&str> {
        self.head.headers.get_single("Transfer-Encoding")
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.head.headers.get_single("Content-Encoding")
    }

    pub fn vary(&self) -> Option<&str> {
        self.head.headers.get_single("Vary")
    }

    pub fn content_length(&self) -> Option<u64> {
        self.head
            .headers
            .get_single("Content-Length")
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.head.status, 301 | 302 | 303 | 307 | 308)
    }

    /// The decoded body. Reads and decodes on the first call only.
    ///
    /// A failed read or decode closes the connection; later calls return
    /// [`NetError::ConnectionAlreadyClosed`].
    pub fn body(&mut self) -> Result<Bytes, NetError> {
        if let Some(body) = &self.body {
            return Ok(body.clone());
        }
        if self.streamed {
            return Err(NetError::BodyConsumed);
        }

        let framing = self.framing;
        let raw = self
            .connection
            .as_mut()
            .ok_or(NetError::ConnectionAlreadyClosed)?
            .reader()
            .and_then(|reader| read_body(reader, framing));
        let decoded = raw.and_then(|raw| decode_content(self.content_encoding(), raw));
        match decoded {
            Ok(decoded) => {
                self.body = Some(decoded.clone());
                Ok(decoded)
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "body read failed, closing connection");
                self.clear_up();
                Err(e)
            }
        }
    }

    /// Body as text, invalid UTF-8 replaced.
    pub fn text(&mut self) -> Result<String, NetError> {
        let body = self.body()?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T, NetError> {
        let body = self.body()?;
        serde_json::from_slice(&body).map_err(|e| NetError::JsonParseError {
            message: e.to_string(),
        })
    }

    /// Copy every remaining byte of the connection to `sink` as received, with
    /// no dechunking or decompression. Returns the byte count.
    pub fn copy_body_to(&mut self, sink: &mut dyn Write) -> Result<u64, NetError> {
        if self.streamed {
            return Err(NetError::BodyConsumed);
        }

        let Some(connection) = self.connection.as_mut() else {
            // Delegated: the decoded body is all there is.
            let body = self.body.as_ref().ok_or(NetError::ConnectionAlreadyClosed)?;
            sink.write_all(body).stream_context("writing body")?;
            self.streamed = true;
            return Ok(body.len() as u64);
        };
        if self.body.is_some() {
            return Err(NetError::BodyConsumed);
        }

        let copied = io::copy(connection.reader()?, &mut *sink).stream_context("copying body")?;
        sink.flush().stream_context("copying body")?;
        self.streamed = true;
        tracing::debug!(url = %self.url, bytes = copied, "response body copied");
        Ok(copied)
    }

    /// [`copy_body_to`](Self::copy_body_to) a newly created file.
    pub fn save_body_to(&mut self, path: impl AsRef<Path>) -> Result<u64, NetError> {
        let mut file = File::create(path.as_ref()).stream_context("creating body file")?;
        self.copy_body_to(&mut file)
    }

    pub fn load_state(&self) -> LoadState {
        if self.body.is_some() || self.streamed || self.is_closed() {
            LoadState::Idle
        } else {
            LoadState::ReadingResponse
        }
    }

    pub fn is_closed(&self) -> bool {
        self.connection.as_ref().map_or(true, Connection::is_closed)
    }

    /// Close the connection. A body already read stays available; an unread
    /// one can no longer be read.
    pub fn clear_up(&mut self) {
        if let Some(connection) = self.connection.as_mut() {
            connection.close();
        }
    }
}
