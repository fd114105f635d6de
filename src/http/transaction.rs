//! One request/response exchange over a connection the session owns.
//! Mirrors Chromium's HttpNetworkTransaction, minus pooling and retries.

use crate::base::context::IoResultExt;
use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::base::options::TransportOptions;
use crate::cookies::jar::CookieJar;
use crate::http::framing::{read_head, BodyFraming};
use crate::http::request::Request;
use crate::http::requestbody::RequestBody;
use crate::http::response::Response;
use crate::socket::connectjob::ConnectJob;
use crate::socket::stream::{BoxedSocket, StreamSocket};
use bytes::Bytes;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

/// Anything that can carry a [`Request`] to a server and hand back a
/// [`Response`].
pub trait Transporter {
    /// Send the header block (once), the body, and read the response head.
    fn execute(&mut self, request: &mut Request) -> Result<Response, NetError>;

    /// Send the header block if needed, then `data` verbatim. For streaming a
    /// body by hand; the caller declares `Content-Length` itself.
    fn send(&mut self, request: &mut Request, data: &[u8]) -> Result<usize, NetError>;

    /// As [`send`](Self::send), streaming the file at `path` from disk.
    fn send_file(&mut self, request: &mut Request, path: &Path) -> Result<u64, NetError>;

    /// Close whatever connection is still held. Idempotent.
    fn clear_up(&mut self);
}

/// An open byte stream, closed exactly once.
pub struct Connection {
    reader: Option<BufReader<BoxedSocket>>,
    peer: String,
    absolute_form: bool,
}

impl Connection {
    pub fn new(socket: BoxedSocket, peer: impl Into<String>, absolute_form: bool) -> Self {
        Self {
            reader: Some(BufReader::new(socket)),
            peer: peer.into(),
            absolute_form,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Requests on this connection use the absolute-URI form.
    pub fn absolute_form(&self) -> bool {
        self.absolute_form
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    pub fn reader(&mut self) -> Result<&mut BufReader<BoxedSocket>, NetError> {
        self.reader.as_mut().ok_or(NetError::ConnectionAlreadyClosed)
    }

    /// Write side. Reads are buffered, writes go straight to the socket.
    pub fn writer(&mut self) -> Result<&mut BoxedSocket, NetError> {
        self.reader()
            .map(BufReader::get_mut)
    }

    pub fn write_all(&mut self, data: &[u8], stage: &str) -> Result<(), NetError> {
        let writer = self.writer()?;
        writer.write_all(data).stream_context(stage)?;
        writer.flush().stream_context(stage)
    }

    /// Shut the socket down. Later calls do nothing.
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            let mut socket = reader.into_inner();
            if let Err(e) = socket.close() {
                tracing::debug!(peer = %self.peer, error = %e, "socket shutdown failed");
            }
            tracing::debug!(peer = %self.peer, "connection closed");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("absolute_form", &self.absolute_form)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Where a session is in its exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    SendingRequest,
    WaitingForResponse,
    /// Response head read; the connection now belongs to the [`Response`].
    Done,
}

impl SessionState {
    fn to_load_state(self, connect_state: LoadState) -> LoadState {
        match self {
            SessionState::Idle | SessionState::Done => LoadState::Idle,
            SessionState::Connecting => connect_state,
            SessionState::SendingRequest => LoadState::SendingRequest,
            SessionState::WaitingForResponse => LoadState::WaitingForResponse,
        }
    }
}

/// Raw-socket [`Transporter`]: writes the request itself and frames the
/// response with [`crate::http::framing`].
///
/// One connection per exchange. The connection is opened lazily on the first
/// write and moves into the returned [`Response`]; a later `execute` opens a
/// fresh one. Redirects are surfaced, never followed.
#[derive(Debug)]
pub struct TransportSession {
    options: TransportOptions,
    jar: CookieJar,
    connection: Option<Connection>,
    state: SessionState,
    connect_state: LoadState,
}

impl TransportSession {
    pub fn new(options: TransportOptions, jar: CookieJar) -> Self {
        Self {
            options,
            jar,
            connection: None,
            state: SessionState::Idle,
            connect_state: LoadState::Idle,
        }
    }

    /// A session over an already open stream. The first request uses it
    /// instead of dialing.
    pub fn over<S: StreamSocket>(socket: S, jar: CookieJar, options: TransportOptions) -> Self {
        let mut session = Self::new(options, jar);
        session.connection = Some(Connection::new(BoxedSocket::new(socket), "preconnected", false));
        session
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn load_state(&self) -> LoadState {
        self.state.to_load_state(self.connect_state)
    }

    /// Whether the session currently holds an open connection.
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| !c.is_closed())
    }

    fn connect(&mut self, request: &Request) -> Result<&mut Connection, NetError> {
        if self.connection.is_none() {
            self.state = SessionState::Connecting;
            let connected = ConnectJob::new(&self.options).connect(
                request.url(),
                request.remote(),
                &mut self.connect_state,
            )?;
            self.connection = Some(Connection::new(
                connected.socket,
                connected.peer,
                connected.absolute_form,
            ));
        }
        self.connection
            .as_mut()
            .ok_or(NetError::ConnectionAlreadyClosed)
    }

    /// Write the request line and headers, once per request.
    fn send_header(&mut self, request: &mut Request) -> Result<(), NetError> {
        if request.is_header_sent() {
            return Ok(());
        }

        if request.headers().is_blank("Cookie") {
            let cookies = self.jar.cookie_header_for(request.url());
            if !cookies.is_empty() {
                request.headers_mut().set("Cookie", cookies);
            }
        }
        let proxy_auth = self
            .options
            .proxy_settings()?
            .and_then(|p| p.get_auth_header());

        let conn = self.connect(request)?;
        let absolute_form = conn.absolute_form();
        if absolute_form {
            if let Some(auth) = proxy_auth {
                request.headers_mut().set("Proxy-Authorization", auth);
            }
        }
        let head = request.head(absolute_form);

        self.state = SessionState::SendingRequest;
        let conn = self
            .connection
            .as_mut()
            .ok_or(NetError::ConnectionAlreadyClosed)?;
        conn.write_all(head.as_bytes(), "sending request headers")?;
        request.mark_header_sent();
        tracing::debug!(
            method = %request.method(),
            path = %request.url().path(),
            peer = %conn.peer(),
            "request headers sent"
        );
        Ok(())
    }

    fn send_body(&mut self, request: &Request, payload: Option<Bytes>) -> Result<(), NetError> {
        let conn = self
            .connection
            .as_mut()
            .ok_or(NetError::ConnectionAlreadyClosed)?;
        match request.body_ref() {
            RequestBody::Multipart(form) => {
                let mut sink = BufWriter::new(conn.writer()?);
                form.write_to(&mut sink)?;
                sink.flush().stream_context("sending multipart body")?;
            }
            _ => {
                if let Some(bytes) = payload.filter(|b| !b.is_empty()) {
                    conn.write_all(&bytes, "sending request body")?;
                }
            }
        }
        Ok(())
    }
}

impl Transporter for TransportSession {
    /// A request whose header block was already sent through
    /// [`send`](Transporter::send) is assumed to carry its body already; only
    /// the response is read.
    fn execute(&mut self, request: &mut Request) -> Result<Response, NetError> {
        let owns_body = !request.is_header_sent();
        let payload = if owns_body {
            request.prepare_body()?
        } else {
            None
        };

        self.send_header(request)?;
        if owns_body {
            self.send_body(request, payload)?;
        }

        self.state = SessionState::WaitingForResponse;
        let mut connection = self
            .connection
            .take()
            .ok_or(NetError::ConnectionAlreadyClosed)?;
        let head = read_head(connection.reader()?)?;

        if let Some(values) = head.headers.get("Set-Cookie") {
            if let Err(e) = self.jar.ingest(request.url(), values) {
                tracing::warn!(url = %request.url(), error = %e, "ignored malformed Set-Cookie");
            }
        }

        let framing = BodyFraming::for_response(&head, request.method())?;
        self.state = SessionState::Done;
        Ok(Response::new(
            head,
            request.method().clone(),
            request.url().clone(),
            framing,
            connection,
        ))
    }

    fn send(&mut self, request: &mut Request, data: &[u8]) -> Result<usize, NetError> {
        self.send_header(request)?;
        let conn = self
            .connection
            .as_mut()
            .ok_or(NetError::ConnectionAlreadyClosed)?;
        conn.write_all(data, "sending request body")?;
        Ok(data.len())
    }

    fn send_file(&mut self, request: &mut Request, path: &Path) -> Result<u64, NetError> {
        let display = path.display().to_string();
        let mut file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => NetError::UploadFileNotFound {
                path: display.clone(),
            },
            _ => NetError::UploadFileUnreadable {
                path: display.clone(),
                message: e.to_string(),
            },
        })?;

        self.send_header(request)?;
        let conn = self
            .connection
            .as_mut()
            .ok_or(NetError::ConnectionAlreadyClosed)?;
        let writer = conn.writer()?;
        let sent = io::copy(&mut file, &mut *writer).stream_context("sending file")?;
        writer.flush().stream_context("sending file")?;
        Ok(sent)
    }

    fn clear_up(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
        self.state = SessionState::Idle;
    }
}
