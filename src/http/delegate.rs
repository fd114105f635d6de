//! Transporter backed by a full HTTP client stack.
//!
//! Drives `hyper`'s HTTP/1 client connection over `tokio` + `tokio-boring` on a
//! private current-thread runtime, so callers stay blocking. Unlike
//! [`TransportSession`](crate::http::transaction::TransportSession) it follows
//! redirects when `follow_location` is set, and it only accepts buffered
//! bodies.

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::base::options::TransportOptions;
use crate::base::urlext::UrlExt;
use crate::cookies::jar::CookieJar;
use crate::http::framing::{decode_content, ResponseHead};
use crate::http::headers::HeaderStore;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::transaction::Transporter;
use crate::socket::connectjob::Endpoint;
use crate::socket::tls::TlsConfig;
use bytes::Bytes;
use http::{Method, Version};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::fmt::Display;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use url::Url;

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

pub struct DelegatingTransporter {
    options: TransportOptions,
    jar: CookieJar,
    runtime: Runtime,
}

/// One hop's outcome before decoding.
struct RawExchange {
    parts: http::response::Parts,
    body: Bytes,
}

fn hyper_failed(stage: &str, err: impl Display) -> NetError {
    NetError::StreamFailed {
        stage: stage.to_string(),
        message: err.to_string(),
    }
}

impl DelegatingTransporter {
    pub fn new(options: TransportOptions, jar: CookieJar) -> Result<Self, NetError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .stream_context("starting runtime")?;
        Ok(Self {
            options,
            jar,
            runtime,
        })
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    fn exchange(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderStore,
        body: Bytes,
        remote: Option<&str>,
    ) -> Result<RawExchange, NetError> {
        let endpoint = match remote.or(self.options.remote.as_deref()) {
            Some(remote) => Endpoint::from_remote(remote, url)?,
            None => Endpoint::from_url(url)?,
        };
        let sni_host = url.host_str().unwrap_or(&endpoint.host).to_string();

        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(url.path_and_query())
            .version(Version::HTTP_11);
        if let Some(map) = builder.headers_mut() {
            *map = headers.to_header_map()?;
        }
        let request = builder
            .body(Full::new(body))
            .map_err(|_| NetError::InvalidUrl)?;

        let tls = endpoint
            .encrypted
            .then(|| TlsConfig::from_options(&self.options));
        let fut = connect_and_send(endpoint, sni_host, tls, request);

        let timeout = self.options.timeout_duration();
        self.runtime.block_on(async move {
            if timeout.is_zero() {
                fut.await
            } else {
                tokio::time::timeout(timeout, fut)
                    .await
                    .map_err(|_| NetError::ConnectionTimedOut)?
            }
        })
    }
}

async fn connect_and_send(
    endpoint: Endpoint,
    sni_host: String,
    tls: Option<TlsConfig>,
    request: http::Request<Full<Bytes>>,
) -> Result<RawExchange, NetError> {
    let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
        .await
        .connection_context(&endpoint.host, endpoint.port)?;
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(host = %endpoint.host, error = %e, "set_nodelay failed");
    }

    let Some(tls) = tls else {
        return send_over(stream, request).await;
    };
    let mut config = tls
        .connector()?
        .configure()
        .map_err(|_| NetError::SslProtocolError)?;
    config.set_verify_hostname(tls.verify_host);
    config.set_use_server_name_indication(TlsConfig::should_set_sni(&sni_host));
    let stream = tokio_boring::connect(config, &sni_host, stream)
        .await
        .map_err(|e| NetError::SslHandshakeFailed {
            host: sni_host.clone(),
            message: e.to_string(),
        })?;
    send_over(stream, request).await
}

async fn send_over<S>(io: S, request: http::Request<Full<Bytes>>) -> Result<RawExchange, NetError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = http1::handshake(TokioIo::new(io))
        .await
        .map_err(|e| hyper_failed("http1 handshake", e))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(error = %e, "delegated connection ended with error");
        }
    });

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| hyper_failed("sending request", e))?;
    let (parts, incoming) = response.into_parts();
    let body = incoming
        .collect()
        .await
        .map_err(|e| hyper_failed("reading body", e))?
        .to_bytes();
    Ok(RawExchange { parts, body })
}

/// Rebuild a head, including the raw header block, from hyper's parts.
fn head_from_parts(parts: &http::response::Parts) -> Result<ResponseHead, NetError> {
    let version = match parts.version {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    };
    let mut lines = vec![format!(
        "HTTP/{} {} {}",
        version,
        parts.status.as_u16(),
        parts.status.canonical_reason().unwrap_or("")
    )
    .trim_end()
    .to_string()];
    for (name, value) in &parts.headers {
        lines.push(format!(
            "{}: {}",
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes())
        ));
    }
    ResponseHead::from_lines(lines)
}

/// Method for the next hop: 303, and 301/302 after a POST, become GET.
fn redirect_method(status: u16, method: &Method) -> Method {
    match status {
        303 if *method != Method::HEAD => Method::GET,
        301 | 302 if *method == Method::POST => Method::GET,
        _ => method.clone(),
    }
}

impl Transporter for DelegatingTransporter {
    fn execute(&mut self, request: &mut Request) -> Result<Response, NetError> {
        if request.body_ref().is_multipart() {
            return Err(NetError::not_supported("multipart body"));
        }
        let mut body = request.prepare_body()?.unwrap_or_default();
        let caller_cookie = !request.headers().is_blank("Cookie");

        let mut method = request.method().clone();
        let mut url = request.url().clone();
        let mut headers = request.headers().clone();
        request.mark_header_sent();

        for _ in 0..=MAX_REDIRECTS {
            if !caller_cookie {
                let cookies = self.jar.cookie_header_for(&url);
                if cookies.is_empty() {
                    headers.set_empty("Cookie");
                } else {
                    headers.set("Cookie", cookies);
                }
            }

            tracing::debug!(method = %method, url = %url, "delegating request");
            let raw = self.exchange(&method, &url, &headers, body.clone(), request.remote())?;
            let head = head_from_parts(&raw.parts)?;

            if let Some(values) = head.headers.get("Set-Cookie") {
                if let Err(e) = self.jar.ingest(&url, values) {
                    tracing::warn!(url = %url, error = %e, "ignored malformed Set-Cookie");
                }
            }

            let location = head.headers.get_single("Location").map(str::to_string);
            let is_redirect = matches!(head.status, 301 | 302 | 303 | 307 | 308);
            match location {
                Some(location) if is_redirect && self.options.follow_location => {
                    let next = url.join(&location).map_err(|_| NetError::InvalidUrl)?;
                    let next_method = redirect_method(head.status, &method);
                    if next_method != method {
                        body = Bytes::new();
                        headers.set_empty("Content-Type").set_empty("Content-Length");
                    }
                    headers
                        .set("Host", next.authority())
                        .set("Referer", url.as_str());
                    tracing::debug!(status = head.status, to = %next, "following redirect");
                    method = next_method;
                    url = next;
                }
                _ => {
                    let decoded = decode_content(
                        head.headers.get_single("Content-Encoding"),
                        raw.body.to_vec(),
                    )?;
                    return Ok(Response::from_parts(head, method, url, decoded));
                }
            }
        }
        Err(NetError::TooManyRedirects)
    }

    fn send(&mut self, _request: &mut Request, _data: &[u8]) -> Result<usize, NetError> {
        Err(NetError::not_supported("send"))
    }

    fn send_file(&mut self, _request: &mut Request, _path: &Path) -> Result<u64, NetError> {
        Err(NetError::not_supported("send_file"))
    }

    fn clear_up(&mut self) {}
}

impl std::fmt::Debug for DelegatingTransporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatingTransporter")
            .field("options", &self.options)
            .finish()
    }
}
