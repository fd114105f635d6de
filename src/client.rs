//! HTTP Client with builder pattern.
//!
//! Assembles [`TransportOptions`] and a [`CookieJar`] once, then hands out
//! one-shot transporters per request.
//!
//! # Example
//!
//! ```rust,no_run
//! use rawnet::client::Client;
//! use rawnet::http::multipart::Form;
//!
//! # fn main() -> Result<(), rawnet::NetError> {
//! let client = Client::builder()
//!     .timeout(5)
//!     .ssl_verify_peer(false)
//!     .build();
//!
//! let form = Form::new().text("title", "report").file("upload", "report.pdf")?;
//! let mut resp = client.post("https://example.com/upload").multipart(form).send()?;
//! println!("{}", resp.text()?);
//! # Ok(())
//! # }
//! ```

use crate::base::neterror::NetError;
use crate::base::options::TransportOptions;
use crate::cookies::jar::CookieJar;
use crate::http::delegate::DelegatingTransporter;
use crate::http::multipart::Form;
use crate::http::request::Request;
use crate::http::requestbody::RequestBody;
use crate::http::response::Response;
use crate::http::transaction::{TransportSession, Transporter};
use crate::socket::proxy::ProxyMode;
use http::Method;

/// Which [`Transporter`] carries requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// [`TransportSession`]: own socket, own framing, redirects surfaced.
    #[default]
    Raw,
    /// [`DelegatingTransporter`]: `hyper` stack, redirects followed.
    Delegating,
}

/// HTTP Client for making requests.
///
/// Use [`Client::builder()`] to configure and create a client. Clones share
/// the cookie jar.
#[derive(Debug, Clone)]
pub struct Client {
    options: TransportOptions,
    jar: CookieJar,
    backend: Backend,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a new client with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// A raw session bound to this client's options and jar.
    pub fn session(&self) -> TransportSession {
        TransportSession::new(self.options.clone(), self.jar.clone())
    }

    /// A transporter for the configured backend.
    pub fn transporter(&self) -> Result<Box<dyn Transporter>, NetError> {
        Ok(match self.backend {
            Backend::Raw => Box::new(self.session()),
            Backend::Delegating => Box::new(DelegatingTransporter::new(
                self.options.clone(),
                self.jar.clone(),
            )?),
        })
    }

    /// Run `request` on a fresh transporter.
    pub fn execute(&self, request: &mut Request) -> Result<Response, NetError> {
        self.transporter()?.execute(request)
    }

    /// Start building a GET request.
    pub fn get<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Start building a POST request.
    pub fn post<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn put<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    pub fn delete<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    pub fn head<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Start building a request with custom method.
    pub fn request<U: AsRef<str>>(&self, method: Method, url: U) -> RequestBuilder {
        RequestBuilder {
            client: self.clone(),
            request: Request::parse(method, url.as_ref()),
        }
    }
}

/// Builder for creating a [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    options: TransportOptions,
    jar: Option<CookieJar>,
    backend: Backend,
}

impl ClientBuilder {
    /// Replace all options at once, e.g. ones loaded with
    /// [`TransportOptions::from_json`].
    pub fn options(mut self, options: TransportOptions) -> Self {
        self.options = options;
        self
    }

    /// Set request timeout in seconds. `0` disables it.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.options.timeout = secs;
        self
    }

    pub fn follow_location(mut self, follow: bool) -> Self {
        self.options.follow_location = follow;
        self
    }

    pub fn ssl_verify_peer(mut self, verify: bool) -> Self {
        self.options.ssl_verify_peer = verify;
        self
    }

    pub fn ssl_verify_host(mut self, verify: bool) -> Self {
        self.options.ssl_verify_host = verify;
        self
    }

    /// Connect to this literal `host:port` instead of the URL's authority.
    pub fn remote(mut self, remote: impl Into<String>) -> Self {
        self.options.remote = Some(remote.into());
        self
    }

    /// Set proxy.
    pub fn proxy(mut self, url: impl Into<String>, mode: ProxyMode) -> Self {
        self.options.proxy = Some(url.into());
        self.options.proxy_mode = mode;
        self
    }

    /// Share an existing jar instead of starting with an empty one.
    pub fn cookie_jar(mut self, jar: CookieJar) -> Self {
        self.jar = Some(jar);
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Build the client.
    pub fn build(self) -> Client {
        Client {
            options: self.options,
            jar: self.jar.unwrap_or_default(),
            backend: self.backend,
        }
    }
}

/// Builder for a single request. A malformed URL is reported by
/// [`send`](Self::send).
#[derive(Debug)]
pub struct RequestBuilder {
    client: Client,
    request: Result<Request, NetError>,
}

impl RequestBuilder {
    fn map(mut self, f: impl FnOnce(Request) -> Request) -> Self {
        self.request = self.request.map(f);
        self
    }

    /// Set (replace) a header.
    pub fn header(self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        self.map(|r| r.header(name, value))
    }

    pub fn referer(self, referer: impl Into<String>) -> Self {
        let referer = referer.into();
        self.map(|r| r.referer(referer))
    }

    /// Set request body.
    pub fn body(self, body: impl Into<RequestBody>) -> Self {
        let body = body.into();
        self.map(|r| r.body(body))
    }

    /// Name/value pairs, sent urlencoded (or as JSON with a JSON content type).
    pub fn fields<I, K, V>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let body: RequestBody = fields.into_iter().collect();
        self.map(|r| r.body(body))
    }

    pub fn multipart(self, form: Form) -> Self {
        self.map(|r| r.multipart(form))
    }

    /// Set JSON body.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize + ?Sized>(mut self, json: &T) -> Self {
        self.request = self.request.and_then(|r| r.json(json));
        self
    }

    /// Per-request `host:port` override.
    pub fn remote(self, remote: impl Into<String>) -> Self {
        let remote = remote.into();
        self.map(|r| r.with_remote(remote))
    }

    /// The request as built so far.
    pub fn build(self) -> Result<Request, NetError> {
        self.request
    }

    /// Send the request.
    pub fn send(self) -> Result<Response, NetError> {
        let mut request = self.request?;
        self.client.execute(&mut request)
    }
}
