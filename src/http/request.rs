//! Outgoing request message.

use crate::base::neterror::NetError;
use crate::base::urlext::UrlExt;
use crate::http::headers::HeaderStore;
use crate::http::multipart::Form;
use crate::http::requestbody::RequestBody;
use http::Method;
use url::Url;

/// Fixed `User-Agent` sent by every new request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36";

/// One outgoing exchange: method, URL, ordered headers and body.
///
/// A new request carries the default header set, in this order: `Host`,
/// `Accept`, `Accept-Encoding`, `Cookie` (declared, empty), `User-Agent`,
/// `Content-Type`, `Content-Length`, `Referer` (declared, empty) and
/// `Connection: close`.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderStore,
    body: RequestBody,
    remote: Option<String>,
    header_sent: bool,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        let mut headers = HeaderStore::new();
        headers
            .set("Host", url.authority())
            .set("Accept", "*/*")
            .set("Accept-Encoding", "gzip, deflate")
            .declare("Cookie")
            .set("User-Agent", DEFAULT_USER_AGENT)
            .declare("Content-Type")
            .declare("Content-Length")
            .declare("Referer")
            .set("Connection", "close");

        Self {
            method,
            url,
            headers,
            body: RequestBody::Empty,
            remote: None,
            header_sent: false,
        }
    }

    /// Parse `url` and build a request.
    pub fn parse(method: Method, url: &str) -> Result<Self, NetError> {
        let url = Url::parse(url).map_err(|_| NetError::InvalidUrl)?;
        match url.scheme() {
            "http" | "https" => Ok(Self::new(method, url)),
            _ => Err(NetError::UnknownUrlScheme),
        }
    }

    pub fn get(url: &str) -> Result<Self, NetError> {
        Self::parse(Method::GET, url)
    }

    pub fn post(url: &str) -> Result<Self, NetError> {
        Self::parse(Method::POST, url)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderStore {
        &mut self.headers
    }

    /// Replace a header's values.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.headers.set("Content-Type", content_type);
        self
    }

    pub fn referer(self, referer: impl Into<String>) -> Self {
        self.header("Referer", referer)
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a body along with its `Content-Type`.
    pub fn body_with_type(mut self, body: impl Into<RequestBody>, content_type: &str) -> Self {
        self.body = body.into();
        self.headers.set("Content-Type", content_type);
        self
    }

    /// Name/value pairs encoded as JSON or urlencoded at send time.
    pub fn fields<I, K, V>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body(fields.into_iter().collect::<RequestBody>())
    }

    /// A streamed multipart body. `Content-Type` and `Content-Length` are
    /// filled in when the body is prepared.
    pub fn multipart(self, form: Form) -> Self {
        self.body(RequestBody::Multipart(form))
    }

    /// Set JSON body.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize + ?Sized>(self, json: &T) -> Result<Self, NetError> {
        let bytes = serde_json::to_vec(json).map_err(|e| NetError::JsonParseError {
            message: e.to_string(),
        })?;
        Ok(self.body_with_type(bytes, "application/json"))
    }

    pub fn body_ref(&self) -> &RequestBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut RequestBody {
        &mut self.body
    }

    /// Connect to this literal `host:port` instead of the URL's authority.
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    pub fn remote(&self) -> Option<&str> {
        self.remote.as_deref()
    }

    pub fn is_header_sent(&self) -> bool {
        self.header_sent
    }

    pub(crate) fn mark_header_sent(&mut self) {
        self.header_sent = true;
    }

    /// Encode a buffered body and declare its length, or prepare a multipart
    /// form and declare its type and total length. Must run before the header
    /// block is sent.
    ///
    /// Returns the bytes to send for buffered bodies; multipart bodies are
    /// streamed from [`body_ref`](Self::body_ref) afterwards.
    pub fn prepare_body(&mut self) -> Result<Option<bytes::Bytes>, NetError> {
        if let RequestBody::Multipart(form) = &mut self.body {
            let length = form.prepare();
            let content_type = form.content_type();
            self.headers
                .set("Content-Type", content_type)
                .set("Content-Length", length.to_string());
            return Ok(None);
        }

        if matches!(self.body, RequestBody::Fields(_)) && self.headers.is_blank("Content-Type") {
            self.headers
                .set("Content-Type", "application/x-www-form-urlencoded");
        }
        let encoded = self
            .body
            .encode(self.headers.get_single("Content-Type"))?;
        if let Some(bytes) = &encoded {
            self.headers.set("Content-Length", bytes.len().to_string());
        }
        Ok(encoded)
    }

    /// Request line plus header block, terminated by the blank line.
    pub fn request_line_and_headers(&self) -> String {
        self.head(false)
    }

    /// As [`request_line_and_headers`](Self::request_line_and_headers); with
    /// `absolute_form` the request target is the full URL, as a forwarding
    /// proxy expects.
    pub fn head(&self, absolute_form: bool) -> String {
        let target = if absolute_form {
            let mut url = self.url.clone();
            url.set_fragment(None);
            url.to_string()
        } else {
            self.url.path_and_query()
        };
        format!(
            "{} {} HTTP/1.1\r\n{}\r\n",
            self.method,
            target,
            self.headers.serialize()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let request = Request::get("http://example.com:8080/a/b?x=1").unwrap();
        assert_eq!(
            request.request_line_and_headers(),
            format!(
                "GET /a/b?x=1 HTTP/1.1\r\nHost: example.com:8080\r\nAccept: */*\r\nAccept-Encoding: gzip, deflate\r\nUser-Agent: {DEFAULT_USER_AGENT}\r\nConnection: close\r\n\r\n"
            )
        );
        let names: Vec<_> = request.headers().names().collect();
        assert_eq!(
            names,
            vec![
                "Host",
                "Accept",
                "Accept-Encoding",
                "Cookie",
                "User-Agent",
                "Content-Type",
                "Content-Length",
                "Referer",
                "Connection"
            ]
        );
    }

    #[test]
    fn test_absolute_form() {
        let request = Request::get("http://example.com/p?q#frag").unwrap();
        assert!(request
            .head(true)
            .starts_with("GET http://example.com/p?q HTTP/1.1\r\n"));
    }

    #[test]
    fn test_rejects_unknown_scheme() {
        assert_eq!(
            Request::get("ftp://example.com/").unwrap_err(),
            NetError::UnknownUrlScheme
        );
        assert_eq!(Request::get("not a url").unwrap_err(), NetError::InvalidUrl);
    }

    #[test]
    fn test_prepare_body_sets_length() {
        let mut request = Request::post("http://example.com/")
            .unwrap()
            .fields([("a", "1"), ("b", "x y")]);
        let body = request.prepare_body().unwrap().unwrap();
        assert_eq!(body, "a=1&b=x+y");
        assert_eq!(request.headers().get_single("Content-Length"), Some("9"));
    }

    #[test]
    fn test_prepare_multipart_sets_type_and_length() {
        let mut request = Request::post("http://example.com/upload")
            .unwrap()
            .multipart(Form::with_boundary("XB").text("a", "1"));
        assert!(request.prepare_body().unwrap().is_none());
        assert_eq!(
            request.headers().get_single("Content-Type"),
            Some("multipart/form-data; boundary=XB")
        );
        let expected = "--XB\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--XB--".len();
        assert_eq!(
            request.headers().get_single("Content-Length"),
            Some(expected.to_string().as_str())
        );
    }

    #[test]
    fn test_empty_body_declares_no_length() {
        let mut request = Request::get("http://example.com/").unwrap();
        assert!(request.prepare_body().unwrap().is_none());
        assert!(request.headers().is_blank("Content-Length"));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_body() {
        #[derive(serde::Serialize)]
        struct Login<'a> {
            user: &'a str,
        }
        let mut request = Request::post("http://example.com/")
            .unwrap()
            .json(&Login { user: "bob" })
            .unwrap();
        let body = request.prepare_body().unwrap().unwrap();
        assert_eq!(body, "{\"user\":\"bob\"}");
        assert_eq!(
            request.headers().get_single("content-type"),
            Some("application/json")
        );
    }
}
