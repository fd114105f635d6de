use crate::base::urlext::UrlExt;
use std::fmt;
use time::format_description;
use time::OffsetDateTime;
use url::Url;

/// Legacy cookie-date rendering used by [`Cookie::to_set_cookie_string`].
const SET_COOKIE_DATE: &str =
    "[weekday repr:short], [day]-[month repr:short]-[year] [hour]:[minute]:[second] GMT";

/// Represents a cookie.
/// Modeled after Chromium's `net::CanonicalCookie`, reduced to the attributes a
/// session jar needs.
///
/// Identity is `(domain, name)`: two cookies with the same domain and name are
/// the same cookie regardless of value or path, and `PartialEq` follows that rule.
#[derive(Debug, Clone)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Lowercased, always starting with `.` once bound. Empty until then.
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// `None` for a session cookie.
    pub expires: Option<OffsetDateTime>,
    pub domain_specified: bool,
    pub path_specified: bool,
    pub expires_specified: bool,
    pub secure_specified: bool,
    pub http_only_specified: bool,
}

impl PartialEq for Cookie {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.name == other.name
    }
}

impl Eq for Cookie {}

/// Lowercase and dot-anchor a cookie domain.
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().to_ascii_lowercase();
    if domain.is_empty() || domain.starts_with('.') {
        domain
    } else {
        format!(".{domain}")
    }
}

/// RFC 6265 path-match with a segment boundary: `/a` matches `/a`, `/a/` and
/// `/a/b` but not `/ab`.
pub fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }

    if request_path.starts_with(cookie_path) {
        if cookie_path.ends_with('/') {
            return true;
        }
        return request_path.as_bytes().get(cookie_path.len()) == Some(&b'/');
    }

    false
}

impl Cookie {
    /// A session cookie with default path `/` and no domain yet.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: "/".to_string(),
            secure: false,
            http_only: false,
            expires: None,
            domain_specified: false,
            path_specified: false,
            expires_specified: false,
            secure_specified: false,
            http_only_specified: false,
        }
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = normalize_domain(domain);
        self.domain_specified = true;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self.path_specified = true;
        self
    }

    pub fn with_expires(mut self, expires: OffsetDateTime) -> Self {
        self.expires = Some(expires);
        self.expires_specified = true;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self.secure_specified = true;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self.http_only_specified = true;
        self
    }

    pub fn is_session(&self) -> bool {
        self.expires.is_none()
    }

    pub fn is_expired(&self, current_time: OffsetDateTime) -> bool {
        match self.expires {
            Some(expiry) => expiry <= current_time,
            None => false,
        }
    }

    pub fn is_expired_now(&self) -> bool {
        self.is_expired(OffsetDateTime::now_utc())
    }

    /// True when this cookie's domain is a dot-anchored suffix of the URL
    /// authority. A cookie without a domain is accepted by any URL.
    pub fn domain_accepts(&self, url: &Url) -> bool {
        if self.domain.is_empty() {
            return true;
        }
        format!(".{}", url.authority()).ends_with(&self.domain)
    }

    /// Bind a domainless cookie to the exact request authority.
    pub fn bind_to(&mut self, url: &Url) {
        if self.domain.is_empty() {
            self.domain = format!(".{}", url.authority());
        }
    }

    /// Whether this cookie should be sent with a request to `url` at `now`.
    pub fn matches_url(&self, url: &Url, now: OffsetDateTime) -> bool {
        if self.domain.is_empty() || !self.domain_accepts(url) {
            return false;
        }
        if self.is_expired(now) {
            return false;
        }
        if self.secure && !url.is_encrypted() {
            return false;
        }
        path_matches(&self.path, url.path())
    }

    /// Render as a `Set-Cookie` directive carrying only the attributes that
    /// were explicitly specified.
    pub fn to_set_cookie_string(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if self.expires_specified {
            if let Some(expires) = self.expires.and_then(format_cookie_date) {
                out.push_str("; Expires=");
                out.push_str(&expires);
            }
        }
        if self.domain_specified {
            out.push_str("; Domain=");
            out.push_str(&self.domain);
        }
        if self.path_specified {
            out.push_str("; Path=");
            out.push_str(&self.path);
        }
        if self.secure_specified && self.secure {
            out.push_str("; Secure");
        }
        if self.http_only_specified && self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

fn format_cookie_date(at: OffsetDateTime) -> Option<String> {
    let format = format_description::parse(SET_COOKIE_DATE).ok()?;
    at.to_offset(time::UtcOffset::UTC).format(&format).ok()
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}
