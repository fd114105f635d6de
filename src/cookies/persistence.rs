//! Cookie persistence - save and load cookies to/from disk.
//!
//! Provides JSON-based persistence for [`CookieJar`].

use crate::cookies::canonicalcookie::Cookie;
use crate::cookies::jar::CookieJar;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Serializable representation of a cookie for persistence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersistentCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub expires_unix_secs: Option<i64>,
    #[serde(default)]
    pub domain_specified: bool,
    #[serde(default)]
    pub path_specified: bool,
    #[serde(default)]
    pub secure_specified: bool,
    #[serde(default)]
    pub http_only_specified: bool,
}

impl From<&Cookie> for PersistentCookie {
    fn from(cookie: &Cookie) -> Self {
        Self {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            expires_unix_secs: cookie.expires.map(|t| t.unix_timestamp()),
            domain_specified: cookie.domain_specified,
            path_specified: cookie.path_specified,
            secure_specified: cookie.secure_specified,
            http_only_specified: cookie.http_only_specified,
        }
    }
}

impl PersistentCookie {
    fn into_cookie(self) -> Cookie {
        let expires = self
            .expires_unix_secs
            .and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok());
        let mut cookie = Cookie::new(self.name, self.value);
        cookie.domain = self.domain;
        cookie.path = self.path;
        cookie.secure = self.secure;
        cookie.http_only = self.http_only;
        cookie.expires = expires;
        cookie.expires_specified = expires.is_some();
        cookie.domain_specified = self.domain_specified;
        cookie.path_specified = self.path_specified;
        cookie.secure_specified = self.secure_specified;
        cookie.http_only_specified = self.http_only_specified;
        cookie
    }
}

/// Render every cookie in the jar as a JSON array.
pub fn to_json(jar: &CookieJar) -> io::Result<String> {
    let all: Vec<PersistentCookie> = jar.all_cookies().iter().map(PersistentCookie::from).collect();
    serde_json::to_string_pretty(&all).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Add cookies from a JSON array to `jar`, skipping expired ones.
/// Returns how many were stored.
pub fn import_json(jar: &CookieJar, json: &str) -> io::Result<usize> {
    let persistent_cookies: Vec<PersistentCookie> =
        serde_json::from_str(json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let now = OffsetDateTime::now_utc();
    let mut count = 0;
    for pc in persistent_cookies {
        let cookie = pc.into_cookie();
        if cookie.is_expired(now) {
            continue;
        }
        if jar.restore(cookie) {
            count += 1;
        }
    }
    Ok(count)
}

/// Save cookies from a jar to a file.
///
/// # Example
/// ```ignore
/// persistence::save_cookies(&jar, Path::new("/path/to/cookies.json"))?;
/// ```
pub fn save_cookies(jar: &CookieJar, path: &Path) -> io::Result<()> {
    fs::write(path, to_json(jar)?)
}

/// Load cookies from a file into a new jar.
pub fn load_cookies(path: &Path) -> io::Result<CookieJar> {
    let json = fs::read_to_string(path)?;
    let jar = CookieJar::new();
    let loaded = import_json(&jar, &json)?;
    tracing::debug!(path = %path.display(), loaded, "loaded cookie jar");
    Ok(jar)
}
