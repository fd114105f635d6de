//! `Set-Cookie` directive parsing.
//!
//! A directive is split on `;`. The first attribute is the `name=value` pair
//! (only the first `=` separates them, so values may contain `=`). Remaining
//! attributes are matched case-insensitively; unknown ones are ignored and an
//! attribute without `=` is a boolean flag.

use crate::base::neterror::NetError;
use crate::cookies::canonicalcookie::{normalize_domain, Cookie};
use time::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

/// Accepted `Expires` layouts, tried in order after a trailing zone name is
/// stripped.
const EXPIRES_FORMATS: &[&str] = &[
    // Wednesday, 21-Oct-2015 07:28:00
    "[weekday case_sensitive:false], [day]-[month repr:short case_sensitive:false]-[year] [hour]:[minute]:[second]",
    // Wed, 21-Oct-2015 07:28:00
    "[weekday repr:short case_sensitive:false], [day]-[month repr:short case_sensitive:false]-[year] [hour]:[minute]:[second]",
    // Wed, 21 Oct 2015 07:28:00 (RFC 7231 IMF-fixdate)
    "[weekday repr:short case_sensitive:false], [day] [month repr:short case_sensitive:false] [year] [hour]:[minute]:[second]",
];

pub struct CookieDirectiveParser;

impl CookieDirectiveParser {
    /// Parse one `Set-Cookie` value.
    ///
    /// Returns `Ok(None)` when the directive has no `name=value` pair or an
    /// empty name. An `Expires` value in none of the accepted layouts fails
    /// with [`NetError::CookieDateFormat`].
    pub fn parse(line: &str) -> Result<Option<Cookie>, NetError> {
        Self::parse_at(line, OffsetDateTime::now_utc())
    }

    /// As [`parse`](Self::parse), resolving `Max-Age` against `now`.
    pub fn parse_at(line: &str, now: OffsetDateTime) -> Result<Option<Cookie>, NetError> {
        let mut attributes = line.split(';').map(str::trim);

        let Some((name, value)) = attributes.next().and_then(|pair| pair.split_once('=')) else {
            return Ok(None);
        };
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let mut cookie = Cookie::new(name, value.trim());
        let mut expires: Option<OffsetDateTime> = None;
        let mut max_age: Option<i64> = None;

        for attribute in attributes.filter(|a| !a.is_empty()) {
            let (key, val) = match attribute.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (attribute, None),
            };

            match (key.to_ascii_lowercase().as_str(), val) {
                ("expires", Some(v)) => expires = Some(parse_expires(v)?),
                ("max-age", Some(v)) => max_age = v.parse().ok(),
                ("domain", Some(v)) if !v.is_empty() => {
                    cookie.domain = normalize_domain(v);
                    cookie.domain_specified = true;
                }
                ("path", Some(v)) if !v.is_empty() => {
                    cookie.path = v.to_string();
                    cookie.path_specified = true;
                }
                ("secure", _) => {
                    cookie.secure = true;
                    cookie.secure_specified = true;
                }
                ("httponly", _) => {
                    cookie.http_only = true;
                    cookie.http_only_specified = true;
                }
                _ => {}
            }
        }

        cookie.expires = match (expires, max_age) {
            (Some(at), _) => Some(at),
            (None, Some(secs)) => Some(now + Duration::seconds(secs)),
            (None, None) => None,
        };
        cookie.expires_specified = cookie.expires.is_some();

        Ok(Some(cookie))
    }
}

/// Parse an `Expires` attribute value as UTC.
pub fn parse_expires(value: &str) -> Result<OffsetDateTime, NetError> {
    let trimmed = value.trim();
    let bare = trimmed
        .strip_suffix(" GMT")
        .or_else(|| trimmed.strip_suffix(" UTC"))
        .unwrap_or(trimmed);

    for layout in EXPIRES_FORMATS {
        let items = match format_description::parse(layout) {
            Ok(items) => items,
            Err(_) => continue,
        };
        if let Ok(at) = PrimitiveDateTime::parse(bare, &items) {
            return Ok(at.assume_utc());
        }
    }

    Err(NetError::CookieDateFormat {
        value: value.to_string(),
    })
}
