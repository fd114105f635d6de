//! Session cookie management.
//!
//! - **Parsing**: `Set-Cookie` directives ([`CookieDirectiveParser`](parser::CookieDirectiveParser))
//! - **Storage**: shared, thread-safe jar ([`CookieJar`](jar::CookieJar))
//! - **Persistence**: save/load a jar as JSON ([`persistence`])
//!
//! # Architecture
//!
//! | Chromium (C++) | rawnet (Rust) | Responsibility |
//! |----------------|---------------|----------------|
//! | `net::CookieMonster` | [`CookieJar`](jar::CookieJar) | Cookie jar, update-in-place and expiry |
//! | `net::CanonicalCookie` | [`Cookie`](canonicalcookie::Cookie) | Single cookie representation |
//! | `net::ParsedCookie` | [`CookieDirectiveParser`](parser::CookieDirectiveParser) | `Set-Cookie` parsing |
//!
//! Domain matching is a dot-anchored suffix comparison against the request
//! authority (host plus non-default port). There is no public-suffix check.
//!
//! ```rust
//! use rawnet::cookies::jar::CookieJar;
//! use url::Url;
//!
//! let jar = CookieJar::new();
//! let url = Url::parse("https://api.example.com/v1").unwrap();
//! jar.ingest(&url, ["sid=abc; Domain=example.com; Path=/"]).unwrap();
//!
//! let home = Url::parse("https://example.com/").unwrap();
//! assert_eq!(jar.cookie_header_for(&home), "sid=abc");
//! ```

pub mod canonicalcookie;
pub mod jar;
pub mod parser;
pub mod persistence;
