use crate::base::neterror::NetError;
use crate::cookies::canonicalcookie::Cookie;
use crate::cookies::parser::CookieDirectiveParser;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

#[derive(Debug, Clone)]
struct StoredCookie {
    /// Insertion sequence; kept across in-place updates.
    seq: u64,
    cookie: Cookie,
}

/// Session cookie store.
/// Modeled after Chromium's `net::CookieMonster`, keeping its `DashMap`
/// domain index so one jar can be shared by sessions on different threads.
///
/// Cloning is cheap and yields a handle to the same store.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    // Map<Domain, List<Cookie>>
    store: Arc<DashMap<String, Vec<StoredCookie>>>,
    seq: Arc<AtomicU64>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold raw `Set-Cookie` values received from `url` into the jar.
    ///
    /// Every value is processed; if any carried an unparsable `Expires`, the
    /// first such error is returned after the rest have been stored.
    pub fn ingest<I, S>(&self, url: &Url, raw_values: I) -> Result<(), NetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut first_error = None;

        for raw in raw_values {
            let raw = raw.as_ref();
            match CookieDirectiveParser::parse(raw) {
                Ok(Some(cookie)) => {
                    self.set_cookie(url, cookie);
                }
                Ok(None) => {
                    tracing::debug!(directive = %raw, "ignoring nameless Set-Cookie");
                }
                Err(e) => {
                    tracing::warn!(directive = %raw, error = %e, "dropping cookie");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Store a cookie received from `url`. Returns `false` when it was rejected
    /// by the domain check or removed because it is already expired.
    pub fn set_cookie(&self, url: &Url, mut cookie: Cookie) -> bool {
        if !cookie.domain_accepts(url) {
            tracing::debug!(
                name = %cookie.name,
                domain = %cookie.domain,
                url = %url,
                "cookie domain does not match request authority"
            );
            return false;
        }
        cookie.bind_to(url);
        self.upsert(cookie)
    }

    /// Insert an already-bound cookie, bypassing the domain check.
    /// Used when restoring a persisted jar.
    pub fn restore(&self, cookie: Cookie) -> bool {
        if cookie.domain.is_empty() {
            return false;
        }
        self.upsert(cookie)
    }

    fn upsert(&self, cookie: Cookie) -> bool {
        let now = OffsetDateTime::now_utc();
        let expired = cookie.is_expired(now);

        let mut entry = self.store.entry(cookie.domain.clone()).or_default();
        entry.retain(|stored| !stored.cookie.is_expired(now));

        let kept = match entry.iter().position(|stored| stored.cookie == cookie) {
            Some(idx) if expired => {
                entry.remove(idx);
                false
            }
            Some(idx) => {
                entry[idx].cookie = cookie;
                true
            }
            None if expired => false,
            None => {
                let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                entry.push(StoredCookie { seq, cookie });
                true
            }
        };

        let empty = entry.is_empty();
        let domain = entry.key().clone();
        drop(entry); // Release the shard lock before removing

        if empty {
            self.store.remove_if(&domain, |_, v| v.is_empty());
        }
        kept
    }

    /// Cookies to send with a request to `url`, in insertion order.
    pub fn cookies_for(&self, url: &Url) -> Vec<Cookie> {
        let now = OffsetDateTime::now_utc();
        let mut matched: Vec<StoredCookie> = self
            .store
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|stored| stored.cookie.matches_url(url, now))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();

        matched.sort_by_key(|stored| stored.seq);
        matched.into_iter().map(|stored| stored.cookie).collect()
    }

    /// Value for a `Cookie` request header: `name=value` pairs joined by `; `.
    /// Empty when nothing matches.
    pub fn cookie_header_for(&self, url: &Url) -> String {
        self.cookies_for(url)
            .iter()
            .map(Cookie::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Look up a cookie by identity.
    pub fn get(&self, domain: &str, name: &str) -> Option<Cookie> {
        let domain = crate::cookies::canonicalcookie::normalize_domain(domain);
        self.store.get(&domain).and_then(|entry| {
            entry
                .iter()
                .find(|stored| stored.cookie.name == name)
                .map(|stored| stored.cookie.clone())
        })
    }

    /// Get total cookie count.
    pub fn len(&self) -> usize {
        self.store.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all cookies.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Every stored cookie in insertion order (for persistence).
    pub fn all_cookies(&self) -> Vec<Cookie> {
        let mut all: Vec<StoredCookie> = self
            .store
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|stored| stored.seq);
        all.into_iter().map(|stored| stored.cookie).collect()
    }
}
