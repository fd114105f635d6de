use rawnet::cookies::canonicalcookie::{path_matches, Cookie};
use rawnet::cookies::jar::CookieJar;
use rawnet::cookies::parser::CookieDirectiveParser;
use rawnet::cookies::persistence;
use rawnet::NetError;
use std::thread;
use url::Url;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[test]
fn test_parse_full_directive() {
    let cookie = CookieDirectiveParser::parse(
        "token=a=b=c; Expires=Wed, 21 Oct 2037 07:28:00 GMT; Domain=Example.COM; Path=/api; Secure; HttpOnly; SameSite=Lax",
    )
    .unwrap()
    .unwrap();

    assert_eq!(cookie.name, "token");
    assert_eq!(cookie.value, "a=b=c");
    assert_eq!(cookie.domain, ".example.com");
    assert_eq!(cookie.path, "/api");
    assert!(cookie.secure && cookie.http_only);
    assert_eq!(cookie.expires.unwrap().year(), 2037);
    assert!(cookie.domain_specified && cookie.path_specified && cookie.expires_specified);
}

#[test]
fn test_parse_bad_expires() {
    let err = CookieDirectiveParser::parse("a=1; Expires=next tuesday").unwrap_err();
    assert!(matches!(err, NetError::CookieDateFormat { .. }));
}

#[test]
fn test_domain_matching() {
    let jar = CookieJar::new();
    jar.ingest(&url("http://www.example.com/"), ["d=1; Domain=example.com"])
        .unwrap();

    assert_eq!(jar.cookie_header_for(&url("http://api.example.com/")), "d=1");
    assert_eq!(jar.cookie_header_for(&url("http://example.com/")), "d=1");
    assert_eq!(jar.cookie_header_for(&url("http://notexample.com/")), "");
}

#[test]
fn test_cross_domain_cookie_rejected() {
    let jar = CookieJar::new();
    jar.ingest(&url("http://evil.test/"), ["steal=1; Domain=example.com"])
        .unwrap();
    assert!(jar.is_empty());

    // A subdomain may only set cookies for itself or a parent.
    jar.ingest(&url("http://sub.example.com/"), ["x=1; Domain=other.sub.example.com"])
        .unwrap();
    assert!(jar.is_empty());
}

#[test]
fn test_host_only_cookie_binds_to_authority() {
    let jar = CookieJar::new();
    jar.ingest(&url("http://shop.example.com:8080/cart"), ["cart=3"])
        .unwrap();
    let stored = jar.get(".shop.example.com:8080", "cart").unwrap();
    assert!(!stored.domain_specified);
    assert_eq!(jar.cookie_header_for(&url("http://shop.example.com:8080/")), "cart=3");
    assert_eq!(jar.cookie_header_for(&url("http://shop.example.com/")), "");
}

#[test]
fn test_path_matching() {
    assert!(path_matches("/a", "/a/b"));
    assert!(path_matches("/a", "/a"));
    assert!(!path_matches("/a", "/ab"));

    let jar = CookieJar::new();
    jar.ingest(&url("http://example.com/"), ["p=1; Path=/a"]).unwrap();
    assert_eq!(jar.cookie_header_for(&url("http://example.com/a/b")), "p=1");
    assert_eq!(jar.cookie_header_for(&url("http://example.com/ab")), "");
}

#[test]
fn test_secure_only_over_https() {
    let jar = CookieJar::new();
    jar.ingest(&url("https://example.com/"), ["s=1; Secure", "plain=2"])
        .unwrap();
    assert_eq!(jar.cookie_header_for(&url("https://example.com/")), "s=1; plain=2");
    assert_eq!(jar.cookie_header_for(&url("http://example.com/")), "plain=2");
}

#[test]
fn test_update_in_place() {
    let jar = CookieJar::new();
    let origin = url("http://x.com/");
    jar.ingest(&origin, ["S=1; Domain=x.com", "T=a"]).unwrap();
    jar.ingest(&origin, ["S=2; Domain=x.com"]).unwrap();

    assert_eq!(jar.len(), 2);
    assert_eq!(jar.get(".x.com", "S").unwrap().value, "2");
    // Updating keeps the original position.
    assert_eq!(jar.cookie_header_for(&origin), "S=2; T=a");
}

#[test]
fn test_expired_cookies() {
    let jar = CookieJar::new();
    let origin = url("http://example.com/");

    jar.ingest(&origin, ["old=1; Expires=Thu, 01 Jan 1970 00:00:00 GMT"])
        .unwrap();
    assert!(jar.is_empty());

    jar.ingest(&origin, ["live=1"]).unwrap();
    jar.ingest(&origin, ["live=gone; Max-Age=0"]).unwrap();
    assert!(jar.is_empty());
}

#[test]
fn test_max_age_ignored_when_expires_present() {
    let cookie = CookieDirectiveParser::parse(
        "a=1; Max-Age=0; Expires=Wed, 21-Oct-2037 07:28:00 GMT",
    )
    .unwrap()
    .unwrap();
    assert!(!cookie.is_expired_now());
}

#[test]
fn test_set_cookie_and_restore() {
    let jar = CookieJar::new();
    let origin = url("http://example.com/");
    assert!(jar.set_cookie(&origin, Cookie::new("manual", "1").with_path("/")));
    assert!(!jar.set_cookie(&origin, Cookie::new("x", "1").with_domain("elsewhere.org")));
    assert!(jar.restore(Cookie::new("r", "2").with_domain("example.com")));
    assert_eq!(jar.cookie_header_for(&origin), "manual=1; r=2");
}

#[test]
fn test_shared_across_threads() {
    let jar = CookieJar::new();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let jar = jar.clone();
            thread::spawn(move || {
                let origin = Url::parse("http://example.com/").unwrap();
                jar.ingest(&origin, [format!("c{i}={i}")]).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(jar.len(), 8);
}

#[test]
fn test_persistence_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cookies.json");

    let jar = CookieJar::new();
    let origin = url("https://example.com/");
    jar.ingest(
        &origin,
        [
            "sid=1; Secure; HttpOnly",
            "pref=dark; Domain=example.com; Expires=Wed, 21 Oct 2037 07:28:00 GMT",
        ],
    )
    .unwrap();
    persistence::save_cookies(&jar, &path).unwrap();

    let loaded = persistence::load_cookies(&path).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.cookie_header_for(&origin), jar.cookie_header_for(&origin));
    let pref = loaded.get("example.com", "pref").unwrap();
    assert!(pref.domain_specified);
    assert_eq!(pref.expires, jar.get("example.com", "pref").unwrap().expires);
}

#[test]
fn test_set_cookie_string() {
    let cookie = CookieDirectiveParser::parse(
        "a=1; Expires=Wed, 21 Oct 2037 07:28:00 GMT; Path=/x; Secure",
    )
    .unwrap()
    .unwrap();
    assert_eq!(
        cookie.to_set_cookie_string(),
        "a=1; Expires=Wed, 21-Oct-2037 07:28:00 GMT; Path=/x; Secure"
    );
    assert_eq!(cookie.to_string(), "a=1");
}
