use rawnet::http::headers::HeaderStore;

#[test]
fn test_add_collects_values_under_one_name() {
    let mut headers = HeaderStore::new();
    headers.add("set-cookie", "a=1");
    headers.add("SET-COOKIE", "b=2");
    headers.add("Set-Cookie", "c=3");

    assert_eq!(headers.len(), 1);
    assert_eq!(
        headers.get("sEt-CoOkIe").unwrap(),
        &["a=1".to_string(), "b=2".to_string(), "c=3".to_string()]
    );
    assert_eq!(headers.get_single("set-cookie"), Some("a=1"));
}

#[test]
fn test_set_replaces_and_keeps_position() {
    let mut headers = HeaderStore::new();
    headers.add("Host", "a").add("Accept", "x").add("accept", "y").add("Connection", "close");
    headers.set("ACCEPT", "*/*");

    assert_eq!(headers.get("Accept").unwrap(), &["*/*".to_string()]);
    let names: Vec<_> = headers.names().collect();
    assert_eq!(names, vec!["Host", "Accept", "Connection"]);
}

#[test]
fn test_declared_headers_are_not_serialized() {
    let mut headers = HeaderStore::new();
    headers.set("Host", "example.com").declare("Cookie").set("Accept", "*/*");

    assert!(headers.contains("cookie"));
    assert!(headers.is_blank("cookie"));
    assert_eq!(headers.get("Cookie").unwrap().len(), 0);
    assert_eq!(headers.serialize(), "Host: example.com\r\nAccept: */*\r\n");
}

#[test]
fn test_remove() {
    let mut headers = HeaderStore::new();
    headers.add("X-One", "1").add("X-Two", "2");
    headers.remove("x-one");
    assert!(headers.get("X-One").is_none());
    assert_eq!(headers.serialize(), "X-Two: 2\r\n");
}

#[test]
fn test_line_parsing() {
    let mut headers = HeaderStore::new();
    assert!(headers.add_line("Location: http://example.com:8080/x"));
    assert!(headers.add_line("X-Empty:"));
    assert!(!headers.add_line("no colon here"));

    // Split at the first colon only.
    assert_eq!(
        headers.get_single("Location"),
        Some("http://example.com:8080/x")
    );
    // Empty after the colon is an empty string, not absent.
    assert_eq!(headers.get("x-empty").unwrap(), &[String::new()]);
    assert_eq!(headers.len(), 2);
}

#[test]
fn test_serialize_parse_round_trip() {
    let mut headers = HeaderStore::new();
    headers
        .add("content-type", "text/plain")
        .add("set-cookie", "a=1")
        .add("set-cookie", "b=2")
        .add("x-request-id", "abc");

    let reparsed = HeaderStore::parse(&headers.serialize());
    assert_eq!(reparsed, headers);
}

#[test]
fn test_to_header_map() {
    let mut headers = HeaderStore::new();
    headers.add("Accept", "*/*").declare("Referer").add("Set-Cookie", "a=1").add("Set-Cookie", "b=2");

    let map = headers.to_header_map().unwrap();
    assert_eq!(map.get("accept").unwrap(), "*/*");
    assert!(map.get("referer").is_none());
    assert_eq!(map.get_all("set-cookie").iter().count(), 2);
}

#[test]
fn test_to_header_map_rejects_bad_value() {
    let mut headers = HeaderStore::new();
    headers.add("X-Bad", "line\nbreak");
    assert!(headers.to_header_map().is_err());
}
