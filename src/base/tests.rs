use crate::base::neterror::{ErrorCategory, NetError};

#[test]
fn test_chromium_codes() {
    assert_eq!(NetError::ConnectionClosed.as_i32(), -100);
    assert_eq!(NetError::ConnectionTimedOut.as_i32(), -118);
    assert_eq!(NetError::InvalidChunkedEncoding.as_i32(), -321);
    assert_eq!(
        NetError::decoding_failed("gzip", "bad header").as_i32(),
        -330
    );
}

#[test]
fn test_custom_codes_stay_in_custom_range() {
    let custom = [
        NetError::CookieDateFormat {
            value: "x".to_string(),
        },
        NetError::ConnectionAlreadyClosed,
        NetError::not_supported("send"),
    ];
    for err in custom {
        let code = err.as_i32();
        assert!((-999..=-900).contains(&code), "{err:?} -> {code}");
    }
}

#[test]
fn test_categories_follow_taxonomy() {
    assert_eq!(NetError::ConnectionClosed.category(), ErrorCategory::Connection);
    assert_eq!(NetError::MissingStatusLine.category(), ErrorCategory::Framing);
    assert_eq!(NetError::MissingBodyLength.category(), ErrorCategory::Framing);
    assert_eq!(
        NetError::UnsupportedTransferEncoding {
            value: "gzip".to_string()
        }
        .category(),
        ErrorCategory::Framing
    );
    assert_eq!(
        NetError::decoding_failed("deflate", "corrupt").category(),
        ErrorCategory::Decode
    );
    assert_eq!(
        NetError::CookieDateFormat {
            value: "tomorrow".to_string()
        }
        .category(),
        ErrorCategory::CookieParse
    );
    assert_eq!(
        NetError::UploadFileNotFound {
            path: "/nope".to_string()
        }
        .category(),
        ErrorCategory::Upload
    );
    assert_eq!(NetError::ConnectionAlreadyClosed.category(), ErrorCategory::Usage);
}

#[test]
fn test_display_carries_context() {
    let err = NetError::UnsupportedTransferEncoding {
        value: "compress".to_string(),
    };
    assert_eq!(err.to_string(), "Unsupported Transfer-Encoding: compress");
}

#[test]
fn test_codes_are_distinct() {
    let s = || "x".to_string();
    let all = [
        NetError::ConnectionClosed,
        NetError::ConnectionReset,
        NetError::ConnectionRefused,
        NetError::ConnectionFailedTo { host: s(), port: 1, message: s() },
        NetError::ConnectionTimedOut,
        NetError::NameNotResolved { domain: s() },
        NetError::StreamFailed { stage: s(), message: s() },
        NetError::SslProtocolError,
        NetError::SslHandshakeFailed { host: s(), message: s() },
        NetError::TunnelConnectionFailed { status_line: s() },
        NetError::EmptyResponse,
        NetError::MissingStatusLine,
        NetError::MissingBodyLength,
        NetError::InvalidContentLength { value: s() },
        NetError::UnsupportedTransferEncoding { value: s() },
        NetError::InvalidChunkedEncoding,
        NetError::ResponseHeadersTooBig,
        NetError::decoding_failed("gzip", "e"),
        NetError::JsonParseError { message: s() },
        NetError::CookieDateFormat { value: s() },
        NetError::UploadFileNotFound { path: s() },
        NetError::UploadFileUnreadable { path: s(), message: s() },
        NetError::ConnectionAlreadyClosed,
        NetError::FieldNotPrepared { name: s() },
        NetError::not_supported("send"),
        NetError::BodyConsumed,
        NetError::InvalidUrl,
        NetError::UnknownUrlScheme,
        NetError::InvalidHeader { name: s() },
        NetError::InvalidProxy { reason: s() },
        NetError::TooManyRedirects,
    ];
    let mut codes: Vec<i32> = all.iter().map(NetError::as_i32).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), all.len());
    assert_eq!(NetError::ResponseHeadersTooBig.category(), ErrorCategory::Framing);
}
