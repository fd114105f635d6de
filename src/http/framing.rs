//! HTTP/1.1 response framing over a blocking byte stream.
//!
//! Strictly sequential, one pass per response:
//!
//! 1. [`read_head`] collects lines up to the blank line and recovers the
//!    *last* status line in the block, so a stray status line left by a proxy
//!    or redirect hop is discarded together with everything before it.
//! 2. [`BodyFraming::for_response`] picks chunked or length-delimited
//!    framing, or no body at all for `HEAD` and 1xx/204/304.
//! 3. [`read_chunked`] / [`read_length`] pull the raw body.
//! 4. [`decode_content`] undoes `gzip` / `deflate`.

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::http::headers::HeaderStore;
use bytes::Bytes;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use http::{Method, StatusCode};
use std::io::{BufRead, Read};

/// Upper bound on a single head or chunk-size line, terminator included.
pub const MAX_LINE_LEN: u64 = 64 * 1024;

/// Upper bound on a whole response head.
pub const MAX_HEAD_LEN: usize = 256 * 1024;

/// Parsed status line and headers of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// Protocol version digits, e.g. `1.1`.
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: HeaderStore,
    /// Header block from the recovered status line onward, CRLF-separated.
    pub raw: String,
    /// Lines that preceded the recovered status line.
    pub discarded: Vec<String>,
}

/// Split `HTTP/<version> <code> [reason]`.
pub fn parse_status_line(line: &str) -> Option<(&str, u16, &str)> {
    let rest = line.strip_prefix("HTTP/")?;
    let (version, rest) = rest.split_once(' ')?;
    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    let rest = rest.trim_start();
    let (code, reason) = match rest.split_once(' ') {
        Some((code, reason)) => (code, reason.trim()),
        None => (rest, ""),
    };
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((version, code.parse().ok()?, reason))
}

impl ResponseHead {
    /// Build a head from already collected lines (no trailing blank line).
    pub fn from_lines(mut lines: Vec<String>) -> Result<Self, NetError> {
        let idx = lines
            .iter()
            .rposition(|line| parse_status_line(line).is_some())
            .ok_or(NetError::MissingStatusLine)?;

        let kept = lines.split_off(idx);
        let discarded = lines;
        for line in &discarded {
            tracing::debug!(line = %line, "discarding line before last status line");
        }

        let (version, status, reason) = match parse_status_line(&kept[0]) {
            Some((v, s, r)) => (v.to_string(), s, r.to_string()),
            None => return Err(NetError::MissingStatusLine),
        };
        let reason = if reason.is_empty() {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("")
                .to_string()
        } else {
            reason
        };

        let mut headers = HeaderStore::new();
        for line in &kept[1..] {
            headers.add_line(line);
        }

        let mut raw = kept.join("\r\n");
        raw.push_str("\r\n");

        tracing::debug!(status, version = %version, "response status parsed");
        Ok(Self {
            version,
            status,
            reason,
            headers,
            raw,
            discarded,
        })
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }
}

/// Read one line, stripping the CRLF/LF terminator. `None` at end of stream.
///
/// A line that reaches [`MAX_LINE_LEN`] without a terminator is
/// [`NetError::ResponseHeadersTooBig`].
pub fn read_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<Option<String>, NetError> {
    let mut buf = Vec::new();
    let n = reader
        .take(MAX_LINE_LEN)
        .read_until(b'\n', &mut buf)
        .stream_context("reading line")?;
    if n == 0 {
        return Ok(None);
    }
    if n as u64 == MAX_LINE_LEN && buf.last() != Some(&b'\n') {
        return Err(NetError::ResponseHeadersTooBig);
    }
    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Read lines until the blank line and parse the response head.
///
/// End of stream before any line is [`NetError::EmptyResponse`]; end of
/// stream after some lines ends the head. A head larger than
/// [`MAX_HEAD_LEN`] is [`NetError::ResponseHeadersTooBig`].
pub fn read_head<R: BufRead + ?Sized>(reader: &mut R) -> Result<ResponseHead, NetError> {
    let mut lines = Vec::new();
    let mut total = 0;
    loop {
        match read_line(reader)? {
            Some(line) if line.is_empty() => break,
            Some(line) => {
                total += line.len() + 2;
                if total > MAX_HEAD_LEN {
                    return Err(NetError::ResponseHeadersTooBig);
                }
                lines.push(line);
            }
            None if lines.is_empty() => return Err(NetError::EmptyResponse),
            None => break,
        }
    }
    ResponseHead::from_lines(lines)
}

/// How the body following a head is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body (HEAD, 1xx, 204, 304).
    None,
    Chunked,
    Length(u64),
}

impl BodyFraming {
    /// `Transfer-Encoding` wins over `Content-Length`; it must be `chunked`.
    pub fn for_response(head: &ResponseHead, method: &Method) -> Result<Self, NetError> {
        if *method == Method::HEAD
            || (100..200).contains(&head.status)
            || head.status == 204
            || head.status == 304
        {
            return Ok(BodyFraming::None);
        }

        if let Some(values) = head.headers.get("Transfer-Encoding") {
            let value = values.join(", ");
            return if value.trim().eq_ignore_ascii_case("chunked") {
                Ok(BodyFraming::Chunked)
            } else {
                Err(NetError::UnsupportedTransferEncoding { value })
            };
        }

        match head.headers.get_single("Content-Length") {
            Some(value) => value
                .trim()
                .parse()
                .map(BodyFraming::Length)
                .map_err(|_| NetError::InvalidContentLength {
                    value: value.to_string(),
                }),
            None => Err(NetError::MissingBodyLength),
        }
    }
}

/// Read a chunked body: `<hex-size>[;ext]` lines, each followed by that many
/// bytes and a CRLF, until a zero-size chunk. Trailer lines are discarded.
pub fn read_chunked<R: BufRead + ?Sized>(reader: &mut R) -> Result<Vec<u8>, NetError> {
    let mut body = Vec::new();
    loop {
        let line = read_chunk_line(reader)?.ok_or(NetError::ConnectionClosed)?;
        let size_str = line.split(';').next().unwrap_or("").trim();
        let size =
            u64::from_str_radix(size_str, 16).map_err(|_| NetError::InvalidChunkedEncoding)?;

        if size == 0 {
            // Trailers up to the final blank line; a server closing early is tolerated.
            while let Some(trailer) = read_chunk_line(reader)? {
                if trailer.is_empty() {
                    break;
                }
            }
            return Ok(body);
        }

        let start = body.len();
        let got = reader
            .take(size)
            .read_to_end(&mut body)
            .stream_context("reading chunk")?;
        if (got as u64) < size {
            body.truncate(start);
            return Err(NetError::ConnectionClosed);
        }

        match read_chunk_line(reader)? {
            Some(rest) if rest.is_empty() => {}
            Some(_) => return Err(NetError::InvalidChunkedEncoding),
            None => return Err(NetError::ConnectionClosed),
        }
    }
}

fn read_chunk_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<Option<String>, NetError> {
    read_line(reader).map_err(|e| match e {
        NetError::ResponseHeadersTooBig => NetError::InvalidChunkedEncoding,
        other => other,
    })
}

/// Read exactly `length` bytes, looping over partial reads.
pub fn read_length<R: Read + ?Sized>(reader: &mut R, length: u64) -> Result<Vec<u8>, NetError> {
    let mut body = Vec::with_capacity(length.min(1 << 20) as usize);
    let got = reader
        .take(length)
        .read_to_end(&mut body)
        .stream_context("reading body")?;
    if (got as u64) < length {
        return Err(NetError::ConnectionClosed);
    }
    Ok(body)
}

/// Read the raw (still encoded) body per `framing`.
pub fn read_body<R: BufRead + ?Sized>(
    reader: &mut R,
    framing: BodyFraming,
) -> Result<Vec<u8>, NetError> {
    match framing {
        BodyFraming::None => Ok(Vec::new()),
        BodyFraming::Chunked => read_chunked(reader),
        BodyFraming::Length(length) => read_length(reader, length),
    }
}

/// Undo a `Content-Encoding` of `gzip` or `deflate`. Other encodings, and
/// empty bodies, pass through untouched.
///
/// `deflate` is tried as zlib-wrapped first, then as a raw deflate stream,
/// since servers send both.
pub fn decode_content(encoding: Option<&str>, body: Vec<u8>) -> Result<Bytes, NetError> {
    let encoding = encoding.map(|e| e.trim().to_ascii_lowercase());
    if body.is_empty() {
        return Ok(Bytes::from(body));
    }

    match encoding.as_deref() {
        Some("gzip") | Some("x-gzip") => {
            let mut out = Vec::new();
            GzDecoder::new(body.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| NetError::decoding_failed("gzip", e))?;
            Ok(Bytes::from(out))
        }
        Some("deflate") => {
            let mut out = Vec::new();
            if ZlibDecoder::new(body.as_slice()).read_to_end(&mut out).is_ok() {
                return Ok(Bytes::from(out));
            }
            out.clear();
            DeflateDecoder::new(body.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| NetError::decoding_failed("deflate", e))?;
            Ok(Bytes::from(out))
        }
        _ => Ok(Bytes::from(body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::{BufReader, Cursor, Write};

    fn head(text: &str) -> ResponseHead {
        read_head(&mut Cursor::new(text.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_parse_status_line() {
        assert_eq!(parse_status_line("HTTP/1.1 200 OK"), Some(("1.1", 200, "OK")));
        assert_eq!(
            parse_status_line("HTTP/1.0 404 Not Found"),
            Some(("1.0", 404, "Not Found"))
        );
        assert_eq!(parse_status_line("HTTP/2 204"), Some(("2", 204, "")));
        assert_eq!(parse_status_line("HTTP/1.1 2000 OK"), None);
        assert_eq!(parse_status_line("Location: HTTP/1.1 200"), None);
        assert_eq!(parse_status_line("HTTP/x 200 OK"), None);
    }

    #[test]
    fn test_read_head() {
        let h = head("HTTP/1.1 200 OK\r\nContent-Length: 5\r\nset-cookie: a=1\r\n\r\nhello");
        assert_eq!(h.status, 200);
        assert_eq!(h.reason, "OK");
        assert_eq!(h.version, "1.1");
        assert_eq!(h.headers.get_single("Set-Cookie"), Some("a=1"));
        assert_eq!(h.raw, "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nset-cookie: a=1\r\n");
    }

    #[test]
    fn test_status_line_recovery_uses_last() {
        let h = head(
            "HTTP/1.1 302 Found\r\nLocation: /next\r\nHTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n",
        );
        assert_eq!(h.status, 200);
        assert_eq!(h.discarded, vec!["HTTP/1.1 302 Found", "Location: /next"]);
        assert!(h.headers.get("Location").is_none());
    }

    #[test]
    fn test_missing_status_line() {
        let err = read_head(&mut Cursor::new(b"Content-Length: 0\r\n\r\n".to_vec())).unwrap_err();
        assert_eq!(err, NetError::MissingStatusLine);
    }

    #[test]
    fn test_empty_response() {
        let err = read_head(&mut Cursor::new(Vec::new())).unwrap_err();
        assert_eq!(err, NetError::EmptyResponse);
    }

    #[test]
    fn test_reason_falls_back_to_canonical() {
        let h = head("HTTP/1.1 404\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(h.reason, "Not Found");
    }

    #[test]
    fn test_framing_decision() {
        let get = Method::GET;
        let chunked = head("HTTP/1.1 200 OK\r\nTransfer-Encoding: Chunked\r\nContent-Length: 3\r\n\r\n");
        assert_eq!(BodyFraming::for_response(&chunked, &get).unwrap(), BodyFraming::Chunked);

        let length = head("HTTP/1.1 200 OK\r\nContent-Length: 42\r\n\r\n");
        assert_eq!(BodyFraming::for_response(&length, &get).unwrap(), BodyFraming::Length(42));

        let neither = head("HTTP/1.1 200 OK\r\nServer: x\r\n\r\n");
        assert_eq!(
            BodyFraming::for_response(&neither, &get).unwrap_err(),
            NetError::MissingBodyLength
        );
        assert_eq!(
            BodyFraming::for_response(&neither, &Method::HEAD).unwrap(),
            BodyFraming::None
        );

        let gzip_te = head("HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip\r\n\r\n");
        assert!(matches!(
            BodyFraming::for_response(&gzip_te, &get),
            Err(NetError::UnsupportedTransferEncoding { .. })
        ));

        let bad_len = head("HTTP/1.1 200 OK\r\nContent-Length: ten\r\n\r\n");
        assert!(matches!(
            BodyFraming::for_response(&bad_len, &get),
            Err(NetError::InvalidContentLength { .. })
        ));

        let no_content = head("HTTP/1.1 204 No Content\r\n\r\n");
        assert_eq!(BodyFraming::for_response(&no_content, &get).unwrap(), BodyFraming::None);
    }

    #[test]
    fn test_read_chunked() {
        let mut input = Cursor::new(b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n".to_vec());
        assert_eq!(read_chunked(&mut input).unwrap(), b"Wikipedia");
    }

    #[test]
    fn test_read_chunked_extensions_and_trailers() {
        let mut input =
            Cursor::new(b"4;name=val\r\nWiki\r\nA \r\n0123456789\r\n0\r\nX-Trailer: 1\r\n\r\n".to_vec());
        assert_eq!(read_chunked(&mut input).unwrap(), b"Wiki0123456789");
    }

    #[test]
    fn test_read_chunked_bad_size() {
        let mut input = Cursor::new(b"zz\r\nWiki\r\n0\r\n\r\n".to_vec());
        assert_eq!(read_chunked(&mut input).unwrap_err(), NetError::InvalidChunkedEncoding);
    }

    #[test]
    fn test_overlong_header_line_is_rejected() {
        let mut wire = b"HTTP/1.1 200 OK\r\nX-Long: ".to_vec();
        wire.extend(std::iter::repeat(b'a').take(65528));
        wire.extend_from_slice(b"Injected: yes\r\nContent-Length: 0\r\n\r\n");
        let mut reader = BufReader::new(Cursor::new(wire));
        assert_eq!(read_head(&mut reader).unwrap_err(), NetError::ResponseHeadersTooBig);
    }

    #[test]
    fn test_line_just_under_limit_is_kept() {
        let value = "v".repeat(MAX_LINE_LEN as usize - "X-Big: \r\n".len());
        let wire = format!("HTTP/1.1 200 OK\r\nX-Big: {value}\r\n\r\n");
        let head = read_head(&mut Cursor::new(wire.into_bytes())).unwrap();
        assert_eq!(head.headers.get_single("X-Big"), Some(value.as_str()));
    }

    #[test]
    fn test_oversized_head_is_rejected() {
        let mut wire = String::from("HTTP/1.1 200 OK\r\n");
        let filler = "b".repeat(1000);
        for i in 0..300 {
            wire.push_str(&format!("X-Fill-{i}: {filler}\r\n"));
        }
        wire.push_str("\r\n");
        let err = read_head(&mut Cursor::new(wire.into_bytes())).unwrap_err();
        assert_eq!(err, NetError::ResponseHeadersTooBig);
    }

    #[test]
    fn test_overlong_chunk_size_line() {
        let mut wire = vec![b'1'; MAX_LINE_LEN as usize + 10];
        wire.extend_from_slice(b"\r\n");
        let err = read_chunked(&mut Cursor::new(wire)).unwrap_err();
        assert_eq!(err, NetError::InvalidChunkedEncoding);
    }

    #[test]
    fn test_read_chunked_truncated() {
        let mut input = Cursor::new(b"10\r\nshort".to_vec());
        assert_eq!(read_chunked(&mut input).unwrap_err(), NetError::ConnectionClosed);
    }

    /// Yields at most `step` bytes per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_read_length_over_fragmented_reads() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let mut reader = Trickle {
            data: data.clone(),
            pos: 0,
            step: 7,
        };
        assert_eq!(read_length(&mut reader, 9_000).unwrap(), data[..9_000].to_vec());
    }

    #[test]
    fn test_read_length_short_stream() {
        let mut reader = Cursor::new(b"abc".to_vec());
        assert_eq!(read_length(&mut reader, 10).unwrap_err(), NetError::ConnectionClosed);
    }

    #[test]
    fn test_chunked_over_fragmented_reads() {
        let wire = b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n".to_vec();
        let mut reader = BufReader::new(Trickle {
            data: wire,
            pos: 0,
            step: 3,
        });
        assert_eq!(read_chunked(&mut reader).unwrap(), b"Wikipedia");
    }

    #[test]
    fn test_decode_gzip() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"hello gzip").unwrap();
        let body = enc.finish().unwrap();
        assert_eq!(decode_content(Some("gzip"), body).unwrap(), "hello gzip");
    }

    #[test]
    fn test_decode_deflate_zlib_and_raw() {
        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(b"zlib wrapped").unwrap();
        assert_eq!(
            decode_content(Some("deflate"), zlib.finish().unwrap()).unwrap(),
            "zlib wrapped"
        );

        let mut raw = DeflateEncoder::new(Vec::new(), Compression::default());
        raw.write_all(b"raw deflate").unwrap();
        assert_eq!(
            decode_content(Some("Deflate"), raw.finish().unwrap()).unwrap(),
            "raw deflate"
        );
    }

    #[test]
    fn test_decode_failure() {
        let err = decode_content(Some("gzip"), b"definitely not gzip".to_vec()).unwrap_err();
        assert!(matches!(err, NetError::ContentDecodingFailed { .. }));
    }

    #[test]
    fn test_identity_passthrough() {
        assert_eq!(decode_content(None, b"plain".to_vec()).unwrap(), "plain");
        assert_eq!(decode_content(Some("br"), b"opaque".to_vec()).unwrap(), "opaque");
    }
}
