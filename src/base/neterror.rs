use thiserror::Error;

/// Coarse error classes every [`NetError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Socket could not be opened, or the stream broke mid-exchange.
    Connection,
    /// The response could not be framed (status line, body length, transfer coding).
    Framing,
    /// A declared content coding could not be decoded.
    Decode,
    /// A `Set-Cookie` directive could not be parsed.
    CookieParse,
    /// An upload field references a file that cannot be used.
    Upload,
    /// The API was used in a way the current state does not allow.
    Usage,
    /// Malformed caller input (URL, header, proxy target).
    InvalidInput,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection to {host}:{port} failed: {message}")]
    ConnectionFailedTo {
        host: String,
        port: u16,
        message: String,
    },
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Name not resolved: {domain}")]
    NameNotResolved { domain: String },
    #[error("Stream I/O failed while {stage}: {message}")]
    StreamFailed { stage: String, message: String },
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("SSL handshake with {host} failed: {message}")]
    SslHandshakeFailed { host: String, message: String },
    #[error("Tunnel connection failed: {status_line}")]
    TunnelConnectionFailed { status_line: String },

    // Framing Errors
    #[error("Empty response")]
    EmptyResponse,
    #[error("Invalid response: no HTTP status line in header block")]
    MissingStatusLine,
    #[error("Response declares neither Content-Length nor Transfer-Encoding")]
    MissingBodyLength,
    #[error("Invalid Content-Length: {value}")]
    InvalidContentLength { value: String },
    #[error("Unsupported Transfer-Encoding: {value}")]
    UnsupportedTransferEncoding { value: String },
    #[error("Invalid chunked encoding")]
    InvalidChunkedEncoding,
    #[error("Response head too big")]
    ResponseHeadersTooBig,

    // Decode Errors
    #[error("Content decoding failed ({encoding}): {message}")]
    ContentDecodingFailed { encoding: String, message: String },
    #[error("Invalid JSON body: {message}")]
    JsonParseError { message: String },

    // Cookie Errors
    #[error("Cookie date parse error: '{value}'")]
    CookieDateFormat { value: String },

    // Upload Errors
    #[error("Upload file does not exist: {path}")]
    UploadFileNotFound { path: String },
    #[error("Upload file unreadable: {path}: {message}")]
    UploadFileUnreadable { path: String, message: String },

    // Usage Errors
    #[error("Connection has been closed")]
    ConnectionAlreadyClosed,
    #[error("Field '{name}' serialized before prepare")]
    FieldNotPrepared { name: String },
    #[error("Operation not supported by this transporter: {operation}")]
    NotSupported { operation: String },
    #[error("Response body already consumed by sink mode")]
    BodyConsumed,

    // Input Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("Invalid header: {name}")]
    InvalidHeader { name: String },
    #[error("Invalid proxy: {reason}")]
    InvalidProxy { reason: String },
    #[error("Too many redirects")]
    TooManyRedirects,
}

impl NetError {
    /// Connection failure with host/port context.
    pub fn connection_failed_to(host: &str, port: u16, err: std::io::Error) -> Self {
        NetError::ConnectionFailedTo {
            host: host.to_string(),
            port,
            message: err.to_string(),
        }
    }

    /// Stream failure at a named stage of the exchange.
    pub fn stream_failed(stage: &str, err: std::io::Error) -> Self {
        NetError::StreamFailed {
            stage: stage.to_string(),
            message: err.to_string(),
        }
    }

    pub fn not_supported(operation: impl Into<String>) -> Self {
        NetError::NotSupported {
            operation: operation.into(),
        }
    }

    pub fn decoding_failed(encoding: &str, message: impl ToString) -> Self {
        NetError::ContentDecodingFailed {
            encoding: encoding.to_string(),
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            NetError::ConnectionClosed
            | NetError::ConnectionReset
            | NetError::ConnectionRefused
            | NetError::ConnectionFailedTo { .. }
            | NetError::ConnectionTimedOut
            | NetError::NameNotResolved { .. }
            | NetError::StreamFailed { .. }
            | NetError::SslProtocolError
            | NetError::SslHandshakeFailed { .. }
            | NetError::TunnelConnectionFailed { .. } => ErrorCategory::Connection,

            NetError::EmptyResponse
            | NetError::MissingStatusLine
            | NetError::MissingBodyLength
            | NetError::InvalidContentLength { .. }
            | NetError::UnsupportedTransferEncoding { .. }
            | NetError::InvalidChunkedEncoding
            | NetError::ResponseHeadersTooBig => ErrorCategory::Framing,

            NetError::ContentDecodingFailed { .. } | NetError::JsonParseError { .. } => {
                ErrorCategory::Decode
            }

            NetError::CookieDateFormat { .. } => ErrorCategory::CookieParse,

            NetError::UploadFileNotFound { .. } | NetError::UploadFileUnreadable { .. } => {
                ErrorCategory::Upload
            }

            NetError::ConnectionAlreadyClosed
            | NetError::FieldNotPrepared { .. }
            | NetError::NotSupported { .. }
            | NetError::BodyConsumed => ErrorCategory::Usage,

            NetError::InvalidUrl
            | NetError::UnknownUrlScheme
            | NetError::InvalidHeader { .. }
            | NetError::InvalidProxy { .. }
            | NetError::TooManyRedirects => ErrorCategory::InvalidInput,
        }
    }

    /// Numeric code, following `net_error_list.h` where a counterpart exists.
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionFailedTo { .. } => -104,
            NetError::NameNotResolved { .. } => -105,
            NetError::SslProtocolError => -107,
            NetError::TunnelConnectionFailed { .. } => -111,
            NetError::ConnectionTimedOut => -118,
            NetError::SslHandshakeFailed { .. } => -148,
            NetError::StreamFailed { .. } => -2,

            NetError::InvalidUrl => -300,
            NetError::UnknownUrlScheme => -302,
            NetError::TooManyRedirects => -310,
            NetError::MissingStatusLine => -320,
            NetError::InvalidChunkedEncoding => -321,
            NetError::EmptyResponse => -324,
            NetError::ResponseHeadersTooBig => -325,
            NetError::ContentDecodingFailed { .. } => -330,
            NetError::InvalidContentLength { .. } => -354,

            // Custom codes (outside the Chromium table)
            NetError::JsonParseError { .. } => -910,
            NetError::CookieDateFormat { .. } => -911,
            NetError::UploadFileNotFound { .. } => -912,
            NetError::UploadFileUnreadable { .. } => -913,
            NetError::ConnectionAlreadyClosed => -914,
            NetError::FieldNotPrepared { .. } => -915,
            NetError::NotSupported { .. } => -916,
            NetError::BodyConsumed => -917,
            NetError::InvalidHeader { .. } => -918,
            NetError::InvalidProxy { .. } => -919,
            NetError::UnsupportedTransferEncoding { .. } => -920,
            NetError::MissingBodyLength => -921,
        }
    }
}
