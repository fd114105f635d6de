/// The current stage of a single request/response exchange.
/// Roughly matches the subset of net/base/load_states.h a one-shot session goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// No exchange in progress (fresh, finished, or closed).
    #[default]
    Idle,

    /// Establishing proxy tunnel.
    EstablishingProxyTunnel,

    /// Connecting to the host (TCP handshake).
    Connecting,

    /// Establishing an SSL connection.
    SslHandshake,

    /// Sending the HTTP request.
    SendingRequest,

    /// Waiting for the server response (TTFB).
    WaitingForResponse,

    /// Reading the response body.
    ReadingResponse,
}
