use crate::base::context::IoResultExt;
use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::base::options::TransportOptions;
use crate::base::urlext::UrlExt;
use crate::http::framing::parse_status_line;
use crate::socket::proxy::ProxySettings;
use crate::socket::stream::BoxedSocket;
use crate::socket::tls::TlsConfig;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use url::Url;

/// Upper bound on a proxy's `CONNECT` response head.
const MAX_TUNNEL_RESPONSE: usize = 16 * 1024;

/// Where to open the byte stream and whether to encrypt it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub encrypted: bool,
}

impl Endpoint {
    /// The URL's own `host:port`.
    pub fn from_url(url: &Url) -> Result<Self, NetError> {
        let (host, port) = url.host_and_port()?;
        Ok(Self {
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
            encrypted: url.is_encrypted(),
        })
    }

    /// A literal override such as `10.0.0.5:8443`, optionally prefixed with
    /// `tcp://` or `tls://`/`ssl://` to force the transport. Without a prefix
    /// the URL scheme decides.
    pub fn from_remote(remote: &str, url: &Url) -> Result<Self, NetError> {
        let (encrypted, address) = if let Some(rest) = remote.strip_prefix("tcp://") {
            (false, rest)
        } else if let Some(rest) = remote
            .strip_prefix("tls://")
            .or_else(|| remote.strip_prefix("ssl://"))
        {
            (true, rest)
        } else {
            (url.is_encrypted(), remote)
        };

        let (host, port) = address.rsplit_once(':').ok_or(NetError::InvalidUrl)?;
        let port = port.parse().map_err(|_| NetError::InvalidUrl)?;
        if host.is_empty() {
            return Err(NetError::InvalidUrl);
        }
        Ok(Self {
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
            encrypted,
        })
    }

    pub fn host_port(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// A freshly opened connection.
#[derive(Debug)]
pub struct ConnectedSocket {
    pub socket: BoxedSocket,
    /// Requests must use the absolute-URI form (forwarding proxy).
    pub absolute_form: bool,
    pub peer: String,
}

/// Manages the connection process: DNS -> TCP -> proxy tunnel -> SSL.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob<'a> {
    options: &'a TransportOptions,
}

impl<'a> ConnectJob<'a> {
    pub fn new(options: &'a TransportOptions) -> Self {
        Self { options }
    }

    /// Open a stream for a request to `url`. `remote` overrides the options'
    /// `remote`. `state` tracks the stage reached.
    pub fn connect(
        &self,
        url: &Url,
        remote: Option<&str>,
        state: &mut LoadState,
    ) -> Result<ConnectedSocket, NetError> {
        let endpoint = match remote.or(self.options.remote.as_deref()) {
            Some(remote) => Endpoint::from_remote(remote, url)?,
            None => Endpoint::from_url(url)?,
        };
        let proxy = self.options.proxy_settings()?;
        let timeout = self.timeout();

        *state = LoadState::Connecting;
        let (mut stream, absolute_form) = match &proxy {
            Some(p) => {
                if p.url.scheme() != "http" {
                    return Err(NetError::InvalidProxy {
                        reason: format!("unsupported proxy scheme: {}", p.url.scheme()),
                    });
                }
                let (phost, pport) = p.host_port().ok_or(NetError::InvalidUrl)?;
                let stream = dial(phost, pport, timeout)?;
                (stream, !p.tunnels(endpoint.encrypted))
            }
            None => (dial(&endpoint.host, endpoint.port, timeout)?, false),
        };

        if let Some(p) = proxy.as_ref().filter(|p| p.tunnels(endpoint.encrypted)) {
            *state = LoadState::EstablishingProxyTunnel;
            establish_tunnel(&mut stream, p, &endpoint.host_port())?;
        }

        let peer = endpoint.host_port();
        if endpoint.encrypted {
            *state = LoadState::SslHandshake;
            // Certificates are checked against the URL host, not a remote override.
            let sni_host = url.host_str().unwrap_or(&endpoint.host);
            let tls = TlsConfig::from_options(self.options).connect(sni_host, stream)?;
            Ok(ConnectedSocket {
                socket: BoxedSocket::new(tls),
                absolute_form,
                peer,
            })
        } else {
            Ok(ConnectedSocket {
                socket: BoxedSocket::new(stream),
                absolute_form,
                peer,
            })
        }
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.options.timeout_duration()).filter(|d| !d.is_zero())
    }
}

/// Resolve and connect, trying every resolved address in order.
fn dial(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpStream, NetError> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs().dns_context(host)?.collect();
    if addrs.is_empty() {
        return Err(NetError::NameNotResolved {
            domain: host.to_string(),
        });
    }

    let mut last_err = None;
    for addr in addrs {
        tracing::debug!(host, %addr, "connecting");
        let attempt = match timeout {
            Some(t) => TcpStream::connect_timeout(&addr, t),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream
                    .set_read_timeout(timeout)
                    .connection_context(host, port)?;
                stream
                    .set_write_timeout(timeout)
                    .connection_context(host, port)?;
                stream.set_nodelay(true).connection_context(host, port)?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }

    match last_err {
        Some(e) => Err::<TcpStream, _>(e).connection_context(host, port),
        None => Err(NetError::ConnectionRefused),
    }
}

/// Send `CONNECT` and require a 200 answer.
fn establish_tunnel(
    stream: &mut TcpStream,
    proxy: &ProxySettings,
    target: &str,
) -> Result<(), NetError> {
    tracing::debug!(proxy = %proxy.url, target, "establishing tunnel");
    stream
        .write_all(proxy.connect_request(target).as_bytes())
        .stream_context("sending CONNECT")?;

    // Byte at a time, so nothing past the head is consumed before TLS starts.
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut byte).stream_context("reading CONNECT response")?;
        if n == 0 {
            return Err(NetError::ConnectionClosed);
        }
        head.push(byte[0]);
        if head.len() > MAX_TUNNEL_RESPONSE {
            break;
        }
    }

    let text = String::from_utf8_lossy(&head);
    let status_line = text.lines().next().unwrap_or("").trim().to_string();
    match parse_status_line(&status_line) {
        Some((_, 200, _)) => Ok(()),
        _ => Err(NetError::TunnelConnectionFailed { status_line }),
    }
}
