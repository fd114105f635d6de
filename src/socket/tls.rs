use crate::base::neterror::NetError;
use crate::base::options::TransportOptions;
use boring::ssl::{SslConnector, SslConnectorBuilder, SslMethod, SslStream, SslVerifyMode, SslVersion};
use std::io::{Read, Write};

/// Client TLS settings for one connection.
/// Keeps a Chromium-like cipher/curve ordering and honours the two verify flags.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub min_version: Option<SslVersion>,
    pub max_version: Option<SslVersion>,
    pub cipher_list: String,
    pub alpn_protos: Vec<String>,
    pub curves: Vec<String>, // Curve names like "X25519", "P-256"
    pub sigalgs: String,     // OpenSSL sigalgs string
    /// Verify the peer certificate chain.
    pub verify_peer: bool,
    /// Verify that the certificate matches the requested host name.
    pub verify_host: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            min_version: Some(SslVersion::TLS1_2),
            max_version: Some(SslVersion::TLS1_3),
            cipher_list:
                "TLS_AES_128_GCM_SHA256:TLS_AES_256_GCM_SHA384:TLS_CHACHA20_POLY1305_SHA256:\
                ECDHE-ECDSA-AES128-GCM-SHA256:ECDHE-RSA-AES128-GCM-SHA256:\
                ECDHE-ECDSA-AES256-GCM-SHA384:ECDHE-RSA-AES256-GCM-SHA384:\
                ECDHE-ECDSA-CHACHA20-POLY1305:ECDHE-RSA-CHACHA20-POLY1305:\
                ECDHE-RSA-AES128-SHA:ECDHE-RSA-AES256-SHA:\
                AES128-GCM-SHA256:AES256-GCM-SHA384:AES128-SHA:AES256-SHA"
                    .to_string(),
            // The session speaks HTTP/1.1 only.
            alpn_protos: vec!["http/1.1".to_string()],
            curves: vec!["X25519".to_string(), "P-256".to_string(), "P-384".to_string()],
            sigalgs: "ECDSA+SHA256:RSA-PSS+SHA256:RSA+SHA256:\
                ECDSA+SHA384:RSA-PSS+SHA384:RSA+SHA384:\
                RSA-PSS+SHA512:RSA+SHA512"
                .to_string(),
            verify_peer: true,
            verify_host: true,
        }
    }
}

impl TlsConfig {
    pub fn from_options(options: &TransportOptions) -> Self {
        Self {
            verify_peer: options.ssl_verify_peer,
            verify_host: options.ssl_verify_host,
            ..Self::default()
        }
    }

    /// Apply this configuration to an SSL connector builder.
    pub fn apply_to_builder(&self, builder: &mut SslConnectorBuilder) -> Result<(), NetError> {
        if let Some(min) = self.min_version {
            builder.set_min_proto_version(Some(min)).map_err(|_| NetError::SslProtocolError)?;
        }
        if let Some(max) = self.max_version {
            builder.set_max_proto_version(Some(max)).map_err(|_| NetError::SslProtocolError)?;
        }

        builder.set_cipher_list(&self.cipher_list).map_err(|_| NetError::SslProtocolError)?;

        if !self.alpn_protos.is_empty() {
            builder
                .set_alpn_protos(&self.alpn_wire()?)
                .map_err(|_| NetError::SslProtocolError)?;
        }

        if !self.sigalgs.is_empty() {
            builder.set_sigalgs_list(&self.sigalgs).map_err(|_| NetError::SslProtocolError)?;
        }

        if !self.curves.is_empty() {
            let curves_str = self.curves.join(":");
            builder.set_curves_list(&curves_str).map_err(|_| NetError::SslProtocolError)?;
        }

        if self.verify_peer {
            builder.set_verify(SslVerifyMode::PEER);
        } else {
            builder.set_verify(SslVerifyMode::NONE);
        }

        Ok(())
    }

    /// ALPN protocol list in wire format (length-prefixed).
    pub fn alpn_wire(&self) -> Result<Vec<u8>, NetError> {
        let mut alpn_wire = Vec::new();
        for proto in &self.alpn_protos {
            if proto.is_empty() || proto.len() > 255 {
                return Err(NetError::SslProtocolError);
            }
            alpn_wire.push(proto.len() as u8);
            alpn_wire.extend_from_slice(proto.as_bytes());
        }
        Ok(alpn_wire)
    }

    /// Build a connector for this configuration.
    pub fn connector(&self) -> Result<SslConnector, NetError> {
        let mut builder =
            SslConnector::builder(SslMethod::tls()).map_err(|_| NetError::SslProtocolError)?;
        self.apply_to_builder(&mut builder)?;
        Ok(builder.build())
    }

    /// Run the client handshake for `host` over `stream`.
    pub fn connect<S>(&self, host: &str, stream: S) -> Result<SslStream<S>, NetError>
    where
        S: Read + Write + std::fmt::Debug,
    {
        let mut config = self
            .connector()?
            .configure()
            .map_err(|_| NetError::SslProtocolError)?;
        config.set_verify_hostname(self.verify_host);
        config.set_use_server_name_indication(Self::should_set_sni(host));

        tracing::debug!(host, verify_peer = self.verify_peer, verify_host = self.verify_host, "tls handshake");
        config
            .connect(host, stream)
            .map_err(|e| NetError::SslHandshakeFailed {
                host: host.to_string(),
                message: e.to_string(),
            })
    }

    /// Check if SNI (Server Name Indication) should be set for this host.
    /// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
    pub fn should_set_sni(host: &str) -> bool {
        host.trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<std::net::IpAddr>()
            .is_err()
    }
}
