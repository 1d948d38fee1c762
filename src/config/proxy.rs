//! Normalized proxy record
//!
//! A [`ProxyRecord`] is what both link decoders produce. It carries no
//! markup-format details of its own; the Clash rendering lives in
//! [`ClashProxy`], which borrows from the record and fixes the key order
//! of the emitted mapping.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::Error;

/// Header name used for WebSocket early data
pub const EARLY_DATA_HEADER_NAME: &str = "Sec-WebSocket-Protocol";

/// Fingerprint used when a TLS link does not name one
pub const DEFAULT_FINGERPRINT: &str = "random";

// ============================================================================
// Protocol and Transport
// ============================================================================

/// Proxy protocol of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Vmess,
    Vless,
}

impl Protocol {
    /// Link scheme, also the Clash `type` value
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Vmess => "vmess",
            Protocol::Vless => "vless",
        }
    }

    /// Name given to nodes whose link carries none
    pub fn default_name(&self) -> &'static str {
        match self {
            Protocol::Vmess => "Vmess Node",
            Protocol::Vless => "VLESS Node",
        }
    }

    /// Transport assumed when the link does not specify one
    pub fn default_transport(&self) -> Transport {
        match self {
            Protocol::Vmess => Transport::Tcp,
            Protocol::Vless => Transport::Ws,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Vmess => write!(f, "VMess"),
            Protocol::Vless => write!(f, "VLESS"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vmess" => Ok(Protocol::Vmess),
            "vless" => Ok(Protocol::Vless),
            other => Err(format!("unknown protocol: {}", other)),
        }
    }
}

/// Network transport of a proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Ws,
    Grpc,
    H2,
    Http,
    /// Any transport name not known above, kept verbatim
    Other(String),
}

impl Transport {
    pub fn as_str(&self) -> &str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Ws => "ws",
            Transport::Grpc => "grpc",
            Transport::H2 => "h2",
            Transport::Http => "http",
            Transport::Other(name) => name,
        }
    }
}

impl FromStr for Transport {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tcp" => Transport::Tcp,
            "ws" => Transport::Ws,
            "grpc" => Transport::Grpc,
            "h2" => Transport::H2,
            "http" => Transport::Http,
            other => Transport::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Transport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// Option Sub-records
// ============================================================================

/// TLS client options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// SNI sent in the ClientHello
    pub server_name: Option<String>,
    /// uTLS client fingerprint
    pub fingerprint: String,
    /// ALPN protocols in advertisement order
    pub alpn: Vec<String>,
    pub skip_cert_verify: bool,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            server_name: None,
            fingerprint: DEFAULT_FINGERPRINT.to_string(),
            alpn: Vec::new(),
            skip_cert_verify: false,
        }
    }
}

/// WebSocket transport options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WsOptions {
    pub path: Option<String>,
    /// Value of the `host` request header
    pub header_host: Option<String>,
    pub early_data_max: Option<u32>,
    pub early_data_header_name: Option<String>,
}

impl WsOptions {
    pub fn is_empty(&self) -> bool {
        self.path.is_none()
            && self.header_host.is_none()
            && self.early_data_max.is_none()
            && self.early_data_header_name.is_none()
    }
}

/// Fields only VMess nodes carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmessExtra {
    pub alter_id: u32,
    pub cipher: String,
}

impl Default for VmessExtra {
    fn default() -> Self {
        Self {
            alter_id: 0,
            cipher: "auto".to_string(),
        }
    }
}

// ============================================================================
// Proxy Record
// ============================================================================

/// One decoded proxy server entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRecord {
    pub name: String,
    pub protocol: Protocol,
    pub server: String,
    pub port: u16,
    /// Credential, usually a UUID. Not validated.
    pub identifier: String,
    pub transport: Transport,
    pub tls_enabled: bool,
    /// Only set when `tls_enabled`
    pub tls_options: Option<TlsOptions>,
    /// Only set when `transport` is [`Transport::Ws`]
    pub ws_options: Option<WsOptions>,
    /// Only set for VMess
    pub vmess_extra: Option<VmessExtra>,
    pub udp_enabled: bool,
}

impl ProxyRecord {
    /// Rejects records the downstream client cannot use
    pub fn validate(&self) -> crate::error::Result<()> {
        let scheme = self.protocol.scheme();
        if self.server.trim().is_empty() {
            return Err(Error::malformed(scheme, "missing server address"));
        }
        if self.port == 0 {
            return Err(Error::malformed(scheme, "missing or zero port"));
        }
        Ok(())
    }

    /// Render this record as a Clash proxy mapping
    pub fn to_clash(&self) -> ClashProxy<'_> {
        let tls = self.tls_options.as_ref().filter(|_| self.tls_enabled);
        let ws = self
            .ws_options
            .as_ref()
            .filter(|_| self.transport == Transport::Ws);

        ClashProxy {
            name: &self.name,
            proxy_type: self.protocol.scheme(),
            server: &self.server,
            port: self.port,
            uuid: &self.identifier,
            alter_id: self.vmess_extra.as_ref().map(|v| v.alter_id),
            cipher: self.vmess_extra.as_ref().map(|v| v.cipher.as_str()),
            tls: self.tls_enabled,
            network: &self.transport,
            udp: self.udp_enabled,
            ws_opts: ws.map(ClashWsOpts::from),
            servername: tls.and_then(|t| t.server_name.as_deref()),
            client_fingerprint: tls.map(|t| t.fingerprint.as_str()),
            alpn: tls.map(|t| t.alpn.as_slice()).filter(|a| !a.is_empty()),
            skip_cert_verify: tls.map(|t| t.skip_cert_verify),
        }
    }

    /// Render this record as a YAML value
    pub fn to_yaml_value(&self) -> Result<serde_yaml::Value, serde_yaml::Error> {
        serde_yaml::to_value(self.to_clash())
    }
}

impl Serialize for ProxyRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_clash().serialize(serializer)
    }
}

// ============================================================================
// Clash Rendering
// ============================================================================

/// Clash proxy entry borrowed from a [`ProxyRecord`]
///
/// Field order is the emitted key order.
#[derive(Serialize, Debug)]
pub struct ClashProxy<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub proxy_type: &'static str,
    pub server: &'a str,
    pub port: u16,
    pub uuid: &'a str,
    #[serde(rename = "alterId", skip_serializing_if = "Option::is_none")]
    pub alter_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher: Option<&'a str>,
    pub tls: bool,
    pub network: &'a Transport,
    pub udp: bool,
    #[serde(rename = "ws-opts", skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<ClashWsOpts<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servername: Option<&'a str>,
    #[serde(rename = "client-fingerprint", skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpn: Option<&'a [String]>,
    #[serde(rename = "skip-cert-verify", skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
}

/// Clash `ws-opts` block
#[derive(Serialize, Debug)]
pub struct ClashWsOpts<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<ClashWsHeaders<'a>>,
    #[serde(rename = "max-early-data", skip_serializing_if = "Option::is_none")]
    pub max_early_data: Option<u32>,
    #[serde(
        rename = "early-data-header-name",
        skip_serializing_if = "Option::is_none"
    )]
    pub early_data_header_name: Option<&'a str>,
}

#[derive(Serialize, Debug)]
pub struct ClashWsHeaders<'a> {
    pub host: &'a str,
}

impl<'a> From<&'a WsOptions> for ClashWsOpts<'a> {
    fn from(ws: &'a WsOptions) -> Self {
        Self {
            path: ws.path.as_deref(),
            headers: ws
                .header_host
                .as_deref()
                .map(|host| ClashWsHeaders { host }),
            max_early_data: ws.early_data_max,
            early_data_header_name: ws.early_data_header_name.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vless_record() -> ProxyRecord {
        ProxyRecord {
            name: "MyNode".to_string(),
            protocol: Protocol::Vless,
            server: "example.com".to_string(),
            port: 8443,
            identifier: "1234".to_string(),
            transport: Transport::Ws,
            tls_enabled: true,
            tls_options: Some(TlsOptions {
                server_name: Some("real.example.com".to_string()),
                alpn: vec!["h2".to_string(), "http/1.1".to_string()],
                ..Default::default()
            }),
            ws_options: Some(WsOptions {
                path: Some("/ws".to_string()),
                header_host: Some("cdn.example.com".to_string()),
                early_data_max: Some(2048),
                early_data_header_name: Some(EARLY_DATA_HEADER_NAME.to_string()),
            }),
            vmess_extra: None,
            udp_enabled: true,
        }
    }

    fn vmess_record() -> ProxyRecord {
        ProxyRecord {
            name: "Node1".to_string(),
            protocol: Protocol::Vmess,
            server: "1.2.3.4".to_string(),
            port: 443,
            identifier: "uuid-1".to_string(),
            transport: Transport::Tcp,
            tls_enabled: true,
            tls_options: None,
            ws_options: None,
            vmess_extra: Some(VmessExtra::default()),
            udp_enabled: true,
        }
    }

    #[test]
    fn test_vless_render_key_order() {
        let yaml = serde_yaml::to_string(&vless_record()).unwrap();
        let keys: Vec<&str> = yaml
            .lines()
            .filter(|l| !l.starts_with(' ') && !l.starts_with('-'))
            .filter_map(|l| l.split(':').next())
            .collect();
        assert_eq!(
            keys,
            vec![
                "name",
                "type",
                "server",
                "port",
                "uuid",
                "tls",
                "network",
                "udp",
                "ws-opts",
                "servername",
                "client-fingerprint",
                "alpn",
                "skip-cert-verify",
            ]
        );
    }

    #[test]
    fn test_vmess_render_has_extra_fields() {
        let value = vmess_record().to_yaml_value().unwrap();
        assert_eq!(value["type"].as_str(), Some("vmess"));
        assert_eq!(value["alterId"].as_u64(), Some(0));
        assert_eq!(value["cipher"].as_str(), Some("auto"));
        assert_eq!(value["tls"].as_bool(), Some(true));
        assert_eq!(value["network"].as_str(), Some("tcp"));
        assert!(value.get("servername").is_none());
        assert!(value.get("client-fingerprint").is_none());
        assert!(value.get("ws-opts").is_none());
    }

    #[test]
    fn test_ws_opts_rendering() {
        let value = vless_record().to_yaml_value().unwrap();
        let ws = &value["ws-opts"];
        assert_eq!(ws["path"].as_str(), Some("/ws"));
        assert_eq!(ws["headers"]["host"].as_str(), Some("cdn.example.com"));
        assert_eq!(ws["max-early-data"].as_u64(), Some(2048));
        assert_eq!(
            ws["early-data-header-name"].as_str(),
            Some("Sec-WebSocket-Protocol")
        );
    }

    #[test]
    fn test_empty_ws_opts_rendered_as_empty_mapping() {
        let mut record = vless_record();
        record.ws_options = Some(WsOptions::default());
        let value = record.to_yaml_value().unwrap();
        let ws = value["ws-opts"].as_mapping().unwrap();
        assert!(ws.is_empty());
    }

    #[test]
    fn test_tls_fields_omitted_without_tls() {
        let mut record = vless_record();
        record.tls_enabled = false;
        let value = record.to_yaml_value().unwrap();
        assert_eq!(value["tls"].as_bool(), Some(false));
        assert!(value.get("servername").is_none());
        assert!(value.get("skip-cert-verify").is_none());
    }

    #[test]
    fn test_ws_opts_omitted_for_other_transport() {
        let mut record = vless_record();
        record.transport = Transport::Grpc;
        let value = record.to_yaml_value().unwrap();
        assert!(value.get("ws-opts").is_none());
        assert_eq!(value["network"].as_str(), Some("grpc"));
    }

    #[test]
    fn test_empty_alpn_omitted() {
        let mut record = vless_record();
        if let Some(tls) = record.tls_options.as_mut() {
            tls.alpn.clear();
        }
        let value = record.to_yaml_value().unwrap();
        assert!(value.get("alpn").is_none());
        assert_eq!(value["client-fingerprint"].as_str(), Some("random"));
    }

    #[test]
    fn test_validate() {
        assert!(vless_record().validate().is_ok());

        let mut record = vless_record();
        record.server = "  ".to_string();
        let err = record.validate().unwrap_err();
        assert!(matches!(err, Error::MalformedLink { scheme: "vless", .. }));
        assert!(err.to_string().contains("server"));

        let mut record = vless_record();
        record.port = 0;
        assert!(record.validate().unwrap_err().to_string().contains("port"));
    }

    #[test]
    fn test_transport_from_str() {
        assert_eq!("ws".parse::<Transport>().unwrap(), Transport::Ws);
        assert_eq!("tcp".parse::<Transport>().unwrap(), Transport::Tcp);
        assert_eq!(
            "xhttp".parse::<Transport>().unwrap(),
            Transport::Other("xhttp".to_string())
        );
        assert_eq!(Transport::Other("quic".to_string()).to_string(), "quic");
    }

    #[test]
    fn test_protocol_from_str() {
        assert_eq!("VMess".parse::<Protocol>().unwrap(), Protocol::Vmess);
        assert_eq!("vless".parse::<Protocol>().unwrap(), Protocol::Vless);
        assert!("trojan".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_protocol_defaults() {
        assert_eq!(Protocol::Vless.default_name(), "VLESS Node");
        assert_eq!(Protocol::Vmess.default_name(), "Vmess Node");
        assert_eq!(Protocol::Vless.default_transport(), Transport::Ws);
        assert_eq!(Protocol::Vmess.default_transport(), Transport::Tcp);
    }
}
