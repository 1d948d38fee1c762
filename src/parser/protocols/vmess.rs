//! VMess protocol parser
//!
//! This module provides parsing for VMess (vmess://) links.
//! VMess links are Base64 encoded JSON containing connection details.

use serde::{Deserialize, Deserializer};
use tracing::trace;

use crate::config::{Protocol, ProxyRecord, Transport, VmessExtra, WsOptions};
use crate::error::{Error, Result};
use crate::parser::base64::decode_base64;

use super::ProtocolParser;

const SCHEME: &str = "vmess";
const PREFIX: &str = "vmess://";
const DEFAULT_CIPHER: &str = "auto";

// ============================================================================
// VMess Parser
// ============================================================================

/// Parser for VMess (vmess://) links
///
/// vmess://BASE64({ "v": "2", "ps": "name", "add": "host", "port": 443, ... })
pub struct VMessParser;

impl ProtocolParser for VMessParser {
    fn protocol(&self) -> Protocol {
        Protocol::Vmess
    }

    fn parse(&self, link: &str) -> Result<ProxyRecord> {
        decode_vmess(link)
    }
}

/// VMess link JSON structure
///
/// Generators disagree on whether numbers are quoted, so every field accepts
/// both JSON strings and numbers.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct VmessJson {
    /// Remark/name
    #[serde(deserialize_with = "deserialize_loose_string")]
    ps: Option<String>,
    /// Server address
    #[serde(deserialize_with = "deserialize_loose_string")]
    add: Option<String>,
    #[serde(deserialize_with = "deserialize_port")]
    port: Option<u16>,
    /// UUID
    #[serde(deserialize_with = "deserialize_loose_string")]
    id: Option<String>,
    /// Alter ID
    #[serde(deserialize_with = "deserialize_alter_id")]
    aid: Option<u32>,
    /// Security/encryption method
    #[serde(deserialize_with = "deserialize_loose_string")]
    scy: Option<String>,
    /// Network type (tcp, ws, etc.)
    #[serde(deserialize_with = "deserialize_loose_string")]
    net: Option<String>,
    /// "tls" when TLS is on
    #[serde(deserialize_with = "deserialize_loose_string")]
    tls: Option<String>,
    /// WebSocket path
    #[serde(deserialize_with = "deserialize_loose_string")]
    path: Option<String>,
    /// WebSocket host header
    #[serde(deserialize_with = "deserialize_loose_string")]
    host: Option<String>,
}

/// Decodes a VMess share link into a proxy record
///
/// The `vmess://` prefix is optional. A payload without a server address or
/// port is rejected.
pub fn decode_vmess(link: &str) -> Result<ProxyRecord> {
    trace!("Parsing VMess link");
    let encoded = link.trim().strip_prefix(PREFIX).unwrap_or(link.trim());

    let bytes = decode_base64(encoded)
        .map_err(|e| Error::malformed(SCHEME, format!("invalid Base64 payload: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| Error::malformed(SCHEME, format!("payload is not UTF-8: {}", e)))?;
    trace!("Decoded VMess JSON: {}", text);

    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| Error::malformed(SCHEME, format!("invalid JSON payload: {}", e)))?;
    if !value.is_object() {
        return Err(Error::malformed(SCHEME, "JSON payload is not an object"));
    }
    let json: VmessJson = serde_json::from_value(value)
        .map_err(|e| Error::malformed(SCHEME, format!("invalid JSON payload: {}", e)))?;

    trace!(
        "VMess config: server={:?}:{:?}, net={:?}, tls={:?}",
        json.add, json.port, json.net, json.tls
    );

    let transport = match non_empty(json.net) {
        Some(net) => {
            let Ok(transport) = net.parse::<Transport>();
            transport
        }
        None => Protocol::Vmess.default_transport(),
    };

    let ws_options = (transport == Transport::Ws).then(|| WsOptions {
        path: non_empty(json.path),
        header_host: non_empty(json.host),
        ..Default::default()
    });

    let record = ProxyRecord {
        name: non_empty(json.ps).unwrap_or_else(|| Protocol::Vmess.default_name().to_string()),
        protocol: Protocol::Vmess,
        server: json.add.unwrap_or_default(),
        port: json.port.unwrap_or(0),
        identifier: json.id.unwrap_or_default(),
        transport,
        tls_enabled: json.tls.as_deref() == Some("tls"),
        tls_options: None,
        ws_options,
        vmess_extra: Some(VmessExtra {
            alter_id: json.aid.unwrap_or(0),
            cipher: non_empty(json.scy).unwrap_or_else(|| DEFAULT_CIPHER.to_string()),
        }),
        udp_enabled: true,
    };
    record.validate()?;
    Ok(record)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// ============================================================================
// Deserialization Helpers
// ============================================================================

/// JSON scalar accepted where a string or number is expected
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseScalar {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Flag(bool),
    Text(String),
}

impl LooseScalar {
    fn into_text(self) -> String {
        match self {
            LooseScalar::Unsigned(n) => n.to_string(),
            LooseScalar::Signed(n) => n.to_string(),
            LooseScalar::Float(n) => n.to_string(),
            LooseScalar::Flag(b) => b.to_string(),
            LooseScalar::Text(s) => s,
        }
    }
}

fn deserialize_loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LooseScalar>::deserialize(deserializer)?.map(LooseScalar::into_text))
}

/// Port as number or numeric string
fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LooseScalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LooseScalar::Unsigned(n)) => u16::try_from(n)
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("port {} out of range", n))),
        Some(LooseScalar::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{}'", s))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid port '{}'",
            other.into_text()
        ))),
    }
}

/// Alter ID as number or numeric string; an empty string means unset
fn deserialize_alter_id<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LooseScalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LooseScalar::Unsigned(n)) => u32::try_from(n)
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("alter id {} out of range", n))),
        Some(LooseScalar::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(LooseScalar::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid alter id '{}'", s))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid alter id '{}'",
            other.into_text()
        ))),
    }
}
