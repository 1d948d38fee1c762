//! VLESS protocol parser
//!
//! This module provides parsing for VLESS (vless://) links.
//! Format: vless://identifier@host[:port][?params][#name]

use std::borrow::Cow;

use tracing::trace;
use url::form_urlencoded;

use crate::config::proxy::{DEFAULT_FINGERPRINT, EARLY_DATA_HEADER_NAME};
use crate::config::{Protocol, ProxyRecord, TlsOptions, Transport, WsOptions};
use crate::error::{Error, Result};

use super::ProtocolParser;

const SCHEME: &str = "vless";
const PREFIX: &str = "vless://";
const DEFAULT_PORT: u16 = 443;

/// Marker separating the WebSocket path from its early data size
const EARLY_DATA_MARKER: &str = "?ed=";

// ============================================================================
// VLESS Parser
// ============================================================================

/// Parser for VLESS (vless://) links
pub struct VLessParser;

impl ProtocolParser for VLessParser {
    fn protocol(&self) -> Protocol {
        Protocol::Vless
    }

    fn parse(&self, link: &str) -> Result<ProxyRecord> {
        decode_vless(link)
    }
}

/// Query parameters a VLESS link may carry
///
/// Unknown keys are ignored. For repeated keys the first non-empty value
/// wins.
#[derive(Debug, Default, PartialEq, Eq)]
struct VlessQuery {
    security: Option<String>,
    transport_type: Option<String>,
    path: Option<String>,
    host: Option<String>,
    sni: Option<String>,
    fp: Option<String>,
    alpn: Option<String>,
}

impl VlessQuery {
    fn parse(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "security" => &mut params.security,
                "type" => &mut params.transport_type,
                "path" => &mut params.path,
                "host" => &mut params.host,
                "sni" => &mut params.sni,
                "fp" => &mut params.fp,
                "alpn" => &mut params.alpn,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// Decodes a VLESS share link into a proxy record
///
/// The `vless://` prefix is optional.
pub fn decode_vless(link: &str) -> Result<ProxyRecord> {
    trace!("Parsing VLESS link");
    let body = link.strip_prefix(PREFIX).unwrap_or(link);

    let (identifier, rest) = body
        .split_once('@')
        .ok_or_else(|| Error::malformed(SCHEME, "missing '@' after identifier"))?;

    let (host_port, query, fragment) = split_location(rest);
    let (server, port) = parse_host_port(host_port)?;

    let name = fragment
        .filter(|f| !f.is_empty())
        .map(decode_component)
        .unwrap_or_else(|| Protocol::Vless.default_name().to_string());

    let params = VlessQuery::parse(query.unwrap_or_default());
    trace!("VLESS query: {:?}", params);

    let tls_enabled = params.security.as_deref() == Some("tls");
    let transport = match params.transport_type.as_deref() {
        Some(t) => {
            let Ok(transport) = t.parse::<Transport>();
            transport
        }
        None => Protocol::Vless.default_transport(),
    };

    let ws_options = if transport == Transport::Ws {
        Some(build_ws_options(&params)?)
    } else {
        None
    };
    let tls_options = tls_enabled.then(|| build_tls_options(&params));

    let record = ProxyRecord {
        name,
        protocol: Protocol::Vless,
        server,
        port,
        identifier: identifier.to_string(),
        transport,
        tls_enabled,
        tls_options,
        ws_options,
        vmess_extra: None,
        udp_enabled: true,
    };
    record.validate()?;
    Ok(record)
}

/// Splits `host_port[?query][#fragment]`
///
/// When a query is present the fragment can only follow it.
fn split_location(rest: &str) -> (&str, Option<&str>, Option<&str>) {
    match rest.split_once('?') {
        Some((host_port, tail)) => match tail.split_once('#') {
            Some((query, fragment)) => (host_port, Some(query), Some(fragment)),
            None => (host_port, Some(tail), None),
        },
        None => match rest.split_once('#') {
            Some((host_port, fragment)) => (host_port, None, Some(fragment)),
            None => (rest, None, None),
        },
    }
}

/// Parses host[:port], handling IPv6 addresses in brackets
fn parse_host_port(host_port: &str) -> Result<(String, u16)> {
    // Links often carry an empty path: host:443/?type=ws
    let host_port = host_port.trim_end_matches('/');

    if let Some(bracketed) = host_port.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| Error::malformed(SCHEME, "missing closing bracket in IPv6 address"))?;
        let port = match after {
            "" => DEFAULT_PORT,
            _ => {
                let port = after.strip_prefix(':').ok_or_else(|| {
                    Error::malformed(SCHEME, format!("unexpected '{}' after IPv6 address", after))
                })?;
                parse_port(port)?
            }
        };
        return Ok((host.to_string(), port));
    }

    match host_port.rsplit_once(':') {
        Some((host, port)) => Ok((host.to_string(), parse_port(port)?)),
        None => Ok((host_port.to_string(), DEFAULT_PORT)),
    }
}

fn parse_port(port: &str) -> Result<u16> {
    match port.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(Error::malformed(
            SCHEME,
            format!("invalid port '{}'", port),
        )),
        Ok(port) => Ok(port),
    }
}

fn build_ws_options(params: &VlessQuery) -> Result<WsOptions> {
    let mut ws = WsOptions::default();

    if let Some(raw_path) = &params.path {
        let path = match raw_path.split_once(EARLY_DATA_MARKER) {
            Some((path, early_data)) => {
                let max = early_data.trim().parse::<u32>().map_err(|_| {
                    Error::malformed(
                        SCHEME,
                        format!("invalid early data size '{}' in path", early_data),
                    )
                })?;
                ws.early_data_max = Some(max);
                ws.early_data_header_name = Some(EARLY_DATA_HEADER_NAME.to_string());
                path
            }
            None => raw_path.as_str(),
        };
        ws.path = Some(decode_component(path));
    }

    ws.header_host = params.host.clone();
    Ok(ws)
}

fn build_tls_options(params: &VlessQuery) -> TlsOptions {
    TlsOptions {
        server_name: params.sni.clone().or_else(|| params.host.clone()),
        fingerprint: params
            .fp
            .clone()
            .unwrap_or_else(|| DEFAULT_FINGERPRINT.to_string()),
        alpn: params
            .alpn
            .as_deref()
            .map(|alpn| {
                alpn.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        skip_cert_verify: false,
    }
}

/// Percent-decodes a link component, keeping it verbatim if not valid UTF-8
fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vless_full_link() {
        let link = "vless://1234@example.com:8443?security=tls&type=ws&path=%2Fws&host=cdn.example.com&sni=real.example.com#MyNode";
        let record = decode_vless(link).unwrap();

        assert_eq!(record.name, "MyNode");
        assert_eq!(record.protocol, Protocol::Vless);
        assert_eq!(record.server, "example.com");
        assert_eq!(record.port, 8443);
        assert_eq!(record.identifier, "1234");
        assert_eq!(record.transport, Transport::Ws);
        assert!(record.tls_enabled);
        let tls = record.tls_options.unwrap();
        assert_eq!(tls.server_name.as_deref(), Some("real.example.com"));
        assert_eq!(tls.fingerprint, "random");
        assert!(!tls.skip_cert_verify);
        let ws = record.ws_options.unwrap();
        assert_eq!(ws.path.as_deref(), Some("/ws"));
        assert_eq!(ws.header_host.as_deref(), Some("cdn.example.com"));
        assert!(record.udp_enabled);
        assert!(record.vmess_extra.is_none());
    }

    #[test]
    fn test_vless_minimal_link() {
        let record = decode_vless("vless://abcd@1.2.3.4").unwrap();
        assert_eq!(record.name, "VLESS Node");
        assert_eq!(record.server, "1.2.3.4");
        assert_eq!(record.port, 443);
        assert_eq!(record.transport, Transport::Ws);
        assert!(!record.tls_enabled);
        assert!(record.tls_options.is_none());
        assert_eq!(record.ws_options, Some(WsOptions::default()));
    }

    #[test]
    fn test_vless_without_prefix() {
        let record = decode_vless("abcd@host.example:2053#bare").unwrap();
        assert_eq!(record.server, "host.example");
        assert_eq!(record.port, 2053);
        assert_eq!(record.name, "bare");
    }

    #[test]
    fn test_vless_fragment_without_query() {
        let record = decode_vless("vless://id@example.com:443#%E9%A6%99%E6%B8%AF%20HK").unwrap();
        assert_eq!(record.name, "香港 HK");
        assert_eq!(record.server, "example.com");
        assert_eq!(record.port, 443);
    }

    #[test]
    fn test_vless_query_without_fragment() {
        let record = decode_vless("vless://id@example.com:443?security=tls").unwrap();
        assert_eq!(record.name, "VLESS Node");
        assert!(record.tls_enabled);
    }

    #[test]
    fn test_vless_empty_fragment_uses_default_name() {
        let record = decode_vless("vless://id@example.com:443#").unwrap();
        assert_eq!(record.name, "VLESS Node");
    }

    #[test]
    fn test_vless_missing_at_sign() {
        let err = decode_vless("vless://example.com:443").unwrap_err();
        assert!(matches!(err, Error::MalformedLink { scheme: "vless", .. }));
    }

    #[test]
    fn test_vless_invalid_port() {
        assert!(decode_vless("vless://id@example.com:abc").is_err());
        assert!(decode_vless("vless://id@example.com:70000").is_err());
        assert!(decode_vless("vless://id@example.com:0").is_err());
        assert!(decode_vless("vless://id@example.com:").is_err());
    }

    #[test]
    fn test_vless_trailing_slash_before_query() {
        let record = decode_vless("vless://id@example.com:2083/?type=ws#slash").unwrap();
        assert_eq!(record.port, 2083);
        assert_eq!(record.server, "example.com");
    }

    #[test]
    fn test_vless_ipv6_host() {
        let record = decode_vless("vless://uuid@[2001:db8::1]:8443#v6").unwrap();
        assert_eq!(record.server, "2001:db8::1");
        assert_eq!(record.port, 8443);

        let record = decode_vless("vless://uuid@[::1]").unwrap();
        assert_eq!(record.server, "::1");
        assert_eq!(record.port, 443);

        assert!(decode_vless("vless://uuid@[::1:443").is_err());
    }

    #[test]
    fn test_vless_early_data_in_path() {
        let link = "vless://id@example.com:443?type=ws&path=%2Fws%3Fed%3D2048";
        let ws = decode_vless(link).unwrap().ws_options.unwrap();
        assert_eq!(ws.path.as_deref(), Some("/ws"));
        assert_eq!(ws.early_data_max, Some(2048));
        assert_eq!(
            ws.early_data_header_name.as_deref(),
            Some("Sec-WebSocket-Protocol")
        );
    }

    #[test]
    fn test_vless_invalid_early_data() {
        let link = "vless://id@example.com:443?type=ws&path=%2Fws%3Fed%3Dlots";
        let err = decode_vless(link).unwrap_err();
        assert!(err.to_string().contains("early data"));
    }

    #[test]
    fn test_vless_non_ws_transport() {
        let link = "vless://id@example.com:443?type=grpc&path=%2Fignored&security=tls";
        let record = decode_vless(link).unwrap();
        assert_eq!(record.transport, Transport::Grpc);
        assert!(record.ws_options.is_none());

        let record = decode_vless("vless://id@example.com:443?type=tcp").unwrap();
        assert_eq!(record.transport, Transport::Tcp);
        assert!(record.ws_options.is_none());
    }

    #[test]
    fn test_vless_unknown_transport_kept() {
        let record = decode_vless("vless://id@example.com:443?type=xhttp").unwrap();
        assert_eq!(record.transport, Transport::Other("xhttp".to_string()));
        assert!(record.ws_options.is_none());
    }

    #[test]
    fn test_vless_missing_server() {
        for link in ["vless://id@:443#n", "vless://id@", "vless://id@[]:443"] {
            let err = decode_vless(link).unwrap_err();
            assert!(matches!(err, Error::MalformedLink { scheme: "vless", .. }));
            assert!(err.to_string().contains("server"));
        }
    }

    #[test]
    fn test_vless_sni_falls_back_to_host() {
        let link = "vless://id@example.com:443?security=tls&host=front.example.com";
        let tls = decode_vless(link).unwrap().tls_options.unwrap();
        assert_eq!(tls.server_name.as_deref(), Some("front.example.com"));
    }

    #[test]
    fn test_vless_fingerprint_and_alpn() {
        let link = "vless://id@example.com:443?security=tls&fp=chrome&alpn=h2%2Chttp%2F1.1";
        let tls = decode_vless(link).unwrap().tls_options.unwrap();
        assert_eq!(tls.fingerprint, "chrome");
        assert_eq!(tls.alpn, vec!["h2", "http/1.1"]);
        assert!(tls.server_name.is_none());
    }

    #[test]
    fn test_vless_tls_options_ignored_without_tls() {
        let link = "vless://id@example.com:443?security=none&sni=x.example.com&fp=chrome";
        let record = decode_vless(link).unwrap();
        assert!(!record.tls_enabled);
        assert!(record.tls_options.is_none());
    }

    #[test]
    fn test_vless_first_value_wins() {
        let link = "vless://id@example.com:443?security=tls&sni=first.example&sni=second.example";
        let tls = decode_vless(link).unwrap().tls_options.unwrap();
        assert_eq!(tls.server_name.as_deref(), Some("first.example"));
    }

    #[test]
    fn test_vless_blank_type_defaults_to_ws() {
        let record = decode_vless("vless://id@example.com:443?type=&path=%2Fp").unwrap();
        assert_eq!(record.transport, Transport::Ws);
        assert_eq!(record.ws_options.unwrap().path.as_deref(), Some("/p"));
    }

    #[test]
    fn test_query_parse_ignores_unknown_keys() {
        let params = VlessQuery::parse("flow=xtls-rprx-vision&encryption=none&sni=a");
        assert_eq!(
            params,
            VlessQuery {
                sni: Some("a".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_split_location() {
        assert_eq!(split_location("h:1"), ("h:1", None, None));
        assert_eq!(split_location("h:1#n"), ("h:1", None, Some("n")));
        assert_eq!(split_location("h:1?a=b"), ("h:1", Some("a=b"), None));
        assert_eq!(split_location("h:1?a=b#n"), ("h:1", Some("a=b"), Some("n")));
    }
}
