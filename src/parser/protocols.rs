//! Protocol parsers module
//!
//! Each supported share link scheme has a parser implementing
//! [`ProtocolParser`]. The [`ProtocolRegistry`] dispatches raw links to the
//! parser registered for their scheme and rejects decoded records that are
//! structurally unusable.

mod vless;
mod vmess;

pub use vless::{VLessParser, decode_vless};
pub use vmess::{VMessParser, decode_vmess};

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::{Protocol, ProxyRecord};
use crate::error::{Error, Result};

use super::detection::normalize_link_list;

// ============================================================================
// Protocol Parser Trait
// ============================================================================

/// Trait for parsing individual share links
pub trait ProtocolParser: Send + Sync {
    /// Returns the protocol this parser handles
    fn protocol(&self) -> Protocol;

    /// Parses a link into a proxy record
    fn parse(&self, link: &str) -> Result<ProxyRecord>;

    /// Returns the link scheme this parser handles (e.g. "vmess")
    fn scheme(&self) -> &'static str {
        self.protocol().scheme()
    }
}

// ============================================================================
// Protocol Registry
// ============================================================================

/// Registry for protocol parsers with dynamic dispatch
#[derive(Default, Clone)]
pub struct ProtocolRegistry {
    parsers: HashMap<&'static str, Arc<dyn ProtocolParser>>,
}

impl ProtocolRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Creates a registry with all built-in parsers registered
    pub fn with_builtin_parsers() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(VMessParser));
        registry.register(Arc::new(VLessParser));
        registry
    }

    /// Creates a registry that only accepts links of one protocol
    pub fn for_protocol(protocol: Protocol) -> Self {
        let mut registry = Self::new();
        match protocol {
            Protocol::Vmess => registry.register(Arc::new(VMessParser)),
            Protocol::Vless => registry.register(Arc::new(VLessParser)),
        }
        registry
    }

    /// Registers a protocol parser
    pub fn register(&mut self, parser: Arc<dyn ProtocolParser>) {
        self.parsers.insert(parser.scheme(), parser);
    }

    /// Gets a parser for the given scheme
    pub fn get(&self, scheme: &str) -> Option<&Arc<dyn ProtocolParser>> {
        self.parsers.get(scheme)
    }

    /// Parses a link using the parser registered for its scheme
    pub fn parse_link(&self, link: &str) -> Result<ProxyRecord> {
        let link = link.trim();
        let scheme = extract_scheme(link)?;
        debug!("Parsing link with scheme '{}'", scheme);

        let parser = self
            .parsers
            .get(scheme)
            .ok_or_else(|| Error::UnsupportedScheme(link_preview(link)))?;

        let result = parser
            .parse(link)
            .and_then(|record| record.validate().map(|()| record));
        match &result {
            Ok(record) => {
                debug!(
                    "Successfully parsed {} link -> node '{}'",
                    scheme, record.name
                );
            }
            Err(e) => {
                debug!("Failed to parse {} link: {}", scheme, e);
            }
        }
        result
    }

    /// Parses multiple links from content (one per line, or Base64 wrapped)
    ///
    /// Blank lines and `#` comments are skipped. Every other line yields one
    /// result, in input order.
    pub fn parse_link_list(&self, content: &str) -> Vec<(String, Result<ProxyRecord>)> {
        let content = normalize_link_list(content);
        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        debug!("Parsing {} link lines from content", lines.len());

        lines
            .into_iter()
            .map(|line| (line.to_string(), self.parse_link(line)))
            .collect()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extracts the scheme from a link
pub fn extract_scheme(link: &str) -> Result<&str> {
    link.split_once("://")
        .map(|(scheme, _)| scheme)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::UnsupportedScheme(link_preview(link)))
}

/// Shortens a link for diagnostics; links carry credentials and can be long
pub fn link_preview(link: &str) -> String {
    const MAX_CHARS: usize = 50;
    if link.chars().count() <= MAX_CHARS {
        link.to_string()
    } else {
        let head: String = link.chars().take(MAX_CHARS).collect();
        format!("{}...", head)
    }
}
