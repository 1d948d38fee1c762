//! Conversion session
//!
//! A [`Session`] owns the ordered list of proxies collected so far. Links are
//! added one at a time or in batches; a bad link in a batch is reported and
//! skipped without affecting the others.

use tracing::{debug, info, warn};

use crate::config::{ClashConfig, Protocol, ProxyRecord};
use crate::error::Result;
use crate::generator::assemble;
use crate::parser::{ProtocolRegistry, link_preview};

/// Outcome of adding a batch of links
#[derive(Debug, Default)]
pub struct AddReport {
    /// Names of the nodes added, in input order
    pub added: Vec<String>,
    /// Shortened link and the reason it was skipped
    pub skipped: Vec<(String, crate::Error)>,
}

impl AddReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Ordered collection of decoded proxies awaiting generation
pub struct Session {
    proxies: Vec<ProxyRecord>,
    registry: ProtocolRegistry,
    protocol: Option<Protocol>,
}

impl Session {
    /// Create a session that accepts every supported link scheme
    pub fn new() -> Self {
        Self {
            proxies: Vec::new(),
            registry: ProtocolRegistry::with_builtin_parsers(),
            protocol: None,
        }
    }

    /// Create a session that only accepts links of `protocol`
    pub fn with_protocol(protocol: Protocol) -> Self {
        Self {
            proxies: Vec::new(),
            registry: ProtocolRegistry::for_protocol(protocol),
            protocol: Some(protocol),
        }
    }

    /// Change which links are accepted from now on. Nodes already added stay.
    pub fn set_protocol(&mut self, protocol: Option<Protocol>) {
        self.registry = match protocol {
            Some(protocol) => ProtocolRegistry::for_protocol(protocol),
            None => ProtocolRegistry::with_builtin_parsers(),
        };
        self.protocol = protocol;
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    /// Append an already decoded record
    ///
    /// Records without a server address or port are rejected.
    pub fn add(&mut self, record: ProxyRecord) -> Result<&ProxyRecord> {
        record.validate()?;
        info!("Added {} node: {}", record.protocol, record.name);
        self.proxies.push(record);
        Ok(&self.proxies[self.proxies.len() - 1])
    }

    /// Decode one link and append it
    pub fn add_link(&mut self, link: &str) -> Result<&ProxyRecord> {
        let record = self.registry.parse_link(link)?;
        self.add(record)
    }

    /// Decode every link in `text` and append the ones that succeed
    ///
    /// `text` holds one link per line, or a Base64 encoded list. Blank lines
    /// and `#` comments are ignored.
    pub fn add_links(&mut self, text: &str) -> AddReport {
        let mut report = AddReport::default();

        for (line, result) in self.registry.parse_link_list(text) {
            match result.and_then(|record| self.add(record).map(|r| r.name.clone())) {
                Ok(name) => report.added.push(name),
                Err(e) => {
                    let preview = link_preview(&line);
                    warn!("Skipping link {}: {}", preview, e);
                    report.skipped.push((preview, e));
                }
            }
        }

        info!(
            "Added {} node(s), skipped {} link(s)",
            report.added.len(),
            report.skipped.len()
        );
        report
    }

    /// Remove all collected nodes
    pub fn clear(&mut self) {
        debug!("Clearing {} node(s)", self.proxies.len());
        self.proxies.clear();
        info!("Cleared all nodes");
    }

    pub fn proxies(&self) -> &[ProxyRecord] {
        &self.proxies
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Merge the collected nodes into `template`
    pub fn generate(&self, template: &ClashConfig) -> Result<ClashConfig> {
        assemble(template, &self.proxies)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
