//! Configuration generator module
//!
//! This module merges decoded proxies into a Clash template and writes the
//! resulting document to disk.

use std::path::{Path, PathBuf};

use serde_yaml::Sequence;
use tracing::{debug, info};

use crate::config::{ClashConfig, ProxyRecord};
use crate::error::{Error, Result};
use crate::session::{AddReport, Session};

// Sub-modules
pub mod generator_config;
pub mod helpers;
pub mod template;

// Re-exports
pub use generator_config::GeneratorConfig;
pub use helpers::{dirs_home, ensure_parent_dir, expand_path, expand_tilde};
pub use template::{DEFAULT_TEMPLATE_PATH, load_template};

// ============================================================================
// Assembly and Serialization
// ============================================================================

/// Merge `records` into a copy of `template`
///
/// The `proxies` list is replaced with the rendered records, in order. The
/// first proxy group's members are replaced with the record names; other
/// groups and all other keys are left as they are. The template itself is
/// never modified. A record without a server address or port fails the whole
/// assembly.
pub fn assemble(template: &ClashConfig, records: &[ProxyRecord]) -> Result<ClashConfig> {
    if records.is_empty() {
        return Err(Error::EmptyProxySet);
    }
    for record in records {
        record.validate()?;
    }

    let proxies = records
        .iter()
        .map(ProxyRecord::to_yaml_value)
        .collect::<std::result::Result<Sequence, _>>()?;
    let names: Vec<String> = records.iter().map(|r| r.name.clone()).collect();

    let mut config = template.clone();
    config.set_proxies(proxies);
    if config.set_first_group_members(names) {
        debug!("Updated first proxy group with {} members", records.len());
    } else {
        debug!("Template has no proxy groups, skipping group update");
    }

    Ok(config)
}

/// Write `config` as YAML to `path`, creating parent directories and
/// overwriting any existing file
pub fn serialize(config: &ClashConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let yaml = config.to_yaml()?;

    ensure_parent_dir(path)?;
    std::fs::write(path, yaml).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Config written to {}", path.display());
    Ok(())
}

// ============================================================================
// Generator
// ============================================================================

/// Generator that turns a session into a config file
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    /// Create a new generator with the given config
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Build a session from the links listed in the config
    ///
    /// Bad links are skipped and reported, never fatal.
    pub fn session(&self) -> (Session, AddReport) {
        let mut session = match self.config.protocol_filter() {
            Some(protocol) => Session::with_protocol(protocol),
            None => Session::new(),
        };
        let report = session.add_links(&self.config.links.join("\n"));
        (session, report)
    }

    /// Run the generation process
    pub fn generate(&self, session: &Session) -> Result<ClashConfig> {
        info!("Starting config generation");

        if session.is_empty() {
            return Err(Error::EmptyProxySet);
        }

        let template = load_template(&self.config.template)?;
        let config = session.generate(&template)?;

        info!("Final config has {} proxies", config.proxies().len());
        Ok(config)
    }

    /// Generate and write to output file, returning the path written
    pub fn generate_to_file(
        &self,
        session: &Session,
        output_override: Option<&str>,
    ) -> Result<PathBuf> {
        let config = self.generate(session)?;

        let output_path = output_override.unwrap_or(&self.config.output);
        let path = PathBuf::from(expand_tilde(output_path));
        serialize(&config, &path)?;

        Ok(path)
    }
}
