use std::{path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::config::Protocol;
use crate::error::{Error, Result};

use super::helpers::expand_tilde;

// ============================================================================
// Generator Config Types
// ============================================================================

/// Generator configuration parsed from TOML file
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeneratorConfig {
    /// Template file path, default "template.yaml"
    #[serde(default = "default_template")]
    pub template: String,

    /// Output file path, default "SVTC.yaml"
    #[serde(default = "default_output")]
    pub output: String,

    /// Share links to convert, one `vmess://` or `vless://` link per entry
    #[serde(default)]
    pub links: Vec<String>,

    /// Only accept links of this protocol ("vmess" or "vless")
    #[serde(default)]
    pub protocol: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            output: default_output(),
            links: Vec::new(),
            protocol: None,
        }
    }
}

// ============================================================================
// Generator Implementation
// ============================================================================

impl GeneratorConfig {
    /// Parse generator config from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: GeneratorConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse TOML: {}", e)))?;

        if let Some(protocol) = &config.protocol {
            Protocol::from_str(protocol).map_err(Error::Config)?;
        }

        Ok(config)
    }

    /// The protocol filter, if one is configured
    pub fn protocol_filter(&self) -> Option<Protocol> {
        // Validated in from_toml
        self.protocol
            .as_deref()
            .and_then(|p| Protocol::from_str(p).ok())
    }

    /// Load generator config from file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Load generator config from a path, expanding `~`
    pub fn load(path: &str) -> Result<Self> {
        let expanded = expand_tilde(path);
        Self::from_file(Path::new(&expanded))
    }
}

fn default_template() -> String {
    "template.yaml".to_string()
}

fn default_output() -> String {
    "SVTC.yaml".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_defaults() {
        let config = GeneratorConfig::from_toml("").unwrap();
        assert_eq!(config, GeneratorConfig::default());
        assert_eq!(config.template, "template.yaml");
        assert_eq!(config.output, "SVTC.yaml");
        assert!(config.links.is_empty());
        assert!(config.protocol_filter().is_none());
    }

    #[test]
    fn test_from_toml_full() {
        let content = r#"
template = "~/clash/base.yaml"
output = "out/clash.yaml"
protocol = "VLESS"
links = [
    "vless://id@host:443#a",
    "vless://id@host2:443#b",
]
"#;
        let config = GeneratorConfig::from_toml(content).unwrap();
        assert_eq!(config.template, "~/clash/base.yaml");
        assert_eq!(config.output, "out/clash.yaml");
        assert_eq!(config.links.len(), 2);
        assert_eq!(config.protocol_filter(), Some(Protocol::Vless));
    }

    #[test]
    fn test_from_toml_invalid_protocol() {
        let err = GeneratorConfig::from_toml(r#"protocol = "trojan""#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("trojan"));
    }

    #[test]
    fn test_from_toml_syntax_error() {
        let err = GeneratorConfig::from_toml("links = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let path = std::env::temp_dir().join("svtc-no-such-generator-config.toml");
        let err = GeneratorConfig::from_file(&path).unwrap_err();
        assert_eq!(err.exit_code(), 8);
    }
}
