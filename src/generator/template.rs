//! Template loading
//!
//! The template is the Clash document the generated proxies are merged into.
//! A missing template file is not an error: the built-in default is used.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use crate::config::ClashConfig;
use crate::error::{Error, Result};

use super::helpers::expand_path;

/// Default template file name
pub const DEFAULT_TEMPLATE_PATH: &str = "template.yaml";

/// Load the template at `path`, falling back to [`ClashConfig::builtin`] when
/// the file does not exist
pub fn load_template(path: impl AsRef<Path>) -> Result<ClashConfig> {
    let path = expand_path(path.as_ref());
    info!("Loading template from {}", path.display());

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(
                "Template {} not found, using built-in default",
                path.display()
            );
            return Ok(ClashConfig::builtin());
        }
        Err(e) => return Err(Error::template(path, e)),
    };

    let config = ClashConfig::from_yaml(&content).map_err(|e| Error::template(&path, e))?;
    debug!(
        "Loaded template with {} top-level keys, {} proxy groups",
        config.keys().count(),
        config.proxy_groups().len()
    );
    Ok(config)
}
