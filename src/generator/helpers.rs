//! Generator utility functions
//!
//! Path expansion and output directory handling shared by the template
//! loader and the serializer.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Path Utilities
// ============================================================================

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Some(home) = dirs_home()
    {
        return path.replacen("~", &home, 1);
    }
    path.to_string()
}

/// Expand ~ in a filesystem path
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(expand_tilde(s)),
        None => path.to_path_buf(),
    }
}

/// Get home directory path
pub fn dirs_home() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok()
    }
}

/// Create the parent directories of `path` if they don't exist
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        debug!("Ensuring output directory {}", parent.display());
        std::fs::create_dir_all(parent).map_err(|source| Error::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
