//! Link list format detection
//!
//! Multi-line input is either a plain list of share links or the same list
//! wrapped in Base64, the way subscription endpoints serve it.

use std::borrow::Cow;

use tracing::debug;

use super::base64::decode_base64;

/// Schemes the link decoders understand
const SHARE_LINK_PREFIXES: [&str; 2] = ["vmess://", "vless://"];

/// Detected link list content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkListKind {
    /// One link per line
    Plain,
    /// Base64 encoded link list
    Base64,
    /// Neither; treated as plain so every line gets a diagnostic
    Unknown,
}

/// Checks if a string starts with a supported share link scheme
pub fn is_share_link(s: &str) -> bool {
    SHARE_LINK_PREFIXES.iter().any(|p| s.starts_with(p))
}

/// Detects the kind of a multi-line link input
pub fn detect_link_list(content: &str) -> LinkListKind {
    let trimmed = content.trim();

    if trimmed.contains("://") {
        debug!("Detected plain link list");
        return LinkListKind::Plain;
    }

    if is_base64_link_list(trimmed) {
        debug!("Detected Base64 encoded link list");
        return LinkListKind::Base64;
    }

    debug!("Unable to detect link list format");
    LinkListKind::Unknown
}

/// Returns the plain-text link list, decoding Base64 input when detected
pub fn normalize_link_list(content: &str) -> Cow<'_, str> {
    if detect_link_list(content) != LinkListKind::Base64 {
        return Cow::Borrowed(content);
    }

    match decode_base64(content.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    {
        Some(decoded) => Cow::Owned(decoded),
        None => Cow::Borrowed(content),
    }
}

fn is_base64_link_list(content: &str) -> bool {
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.len() < 4 {
        return false;
    }

    let is_valid_base64 = cleaned.chars().all(|c| {
        c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=' || c == '-' || c == '_'
    });
    if !is_valid_base64 {
        return false;
    }

    if let Ok(decoded) = decode_base64(&cleaned)
        && let Ok(decoded_str) = String::from_utf8(decoded)
    {
        return decoded_str.lines().any(|line| is_share_link(line.trim()));
    }

    false
}
