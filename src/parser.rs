//! Share Link Parsing Module
//!
//! This module provides functionality for:
//! - Decoding `vmess://` and `vless://` share links into [`ProxyRecord`]s
//! - Dispatching raw links to the right decoder by scheme
//! - Normalizing multi-line link lists (plain or Base64 wrapped)
//!
//! [`ProxyRecord`]: crate::config::ProxyRecord

mod base64;
pub mod detection;
pub mod protocols;

pub use self::base64::{add_base64_padding, decode_base64};
pub use detection::{LinkListKind, detect_link_list, is_share_link, normalize_link_list};
pub use protocols::{
    ProtocolParser, ProtocolRegistry, VLessParser, VMessParser, decode_vless, decode_vmess,
    extract_scheme, link_preview,
};
