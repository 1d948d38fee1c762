use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Sequence, Value};

pub mod proxy;

pub use proxy::{Protocol, ProxyRecord, TlsOptions, Transport, VmessExtra, WsOptions};

/// Key holding the proxy list
pub const PROXIES_KEY: &str = "proxies";

/// Key holding the proxy group list
pub const PROXY_GROUPS_KEY: &str = "proxy-groups";

/// Name of the group in the built-in template
pub const DEFAULT_GROUP_NAME: &str = "PROXY";

/// Clash configuration document
///
/// The document is kept as an insertion-ordered YAML mapping so that keys the
/// generator does not touch are written back verbatim and in their original
/// position. Only `proxies` and `proxy-groups` have a required shape.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct ClashConfig {
    root: Mapping,
}

impl ClashConfig {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            root: Mapping::new(),
        }
    }

    /// The document used when no template file exists
    pub fn builtin() -> Self {
        let mut group = Mapping::new();
        group.insert("name".into(), DEFAULT_GROUP_NAME.into());
        group.insert("type".into(), "select".into());
        group.insert(PROXIES_KEY.into(), Value::Sequence(Sequence::new()));

        let mut root = Mapping::new();
        root.insert("mixed-port".into(), 7890.into());
        root.insert("log-level".into(), "info".into());
        root.insert(PROXIES_KEY.into(), Value::Sequence(Sequence::new()));
        root.insert(
            PROXY_GROUPS_KEY.into(),
            Value::Sequence(vec![Value::Mapping(group)]),
        );
        root.insert(
            "rules".into(),
            Value::Sequence(vec![format!("MATCH,{}", DEFAULT_GROUP_NAME).into()]),
        );
        Self { root }
    }

    /// Parse a document from YAML text, checking the shape of the keys the
    /// generator rewrites
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        let value: Value = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
        Self::from_value(value)
    }

    /// Wrap a YAML value, checking the shape of the keys the generator rewrites
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Mapping(root) = value else {
            return Err("document root is not a mapping".to_string());
        };

        if let Some(proxies) = root.get(PROXIES_KEY)
            && !proxies.is_sequence()
            && !proxies.is_null()
        {
            return Err(format!("'{}' is not a list", PROXIES_KEY));
        }

        if let Some(groups) = root.get(PROXY_GROUPS_KEY) {
            match groups {
                Value::Null => {}
                Value::Sequence(groups) => {
                    if let Some(index) = groups.iter().position(|g| !g.is_mapping()) {
                        return Err(format!(
                            "'{}' entry {} is not a mapping",
                            PROXY_GROUPS_KEY, index
                        ));
                    }
                }
                _ => return Err(format!("'{}' is not a list", PROXY_GROUPS_KEY)),
            }
        }

        Ok(Self { root })
    }

    /// Serialize the document to YAML text
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.root)
    }

    /// Look up a top-level key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Top-level keys in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().filter_map(Value::as_str)
    }

    /// Rendered proxy entries
    pub fn proxies(&self) -> &[Value] {
        self.root
            .get(PROXIES_KEY)
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Proxy group mappings
    pub fn proxy_groups(&self) -> &[Value] {
        self.root
            .get(PROXY_GROUPS_KEY)
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Member names of the proxy group at `index`
    pub fn group_members(&self, index: usize) -> Vec<&str> {
        self.proxy_groups()
            .get(index)
            .and_then(|g| g.get(PROXIES_KEY))
            .and_then(Value::as_sequence)
            .map(|members| members.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Replace the proxy list. An existing key keeps its position.
    pub fn set_proxies(&mut self, proxies: Sequence) {
        self.root
            .insert(PROXIES_KEY.into(), Value::Sequence(proxies));
    }

    /// Replace the member list of the first proxy group.
    ///
    /// Returns `false` when there is no group to update.
    pub fn set_first_group_members(&mut self, names: Vec<String>) -> bool {
        let first = self
            .root
            .get_mut(PROXY_GROUPS_KEY)
            .and_then(Value::as_sequence_mut)
            .and_then(|groups| groups.first_mut())
            .and_then(Value::as_mapping_mut);

        match first {
            Some(group) => {
                let members = names.into_iter().map(Value::String).collect();
                group.insert(PROXIES_KEY.into(), Value::Sequence(members));
                true
            }
            None => false,
        }
    }
}

impl Default for ClashConfig {
    fn default() -> Self {
        Self::new()
    }
}
