use std::collections::HashMap;
use std::fmt;

use crate::ids::StorageRootId;
use crate::protocol::Protocol;

/// Default recursion limit applied when a root does not carry its own.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// A configured storage backend location.
///
/// Roots are unique by `name`. A root does not need to be registered ahead of
/// time: the catalog writer creates the row the first time a file under it is
/// recorded, which is why `id` is optional here.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StorageRoot {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<StorageRootId>,
    pub name: String,
    pub protocol: Protocol,
    #[cfg_attr(feature = "serde", serde(default))]
    pub host: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub port: Option<u16>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub path: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub username: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub password: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub domain: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mount_point: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub options: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub url: Option<String>,
    #[cfg_attr(feature = "serde", serde(default = "default_enabled"))]
    pub enabled: bool,
    #[cfg_attr(feature = "serde", serde(default = "default_max_depth"))]
    pub max_depth: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub include_patterns: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub exclude_patterns: Vec<String>,
}

impl fmt::Debug for StorageRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageRoot")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("domain", &self.domain)
            .field("mount_point", &self.mount_point)
            .field("url", &self.url)
            .field("enabled", &self.enabled)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "serde")]
fn default_enabled() -> bool {
    true
}

#[cfg(feature = "serde")]
fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

impl StorageRoot {
    /// Minimal root with every optional connection field unset.
    pub fn new(name: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            id: None,
            name: name.into(),
            protocol,
            host: None,
            port: None,
            path: None,
            username: None,
            password: None,
            domain: None,
            mount_point: None,
            options: None,
            url: None,
            enabled: true,
            max_depth: DEFAULT_MAX_DEPTH,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Convenience constructor for a local directory root.
    pub fn local(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        let mut root = Self::new(name, Protocol::Local);
        root.path = Some(base_path.into());
        root
    }

    /// Connection settings handed to a filesystem client factory.
    ///
    /// Keys depend on the protocol; absent optional fields are omitted rather
    /// than stored as empty strings.
    pub fn connection_settings(&self) -> HashMap<String, String> {
        let mut settings = HashMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                settings.insert(key.to_string(), value);
            }
        };

        match self.protocol {
            Protocol::Local => {
                put("base_path", self.path.clone());
            }
            Protocol::Smb => {
                put("host", self.host.clone());
                put("port", self.port.map(|p| p.to_string()));
                put("share", self.path.clone());
                put("username", self.username.clone());
                put("password", self.password.clone());
                put("domain", self.domain.clone());
            }
            Protocol::Ftp => {
                put("host", self.host.clone());
                put("port", self.port.map(|p| p.to_string()));
                put("username", self.username.clone());
                put("password", self.password.clone());
            }
            Protocol::Nfs => {
                put("host", self.host.clone());
                put("export_path", self.path.clone());
                put("mount_point", self.mount_point.clone());
                put("options", self.options.clone());
            }
            Protocol::Webdav => {
                put("url", self.url.clone());
                put("username", self.username.clone());
                put("password", self.password.clone());
            }
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smb_settings_map_path_to_share() {
        let mut root = StorageRoot::new("nas", Protocol::Smb);
        root.host = Some("10.0.0.2".into());
        root.port = Some(445);
        root.path = Some("media".into());
        root.username = Some("guest".into());

        let settings = root.connection_settings();
        assert_eq!(settings.get("share").map(String::as_str), Some("media"));
        assert_eq!(settings.get("port").map(String::as_str), Some("445"));
        assert!(!settings.contains_key("password"));
    }

    #[test]
    fn local_settings_only_carry_base_path() {
        let root = StorageRoot::local("disk", "/srv/media");
        let settings = root.connection_settings();
        assert_eq!(settings.len(), 1);
        assert_eq!(
            settings.get("base_path").map(String::as_str),
            Some("/srv/media")
        );
    }

    #[test]
    fn nfs_settings_use_export_path() {
        let mut root = StorageRoot::new("nfs", Protocol::Nfs);
        root.host = Some("filer".into());
        root.path = Some("/exports/media".into());
        root.mount_point = Some("/mnt/media".into());

        let settings = root.connection_settings();
        assert_eq!(
            settings.get("export_path").map(String::as_str),
            Some("/exports/media")
        );
        assert_eq!(
            settings.get("mount_point").map(String::as_str),
            Some("/mnt/media")
        );
    }
}
