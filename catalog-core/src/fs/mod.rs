//! Filesystem client abstraction consumed by the protocol scanners.
//!
//! The wire protocols themselves live outside this crate. A scanner only sees
//! a [`FileSystemClient`] built by a [`ClientFactory`] from a
//! [`StorageConfig`]; the bundled [`DefaultClientFactory`] knows how to build
//! local clients and accepts registrations for the remote protocols.

mod local;
mod memory;

pub use local::LocalClient;
pub use memory::InMemoryClient;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use catalog_model::{Protocol, StorageRoot};
use chrono::{DateTime, Utc};

use crate::error::{CatalogError, Result};

/// One entry returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileInfo {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl RemoteFileInfo {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
            modified: None,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
            modified: None,
        }
    }
}

/// Minimal, async-capable client used by scanners to walk a storage root.
///
/// Paths are slash-separated and relative to the root the client was built
/// for; `/` lists the root itself.
#[async_trait]
pub trait FileSystemClient: Send + Sync {
    /// Protocol the client speaks.
    fn protocol(&self) -> Protocol;

    /// Establish the session. Called once per scan job before any listing.
    async fn connect(&self) -> Result<()>;

    /// Tear down the session. Errors are logged by the caller and ignored.
    async fn disconnect(&self) -> Result<()>;

    /// List the direct children of `path`.
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteFileInfo>>;

    /// Cheap content fingerprint for move detection.
    ///
    /// Clients that cannot read file content without a full transfer return
    /// `None`, in which case moves are matched on size alone.
    async fn fingerprint(&self, _path: &str, _size: u64) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Protocol plus the flat settings map a client is built from.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub protocol: Protocol,
    pub settings: HashMap<String, String>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.settings.keys().collect();
        keys.sort();
        f.debug_struct("StorageConfig")
            .field("protocol", &self.protocol)
            .field("settings", &keys)
            .finish()
    }
}

impl StorageConfig {
    pub fn from_root(root: &StorageRoot) -> Self {
        Self {
            protocol: root.protocol,
            settings: root.connection_settings(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Fetch a setting the client cannot work without.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                CatalogError::InvalidInput(format!(
                    "{} storage requires the '{key}' setting",
                    self.protocol
                ))
            })
    }

    /// Validate the settings a client for this protocol needs.
    pub fn validate(&self) -> Result<()> {
        match self.protocol {
            Protocol::Local => {
                self.require("base_path")?;
            }
            Protocol::Smb => {
                self.require("host")?;
                self.require("share")?;
            }
            Protocol::Ftp => {
                self.require("host")?;
            }
            Protocol::Nfs => {
                self.require("host")?;
                self.require("export_path")?;
            }
            Protocol::Webdav => {
                let raw = self.require("url")?;
                url::Url::parse(raw).map_err(|e| {
                    CatalogError::InvalidInput(format!("invalid webdav url '{raw}': {e}"))
                })?;
            }
        }
        if let Some(port) = self.get("port") {
            port.parse::<u16>().map_err(|_| {
                CatalogError::InvalidInput(format!("invalid port '{port}'"))
            })?;
        }
        Ok(())
    }
}

/// Builds filesystem clients for storage roots.
pub trait ClientFactory: Send + Sync {
    fn create_client(&self, config: &StorageConfig) -> Result<Box<dyn FileSystemClient>>;
}

type ClientConstructor =
    Arc<dyn Fn(&StorageConfig) -> Result<Box<dyn FileSystemClient>> + Send + Sync>;

/// Factory with a constructor per protocol.
///
/// Local clients are registered out of the box. Remote protocol clients are
/// supplied by the embedding process through [`DefaultClientFactory::register`].
#[derive(Clone)]
pub struct DefaultClientFactory {
    constructors: HashMap<Protocol, ClientConstructor>,
}

impl fmt::Debug for DefaultClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut protocols: Vec<&Protocol> = self.constructors.keys().collect();
        protocols.sort();
        f.debug_struct("DefaultClientFactory")
            .field("protocols", &protocols)
            .finish()
    }
}

impl Default for DefaultClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultClientFactory {
    pub fn new() -> Self {
        let mut factory = Self {
            constructors: HashMap::new(),
        };
        factory.register(Protocol::Local, |config| {
            let base = config.require("base_path")?;
            Ok(Box::new(LocalClient::new(base)) as Box<dyn FileSystemClient>)
        });
        factory
    }

    /// Install (or replace) the constructor used for `protocol`.
    pub fn register<F>(&mut self, protocol: Protocol, constructor: F)
    where
        F: Fn(&StorageConfig) -> Result<Box<dyn FileSystemClient>> + Send + Sync + 'static,
    {
        self.constructors.insert(protocol, Arc::new(constructor));
    }

    pub fn supports(&self, protocol: Protocol) -> bool {
        self.constructors.contains_key(&protocol)
    }
}

impl ClientFactory for DefaultClientFactory {
    fn create_client(&self, config: &StorageConfig) -> Result<Box<dyn FileSystemClient>> {
        let constructor = self
            .constructors
            .get(&config.protocol)
            .ok_or(CatalogError::UnsupportedProtocol(config.protocol))?;
        config.validate()?;
        constructor(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_protocols_are_unsupported_until_registered() {
        let mut root = StorageRoot::new("nas", Protocol::Smb);
        root.host = Some("nas.local".into());
        root.path = Some("media".into());
        let config = StorageConfig::from_root(&root);

        let mut factory = DefaultClientFactory::new();
        assert!(matches!(
            factory.create_client(&config),
            Err(CatalogError::UnsupportedProtocol(Protocol::Smb))
        ));

        let shared = InMemoryClient::new(Protocol::Smb);
        factory.register(Protocol::Smb, move |_| {
            Ok(Box::new(shared.clone()) as Box<dyn FileSystemClient>)
        });
        let client = factory.create_client(&config).expect("registered client");
        assert_eq!(client.protocol(), Protocol::Smb);
    }

    #[test]
    fn validation_reports_missing_settings() {
        let root = StorageRoot::new("ftp", Protocol::Ftp);
        let err = StorageConfig::from_root(&root).validate().unwrap_err();
        assert!(err.to_string().contains("'host'"));

        let mut dav = StorageRoot::new("dav", Protocol::Webdav);
        dav.url = Some("not a url".into());
        assert!(StorageConfig::from_root(&dav).validate().is_err());
    }

    #[test]
    fn debug_output_hides_setting_values() {
        let mut root = StorageRoot::new("ftp", Protocol::Ftp);
        root.host = Some("ftp.example".into());
        root.password = Some("hunter2".into());
        let rendered = format!("{:?}", StorageConfig::from_root(&root));
        assert!(rendered.contains("password"));
        assert!(!rendered.contains("hunter2"));
    }
}
