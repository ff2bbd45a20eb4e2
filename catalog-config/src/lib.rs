//! Configuration loading for the storage catalog.
//!
//! A [`CatalogConfig`] is resolved from an explicit file, the
//! `CATALOG_CONFIG_PATH` / `CATALOG_CONFIG_JSON` environment variables, a
//! default `catalog.toml`, or built-in defaults. `.env` files are honoured and
//! `DATABASE_URL` overrides whatever the file says.
#![allow(missing_docs)]

pub mod loader;
pub mod models;

pub use loader::{
    ConfigLoad, ConfigLoader, ConfigSource, EnvOverrides, load_from_file, parse_from_str,
    parse_json,
};
pub use models::{CatalogConfig, DatabaseConfig, ScannerConfig};
