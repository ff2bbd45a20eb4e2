use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use crate::models::CatalogConfig;

const CONFIG_PATH_VAR: &str = "CATALOG_CONFIG_PATH";
const CONFIG_JSON_VAR: &str = "CATALOG_CONFIG_JSON";
const DATABASE_URL_VAR: &str = "DATABASE_URL";

const DEFAULT_CANDIDATES: &[&str] = &[
    "catalog.toml",
    "catalog.json",
    "config/catalog.toml",
    "config/catalog.json",
];

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    Explicit(PathBuf),
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// A resolved configuration plus its provenance.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: CatalogConfig,
    pub source: ConfigSource,
    pub env_file_loaded: bool,
}

/// Environment values consulted while resolving the configuration.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub config_path: Option<PathBuf>,
    pub config_json: Option<String>,
    pub database_url: Option<String>,
}

impl EnvOverrides {
    pub fn gather() -> Self {
        Self {
            config_path: non_empty_var(CONFIG_PATH_VAR).map(PathBuf::from),
            config_json: non_empty_var(CONFIG_JSON_VAR),
            database_url: non_empty_var(DATABASE_URL_VAR),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Resolves [`CatalogConfig`] from, in order: an explicit path,
/// `$CATALOG_CONFIG_PATH`, `$CATALOG_CONFIG_JSON`, the first default file
/// found in `search_dir`, then built-in defaults. `$DATABASE_URL` always wins
/// over the file's database url.
#[derive(Debug, Default, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
    search_dir: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Directory the default candidates are looked up in (the working
    /// directory when unset).
    pub fn with_search_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.search_dir = Some(dir.into());
        self
    }

    /// Load `.env`, gather the environment, and resolve.
    pub fn load(&self) -> anyhow::Result<ConfigLoad> {
        let env_file_loaded = self.load_env_file()?;
        let mut load = self.resolve(&EnvOverrides::gather())?;
        load.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    fn load_env_file(&self) -> anyhow::Result<bool> {
        let loaded = match &self.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true),
            None => dotenvy::dotenv().map(|_| true),
        };
        match loaded {
            Ok(loaded) => Ok(loaded),
            Err(dotenvy::Error::Io(_)) => Ok(false),
            Err(err) => Err(err).context("failed to parse .env file"),
        }
    }

    /// Resolve against already-gathered environment values.
    pub fn resolve(&self, env: &EnvOverrides) -> anyhow::Result<ConfigLoad> {
        let (mut config, source) = self.read_config(env)?;

        if let Some(url) = &env.database_url {
            debug!("database url taken from {DATABASE_URL_VAR}");
            config.database.url = Some(url.clone());
        }

        config.validate()?;
        info!(
            source = ?source,
            storage_roots = config.storage_roots.len(),
            "catalog configuration loaded"
        );

        Ok(ConfigLoad {
            config,
            source,
            env_file_loaded: false,
        })
    }

    fn read_config(&self, env: &EnvOverrides) -> anyhow::Result<(CatalogConfig, ConfigSource)> {
        if let Some(path) = &self.config_path {
            let config = load_from_file(path)?;
            return Ok((config, ConfigSource::Explicit(path.clone())));
        }

        if let Some(path) = &env.config_path {
            let config = load_from_file(path)?;
            return Ok((config, ConfigSource::EnvPath(path.clone())));
        }

        if let Some(raw) = &env.config_json {
            let config =
                parse_json(raw).with_context(|| format!("failed to parse {CONFIG_JSON_VAR}"))?;
            return Ok((config, ConfigSource::EnvInline));
        }

        if let Some(path) = self.find_default_file() {
            let config = load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((CatalogConfig::default(), ConfigSource::Default))
    }

    fn find_default_file(&self) -> Option<PathBuf> {
        let base = self.search_dir.as_deref().unwrap_or_else(|| Path::new(""));
        DEFAULT_CANDIDATES
            .iter()
            .map(|candidate| base.join(candidate))
            .find(|path| path.exists())
    }
}

/// Read a TOML or JSON config file, picking the parser from the extension.
pub fn load_from_file(path: &Path) -> anyhow::Result<CatalogConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog config from {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => {
            parse_json(&contents).with_context(|| format!("invalid catalog config {}", path.display()))
        }
        Some("toml") => toml::from_str(&contents)
            .map_err(|err| anyhow!("invalid catalog config {}: {}", path.display(), err)),
        _ => parse_from_str(&contents, &path.display().to_string()),
    }
}

/// Parse contents of unknown format: TOML first, then JSON.
pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<CatalogConfig> {
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| {
            anyhow!(
                "failed to parse catalog config {}: toml error: {}; json error: {}",
                origin,
                toml_err,
                json_err
            )
        })
    })
}

pub fn parse_json(raw: &str) -> anyhow::Result<CatalogConfig> {
    serde_json::from_str(raw).map_err(|err| anyhow!("invalid catalog config json: {err}"))
}
