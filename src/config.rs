//! Configuration file handling.
//!
//! This module handles loading `.certa.toml` files and merging them with
//! command-line and environment values. The resolved [`Config`] is built
//! once at startup and handed to the web layer.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".certa.toml";

const DEFAULT_ADMIN_USER: &str = "admin";
const DEFAULT_ADMIN_PASS: &str = "fcee2025";
const DEFAULT_SECRET_KEY: &str = "chave-secreta-trocar";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Data file locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Admin credentials and session signing.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Where the data files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory with `dados.csv` and `demografia.csv`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory with the bundled defaults and the boundary map.
    #[serde(default = "default_seed_dir")]
    pub seed_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            seed_dir: default_seed_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_seed_dir() -> PathBuf {
    PathBuf::from("seed")
}

/// Admin credential pair and session signing secret.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_admin_user")]
    pub username: String,

    #[serde(default = "default_admin_pass")]
    pub password: String,

    #[serde(default = "default_secret_key")]
    pub secret_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: default_admin_user(),
            password: default_admin_pass(),
            secret_key: default_secret_key(),
        }
    }
}

// Keep secrets out of debug logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

fn default_admin_user() -> String {
    DEFAULT_ADMIN_USER.to_string()
}

fn default_admin_pass() -> String {
    DEFAULT_ADMIN_PASS.to_string()
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

impl AuthConfig {
    /// Exact comparison against the configured credential pair.
    pub fn check(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }

    /// Whether the built-in password or secret is still in use.
    pub fn uses_defaults(&self) -> bool {
        self.password == DEFAULT_ADMIN_PASS || self.secret_key == DEFAULT_SECRET_KEY
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment fallbacks) take precedence
    /// over config file settings, but only when they were provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref dir) = args.data_dir {
            self.storage.data_dir = dir.clone();
        }
        if let Some(ref dir) = args.seed_dir {
            self.storage.seed_dir = dir.clone();
        }

        if let Some(ref user) = args.admin_user {
            self.auth.username = user.clone();
        }
        if let Some(ref pass) = args.admin_pass {
            self.auth.password = pass.clone();
        }
        if let Some(ref secret) = args.secret_key {
            self.auth.secret_key = secret.clone();
        }
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
