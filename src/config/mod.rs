pub mod defaults;
mod types;
mod validation;

pub use defaults::*;
pub use types::*;
pub use validation::*;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level Harbormaster server configuration.
///
/// Distinct from the persisted [`crate::model::Settings`] aggregate: this is
/// the process configuration read at startup, not the mutable platform
/// settings exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub store: StoreConfig,

    /// State directory for persistent data.
    #[serde(skip)]
    pub state_dir: PathBuf,
}

impl ServerConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(find_config_file)
            .unwrap_or_else(|| PathBuf::from("harbormaster.json"));

        let mut config = if config_path.exists() {
            info!("Loading config from {}", config_path.display());
            load_config_file(&config_path)?
        } else {
            info!("No config file found, using defaults");
            ServerConfig::default()
        };

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Resolve state directory
        config.state_dir = resolve_state_dir();

        Ok(config)
    }

    /// Write default configuration to a file.
    pub fn write_default(path: &str) -> Result<()> {
        let config = ServerConfig::default();
        let json = serde_json::to_string_pretty(&config)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Path of the SQLite datastore.
    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.state_dir.join(STORE_FILE_NAME))
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("HARBORMASTER_HTTP_PORT") {
            if let Ok(port) = port.parse() {
                self.http.port = port;
            }
        }

        if let Ok(bind) = std::env::var("HARBORMASTER_HTTP_BIND") {
            self.http.bind = bind;
        }

        if let Ok(secret) = std::env::var("HARBORMASTER_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }

        if let Ok(path) = std::env::var("HARBORMASTER_STORE_PATH") {
            self.store.path = Some(path);
        }

        if let Ok(flag) = std::env::var("HARBORMASTER_NO_TX") {
            self.features.disable_transactions = matches!(flag.as_str(), "1" | "true" | "yes");
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            auth: AuthConfig::default(),
            features: FeatureConfig::default(),
            demo: DemoConfig::default(),
            store: StoreConfig::default(),
            state_dir: resolve_state_dir(),
        }
    }
}

/// Find the configuration file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("harbormaster.json"),
        PathBuf::from("harbormaster.yaml"),
        PathBuf::from("harbormaster.yml"),
        PathBuf::from("harbormaster.toml"),
    ];

    for path in &candidates {
        if path.exists() {
            return Some(path.clone());
        }
    }

    // Check home directory
    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".harbormaster").join("config.json");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Resolve the state directory for persistent data.
fn resolve_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HARBORMASTER_STATE_DIR") {
        return PathBuf::from(dir);
    }

    dirs::home_dir()
        .map(|h| h.join(".harbormaster"))
        .unwrap_or_else(|| PathBuf::from(".harbormaster"))
}

/// Load configuration from a file path.
fn load_config_file(path: &Path) -> Result<ServerConfig> {
    let content = std::fs::read_to_string(path)?;

    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        _ => {
            // Try JSON5 first, then regular JSON
            json5::from_str(&content).or_else(|_| {
                serde_json::from_str(&content).map_err(|e| json5::Error::Message {
                    msg: e.to_string(),
                    location: None,
                })
            })?
        }
    };

    Ok(config)
}
