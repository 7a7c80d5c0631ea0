use serde::{Deserialize, Serialize};

use crate::config::defaults::{DEFAULT_API_PORT, DEFAULT_BIND_ADDRESS};
use crate::model::UserId;

// ============================================================================
// HTTP
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_API_PORT
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Secret used to sign session tokens. A random secret is generated at
    /// startup when unset, which invalidates sessions across restarts.
    pub jwt_secret: Option<String>,
}

// ============================================================================
// Features
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeatureConfig {
    /// Run datastore mutations directly instead of inside a transaction.
    #[serde(default)]
    pub disable_transactions: bool,
}

// ============================================================================
// Demo
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DemoConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub user_ids: Vec<UserId>,
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Path of the SQLite database. Defaults to `<state_dir>/harbormaster.db`.
    pub path: Option<String>,
}
