use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type UserId = u64;
pub type TeamId = u64;
pub type EndpointId = u64;
pub type RegistryId = u64;

/// Default template repository served to fresh installations. Updates that
/// set this exact URL skip the reachability/format gate.
pub const DEFAULT_TEMPLATE_REPOSITORY_URL: &str =
    "https://raw.githubusercontent.com/harbormaster/templates/master/templates.json";

/// Default user session lifetime, as a duration string.
pub const DEFAULT_USER_SESSION_TIMEOUT: &str = "8h";

/// Default environment snapshot interval, as a duration string.
pub const DEFAULT_SNAPSHOT_INTERVAL: &str = "5m";

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Standard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// bcrypt hash of the user's password. Never serialized to API clients.
    pub password_hash: String,
    pub role: Role,
    /// Unix timestamp of the last credential change. Tokens minted before
    /// this instant are rejected.
    pub token_issued_at: i64,
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticationMethod {
    #[default]
    Internal,
    Ldap,
    OAuth,
}

impl TryFrom<u8> for AuthenticationMethod {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Internal),
            2 => Ok(Self::Ldap),
            3 => Ok(Self::OAuth),
            other => Err(other),
        }
    }
}

/// A label name/value pair used to hide matching containers from queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPair {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalAuthSettings {
    pub required_password_length: usize,
}

impl Default for InternalAuthSettings {
    fn default() -> Self {
        Self {
            required_password_length: 12,
        }
    }
}

/// Sub-blocks arrive sparse in update payloads, so every field falls back to
/// its default when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LdapSettings {
    pub url: String,
    /// Distinguished name of the account used for read queries.
    pub reader_dn: String,
    /// Password of the reader account. Preserved on update when the incoming
    /// block leaves it empty, redacted on API reads.
    pub password: String,
    pub tls: bool,
    pub start_tls: bool,
    pub tls_skip_verify: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OAuthSettings {
    pub client_id: String,
    /// Preserved on update when the incoming block leaves it empty, redacted
    /// on API reads.
    pub client_secret: String,
    /// Key material for sealing OAuth state in cluster secrets. Preserved on
    /// update when absent from the incoming block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kube_secret_key: Option<Vec<u8>>,
    pub authorization_url: String,
    pub access_token_url: String,
    pub redirect_url: String,
    pub user_identifier: String,
    pub scopes: String,
}

/// The single process-wide configuration aggregate. Persisted whole under a
/// singleton key; mutated by the partial-update merge in `api::settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub authentication_method: AuthenticationMethod,
    pub logo_url: String,
    pub template_repository_url: String,
    pub blacklisted_labels: Vec<LabelPair>,
    pub snapshot_interval: String,
    pub user_session_timeout: String,
    pub kubeconfig_expiry: String,
    pub enable_telemetry: bool,
    pub enable_edge_compute: bool,
    pub internal_auth: InternalAuthSettings,
    pub ldap: LdapSettings,
    pub oauth: OAuthSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            authentication_method: AuthenticationMethod::Internal,
            logo_url: String::new(),
            template_repository_url: DEFAULT_TEMPLATE_REPOSITORY_URL.to_string(),
            blacklisted_labels: Vec::new(),
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL.to_string(),
            user_session_timeout: DEFAULT_USER_SESSION_TIMEOUT.to_string(),
            kubeconfig_expiry: "0".to_string(),
            enable_telemetry: false,
            enable_edge_compute: false,
            internal_auth: InternalAuthSettings::default(),
            ldap: LdapSettings::default(),
            oauth: OAuthSettings::default(),
        }
    }
}

impl Settings {
    /// Blank out secret material before handing the aggregate to an API
    /// client. Clients that round-trip a redacted object back as an update
    /// rely on the merge engine's preservation rules to not lose these.
    pub fn hide_fields(&mut self) {
        self.ldap.password = String::new();
        self.oauth.client_secret = String::new();
        self.oauth.kube_secret_key = None;
    }
}

// ============================================================================
// Registries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    ReadWrite,
    ReadOnly,
}

/// Per-environment access record for a registry. For Kubernetes environments
/// only `namespaces` is meaningful; for every other environment type only the
/// user/team policy maps are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryAccess {
    #[serde(default)]
    pub user_policies: HashMap<UserId, AccessLevel>,
    #[serde(default)]
    pub team_policies: HashMap<TeamId, AccessLevel>,
    #[serde(default)]
    pub namespaces: Vec<String>,
}

pub type RegistryAccesses = HashMap<EndpointId, RegistryAccess>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    pub id: RegistryId,
    pub name: String,
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub accesses: RegistryAccesses,
}

impl Registry {
    /// Name of the pull secret materialized for this registry in a cluster
    /// namespace.
    pub fn secret_name(&self) -> String {
        format!("registry-{}", self.id)
    }
}

// ============================================================================
// Endpoints
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndpointType {
    DockerLocal,
    DockerAgent,
    KubernetesLocal,
    KubernetesAgent,
    KubernetesEdgeAgent,
}

impl EndpointType {
    /// Kubernetes-type environments get namespace-scoped registry access;
    /// everything else gets user/team access policies.
    pub fn is_kubernetes(self) -> bool {
        matches!(
            self,
            Self::KubernetesLocal | Self::KubernetesAgent | Self::KubernetesEdgeAgent
        )
    }
}

/// A managed environment (a Docker host or a Kubernetes cluster).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: EndpointId,
    pub name: String,
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,
    /// Base URL of the environment's API server.
    pub api_url: String,
    /// Bearer token used to authenticate against the environment.
    #[serde(default)]
    pub access_token: String,
}
