//! Settings read/update handlers and the partial-update merge engine.
//!
//! The update payload is sparse: absent fields leave the aggregate untouched,
//! present fields are applied under per-field policy (plain overwrite,
//! secret preservation, demo suppression, gated URL validation, duration
//! re-derivation). Dependent-subsystem reconfigurations are collected as
//! [`SettingsSideEffects`] and applied by the handler only after the merged
//! aggregate has been persisted as a whole.

use axum::extract::{Json, State};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::api::error::ApiError;
use crate::api::server::ApiState;
use crate::demo::DemoService;
use crate::duration;
use crate::model::{
    AuthenticationMethod, LabelPair, LdapSettings, OAuthSettings, Settings,
    DEFAULT_TEMPLATE_REPOSITORY_URL,
};
use crate::security::TokenData;
use crate::store::{DataStoreExt, DataStoreTx};

// ============================================================================
// Payload
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalAuthPayload {
    pub required_password_length: usize,
}

/// Sparse settings update. Every field is optional; `None` means "leave the
/// persisted value alone".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdatePayload {
    /// 1 = internal, 2 = LDAP, 3 = OAuth.
    pub authentication_method: Option<u8>,
    pub logo_url: Option<String>,
    pub blacklisted_labels: Option<Vec<LabelPair>>,
    pub internal_auth: Option<InternalAuthPayload>,
    pub ldap: Option<LdapSettings>,
    pub oauth: Option<OAuthSettings>,
    pub snapshot_interval: Option<String>,
    pub template_repository_url: Option<String>,
    pub user_session_timeout: Option<String>,
    pub kubeconfig_expiry: Option<String>,
    pub enable_telemetry: Option<bool>,
    pub enable_edge_compute: Option<bool>,
}

fn validate_payload(payload: &SettingsUpdatePayload) -> Result<(), ApiError> {
    if let Some(method) = payload.authentication_method {
        AuthenticationMethod::try_from(method).map_err(|v| {
            ApiError::InvalidInput(format!(
                "invalid authentication method value {v}; must be 1 (internal), 2 (LDAP) or 3 (OAuth)"
            ))
        })?;
    }

    let url_fields = [
        ("logoURL", &payload.logo_url),
        ("templateRepositoryURL", &payload.template_repository_url),
    ];
    for (field, value) in url_fields {
        if let Some(url) = value {
            if !url.is_empty() && Url::parse(url).is_err() {
                return Err(ApiError::InvalidInput(format!(
                    "invalid {field}: must be a valid URL"
                )));
            }
        }
    }

    let duration_fields = [
        ("userSessionTimeout", &payload.user_session_timeout),
        ("kubeconfigExpiry", &payload.kubeconfig_expiry),
        ("snapshotInterval", &payload.snapshot_interval),
    ];
    for (field, value) in duration_fields {
        if let Some(text) = value {
            duration::parse(text)
                .map_err(|err| ApiError::InvalidInput(format!("invalid {field}: {err}")))?;
        }
    }

    Ok(())
}

// ============================================================================
// Merge engine
// ============================================================================

/// Dependent-subsystem reconfigurations produced by a merge. Carried out by
/// the caller only after the merge as a whole has succeeded and persisted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SettingsSideEffects {
    pub session_lifetime: Option<Duration>,
    pub snapshot_interval: Option<Duration>,
}

/// Apply `payload` onto `settings` under per-field policy. On error the
/// in-memory aggregate must be discarded; nothing has been persisted.
pub fn merge_settings(
    settings: &mut Settings,
    mut payload: SettingsUpdatePayload,
    demo: &DemoService,
) -> Result<SettingsSideEffects, ApiError> {
    let mut effects = SettingsSideEffects::default();

    // Demo installations cannot rebrand or toggle telemetry. Suppression runs
    // before any field policy.
    if demo.is_demo() {
        payload.enable_telemetry = None;
        payload.logo_url = None;
    }

    if let Some(method) = payload.authentication_method {
        settings.authentication_method = AuthenticationMethod::try_from(method)
            .map_err(|v| ApiError::InvalidInput(format!("invalid authentication method value {v}")))?;
    }

    if let Some(logo_url) = payload.logo_url {
        settings.logo_url = logo_url;
    }

    if let Some(labels) = payload.blacklisted_labels {
        settings.blacklisted_labels = labels;
    }

    if let Some(internal) = payload.internal_auth {
        settings.internal_auth.required_password_length = internal.required_password_length;
    }

    if let Some(template_url) = payload.template_repository_url {
        if template_url.is_empty() {
            settings.template_repository_url = String::new();
        } else {
            let normalized = template_url.to_lowercase().trim_end_matches('/').to_string();

            // Only gate values that actually change something and are not the
            // known-good default.
            if normalized != settings.template_repository_url
                && normalized != DEFAULT_TEMPLATE_REPOSITORY_URL
            {
                validate_template_repository(&normalized)?;
            }

            settings.template_repository_url = normalized;
        }
    }

    if let Some(ldap) = payload.ldap {
        settings.ldap = merge_ldap(&settings.ldap, ldap);
    }

    if let Some(oauth) = payload.oauth {
        settings.oauth = merge_oauth(&settings.oauth, oauth);
    }

    if let Some(interval) = payload.snapshot_interval {
        if interval != settings.snapshot_interval {
            let parsed = duration::parse(&interval)
                .map_err(|err| ApiError::InvalidInput(format!("invalid snapshotInterval: {err}")))?;
            settings.snapshot_interval = interval;
            effects.snapshot_interval = Some(parsed);
        }
    }

    if let Some(timeout) = payload.user_session_timeout {
        let parsed = duration::parse(&timeout)
            .map_err(|err| ApiError::InvalidInput(format!("invalid userSessionTimeout: {err}")))?;
        settings.user_session_timeout = timeout;
        effects.session_lifetime = Some(parsed);
    }

    if let Some(expiry) = payload.kubeconfig_expiry {
        duration::parse(&expiry)
            .map_err(|err| ApiError::InvalidInput(format!("invalid kubeconfigExpiry: {err}")))?;
        settings.kubeconfig_expiry = expiry;
    }

    if let Some(enabled) = payload.enable_telemetry {
        settings.enable_telemetry = enabled;
    }

    if let Some(enabled) = payload.enable_edge_compute {
        settings.enable_edge_compute = enabled;
    }

    Ok(effects)
}

/// The incoming block replaces the stored one, except that empty secret
/// sub-fields keep their stored values — clients round-trip redacted
/// settings objects back as updates.
fn merge_ldap(current: &LdapSettings, mut incoming: LdapSettings) -> LdapSettings {
    if incoming.reader_dn.is_empty() {
        incoming.reader_dn = current.reader_dn.clone();
    }
    if incoming.password.is_empty() {
        incoming.password = current.password.clone();
    }
    incoming
}

fn merge_oauth(current: &OAuthSettings, mut incoming: OAuthSettings) -> OAuthSettings {
    if incoming.client_secret.is_empty() {
        incoming.client_secret = current.client_secret.clone();
    }
    if incoming.kube_secret_key.is_none() {
        incoming.kube_secret_key = current.kube_secret_key.clone();
    }
    incoming
}

fn validate_template_repository(url: &str) -> Result<(), ApiError> {
    let parsed = Url::parse(url).map_err(|_| {
        ApiError::InvalidInput("invalid templateRepositoryURL: must be a valid URL".to_string())
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ApiError::InvalidInput(
            "invalid templateRepositoryURL: must use http or https".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /api/settings` — administrator only, secrets redacted.
pub async fn inspect_handler(
    State(state): State<ApiState>,
    token: TokenData,
) -> Result<Json<Settings>, ApiError> {
    require_admin(&token)?;

    let mut settings = state
        .store
        .direct()
        .settings()
        .await
        .map_err(|e| ApiError::internal("unable to retrieve settings from the datastore", e))?;
    settings.hide_fields();
    Ok(Json(settings))
}

/// `PUT /api/settings` — administrator only.
pub async fn update_handler(
    State(state): State<ApiState>,
    token: TokenData,
    Json(payload): Json<SettingsUpdatePayload>,
) -> Result<Json<Settings>, ApiError> {
    require_admin(&token)?;
    validate_payload(&payload)?;

    let demo = Arc::clone(&state.demo);
    let (mut settings, effects) = state
        .store
        .execute(state.no_tx, move |tx| {
            Box::pin(async move { apply_update(tx, payload, &demo).await })
        })
        .await?;

    // Deferred side effects: the merge persisted as a whole, so dependent
    // subsystems may now observe the new values.
    if let Some(lifetime) = effects.session_lifetime {
        state.jwt.set_user_session_duration(lifetime);
    }
    if let Some(interval) = effects.snapshot_interval {
        state.snapshots.set_interval(interval);
    }

    settings.hide_fields();
    Ok(Json(settings))
}

async fn apply_update(
    tx: &dyn DataStoreTx,
    payload: SettingsUpdatePayload,
    demo: &DemoService,
) -> Result<(Settings, SettingsSideEffects), ApiError> {
    let mut settings = tx
        .settings()
        .await
        .map_err(|e| ApiError::internal("unable to retrieve settings from the datastore", e))?;

    let effects = merge_settings(&mut settings, payload, demo)?;

    tx.update_settings(&settings)
        .await
        .map_err(|e| ApiError::internal("unable to persist settings changes", e))?;

    Ok((settings, effects))
}

fn require_admin(token: &TokenData) -> Result<(), ApiError> {
    if token.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "administrator access required".to_string(),
        ))
    }
}
