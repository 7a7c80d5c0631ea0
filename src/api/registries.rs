//! Per-environment registry access handler.
//!
//! Kubernetes environments get namespace-scoped access: changing the
//! namespace set reconciles pull secrets in the cluster before the new set is
//! persisted. Every other environment type carries plain user/team policies.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::server::ApiState;
use crate::model::{AccessLevel, EndpointId, RegistryId, TeamId, UserId};
use crate::provision::{synchronize, ProvisionerFactory};
use crate::security::TokenData;
use crate::store::{DataStoreExt, DataStoreTx};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryAccessPayload {
    pub user_policies: HashMap<UserId, AccessLevel>,
    pub team_policies: HashMap<TeamId, AccessLevel>,
    pub namespaces: Vec<String>,
}

/// `PUT /api/endpoints/{id}/registries/{registry_id}` — administrator only.
pub async fn update_access_handler(
    State(state): State<ApiState>,
    Path((endpoint_id, registry_id)): Path<(EndpointId, RegistryId)>,
    token: TokenData,
    Json(payload): Json<RegistryAccessPayload>,
) -> Result<StatusCode, ApiError> {
    if !token.is_admin() {
        return Err(ApiError::Forbidden(
            "administrator access required".to_string(),
        ));
    }

    let provisioners = Arc::clone(&state.provisioners);
    state
        .store
        .execute(state.no_tx, move |tx| {
            Box::pin(async move {
                update_registry_access(tx, provisioners.as_ref(), endpoint_id, registry_id, payload)
                    .await
            })
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn update_registry_access(
    tx: &dyn DataStoreTx,
    provisioners: &dyn ProvisionerFactory,
    endpoint_id: EndpointId,
    registry_id: RegistryId,
    payload: RegistryAccessPayload,
) -> Result<(), ApiError> {
    let endpoint = match tx.endpoint(endpoint_id).await {
        Ok(endpoint) => endpoint,
        Err(err) if err.is_not_found() => {
            return Err(ApiError::NotFound(
                "unable to find an environment with the specified identifier".to_string(),
            ))
        }
        Err(err) => {
            return Err(ApiError::internal(
                "unable to read environment from the datastore",
                err,
            ))
        }
    };

    let mut registry = match tx.registry(registry_id).await {
        Ok(registry) => registry,
        Err(err) if err.is_not_found() => {
            return Err(ApiError::NotFound(
                "unable to find a registry with the specified identifier".to_string(),
            ))
        }
        Err(err) => {
            return Err(ApiError::internal(
                "unable to read registry from the datastore",
                err,
            ))
        }
    };

    let mut access = registry
        .accesses
        .get(&endpoint_id)
        .cloned()
        .unwrap_or_default();

    if endpoint.endpoint_type.is_kubernetes() {
        let provisioner = provisioners.provisioner_for(&endpoint)?;
        synchronize(
            provisioner.as_ref(),
            &registry,
            &access.namespaces,
            &payload.namespaces,
        )
        .await?;

        // External state converged; only now does the desired set persist.
        access.namespaces = payload.namespaces;
    } else {
        access.user_policies = payload.user_policies;
        access.team_policies = payload.team_policies;
    }

    registry.accesses.insert(endpoint_id, access);

    tx.update_registry(&registry)
        .await
        .map_err(|e| ApiError::internal("unable to persist registry changes", e))?;

    info!(
        registry = registry.id,
        endpoint = endpoint_id,
        "registry access updated"
    );
    Ok(())
}
