//! Drives an external secret provisioner to converge cluster state with a
//! registry's desired namespace set.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{Endpoint, Registry};

use super::reconcile::reconcile;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("cluster API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("cluster API returned {status} while trying to {op} secret {secret} in namespace {namespace}: {message}")]
    Api {
        status: u16,
        op: &'static str,
        secret: String,
        namespace: String,
        message: String,
    },
    #[error("environment {0} has no usable API URL")]
    InvalidEndpoint(String),
}

/// External secret lifecycle, scoped to one target cluster.
#[async_trait]
pub trait SecretProvisioner: Send + Sync {
    async fn create_secret(&self, registry: &Registry, namespace: &str)
        -> Result<(), ProvisionError>;
    async fn delete_secret(&self, registry: &Registry, namespace: &str)
        -> Result<(), ProvisionError>;
}

/// Produces a provisioner bound to a specific environment. Tests substitute
/// a recording implementation.
pub trait ProvisionerFactory: Send + Sync {
    fn provisioner_for(
        &self,
        endpoint: &Endpoint,
    ) -> Result<std::sync::Arc<dyn SecretProvisioner>, ProvisionError>;
}

/// Converge the cluster's registry secrets from `old_namespaces` to
/// `new_namespaces`.
///
/// All removals are issued before any additions, sequentially, and the first
/// failure aborts the whole operation with the error propagated unchanged.
/// Nothing is persisted here: the caller stores the new namespace set only
/// after this returns success, and a replay against already-converged state
/// issues zero calls.
pub async fn synchronize(
    provisioner: &dyn SecretProvisioner,
    registry: &Registry,
    old_namespaces: &[String],
    new_namespaces: &[String],
) -> Result<(), ProvisionError> {
    let delta = reconcile(old_namespaces, new_namespaces);
    if delta.is_empty() {
        debug!(registry = registry.id, "registry access already converged");
        return Ok(());
    }

    for namespace in &delta.to_remove {
        provisioner.delete_secret(registry, namespace).await?;
    }

    for namespace in &delta.to_add {
        provisioner.create_secret(registry, namespace).await?;
    }

    info!(
        registry = registry.id,
        added = delta.to_add.len(),
        removed = delta.to_remove.len(),
        "registry secrets reconciled"
    );
    Ok(())
}
