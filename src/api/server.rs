use anyhow::{Context, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{ServerConfig, GENERATED_JWT_SECRET_LEN};
use crate::demo::DemoService;
use crate::duration;
use crate::provision::{KubeProvisionerFactory, ProvisionerFactory};
use crate::security::{JwtService, PasswordStrengthChecker};
use crate::snapshots::SnapshotScheduler;
use crate::store::{DataStoreExt, Store};

use super::routes;

/// Shared state for the API server.
#[derive(Clone)]
pub struct ApiState {
    pub store: Store,
    pub jwt: Arc<JwtService>,
    pub snapshots: Arc<SnapshotScheduler>,
    pub demo: Arc<DemoService>,
    pub provisioners: Arc<dyn ProvisionerFactory>,
    pub strength: PasswordStrengthChecker,
    /// Executor-mode flag: when set, mutations run without a transaction.
    pub no_tx: bool,
    pub version: String,
}

/// The API server.
pub struct ApiServer {
    state: ApiState,
    addr: SocketAddr,
}

impl ApiServer {
    /// Open the datastore and assemble the server state.
    pub async fn start(config: ServerConfig) -> Result<Self> {
        let store = Store::open(&config.store_path())
            .with_context(|| format!("opening datastore at {}", config.store_path().display()))?;

        let settings = store.direct().settings().await?;

        let session_lifetime = parse_stored_duration(
            &settings.user_session_timeout,
            "userSessionTimeout",
            Duration::from_secs(8 * 3600),
        );
        let snapshot_interval = parse_stored_duration(
            &settings.snapshot_interval,
            "snapshotInterval",
            Duration::from_secs(300),
        );

        let secret = match &config.auth.jwt_secret {
            Some(secret) => secret.clone(),
            None => {
                warn!("no JWT secret configured; generating an ephemeral one — sessions will not survive a restart");
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(GENERATED_JWT_SECRET_LEN)
                    .map(char::from)
                    .collect()
            }
        };

        let addr: SocketAddr = format!("{}:{}", config.http.bind, config.http.port)
            .parse()
            .with_context(|| format!("invalid bind address {}", config.http.bind))?;

        let state = ApiState {
            store,
            jwt: Arc::new(JwtService::new(secret.as_bytes(), session_lifetime)),
            snapshots: Arc::new(SnapshotScheduler::new(snapshot_interval)),
            demo: Arc::new(DemoService::from_config(&config.demo)),
            provisioners: Arc::new(KubeProvisionerFactory::new()),
            strength: PasswordStrengthChecker::default(),
            no_tx: config.features.disable_transactions,
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        info!("API server binding to {}", addr);

        Ok(Self { state, addr })
    }

    /// Run the server until a shutdown signal is received.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let app = routes::build_routes(self.state.clone());

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(
            "Harbormaster v{} listening on {}",
            self.state.version, self.addr
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server shut down gracefully");
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Stored duration strings were validated when written, so a parse failure
/// here means hand-edited or corrupt data; fall back rather than refusing to
/// boot.
fn parse_stored_duration(text: &str, field: &str, fallback: Duration) -> Duration {
    match duration::parse(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(field, %err, "stored duration is invalid, using fallback");
            fallback
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
