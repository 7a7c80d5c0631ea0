//! Shared harness for the API integration tests: boots a real server on an
//! ephemeral port with an in-memory datastore and a recording secret
//! provisioner.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use harbormaster::api::{routes, ApiState};
use harbormaster::config::DemoConfig;
use harbormaster::demo::DemoService;
use harbormaster::model::{
    Endpoint, EndpointId, EndpointType, Registry, RegistryAccess, RegistryId, Role, User, UserId,
};
use harbormaster::provision::{ProvisionError, ProvisionerFactory, SecretProvisioner};
use harbormaster::security::{hash_password, JwtService, PasswordStrengthChecker};
use harbormaster::snapshots::SnapshotScheduler;
use harbormaster::store::{DataStoreExt, Store};

/// Password every seeded user starts with.
pub const SEED_PASSWORD: &str = "original-password";

// ============================================================================
// Recording provisioner
// ============================================================================

#[derive(Default)]
pub struct MockProvisioner {
    calls: Mutex<Vec<String>>,
    fail_on_create: Option<String>,
}

impl MockProvisioner {
    pub fn failing_on_create(namespace: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on_create: Some(namespace.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SecretProvisioner for MockProvisioner {
    async fn create_secret(
        &self,
        _registry: &Registry,
        namespace: &str,
    ) -> Result<(), ProvisionError> {
        if self.fail_on_create.as_deref() == Some(namespace) {
            return Err(ProvisionError::Api {
                status: 500,
                op: "create",
                secret: "registry-test".to_string(),
                namespace: namespace.to_string(),
                message: "injected failure".to_string(),
            });
        }
        self.calls.lock().push(format!("create:{namespace}"));
        Ok(())
    }

    async fn delete_secret(
        &self,
        _registry: &Registry,
        namespace: &str,
    ) -> Result<(), ProvisionError> {
        self.calls.lock().push(format!("delete:{namespace}"));
        Ok(())
    }
}

pub struct MockFactory(pub Arc<MockProvisioner>);

impl ProvisionerFactory for MockFactory {
    fn provisioner_for(
        &self,
        _endpoint: &Endpoint,
    ) -> Result<Arc<dyn SecretProvisioner>, ProvisionError> {
        let provisioner: Arc<dyn SecretProvisioner> = self.0.clone();
        Ok(provisioner)
    }
}

// ============================================================================
// Server harness
// ============================================================================

pub struct TestServer {
    pub base_url: String,
    pub store: Store,
    pub jwt: Arc<JwtService>,
    pub provisioner: Arc<MockProvisioner>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn token_for(&self, user: &User) -> String {
        self.jwt.generate_token(user).unwrap()
    }
}

pub fn demo_environment(user_ids: Vec<UserId>) -> DemoService {
    DemoService::from_config(&DemoConfig {
        enabled: true,
        user_ids,
    })
}

/// Boot a server with the given executor mode, demo policy, and provisioner.
pub async fn start_server_with(
    no_tx: bool,
    demo: DemoService,
    provisioner: Arc<MockProvisioner>,
) -> TestServer {
    let store = Store::open_in_memory().unwrap();
    let jwt = Arc::new(JwtService::new(
        b"integration-test-secret",
        Duration::from_secs(3600),
    ));

    let state = ApiState {
        store: store.clone(),
        jwt: Arc::clone(&jwt),
        snapshots: Arc::new(SnapshotScheduler::new(Duration::from_secs(300))),
        demo: Arc::new(demo),
        provisioners: Arc::new(MockFactory(Arc::clone(&provisioner))),
        strength: PasswordStrengthChecker::default(),
        no_tx,
        version: "test".to_string(),
    };

    let app = routes::build_routes(state);

    // Bind to port 0 to get an ephemeral port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        store,
        jwt,
        provisioner,
    }
}

pub async fn start_server(no_tx: bool) -> TestServer {
    start_server_with(no_tx, DemoService::default(), Arc::default()).await
}

// ============================================================================
// Seeding
// ============================================================================

pub async fn seed_user(store: &Store, id: UserId, username: &str, role: Role) -> User {
    let user = User {
        id,
        username: username.to_string(),
        password_hash: hash_password(SEED_PASSWORD).unwrap(),
        role,
        token_issued_at: 0,
    };
    store.direct().update_user(&user).await.unwrap();
    user
}

pub async fn seed_admin(store: &Store) -> User {
    seed_user(store, 1, "admin", Role::Administrator).await
}

pub async fn seed_endpoint(store: &Store, id: EndpointId, endpoint_type: EndpointType) -> Endpoint {
    let endpoint = Endpoint {
        id,
        name: format!("env-{id}"),
        endpoint_type,
        api_url: "https://cluster.example:6443".to_string(),
        access_token: "cluster-token".to_string(),
    };
    store.direct().update_endpoint(&endpoint).await.unwrap();
    endpoint
}

pub async fn seed_registry(
    store: &Store,
    id: RegistryId,
    endpoint_id: EndpointId,
    namespaces: &[&str],
) -> Registry {
    let mut registry = Registry {
        id,
        name: "quay".to_string(),
        url: "quay.example.com".to_string(),
        username: "robot".to_string(),
        password: "hunter2".to_string(),
        accesses: Default::default(),
    };
    registry.accesses.insert(
        endpoint_id,
        RegistryAccess {
            namespaces: namespaces.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
    );
    store.direct().update_registry(&registry).await.unwrap();
    registry
}
