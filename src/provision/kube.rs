//! Kubernetes implementation of the secret provisioner.
//!
//! Registry credentials are materialized per namespace as
//! `kubernetes.io/dockerconfigjson` pull secrets via the cluster REST API.
//! Delete-of-missing and create-of-existing are treated as no-ops so that a
//! replayed reconciliation converges instead of failing.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::debug;

use crate::model::{Endpoint, Registry};

use super::sync::{ProvisionError, ProvisionerFactory, SecretProvisioner};

#[derive(Debug)]
pub struct KubeSecretClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl KubeSecretClient {
    pub fn new(http: reqwest::Client, endpoint: &Endpoint) -> Result<Self, ProvisionError> {
        let base_url = endpoint.api_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ProvisionError::InvalidEndpoint(endpoint.name.clone()));
        }
        Ok(Self {
            http,
            base_url,
            token: endpoint.access_token.clone(),
        })
    }

    fn secret_url(&self, namespace: &str, name: Option<&str>) -> String {
        match name {
            Some(name) => format!(
                "{}/api/v1/namespaces/{}/secrets/{}",
                self.base_url, namespace, name
            ),
            None => format!("{}/api/v1/namespaces/{}/secrets", self.base_url, namespace),
        }
    }

    /// Secret manifest carrying the registry's pull credentials.
    fn secret_manifest(registry: &Registry, namespace: &str) -> serde_json::Value {
        let auth = BASE64.encode(format!("{}:{}", registry.username, registry.password));
        let dockerconfig = serde_json::json!({
            "auths": {
                &registry.url: {
                    "username": registry.username,
                    "password": registry.password,
                    "auth": auth,
                }
            }
        });

        serde_json::json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": registry.secret_name(),
                "namespace": namespace,
            },
            "type": "kubernetes.io/dockerconfigjson",
            "stringData": {
                ".dockerconfigjson": dockerconfig.to_string(),
            }
        })
    }

    async fn api_error(
        response: reqwest::Response,
        op: &'static str,
        secret: &str,
        namespace: &str,
    ) -> ProvisionError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        ProvisionError::Api {
            status,
            op,
            secret: secret.to_string(),
            namespace: namespace.to_string(),
            message,
        }
    }
}

#[async_trait]
impl SecretProvisioner for KubeSecretClient {
    async fn create_secret(
        &self,
        registry: &Registry,
        namespace: &str,
    ) -> Result<(), ProvisionError> {
        let name = registry.secret_name();
        let response = self
            .http
            .post(self.secret_url(namespace, None))
            .bearer_auth(&self.token)
            .json(&Self::secret_manifest(registry, namespace))
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            debug!(namespace, secret = %name, "secret already present");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response, "create", &name, namespace).await);
        }

        debug!(namespace, secret = %name, "registry secret created");
        Ok(())
    }

    async fn delete_secret(
        &self,
        registry: &Registry,
        namespace: &str,
    ) -> Result<(), ProvisionError> {
        let name = registry.secret_name();
        let response = self
            .http
            .delete(self.secret_url(namespace, Some(&name)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(namespace, secret = %name, "secret already absent");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response, "delete", &name, namespace).await);
        }

        debug!(namespace, secret = %name, "registry secret deleted");
        Ok(())
    }
}

/// Builds one [`KubeSecretClient`] per environment, sharing the HTTP client.
#[derive(Clone, Default)]
pub struct KubeProvisionerFactory {
    http: reqwest::Client,
}

impl KubeProvisionerFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProvisionerFactory for KubeProvisionerFactory {
    fn provisioner_for(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Arc<dyn SecretProvisioner>, ProvisionError> {
        Ok(Arc::new(KubeSecretClient::new(
            self.http.clone(),
            endpoint,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EndpointType;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_endpoint(api_url: &str) -> Endpoint {
        Endpoint {
            id: 3,
            name: "prod-cluster".to_string(),
            endpoint_type: EndpointType::KubernetesAgent,
            api_url: api_url.to_string(),
            access_token: "cluster-token".to_string(),
        }
    }

    fn test_registry() -> Registry {
        Registry {
            id: 9,
            name: "quay".to_string(),
            url: "quay.example.com".to_string(),
            username: "robot".to_string(),
            password: "hunter2".to_string(),
            accesses: Default::default(),
        }
    }

    #[tokio::test]
    async fn creates_dockerconfigjson_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/namespaces/ns1/secrets"))
            .and(body_partial_json(serde_json::json!({
                "kind": "Secret",
                "type": "kubernetes.io/dockerconfigjson",
                "metadata": { "name": "registry-9" }
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = KubeSecretClient::new(reqwest::Client::new(), &test_endpoint(&server.uri()))
            .unwrap();
        client.create_secret(&test_registry(), "ns1").await.unwrap();
    }

    #[tokio::test]
    async fn create_conflict_is_a_no_op() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/namespaces/ns1/secrets"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let client = KubeSecretClient::new(reqwest::Client::new(), &test_endpoint(&server.uri()))
            .unwrap();
        client.create_secret(&test_registry(), "ns1").await.unwrap();
    }

    #[tokio::test]
    async fn delete_missing_is_a_no_op() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/namespaces/ns1/secrets/registry-9"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = KubeSecretClient::new(reqwest::Client::new(), &test_endpoint(&server.uri()))
            .unwrap();
        client.delete_secret(&test_registry(), "ns1").await.unwrap();
    }

    #[tokio::test]
    async fn server_errors_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/namespaces/ns1/secrets/registry-9"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let client = KubeSecretClient::new(reqwest::Client::new(), &test_endpoint(&server.uri()))
            .unwrap();
        let err = client
            .delete_secret(&test_registry(), "ns1")
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn empty_api_url_is_rejected() {
        let err = KubeSecretClient::new(reqwest::Client::new(), &test_endpoint("")).unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidEndpoint(_)));
    }
}
