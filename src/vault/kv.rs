use crate::{
    secrets::{SecretStore, StoreError},
    vault,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{info_span, instrument, Instrument};

/// Vault KV-v2 engine as a [`SecretStore`].
///
/// A secret named `prod/jwt-secret` under mount `secret` is read from
/// `GET /v1/secret/data/prod/jwt-secret`; its `data.data` object is returned as
/// the JSON secret string.
#[derive(Clone)]
pub struct VaultKv {
    client: Client,
    vault_url: String,
    mount: String,
    token: SecretString,
}

impl VaultKv {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(vault_url: &str, mount: &str, token: SecretString) -> anyhow::Result<Self> {
        Ok(Self {
            client: vault::client()?,
            vault_url: vault_url.to_string(),
            mount: mount.trim_matches('/').to_string(),
            token,
        })
    }
}

impl std::fmt::Debug for VaultKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKv")
            .field("vault_url", &self.vault_url)
            .field("mount", &self.mount)
            .field("token", &"***")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretStore for VaultKv {
    #[instrument(skip(self))]
    async fn get_secret_string(&self, name: &str) -> Result<Option<String>, StoreError> {
        let path = format!("/v1/{}/data/{}", self.mount, name.trim_matches('/'));
        let url = vault::endpoint_url(&self.vault_url, &path)
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let span = info_span!("vault.kv.read", http.method = "GET", url = %url);
        let response = self
            .client
            .get(&url)
            .header("X-Vault-Token", self.token.expose_secret())
            .send()
            .instrument(span)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let json_response: Value = response.json().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: json_response["errors"][0]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        let json_response: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        match json_response.get("data").and_then(|data| data.get("data")) {
            Some(data) if data.is_object() => Ok(Some(data.to_string())),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::secrets::{SecretError, SecretProvider, DEFAULT_SECRET_NAME};
    use httpmock::prelude::*;
    use std::sync::Arc;

    const KV_PATH: &str = "/v1/secret/data/prod/jwt-secret";

    fn store(server: &MockServer) -> VaultKv {
        VaultKv::new(
            &server.url("/v1/auth/approle/login"),
            "secret",
            SecretString::from("s.token"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn reads_kv_v2_data() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path(KV_PATH).header("X-Vault-Token", "s.token");
                then.status(200).json_body(serde_json::json!({
                    "data": {
                        "data": {"JWT_SECRET": "from-vault"},
                        "metadata": {"version": 3}
                    }
                }));
            })
            .await;

        let raw = store(&server)
            .get_secret_string(DEFAULT_SECRET_NAME)
            .await
            .unwrap()
            .unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["JWT_SECRET"], "from-vault");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_path_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(KV_PATH);
                then.status(404).json_body(serde_json::json!({"errors": []}));
            })
            .await;

        assert_eq!(store(&server).get_secret_string(DEFAULT_SECRET_NAME).await, Ok(None));
    }

    #[tokio::test]
    async fn permission_denied_is_propagated() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(KV_PATH);
                then.status(403)
                    .json_body(serde_json::json!({"errors": ["permission denied"]}));
            })
            .await;

        assert_eq!(
            store(&server).get_secret_string(DEFAULT_SECRET_NAME).await,
            Err(StoreError::Status {
                status: 403,
                message: "permission denied".to_string()
            })
        );
    }

    #[tokio::test]
    async fn unreachable_vault_is_a_transport_error() {
        let kv = VaultKv::new("http://127.0.0.1:1", "secret", SecretString::from("t")).unwrap();
        assert!(matches!(
            kv.get_secret_string(DEFAULT_SECRET_NAME).await,
            Err(StoreError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn provider_over_vault_fetches_once() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path(KV_PATH);
                then.status(200).json_body(serde_json::json!({
                    "data": {"data": {"JWT_SECRET": "cached"}}
                }));
            })
            .await;
        let provider = Arc::new(SecretProvider::new(Arc::new(store(&server)), DEFAULT_SECRET_NAME));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let provider = provider.clone();
                tokio::spawn(async move { provider.get().await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().expose_secret(), "cached");
        }

        mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn provider_over_vault_reports_missing_secret() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(KV_PATH);
                then.status(404);
            })
            .await;
        let provider = SecretProvider::new(Arc::new(store(&server)), DEFAULT_SECRET_NAME);

        assert!(matches!(provider.get().await, Err(SecretError::NotFound { .. })));
    }
}
