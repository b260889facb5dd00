use std::collections::HashMap;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

const SECTION_SEPARATOR: &str = "--";

#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// The base URL of the vault, e.g. `https://vault.internal:8200`.
    pub endpoint: String,

    #[serde(default = "default_mount")]
    /// The mount point of the KV secrets engine.
    ///
    /// Defaults to `secret`.
    pub mount: String,

    #[serde(default = "default_path")]
    /// The secret path within the mount.
    ///
    /// Defaults to `photoshelf`.
    pub path: String,

    #[serde(default = "default_token_env")]
    /// The environment variable holding the vault access token.
    ///
    /// Defaults to `VAULT_TOKEN`.
    pub token_env: String,
}

fn default_mount() -> String {
    "secret".to_string()
}

fn default_path() -> String {
    "photoshelf".to_string()
}

fn default_token_env() -> String {
    "VAULT_TOKEN".to_string()
}

#[derive(Deserialize)]
struct SecretResponse {
    data: SecretData,
}

#[derive(Deserialize)]
struct SecretData {
    data: HashMap<String, String>,
}

/// Reads the secrets stored at the configured path of a KV (version 2) secrets engine.
pub async fn fetch_secrets(cfg: &VaultConfig) -> anyhow::Result<HashMap<String, String>> {
    let token = std::env::var(&cfg.token_env)
        .with_context(|| format!("Vault token variable {} is not set", &cfg.token_env))?;

    fetch_secrets_with_token(cfg, &token).await
}

pub(crate) async fn fetch_secrets_with_token(
    cfg: &VaultConfig,
    token: &str,
) -> anyhow::Result<HashMap<String, String>> {
    let url = format!(
        "{}/v1/{}/data/{}",
        cfg.endpoint.trim_end_matches('/'),
        cfg.mount.trim_matches('/'),
        cfg.path.trim_matches('/'),
    );

    debug!("Fetching secrets from vault @ {}", &url);
    let response = reqwest::Client::new()
        .get(&url)
        .header("X-Vault-Token", token)
        .send()
        .await
        .with_context(|| format!("Failed to reach vault @ {}", &cfg.endpoint))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("Vault responded to secret read with status {}", status));
    }

    let body: SecretResponse = response
        .json()
        .await
        .context("Vault returned a malformed secret payload")?;

    Ok(body.data.data)
}

/// Overlays the given secrets onto the raw config, creating any missing sections.
///
/// A secret name uses `--` to separate config sections, so a secret called
/// `backend--blobstorage--secret_key` sets `backend.blobstorage.secret_key`.
/// Numbers and booleans are kept as such unless they replace a string value.
pub fn merge_secrets(config: &mut Value, secrets: HashMap<String, String>) {
    for (name, secret) in secrets {
        let mut sections: Vec<&str> = name.split(SECTION_SEPARATOR).collect();
        let leaf = match sections.pop() {
            Some(leaf) if !leaf.is_empty() => leaf,
            _ => continue,
        };

        let mut target = &mut *config;
        for section in sections {
            target = &mut ensure_mapping(target)[section];
        }

        debug!("Applying vault secret {}", &name);
        let section = ensure_mapping(target);
        let value = secret_value(&section[leaf], secret);
        section[leaf] = value;
    }
}

fn secret_value(existing: &Value, secret: String) -> Value {
    if existing.is_string() {
        return Value::String(secret);
    }

    match serde_yaml::from_str::<Value>(&secret) {
        Ok(value @ (Value::Bool(_) | Value::Number(_))) => value,
        _ => Value::String(secret),
    }
}

/// Replaces anything that isn't a mapping, including missing sections, with an empty one.
fn ensure_mapping(value: &mut Value) -> &mut Value {
    if !value.is_mapping() {
        *value = Value::Mapping(Mapping::new());
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::storage::backends::BackendConfigs;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vault_config(endpoint: String) -> VaultConfig {
        VaultConfig {
            endpoint,
            mount: default_mount(),
            path: default_path(),
            token_env: default_token_env(),
        }
    }

    #[tokio::test]
    async fn test_fetch_secrets() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/data/photoshelf"))
            .and(header("X-Vault-Token", "s.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "data": {
                        "backend--blobstorage--secret_key": "hunter2",
                    },
                    "metadata": {
                        "version": 3,
                    },
                },
            })))
            .mount(&server)
            .await;

        let secrets = fetch_secrets_with_token(&vault_config(server.uri()), "s.test").await?;
        assert_eq!(
            secrets.get("backend--blobstorage--secret_key").map(String::as_str),
            Some("hunter2"),
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_secrets_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let res = fetch_secrets_with_token(&vault_config(server.uri()), "s.bad").await;
        assert!(res.is_err());
    }

    #[test]
    fn test_merge_secrets() -> anyhow::Result<()> {
        let mut raw: Value = serde_yaml::from_str(
            "backend:\n  blobstorage:\n    region: eu-west-1\n    access_key: placeholder\n",
        )?;

        let mut secrets = HashMap::new();
        secrets.insert("backend--blobstorage--access_key".to_string(), "12345".to_string());
        secrets.insert("photos--blob_prefix".to_string(), "Shelf".to_string());
        secrets.insert("broken--".to_string(), "ignored".to_string());
        merge_secrets(&mut raw, secrets);

        assert_eq!(raw["backend"]["blobstorage"]["access_key"].as_str(), Some("12345"));
        assert_eq!(raw["backend"]["blobstorage"]["region"].as_str(), Some("eu-west-1"));
        assert_eq!(raw["photos"]["blob_prefix"].as_str(), Some("Shelf"));
        assert!(raw.get("broken").is_none());

        Ok(())
    }

    #[test]
    fn test_typed_secrets_deserialize() -> anyhow::Result<()> {
        let mut raw: Value = serde_yaml::from_str(include_str!("../tests/configs/blob-storage.yaml"))?;

        let mut secrets = HashMap::new();
        secrets.insert("backend--blobstorage--request_timeout".to_string(), "60".to_string());
        secrets.insert("photos--remove_empty_containers".to_string(), "false".to_string());
        secrets.insert("photos--max_upload_size".to_string(), "2048".to_string());
        merge_secrets(&mut raw, secrets);

        let cfg: RuntimeConfig = serde_yaml::from_value(raw)?;
        match cfg.backend {
            BackendConfigs::BlobStorage { request_timeout, .. } => {
                assert_eq!(request_timeout, Some(60));
            },
            other => panic!("unexpected backend {:?}", other),
        }
        assert!(!cfg.photos.remove_empty_containers);
        assert_eq!(cfg.photos.max_upload_size, Some(2048));

        Ok(())
    }
}
