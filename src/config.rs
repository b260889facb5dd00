use std::path::Path;
use anyhow::Context;
use serde::Deserialize;

use crate::storage::backends::BackendConfigs;
use crate::vault::{self, VaultConfig};

#[derive(Debug, Deserialize)]
pub struct RuntimeConfig {
    /// The set storage backend configuration.
    pub backend: BackendConfigs,

    #[serde(default)]
    /// How photos are named and cleaned up.
    pub photos: PhotoConfig,

    /// The (optional) secrets vault merged into this config at start up.
    ///
    /// Any secrets are applied before the backend is connected.
    pub vault: Option<VaultConfig>,
}

impl RuntimeConfig {
    /// Reads the config file, merging in any secrets from the configured
    /// vault before deserializing it.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        Self::from_yaml(&data).await
    }

    pub async fn from_yaml(data: &str) -> anyhow::Result<Self> {
        let mut raw: serde_yaml::Value = serde_yaml::from_str(data)?;

        let vault_cfg = match raw.get("vault") {
            Some(value) if !value.is_null() => {
                Some(serde_yaml::from_value::<VaultConfig>(value.clone())?)
            },
            _ => None,
        };

        if let Some(cfg) = vault_cfg.filter(|cfg| !cfg.endpoint.trim().is_empty()) {
            let secrets = vault::fetch_secrets(&cfg).await?;
            info!("Merging {} secret(s) from vault @ {}", secrets.len(), &cfg.endpoint);
            vault::merge_secrets(&mut raw, secrets);
        }

        Ok(serde_yaml::from_value(raw)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct PhotoConfig {
    #[serde(default = "default_blob_prefix")]
    /// The prefix every generated blob name starts with.
    ///
    /// Defaults to `ProductPhoto`.
    pub blob_prefix: String,

    #[serde(default = "default_true")]
    /// Remove a category's container once its last photo is deleted.
    ///
    /// Defaults to `true`.
    pub remove_empty_containers: bool,

    #[serde(default)]
    /// The maximum photo size in bytes, unlimited if not set.
    pub max_upload_size: Option<usize>,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            blob_prefix: default_blob_prefix(),
            remove_empty_containers: true,
            max_upload_size: None,
        }
    }
}

fn default_blob_prefix() -> String {
    "ProductPhoto".to_string()
}

const fn default_true() -> bool {
    true
}
