//! # ConfigMap Store
//!
//! Write access to the cluster's ConfigMaps, behind a trait so the pipeline
//! can persist through a test double.
//!
//! The pipeline only ever updates; reads come in through the watch stream.

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, PostParams};
use kube::Client;

/// Update capability for watched ConfigMaps.
///
/// Concurrency control is the store's problem: a version-conflict rejection
/// comes back as an ordinary `Err`, which the pipeline treats like any other
/// persist failure.
#[async_trait]
pub trait ConfigMapStore: Send + Sync {
    async fn update(&self, config_map: &ConfigMap) -> Result<()>;
}

/// Production store backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeConfigMapStore {
    client: Client,
}

impl std::fmt::Debug for KubeConfigMapStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeConfigMapStore").finish_non_exhaustive()
    }
}

impl KubeConfigMapStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigMapStore for KubeConfigMapStore {
    async fn update(&self, config_map: &ConfigMap) -> Result<()> {
        let name = config_map
            .metadata
            .name
            .as_deref()
            .context("config map has no name")?;
        let namespace = config_map
            .metadata
            .namespace
            .as_deref()
            .unwrap_or("default");

        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        api.replace(name, &PostParams::default(), config_map)
            .await
            .with_context(|| format!("replacing config map {namespace}/{name}"))?;

        Ok(())
    }
}
