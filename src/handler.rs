//! # Handler
//!
//! The per-ConfigMap fetch-and-merge pipeline.
//!
//! One invocation per watch notification: read the directive annotation,
//! normalize its url, GET it, merge the body into the ConfigMap data, and
//! push the update back. The first failure aborts the run and becomes exactly
//! one Warning event on the ConfigMap. ConfigMaps without the annotation are
//! ignored entirely: no fetch, no update, no event.
//!
//! The handler owns no state beyond its collaborators (GET capability, store,
//! event sink), all constructed once at startup and passed in, so concurrent
//! invocations for different objects never interfere. Two concurrent runs for
//! the *same* object race at the store, where version-conflict rejection
//! applies; that surfaces here as an ordinary persist failure.

use crate::constants::{CURL_ME_THAT_ANNOTATION, EVENT_REASON_FAILED};
use crate::directive::{normalize_locator, Directive};
use crate::error::PipelineError;
use crate::events::{object_reference, EventSink};
use crate::fetch::{fetch_body, HttpFetcher};
use crate::metrics;
use crate::store::ConfigMapStore;
use k8s_openapi::api::core::v1::ConfigMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct Handler {
    fetcher: Arc<dyn HttpFetcher>,
    store: Arc<dyn ConfigMapStore>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

impl Handler {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        store: Arc<dyn ConfigMapStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            fetcher,
            store,
            events,
        }
    }

    /// Process one watch notification.
    ///
    /// Never returns an error: a failed run is reported against the ConfigMap
    /// and the notification is done with. Nothing here retries.
    pub async fn process(&self, config_map: &ConfigMap) {
        let Some(value) = config_map
            .metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(CURL_ME_THAT_ANNOTATION))
        else {
            return;
        };

        info!("annotation detected: {}", value);
        metrics::increment_pipeline_runs();

        match self.run(config_map, value).await {
            Ok(data_key) => {
                metrics::increment_config_maps_updated();
                info!(
                    namespace = config_map.metadata.namespace.as_deref().unwrap_or(""),
                    name = config_map.metadata.name.as_deref().unwrap_or(""),
                    data_key = %data_key,
                    "stored fetched content"
                );
            }
            Err(err) => {
                metrics::increment_pipeline_failures(err.reason());
                self.report_failure(config_map, &err).await;
            }
        }
    }

    async fn run(&self, config_map: &ConfigMap, value: &str) -> Result<String, PipelineError> {
        let directive = Directive::parse(value)?;
        let url = normalize_locator(&directive.raw_locator)?;

        let started = Instant::now();
        let body = fetch_body(self.fetcher.as_ref(), &url).await?;
        metrics::observe_fetch_duration(started.elapsed().as_secs_f64());

        self.merge_and_persist(config_map, &directive.data_key, body)
            .await?;
        Ok(directive.data_key)
    }

    /// Upsert `data[data_key] = body` and push the mutated snapshot back.
    ///
    /// Single-key overwrite: every other data entry rides along untouched.
    async fn merge_and_persist(
        &self,
        config_map: &ConfigMap,
        data_key: &str,
        body: String,
    ) -> Result<(), PipelineError> {
        let mut updated = config_map.clone();
        updated
            .data
            .get_or_insert_with(BTreeMap::new)
            .insert(data_key.to_string(), body);

        self.store
            .update(&updated)
            .await
            .map_err(|source| PipelineError::PersistFailed {
                namespace: config_map
                    .metadata
                    .namespace
                    .clone()
                    .unwrap_or_default(),
                name: config_map.metadata.name.clone().unwrap_or_default(),
                source,
            })
    }

    /// Log the failure and attach one Warning event to the ConfigMap.
    async fn report_failure(&self, config_map: &ConfigMap, err: &PipelineError) {
        error!("{err}");

        let reference = object_reference(config_map);
        if let Err(publish_err) = self
            .events
            .emit_warning(&reference, EVENT_REASON_FAILED, &err.to_string())
            .await
        {
            // best-effort; the run is already over
            warn!(
                namespace = config_map.metadata.namespace.as_deref().unwrap_or(""),
                name = config_map.metadata.name.as_deref().unwrap_or(""),
                "could not publish warning event: {publish_err:#}"
            );
        }
    }
}
