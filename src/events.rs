//! # Failure Events
//!
//! Structured Warning events for failed pipeline runs.
//!
//! The sink is a trait so tests can capture events in memory; the production
//! implementation publishes through the `kube-runtime` event recorder, the
//! Rust counterpart of a core/v1 event broadcaster. The recorder is
//! constructed once at startup and handed to the handler; there is no
//! process-wide broadcaster singleton.

use crate::constants::{EVENT_ACTION, EVENT_COMPONENT};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, ObjectReference};
use kube::{Client, Resource};
use kube_runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::error;

/// Emit capability for Warning events addressed to a watched object.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit_warning(
        &self,
        reference: &ObjectReference,
        reason: &str,
        message: &str,
    ) -> Result<()>;
}

/// Production sink publishing events through the Kubernetes events API.
#[derive(Clone)]
pub struct KubeEventSink {
    recorder: Recorder,
}

impl std::fmt::Debug for KubeEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventSink").finish_non_exhaustive()
    }
}

impl KubeEventSink {
    #[must_use]
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: EVENT_COMPONENT.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn emit_warning(
        &self,
        reference: &ObjectReference,
        reason: &str,
        message: &str,
    ) -> Result<()> {
        self.recorder
            .publish(
                &Event {
                    type_: EventType::Warning,
                    reason: reason.to_string(),
                    note: Some(message.to_string()),
                    action: EVENT_ACTION.to_string(),
                    secondary: None,
                },
                reference,
            )
            .await
            .context("publishing warning event")?;
        Ok(())
    }
}

/// Resolve the event reference for a ConfigMap snapshot.
///
/// Snapshots come from the watch stream, which only delivers named,
/// namespaced objects. A snapshot missing either field means the process is
/// operating on data it cannot report against, so this terminates instead of
/// limping on.
#[must_use]
pub fn object_reference(config_map: &ConfigMap) -> ObjectReference {
    if config_map.metadata.name.is_none() || config_map.metadata.namespace.is_none() {
        error!(
            name = config_map.metadata.name.as_deref().unwrap_or(""),
            namespace = config_map.metadata.namespace.as_deref().unwrap_or(""),
            "config map snapshot is missing its name or namespace, cannot address events; aborting"
        );
        std::process::exit(1);
    }
    config_map.object_ref(&())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_reference_points_at_the_config_map() {
        let config_map: ConfigMap = serde_json::from_value(serde_json::json!({
            "metadata": {"name": "test-config-map", "namespace": "testns"}
        }))
        .unwrap();

        let reference = object_reference(&config_map);
        assert_eq!(reference.name.as_deref(), Some("test-config-map"));
        assert_eq!(reference.namespace.as_deref(), Some("testns"));
        assert_eq!(reference.kind.as_deref(), Some("ConfigMap"));
    }
}
