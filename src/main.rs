//! # Curl Me That Controller
//!
//! A Kubernetes controller that fetches URLs named in ConfigMap annotations
//! and stores the response in the ConfigMap data.
//!
//! ## Overview
//!
//! 1. **Watching ConfigMaps** - Subscribes to ConfigMap changes, cluster-wide
//!    or in a single namespace
//! 2. **Directive annotation** - A ConfigMap annotated with
//!    `x-k8s.io/curl-me-that: mykey=example.com` asks for `example.com` to be
//!    fetched (scheme defaults to `http`)
//! 3. **Merge** - The response body lands under `data.mykey`; every other
//!    data entry is preserved
//! 4. **Failure events** - Any failed run attaches one Warning event with
//!    reason `Failed` to the ConfigMap
//! 5. **Observability** - Prometheus metrics and health probes over HTTP
//!
//! ## Usage
//!
//! ```bash
//! # In-cluster, or with the ambient kubeconfig
//! curl-me-that-controller
//!
//! # Out-of-cluster against a specific kubeconfig, one namespace only
//! curl-me-that-controller --kubeconfig ~/.kube/config --namespace testns
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use futures::TryStreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::Api;
use kube::config::{Config, KubeConfigOptions, Kubeconfig};
use kube::Client;
use kube_runtime::{predicates, watcher, WatchStreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use curl_me_that_controller::constants::{
    DEFAULT_METRICS_PORT, DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
    DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use curl_me_that_controller::events::KubeEventSink;
use curl_me_that_controller::fetch::ReqwestFetcher;
use curl_me_that_controller::handler::Handler;
use curl_me_that_controller::metrics;
use curl_me_that_controller::server::{start_server, ServerState};
use curl_me_that_controller::store::KubeConfigMapStore;

/// Curl Me That Controller
#[derive(Debug, Parser)]
#[command(name = "curl-me-that-controller", version)]
struct Args {
    /// Path to a kubeconfig. Only required if out-of-cluster.
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Watch a single namespace instead of the whole cluster.
    #[arg(long)]
    namespace: Option<String>,

    /// Port for the metrics and probes HTTP server.
    #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curl_me_that_controller=info".into()),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        built = env!("BUILD_DATETIME"),
        git = env!("BUILD_GIT_HASH"),
        "Starting Curl Me That Controller"
    );

    metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(args.metrics_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = build_client(args.kubeconfig.as_deref()).await?;

    let handler = Handler::new(
        Arc::new(ReqwestFetcher::new()?),
        Arc::new(KubeConfigMapStore::new(client.clone())),
        Arc::new(KubeEventSink::new(client.clone())),
    );

    let config_maps: Api<ConfigMap> = match args.namespace.as_deref() {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    };

    server_state.mark_ready();
    run_watch_loop(config_maps, handler).await
}

async fn build_client(kubeconfig: Option<&std::path::Path>) -> Result<Client> {
    match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("reading kubeconfig from {}", path.display()))?;
            let config =
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .context("building client config from kubeconfig")?;
            Client::try_from(config).context("building kubernetes client")
        }
        None => Client::try_default()
            .await
            .context("building kubernetes client from the ambient environment"),
    }
}

/// Run the watch stream forever, restarting it when it ends or errors.
///
/// The annotations predicate fires the handler when an object first appears
/// or its annotations change, so the controller's own data-only update does
/// not come back around as a new notification.
async fn run_watch_loop(config_maps: Api<ConfigMap>, handler: Handler) -> Result<()> {
    loop {
        let stream = watcher(config_maps.clone(), watcher::Config::default())
            .default_backoff()
            .applied_objects()
            .predicate_filter(predicates::annotations);
        futures::pin_mut!(stream);

        loop {
            match stream.try_next().await {
                Ok(Some(config_map)) => handler.process(&config_map).await,
                Ok(None) => {
                    warn!("watch stream ended, restarting");
                    tokio::time::sleep(Duration::from_secs(
                        DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
                    ))
                    .await;
                    break;
                }
                Err(e) => {
                    error!("watch stream error: {}, restarting", e);
                    tokio::time::sleep(Duration::from_secs(DEFAULT_WATCH_RESTART_DELAY_SECS))
                        .await;
                    break;
                }
            }
        }
    }
}
