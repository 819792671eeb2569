//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Annotation that triggers the fetch-and-merge pipeline.
///
/// Value format: `<dataKey>=<url>`, where the url may omit a scheme
/// (defaults to `http`).
pub const CURL_ME_THAT_ANNOTATION: &str = "x-k8s.io/curl-me-that";

/// Component name attached to emitted events
pub const EVENT_COMPONENT: &str = "curl-me-that-controller";

/// Reason attached to Warning events emitted for failed pipeline runs
pub const EVENT_REASON_FAILED: &str = "Failed";

/// Action attached to emitted events (events.k8s.io requires one)
pub const EVENT_ACTION: &str = "CurlMeThat";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default deadline for the outbound GET (seconds)
///
/// The pipeline specifies no timeout of its own; the bound lives in the
/// injected fetcher so a hung remote cannot stall the watch loop forever.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default delay before restarting the watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting the watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;
