//! Curl Me That Controller Library
//!
//! Watches ConfigMaps for the `x-k8s.io/curl-me-that` annotation. The
//! annotation value names a data key and a url (`<dataKey>=<url>`); the
//! controller GETs the url and merges the response body into the ConfigMap
//! data under that key. Failures become Warning events on the ConfigMap.
//!
//! The pipeline's collaborators (the GET capability, the ConfigMap store,
//! and the event sink) are traits injected into [`handler::Handler`], so the
//! whole pipeline runs in tests without a cluster or a network. Unit tests
//! live in the module files; pipeline tests in `tests/`.

pub mod constants;
pub mod directive;
pub mod error;
pub mod events;
pub mod fetch;
pub mod handler;
pub mod metrics;
pub mod server;
pub mod store;
