//! # Remote Fetcher
//!
//! The outbound GET capability and the code that validates and drains its
//! response.
//!
//! The capability is a trait so the pipeline's only network dependency can be
//! swapped for a test double; the production implementation is a `reqwest`
//! client with rustls and a bounded request deadline.

use crate::constants::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::error::PipelineError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use std::time::Duration;

/// Response body as a fallible byte stream.
///
/// Kept as a stream rather than a buffer so read errors surface while
/// draining, after the status code has already been accepted.
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// One HTTP response, before the body has been drained.
pub struct HttpResponse {
    pub status: u16,
    pub body: BodyStream,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// The injected GET capability, the pipeline's sole network dependency.
///
/// An `Err` means the transport failed before any response arrived;
/// status-code handling belongs to the caller.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Production fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map_err(anyhow::Error::from)
            .boxed();
        Ok(HttpResponse { status, body })
    }
}

/// Perform one GET against `url` and return the body as text.
///
/// Exactly one outbound request per call. Status codes >= 300 are rejected
/// before the body is touched, so a redirect or error page never lands in
/// the ConfigMap.
pub async fn fetch_body(fetcher: &dyn HttpFetcher, url: &str) -> Result<String, PipelineError> {
    let response = fetcher
        .get(url)
        .await
        .map_err(|source| PipelineError::FetchFailed {
            url: url.to_string(),
            source,
        })?;

    if response.status >= 300 {
        return Err(PipelineError::NonSuccessStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let mut body = response.body;
    let mut buf = Vec::new();
    while let Some(chunk) = body
        .try_next()
        .await
        .map_err(|source| PipelineError::BodyReadFailed { source })?
    {
        buf.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    struct StaticFetcher {
        status: u16,
        chunks: Vec<&'static str>,
    }

    #[async_trait]
    impl HttpFetcher for StaticFetcher {
        async fn get(&self, _url: &str) -> Result<HttpResponse> {
            let chunks: Vec<Result<Bytes>> = self
                .chunks
                .iter()
                .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
                .collect();
            Ok(HttpResponse {
                status: self.status,
                body: stream::iter(chunks).boxed(),
            })
        }
    }

    struct BrokenTransport;

    #[async_trait]
    impl HttpFetcher for BrokenTransport {
        async fn get(&self, _url: &str) -> Result<HttpResponse> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    struct BrokenBody;

    #[async_trait]
    impl HttpFetcher for BrokenBody {
        async fn get(&self, _url: &str) -> Result<HttpResponse> {
            let chunks: Vec<Result<Bytes>> = vec![
                Ok(Bytes::from_static(b"partial")),
                Err(anyhow::anyhow!("some error")),
            ];
            Ok(HttpResponse {
                status: 200,
                body: stream::iter(chunks).boxed(),
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_body_drains_all_chunks() {
        let fetcher = StaticFetcher {
            status: 200,
            chunks: vec!["a remote", " answer"],
        };
        let body = fetch_body(&fetcher, "http://foobar.com").await.unwrap();
        assert_eq!(body, "a remote answer");
    }

    #[tokio::test]
    async fn test_fetch_body_accepts_status_just_below_300() {
        let fetcher = StaticFetcher {
            status: 299,
            chunks: vec!["ok"],
        };
        assert!(fetch_body(&fetcher, "http://foobar.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_body_rejects_status_300_and_above() {
        let fetcher = StaticFetcher {
            status: 300,
            chunks: vec![],
        };
        let err = fetch_body(&fetcher, "http://foobar.com").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NonSuccessStatus { status: 300, .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_body_rejects_401() {
        let fetcher = StaticFetcher {
            status: 401,
            chunks: vec![],
        };
        let err = fetch_body(&fetcher, "https://foobar.com").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_fetch_body_wraps_transport_errors() {
        let err = fetch_body(&BrokenTransport, "http://foobar.com")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::FetchFailed { .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_fetch_body_wraps_read_errors() {
        let err = fetch_body(&BrokenBody, "http://foobar.com")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::BodyReadFailed { .. }));
        assert!(err.to_string().contains("response body cannot be read"));
    }
}
