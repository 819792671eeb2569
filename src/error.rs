//! # Error Taxonomy
//!
//! Every way a single pipeline run can fail, one variant per failure point.
//!
//! Display strings carry the operative detail (offending value, status code,
//! or underlying error text) because they become the message of the Warning
//! event attached to the ConfigMap, and operators grep events, not source.

use thiserror::Error;

/// Failure of one fetch-and-merge pipeline run.
///
/// Errors are local to the run that produced them; nothing is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The annotation value could not be split into `<dataKey>=<url>`
    #[error("cannot parse annotation value, miss '=': {value}")]
    AnnotationMalformed { value: String },

    /// The part after `=` was empty
    #[error("empty url: {value}")]
    EmptyUrl { value: String },

    /// The url did not parse, even after scheme defaulting
    #[error("cannot parse url {locator}: {source}")]
    InvalidUrl {
        locator: String,
        source: url::ParseError,
    },

    /// Transport-level failure before any response arrived
    #[error("failed to connect to {url}: {source}")]
    FetchFailed {
        url: String,
        source: anyhow::Error,
    },

    /// The remote answered with a non-success status code
    #[error("non valid status code connecting to {url}: {status}")]
    NonSuccessStatus { url: String, status: u16 },

    /// The response arrived but its body could not be drained
    #[error("response body cannot be read: {source}")]
    BodyReadFailed { source: anyhow::Error },

    /// The object store rejected the updated ConfigMap
    #[error("failed to update config map {namespace}/{name}: {source}")]
    PersistFailed {
        namespace: String,
        name: String,
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// Stable label for the failure counter, one per variant.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::AnnotationMalformed { .. } => "annotation_malformed",
            Self::EmptyUrl { .. } => "empty_url",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::NonSuccessStatus { .. } => "non_success_status",
            Self::BodyReadFailed { .. } => "body_read_failed",
            Self::PersistFailed { .. } => "persist_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_the_offending_value() {
        let err = PipelineError::AnnotationMalformed {
            value: "mykey".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("cannot parse annotation value"));
        assert!(message.contains("mykey"));
    }

    #[test]
    fn test_display_carries_the_status_code() {
        let err = PipelineError::NonSuccessStatus {
            url: "https://foobar.com".to_string(),
            status: 401,
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("https://foobar.com"));
    }

    #[test]
    fn test_display_carries_the_underlying_error() {
        let err = PipelineError::BodyReadFailed {
            source: anyhow::anyhow!("some error"),
        };
        let message = err.to_string();
        assert!(message.contains("response body cannot be read"));
        assert!(message.contains("some error"));
    }

    #[test]
    fn test_every_variant_has_a_distinct_reason_label() {
        let labels = [
            PipelineError::AnnotationMalformed {
                value: String::new(),
            }
            .reason(),
            PipelineError::EmptyUrl {
                value: String::new(),
            }
            .reason(),
            PipelineError::InvalidUrl {
                locator: String::new(),
                source: url::ParseError::EmptyHost,
            }
            .reason(),
            PipelineError::FetchFailed {
                url: String::new(),
                source: anyhow::anyhow!("x"),
            }
            .reason(),
            PipelineError::NonSuccessStatus {
                url: String::new(),
                status: 500,
            }
            .reason(),
            PipelineError::BodyReadFailed {
                source: anyhow::anyhow!("x"),
            }
            .reason(),
            PipelineError::PersistFailed {
                namespace: String::new(),
                name: String::new(),
                source: anyhow::anyhow!("x"),
            }
            .reason(),
        ];
        let mut deduped = labels.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), labels.len());
    }
}
