//! # Directive Parsing
//!
//! Turns the raw `x-k8s.io/curl-me-that` annotation value into a data key
//! and a fetchable url.
//!
//! Parsing and normalization are pure; they see only the annotation string
//! and never the ConfigMap, so both halves are unit-testable in isolation.

use crate::error::PipelineError;
use url::Url;

/// The parsed `<dataKey>=<url>` pair extracted from the annotation value.
///
/// Derived, never persisted; lives for the duration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Key in the ConfigMap data map that receives the response body
    pub data_key: String,
    /// Target url exactly as written in the annotation
    pub raw_locator: String,
}

impl Directive {
    /// Split the annotation value on the first `=`.
    ///
    /// Both halves must be non-empty: a missing `=` or an empty key is
    /// `AnnotationMalformed`, an empty url is `EmptyUrl`.
    pub fn parse(value: &str) -> Result<Self, PipelineError> {
        let Some((data_key, raw_locator)) = value.split_once('=') else {
            return Err(PipelineError::AnnotationMalformed {
                value: value.to_string(),
            });
        };

        if data_key.is_empty() {
            return Err(PipelineError::AnnotationMalformed {
                value: value.to_string(),
            });
        }

        if raw_locator.is_empty() {
            return Err(PipelineError::EmptyUrl {
                value: value.to_string(),
            });
        }

        Ok(Self {
            data_key: data_key.to_string(),
            raw_locator: raw_locator.to_string(),
        })
    }
}

/// Normalize the raw locator into an absolute url string.
///
/// A locator without a scheme gets `http://` prefixed; everything else
/// passes through verbatim. The parsed `Url` is used only for validation:
/// re-serializing it would rewrite host-only forms (`foobar.com?bar=zot`
/// becomes `http://foobar.com/?bar=zot`), and the fetch target must match
/// what the annotation author wrote.
pub fn normalize_locator(raw_locator: &str) -> Result<String, PipelineError> {
    match Url::parse(raw_locator) {
        Ok(_) => Ok(raw_locator.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let prefixed = format!("http://{raw_locator}");
            if let Err(source) = Url::parse(&prefixed) {
                return Err(PipelineError::InvalidUrl {
                    locator: raw_locator.to_string(),
                    source,
                });
            }
            Ok(prefixed)
        }
        Err(source) => Err(PipelineError::InvalidUrl {
            locator: raw_locator.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_on_first_equals() {
        let directive = Directive::parse("mykey=https://foobar.com").unwrap();
        assert_eq!(directive.data_key, "mykey");
        assert_eq!(directive.raw_locator, "https://foobar.com");
    }

    #[test]
    fn test_parse_keeps_later_equals_in_the_url() {
        // Query strings carry their own '='; only the first one splits
        let directive = Directive::parse("mykey=foobar.com?bar=zot").unwrap();
        assert_eq!(directive.data_key, "mykey");
        assert_eq!(directive.raw_locator, "foobar.com?bar=zot");
    }

    #[test]
    fn test_parse_without_equals_is_malformed() {
        let err = Directive::parse("mykey").unwrap_err();
        assert!(matches!(err, PipelineError::AnnotationMalformed { .. }));
        assert!(err.to_string().contains("cannot parse annotation value"));
    }

    #[test]
    fn test_parse_empty_value_is_malformed() {
        let err = Directive::parse("").unwrap_err();
        assert!(matches!(err, PipelineError::AnnotationMalformed { .. }));
    }

    #[test]
    fn test_parse_empty_key_is_malformed() {
        let err = Directive::parse("=https://foobar.com").unwrap_err();
        assert!(matches!(err, PipelineError::AnnotationMalformed { .. }));
    }

    #[test]
    fn test_parse_empty_url() {
        let err = Directive::parse("mykey=").unwrap_err();
        assert!(matches!(err, PipelineError::EmptyUrl { .. }));
        assert!(err.to_string().contains("empty url"));
    }

    #[test]
    fn test_normalize_keeps_explicit_scheme() {
        let url = normalize_locator("https://foobar.com").unwrap();
        assert_eq!(url, "https://foobar.com");
    }

    #[test]
    fn test_normalize_defaults_missing_scheme_to_http() {
        let url = normalize_locator("foobar.com").unwrap();
        assert_eq!(url, "http://foobar.com");
    }

    #[test]
    fn test_normalize_preserves_query_string_verbatim() {
        let url = normalize_locator("foobar.com?bar=zot").unwrap();
        assert_eq!(url, "http://foobar.com?bar=zot");
    }

    #[test]
    fn test_normalize_preserves_path() {
        let url = normalize_locator("foobar.com/api/joke").unwrap();
        assert_eq!(url, "http://foobar.com/api/joke");
    }

    #[test]
    fn test_normalize_rejects_unparseable_url() {
        let err = normalize_locator("http://[foosomething-invalid").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidUrl { .. }));
        let message = err.to_string();
        assert!(message.contains("cannot parse url"));
        assert!(message.contains("http://[foosomething-invalid"));
    }
}
