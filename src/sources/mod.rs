//! Remote literature API plugins.
//!
//! This module defines the [`LiteratureApi`] trait, the two-call protocol the
//! fetch engine drives:
//!
//! 1. [`LiteratureApi::search_ids`] returns a ranked list of identifiers for a
//!    query (the *id list*).
//! 2. [`LiteratureApi::summarize`] resolves a batch of identifiers into full
//!    [`Article`] records.
//!
//! [`PubMedClient`] implements it over NCBI E-utilities; [`MockLiteratureApi`]
//! is an in-memory implementation with scripted failures and latency for
//! tests.

mod mock;
mod pubmed;

pub use mock::{make_article, MockLiteratureApi};
pub use pubmed::{PubMedClient, PUBMED_EUTILS_URL};

use crate::models::{Article, SearchQuery};
use async_trait::async_trait;

/// Two-phase search/summarize interface of a literature service.
#[async_trait]
pub trait LiteratureApi: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this service (e.g. "pubmed")
    fn id(&self) -> &str;

    /// Human-readable name of this service
    fn name(&self) -> &str;

    /// Run a search and return the ranked identifier list
    async fn search_ids(&self, query: &SearchQuery) -> Result<Vec<String>, SourceError>;

    /// Resolve identifiers into article records, in the order the service
    /// reports them
    async fn summarize(&self, ids: &[String]) -> Result<Vec<Article>, SourceError>;
}

/// Errors that can occur when talking to a literature service
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Non-success response from the service
    #[error("API error: {0}")]
    Api(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// The failure's own text, without the kind prefix of `Display`
    pub fn message(&self) -> String {
        match self {
            SourceError::Network(msg)
            | SourceError::Parse(msg)
            | SourceError::InvalidRequest(msg)
            | SourceError::Api(msg)
            | SourceError::Other(msg) => msg.clone(),
            SourceError::RateLimit => self.to_string(),
        }
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SourceError::InvalidRequest(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SourceError::Network("reset".to_string()).is_retryable());
        assert!(SourceError::Api("502".to_string()).is_retryable());
        assert!(SourceError::RateLimit.is_retryable());
        assert!(!SourceError::InvalidRequest("empty".to_string()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = SourceError::Api("PubMed API returned status: 500".to_string());
        assert_eq!(err.to_string(), "API error: PubMed API returned status: 500");
        assert_eq!(err.message(), "PubMed API returned status: 500");
        assert_eq!(SourceError::RateLimit.message(), "Rate limit exceeded");

        let parse: SourceError = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(parse.to_string().starts_with("Parse error: JSON:"));
    }
}
