//! Utility modules supporting the fetch engine and local stores.
//!
//! - [`HttpClient`]: shared reqwest client with timeouts and a user agent
//! - [`RetryConfig`], [`with_retry`], [`with_retry_if`]: retries with fixed
//!   or exponential pauses
//! - [`read_json`], [`write_json_atomic`]: JSON documents replaced atomically
//!
//! # Retry with a fixed pause
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use pubmed_boards::models::SearchQuery;
//! use pubmed_boards::sources::{LiteratureApi, PubMedClient};
//! use pubmed_boards::utils::{with_retry, RetryConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PubMedClient::new()?;
//! let query = SearchQuery::new("dengue");
//! let ids = with_retry(RetryConfig::fixed(2, Duration::from_secs(2)), || {
//!     client.search_ids(&query)
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod persist;
mod retry;

pub use http::{default_user_agent, HttpClient, DEFAULT_TIMEOUT};
pub use persist::{read_json, write_json_atomic};
pub use retry::{with_retry, with_retry_if, RetryConfig};
