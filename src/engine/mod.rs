//! Incremental result fetching and pagination.
//!
//! A [`QueryFetchEngine`] drives the two-call protocol of a
//! [`LiteratureApi`](crate::sources::LiteratureApi) for one query:
//!
//! 1. after a debounce plus a caller-supplied start delay, search for up to
//!    [`SEARCH_CEILING`] ids, newest first (retried once after
//!    [`RETRY_PAUSE`]);
//! 2. summarize the first [`PAGE_SIZE`] ids and publish them;
//! 3. on [`QueryFetchEngine::load_more`], summarize the next slice and
//!    append it.
//!
//! The [`Dashboard`] runs one engine per board and staggers their starts by
//! board position so the remote service never sees a burst.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pubmed_boards::engine::QueryFetchEngine;
//! use pubmed_boards::sources::PubMedClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let api = Arc::new(PubMedClient::new()?);
//! let engine = QueryFetchEngine::spawn(api, "measles vaccine", Duration::ZERO, true);
//!
//! let state = engine.settled().await;
//! for article in state.results() {
//!     println!("{} {}", article.uid, article.title);
//! }
//! if state.has_more() {
//!     engine.load_more().await;
//! }
//! # Ok(())
//! # }
//! ```

mod fetch;
mod schedule;
mod state;

use std::time::Duration;

pub use fetch::{error_message, FetchParams, LoadMore, QueryFetchEngine, UNKNOWN_ERROR};
pub use schedule::{stagger_delay, BoardFeed, Dashboard, STAGGER_INTERVAL};
pub use state::FeedState;

/// Public state of an engine as returned by [`QueryFetchEngine::snapshot`]
pub type EngineSnapshot = FeedState;

/// Ids summarized per page
pub const PAGE_SIZE: usize = 10;

/// Maximum number of ids requested from the search phase
pub const SEARCH_CEILING: usize = 100;

/// Quiet period after a (re)start before any request is made
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// Pause before the single retry of a failed search
pub const RETRY_PAUSE: Duration = Duration::from_secs(2);
