//! # PubMed Boards
//!
//! A personal dashboard of curated PubMed search feeds ("boards") with
//! incremental, paginated fetching and favorites.
//!
//! ## Architecture
//!
//! - [`engine`]: the query fetch engine (search, then summarize page by page)
//!   and the staggered [`Dashboard`](engine::Dashboard)
//! - [`sources`]: the [`LiteratureApi`](sources::LiteratureApi) seam, the
//!   E-utilities client and an in-memory mock
//! - [`models`]: articles, boards and search parameters
//! - [`boards`]: per-user board persistence
//! - [`favorites`]: the favorite set and the favorites feed
//! - [`import`]: boards from PubMed web URLs
//! - [`config`]: configuration management
//! - [`ui`]: terminal output helpers
//! - [`utils`]: HTTP client, retry and file helpers

pub mod boards;
pub mod config;
pub mod engine;
pub mod favorites;
pub mod import;
pub mod models;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use engine::{Dashboard, QueryFetchEngine};
pub use models::{Article, Board};
pub use sources::{LiteratureApi, PubMedClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
