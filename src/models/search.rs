//! Search request model for the id-list phase.

use serde::{Deserialize, Serialize};

/// Ranking requested from the search endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Most recent publication first
    #[default]
    Date,
    /// Best match
    Relevance,
}

impl SortBy {
    /// Value of the `sort` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            SortBy::Date => "date",
            SortBy::Relevance => "relevance",
        }
    }
}

/// Search query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query expression in PubMed syntax
    pub term: String,

    /// Maximum number of identifiers to return
    pub max_results: usize,

    /// Ranking
    pub sort: SortBy,
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            max_results: 20,
            sort: SortBy::default(),
        }
    }

    /// Set maximum results
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Set ranking
    pub fn sort(mut self, sort: SortBy) -> Self {
        self.sort = sort;
        self
    }
}
