//! Observable per-query state: id list, result set and paging cursor.

use std::collections::HashSet;

use crate::models::Article;

/// State of one query's feed as seen by callers.
///
/// Invariants: no uid appears twice in `results`; `cursor <= id_list.len()`;
/// `has_more` is only true once the first page has been published and
/// `cursor < id_list.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedState {
    query: String,
    generation: u64,
    id_list: Vec<String>,
    results: Vec<Article>,
    seen: HashSet<String>,
    cursor: usize,
    has_more: bool,
    loading: bool,
    error: Option<String>,
}

impl FeedState {
    /// Query this state belongs to
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Accumulated, deduplicated articles in page order
    pub fn results(&self) -> &[Article] {
        &self.results
    }

    /// Whether a fetch is in flight
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Last surfaced error message
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether `load_more` can fetch another page
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Number of ids already summarized
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Length of the id list returned by the search phase
    pub fn total_ids(&self) -> usize {
        self.id_list.len()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Fresh state for a new query; `loading` if a fetch will follow
    pub(crate) fn reset(&mut self, query: &str, generation: u64, loading: bool) {
        *self = FeedState {
            query: query.to_string(),
            generation,
            loading,
            ..FeedState::default()
        };
    }

    pub(crate) fn set_id_list(&mut self, ids: Vec<String>) {
        self.id_list = ids;
        self.cursor = 0;
        self.has_more = false;
    }

    /// Terminal state for a query with no matches
    pub(crate) fn finish_empty(&mut self) {
        self.set_id_list(Vec::new());
        self.results.clear();
        self.seen.clear();
        self.loading = false;
        self.error = None;
    }

    /// Next `page_size` ids after the cursor
    pub(crate) fn next_slice(&self, page_size: usize) -> Vec<String> {
        let end = (self.cursor + page_size).min(self.id_list.len());
        self.id_list[self.cursor..end].to_vec()
    }

    /// Append a page, skipping uids already present (in earlier pages or
    /// earlier in this page), and advance the cursor by `consumed` ids.
    /// Returns how many articles were added.
    pub(crate) fn append_page(&mut self, articles: Vec<Article>, consumed: usize) -> usize {
        let before = self.results.len();
        for article in articles {
            if self.seen.insert(article.uid.clone()) {
                self.results.push(article);
            }
        }

        self.cursor = (self.cursor + consumed).min(self.id_list.len());
        self.has_more = self.cursor < self.id_list.len();
        self.loading = false;
        self.error = None;
        self.results.len() - before
    }

    /// Claim the in-flight flag for a follow-up page.
    /// Returns the ids to summarize, or `None` if the guard rejects.
    pub(crate) fn begin_page(&mut self, page_size: usize) -> Option<Vec<String>> {
        if self.loading || !self.has_more {
            return None;
        }
        let slice = self.next_slice(page_size);
        if slice.is_empty() {
            self.has_more = false;
            return None;
        }
        self.loading = true;
        self.error = None;
        Some(slice)
    }

    /// Failure of the initial sequence: nothing partial survives
    pub(crate) fn fail_initial(&mut self, message: String) {
        self.set_id_list(Vec::new());
        self.results.clear();
        self.seen.clear();
        self.loading = false;
        self.error = Some(message);
    }

    /// Failure of a follow-up page: results and cursor are kept
    pub(crate) fn fail_page(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }
}
