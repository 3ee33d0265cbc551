//! The query fetch engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use super::state::FeedState;
use super::{DEBOUNCE, PAGE_SIZE, RETRY_PAUSE, SEARCH_CEILING};
use crate::models::{SearchQuery, SortBy};
use crate::sources::{LiteratureApi, SourceError};
use crate::utils::{with_retry_if, RetryConfig};

/// Message surfaced when a failure carries no text of its own
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Inputs an engine is keyed by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub query: String,
    pub delay: Duration,
    pub should_fetch: bool,
}

impl FetchParams {
    pub fn new(query: impl Into<String>, delay: Duration, should_fetch: bool) -> Self {
        Self {
            query: query.into(),
            delay,
            should_fetch,
        }
    }

    /// Whether these inputs schedule a fetch at all
    pub fn is_active(&self) -> bool {
        self.should_fetch && !self.query.trim().is_empty()
    }
}

/// Outcome of a [`QueryFetchEngine::load_more`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMore {
    /// A page was appended; holds the number of new articles
    Appended(usize),
    /// Nothing to do: no more ids, or a fetch was already in flight
    Skipped,
    /// The query changed while the page was in flight; the page was dropped
    Stale,
    /// The summarize call failed; holds the surfaced message
    Failed(String),
}

#[derive(Debug)]
struct Shared {
    state: watch::Sender<FeedState>,
    generation: AtomicU64,
    params: Mutex<Option<FetchParams>>,
}

impl Shared {
    fn is_live(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Start a new generation and reset the state to it.
    ///
    /// The counter is bumped under the channel lock, so the state always
    /// carries the latest generation.
    fn advance(&self, query: &str, active: bool) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            state.reset(query, generation, active);
        });
        generation
    }

    /// Apply `f` only if `generation` is still the live one
    fn update<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut FeedState),
    {
        self.state.send_if_modified(|state| {
            if !self.is_live(generation) || state.generation() != generation {
                return false;
            }
            f(state);
            true
        })
    }
}

/// Incremental search/summarize engine for one query.
///
/// The engine hides the two-call protocol of the remote service behind a
/// growing, deduplicated result set and a `load_more` cursor. Restarting
/// with new inputs invalidates everything in flight: late responses from an
/// older generation are dropped when they resolve. Dropping the engine does
/// the same.
///
/// `start` spawns onto the current Tokio runtime.
#[derive(Debug)]
pub struct QueryFetchEngine {
    api: Arc<dyn LiteratureApi>,
    shared: Arc<Shared>,
}

impl QueryFetchEngine {
    /// Create an idle engine
    pub fn new(api: Arc<dyn LiteratureApi>) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            api,
            shared: Arc::new(Shared {
                state,
                generation: AtomicU64::new(0),
                params: Mutex::new(None),
            }),
        }
    }

    /// Create an engine and start it with the given inputs
    pub fn spawn(
        api: Arc<dyn LiteratureApi>,
        query: impl Into<String>,
        delay: Duration,
        should_fetch: bool,
    ) -> Self {
        let engine = Self::new(api);
        engine.start(query, delay, should_fetch);
        engine
    }

    /// (Re)initialize for `query`.
    ///
    /// Clears the result set and, unless the query is blank or
    /// `should_fetch` is false, schedules the fetch sequence after the
    /// debounce plus `delay`.
    pub fn start(&self, query: impl Into<String>, delay: Duration, should_fetch: bool) {
        let params = FetchParams::new(query, delay, should_fetch);
        self.restart(params);
    }

    /// Restart only if any input differs from the current ones.
    /// Returns whether a restart happened.
    pub fn set_params(&self, query: impl Into<String>, delay: Duration, should_fetch: bool) -> bool {
        let params = FetchParams::new(query, delay, should_fetch);
        if self.params().as_ref() == Some(&params) {
            return false;
        }
        self.restart(params);
        true
    }

    /// Invalidate anything in flight and return to the idle state
    pub fn stop(&self) {
        if let Ok(mut current) = self.shared.params.lock() {
            *current = None;
        }
        self.shared.advance("", false);
    }

    /// Current inputs, if started
    pub fn params(&self) -> Option<FetchParams> {
        self.shared
            .params
            .lock()
            .map(|params| params.clone())
            .unwrap_or_default()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> FeedState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.shared.state.subscribe()
    }

    /// Wait until no fetch is in flight and return the state at that point
    pub async fn settled(&self) -> FeedState {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|state| !state.loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        };
        settled
    }

    /// Fetch the next page of summaries and append it.
    ///
    /// No-op while a fetch is in flight or when the id list is exhausted.
    /// On failure the error is surfaced in the state and the result set and
    /// cursor are left untouched, so calling again retries the same page.
    pub async fn load_more(&self) -> LoadMore {
        let mut claim = None;
        self.shared.state.send_if_modified(|state| {
            claim = state
                .begin_page(PAGE_SIZE)
                .map(|slice| (state.generation(), slice));
            claim.is_some()
        });

        let Some((generation, slice)) = claim else {
            return LoadMore::Skipped;
        };

        tracing::debug!(
            "Loading {} more summaries for generation {}",
            slice.len(),
            generation
        );

        match self.api.summarize(&slice).await {
            Ok(articles) => {
                let mut added = 0;
                let applied = self.shared.update(generation, |state| {
                    added = state.append_page(articles, slice.len());
                });
                if applied {
                    LoadMore::Appended(added)
                } else {
                    tracing::debug!("Discarding stale page for generation {}", generation);
                    LoadMore::Stale
                }
            }
            Err(error) => {
                let message = error_message(&error);
                tracing::warn!("Failed to load more results: {}", message);
                let applied = self
                    .shared
                    .update(generation, |state| state.fail_page(message.clone()));
                if applied {
                    LoadMore::Failed(message)
                } else {
                    LoadMore::Stale
                }
            }
        }
    }

    fn restart(&self, params: FetchParams) {
        if let Ok(mut current) = self.shared.params.lock() {
            *current = Some(params.clone());
        }

        let active = params.is_active();
        let generation = self.shared.advance(&params.query, active);

        if !active {
            tracing::debug!("Fetch gated off for query {:?}", params.query);
            return;
        }

        let api = Arc::clone(&self.api);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            initial_fetch(api, shared, generation, params).await;
        });
    }
}

impl Drop for QueryFetchEngine {
    fn drop(&mut self) {
        self.shared.advance("", false);
    }
}

/// Debounce, search (with one retry), then publish the first page
async fn initial_fetch(
    api: Arc<dyn LiteratureApi>,
    shared: Arc<Shared>,
    generation: u64,
    params: FetchParams,
) {
    tokio::time::sleep(DEBOUNCE + params.delay).await;
    if !shared.is_live(generation) {
        return;
    }

    let query = SearchQuery::new(params.query.as_str())
        .max_results(SEARCH_CEILING)
        .sort(SortBy::Date);

    tracing::debug!("Searching {} for {:?}", api.name(), query.term);

    let searched = with_retry_if(
        RetryConfig::fixed(2, RETRY_PAUSE),
        || shared.is_live(generation),
        || api.search_ids(&query),
    )
    .await;

    let ids = match searched {
        Ok(ids) => ids,
        Err(error) => {
            let message = error_message(&error);
            if shared.update(generation, |state| state.fail_initial(message.clone())) {
                tracing::warn!("Search failed for {:?}: {}", query.term, message);
            }
            return;
        }
    };

    if ids.is_empty() {
        shared.update(generation, FeedState::finish_empty);
        return;
    }

    let first_page: Vec<String> = ids.iter().take(PAGE_SIZE).cloned().collect();
    if !shared.update(generation, |state| state.set_id_list(ids)) {
        tracing::debug!("Discarding stale id list for {:?}", query.term);
        return;
    }

    match api.summarize(&first_page).await {
        Ok(articles) => {
            let applied = shared.update(generation, |state| {
                state.append_page(articles, first_page.len());
            });
            if !applied {
                tracing::debug!("Discarding stale first page for {:?}", query.term);
            }
        }
        Err(error) => {
            let message = error_message(&error);
            if shared.update(generation, |state| state.fail_initial(message.clone())) {
                tracing::warn!("Summary failed for {:?}: {}", query.term, message);
            }
        }
    }
}

/// Message surfaced at the engine boundary: the failure's own text, without
/// the error kind prefix
pub fn error_message(error: &SourceError) -> String {
    let message = error.message();
    if message.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockLiteratureApi;

    fn engine_for(api: &Arc<MockLiteratureApi>) -> QueryFetchEngine {
        QueryFetchEngine::new(Arc::clone(api) as Arc<dyn LiteratureApi>)
    }

    fn uids(state: &FeedState) -> Vec<String> {
        state.results().iter().map(|a| a.uid.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_pages_through_twenty_five_ids() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 25));
        let engine = engine_for(&api);

        engine.start("q", Duration::ZERO, true);
        assert!(engine.snapshot().loading());

        let state = engine.settled().await;
        assert_eq!(state.results().len(), 10);
        assert!(state.has_more());
        assert_eq!(state.error(), None);

        assert_eq!(engine.load_more().await, LoadMore::Appended(10));
        let state = engine.snapshot();
        assert_eq!(state.results().len(), 20);
        assert!(state.has_more());

        assert_eq!(engine.load_more().await, LoadMore::Appended(5));
        let state = engine.snapshot();
        assert_eq!(state.results().len(), 25);
        assert!(!state.has_more());
        assert_eq!(state.cursor(), 25);

        assert_eq!(engine.load_more().await, LoadMore::Skipped);
        assert_eq!(engine.snapshot(), state);
        assert_eq!(api.summary_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_waits_for_first_page() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 3));
        let engine = engine_for(&api);
        engine.start("q", Duration::from_secs(1), true);

        let mut settled = tokio_test::task::spawn(engine.settled());
        tokio_test::assert_pending!(settled.poll());
        drop(settled);

        let state = engine.settled().await;
        assert!(!state.loading());
        assert_eq!(state.results().len(), 3);
        assert_eq!(engine.subscribe().borrow().results().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_id_list_is_not_an_error() {
        let api = Arc::new(MockLiteratureApi::new());
        let engine = engine_for(&api);

        engine.start("nothing matches", Duration::ZERO, true);
        let state = engine.settled().await;

        assert!(state.results().is_empty());
        assert!(!state.has_more());
        assert_eq!(state.error(), None);
        assert_eq!(api.summary_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_failing_twice_surfaces_error() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 25));
        api.fail_next_search(SourceError::Api("Failed to search PubMed".to_string()));
        api.fail_next_search(SourceError::Api("Failed to search PubMed".to_string()));
        let engine = engine_for(&api);

        let started = tokio::time::Instant::now();
        engine.start("q", Duration::ZERO, true);
        let state = engine.settled().await;

        assert_eq!(api.search_calls(), 2);
        assert!(started.elapsed() >= DEBOUNCE + RETRY_PAUSE);
        assert_eq!(state.error(), Some("Failed to search PubMed"));
        assert!(state.results().is_empty());
        assert!(!state.loading());
        assert!(!state.has_more());
        assert_eq!(api.summary_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_recovers_on_retry() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 3));
        api.fail_next_search(SourceError::Network("connection reset".to_string()));
        let engine = engine_for(&api);

        engine.start("q", Duration::ZERO, true);
        let state = engine.settled().await;

        assert_eq!(api.search_calls(), 2);
        assert_eq!(state.results().len(), 3);
        assert!(!state.has_more());
        assert_eq!(state.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_summary_failure_is_not_retried() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 12));
        api.fail_next_summary(SourceError::Api("Failed to fetch summaries".to_string()));
        let engine = engine_for(&api);

        engine.start("q", Duration::ZERO, true);
        let state = engine.settled().await;

        assert_eq!(api.search_calls(), 1);
        assert_eq!(api.summary_calls(), 1);
        assert!(state.error().is_some());
        assert!(state.results().is_empty());
        assert!(!state.has_more());
        assert_eq!(engine.load_more().await, LoadMore::Skipped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_failure_keeps_results() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 15));
        let engine = engine_for(&api);
        engine.start("q", Duration::ZERO, true);
        engine.settled().await;

        api.fail_next_summary(SourceError::Network("timeout".to_string()));
        let outcome = engine.load_more().await;
        assert_eq!(outcome, LoadMore::Failed("timeout".to_string()));

        let state = engine.snapshot();
        assert_eq!(state.results().len(), 10);
        assert_eq!(state.cursor(), 10);
        assert!(state.has_more());
        assert!(!state.loading());

        assert_eq!(engine.load_more().await, LoadMore::Appended(5));
        let state = engine.snapshot();
        assert_eq!(state.results().len(), 15);
        assert_eq!(state.error(), None);

        let log = api.summary_log();
        assert_eq!(log[1], log[2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_rejected_while_in_flight() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 30));
        let engine = engine_for(&api);
        engine.start("q", Duration::ZERO, true);
        engine.settled().await;

        api.set_summary_latency(Duration::from_millis(500));
        let (first, second) = tokio::join!(engine.load_more(), engine.load_more());

        assert_eq!(first, LoadMore::Appended(10));
        assert_eq!(second, LoadMore::Skipped);
        assert_eq!(engine.snapshot().cursor(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_rejected_during_initial_fetch() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 30));
        let engine = engine_for(&api);
        engine.start("q", Duration::ZERO, true);

        assert_eq!(engine.load_more().await, LoadMore::Skipped);
        assert_eq!(engine.settled().await.results().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_in_a_page_are_dropped() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 12));
        api.repeat_in_summary("id-3");
        let engine = engine_for(&api);

        engine.start("q", Duration::ZERO, true);
        let state = engine.settled().await;
        assert_eq!(state.results().len(), 10);

        let unique: std::collections::HashSet<_> = uids(&state).into_iter().collect();
        assert_eq!(unique.len(), 10);
        assert_eq!(api.summary_log()[0].len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_search_never_reaches_new_query() {
        let api = Arc::new(
            MockLiteratureApi::new()
                .with_results("a", "a", 5)
                .with_results("b", "b", 5),
        );
        api.set_search_latency("a", Duration::from_secs(5));
        let engine = engine_for(&api);

        engine.start("a", Duration::ZERO, true);
        tokio::time::sleep(Duration::from_secs(1)).await;
        engine.start("b", Duration::ZERO, true);

        let state = engine.settled().await;
        assert_eq!(state.query(), "b");
        assert!(uids(&state).iter().all(|uid| uid.starts_with("b-")));

        // let the slow search for "a" resolve
        tokio::time::sleep(Duration::from_secs(10)).await;
        let state = engine.snapshot();
        assert_eq!(state.results().len(), 5);
        assert!(uids(&state).iter().all(|uid| uid.starts_with("b-")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_page_is_discarded() {
        let api = Arc::new(
            MockLiteratureApi::new()
                .with_results("a", "a", 20)
                .with_results("b", "b", 3),
        );
        let engine = engine_for(&api);
        engine.start("a", Duration::ZERO, true);
        engine.settled().await;

        api.set_summary_latency(Duration::from_secs(1));
        let (outcome, _) = tokio::join!(engine.load_more(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine.start("b", Duration::ZERO, true);
        });

        assert_eq!(outcome, LoadMore::Stale);
        let state = engine.settled().await;
        assert_eq!(uids(&state), vec!["b-0", "b-1", "b-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_absorbs_rapid_restarts() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 4));
        let engine = engine_for(&api);

        engine.start("q", Duration::ZERO, true);
        engine.start("q", Duration::ZERO, true);
        let state = engine.settled().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.search_calls(), 1);
        assert_eq!(state.results().len(), 4);
        assert_eq!(engine.snapshot(), state);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_with_same_query_is_idempotent() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 14));
        let engine = engine_for(&api);

        engine.start("q", Duration::ZERO, true);
        let once = uids(&engine.settled().await);

        engine.start("q", Duration::ZERO, true);
        let twice = uids(&engine.settled().await);
        assert_eq!(once, twice);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_and_blank_query() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 4));
        let engine = engine_for(&api);

        engine.start("q", Duration::ZERO, false);
        assert!(!engine.snapshot().loading());
        engine.start("   ", Duration::ZERO, true);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.search_calls(), 0);

        assert!(engine.set_params("q", Duration::ZERO, true));
        assert_eq!(engine.settled().await.results().len(), 4);

        assert!(!engine.set_params("q", Duration::ZERO, true));
        assert!(engine.set_params("q", Duration::ZERO, false));
        let state = engine.snapshot();
        assert!(state.results().is_empty());
        assert!(!state.loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_and_drop_invalidate() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 4));
        let engine = engine_for(&api);

        engine.start("q", Duration::from_secs(1), true);
        engine.stop();
        assert_eq!(engine.params(), None);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(api.search_calls(), 0);

        let dropped = engine_for(&api);
        dropped.start("q", Duration::ZERO, true);
        drop(dropped);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(api.search_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_during_search_publishes_nothing() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 25));
        api.set_search_latency("q", Duration::from_secs(2));
        let engine = engine_for(&api);
        let rx = engine.subscribe();

        engine.start("q", Duration::ZERO, true);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(api.search_calls(), 1);
        drop(engine);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.summary_calls(), 0);
        let state = rx.borrow().clone();
        assert!(state.results().is_empty());
        assert!(!state.loading());
        assert!(!state.has_more());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_search_publishes_nothing() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 25));
        api.set_search_latency("q", Duration::from_secs(2));
        let engine = engine_for(&api);

        engine.start("q", Duration::ZERO, true);
        tokio::time::sleep(Duration::from_millis(500)).await;
        engine.stop();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.summary_calls(), 0);
        assert_eq!(engine.snapshot().total_ids(), 0);
        assert!(engine.snapshot().results().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_restarts_settle() {
        let api = Arc::new(MockLiteratureApi::new().with_results("q", "id", 3));
        let engine = Arc::new(engine_for(&api));

        let restarts: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.start("q", Duration::ZERO, true) })
            })
            .collect();
        for restart in restarts {
            restart.await.unwrap();
        }

        let state = tokio::time::timeout(Duration::from_secs(5), engine.settled())
            .await
            .unwrap();
        assert_eq!(state.results().len(), 3);
        assert_eq!(state.generation(), engine.shared.generation.load(Ordering::Acquire));
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(error_message(&SourceError::Other(String::new())), UNKNOWN_ERROR);
        assert_eq!(error_message(&SourceError::Api("  ".to_string())), UNKNOWN_ERROR);
        assert_eq!(
            error_message(&SourceError::RateLimit),
            "Rate limit exceeded"
        );
        assert_eq!(
            error_message(&SourceError::Api("Failed to fetch summaries".to_string())),
            "Failed to fetch summaries"
        );
    }
}
