//! In-memory literature API for testing purposes.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::models::{Article, ArticleBuilder, SearchQuery};
use crate::sources::{LiteratureApi, SourceError};

/// A mock service that serves a scripted corpus.
///
/// Each registered query maps to an id list; summaries are synthesized with
/// [`make_article`]. Failures are consumed from per-phase queues, so a test
/// can make exactly the next N calls fail.
#[derive(Debug, Default)]
pub struct MockLiteratureApi {
    corpus: Mutex<HashMap<String, Vec<String>>>,
    search_failures: Mutex<VecDeque<SourceError>>,
    summary_failures: Mutex<VecDeque<SourceError>>,
    search_latency: Mutex<HashMap<String, Duration>>,
    summary_latency: Mutex<Duration>,
    repeat_in_summary: Mutex<Option<String>>,
    search_calls: AtomicUsize,
    summary_calls: AtomicUsize,
    search_log: Mutex<Vec<(String, Instant)>>,
    summary_log: Mutex<Vec<Vec<String>>>,
}

impl MockLiteratureApi {
    /// Create a new, empty mock service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a query with an explicit id list.
    pub fn with_ids(self, query: &str, ids: Vec<String>) -> Self {
        self.corpus.lock().unwrap().insert(query.to_string(), ids);
        self
    }

    /// Register a query returning `count` ids, "<prefix>-0" .. "<prefix>-(count-1)".
    pub fn with_results(self, query: &str, prefix: &str, count: usize) -> Self {
        let ids = (0..count).map(|i| format!("{}-{}", prefix, i)).collect();
        self.with_ids(query, ids)
    }

    /// Replace the id list of a query.
    pub fn set_ids(&self, query: &str, ids: Vec<String>) {
        self.corpus.lock().unwrap().insert(query.to_string(), ids);
    }

    /// Make the next search call fail with `error`.
    pub fn fail_next_search(&self, error: SourceError) {
        self.search_failures.lock().unwrap().push_back(error);
    }

    /// Make the next summarize call fail with `error`.
    pub fn fail_next_summary(&self, error: SourceError) {
        self.summary_failures.lock().unwrap().push_back(error);
    }

    /// Delay every search for `query` by `latency`.
    pub fn set_search_latency(&self, query: &str, latency: Duration) {
        self.search_latency
            .lock()
            .unwrap()
            .insert(query.to_string(), latency);
    }

    /// Delay every summarize call by `latency`.
    pub fn set_summary_latency(&self, latency: Duration) {
        *self.summary_latency.lock().unwrap() = latency;
    }

    /// Echo `uid` a second time in every summary response that contains it.
    pub fn repeat_in_summary(&self, uid: &str) {
        *self.repeat_in_summary.lock().unwrap() = Some(uid.to_string());
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    /// Queries searched so far, with the (tokio) instant each call started.
    pub fn search_log(&self) -> Vec<(String, Instant)> {
        self.search_log.lock().unwrap().clone()
    }

    /// Id batches summarized so far.
    pub fn summary_log(&self) -> Vec<Vec<String>> {
        self.summary_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl LiteratureApi for MockLiteratureApi {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Literature API"
    }

    async fn search_ids(&self, query: &SearchQuery) -> Result<Vec<String>, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_log
            .lock()
            .unwrap()
            .push((query.term.clone(), Instant::now()));

        let latency = self.search_latency.lock().unwrap().get(&query.term).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.search_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let corpus = self.corpus.lock().unwrap();
        let ids = corpus.get(&query.term).cloned().unwrap_or_default();
        Ok(ids.into_iter().take(query.max_results).collect())
    }

    async fn summarize(&self, ids: &[String]) -> Result<Vec<Article>, SourceError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        self.summary_log.lock().unwrap().push(ids.to_vec());

        let latency = *self.summary_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.summary_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let repeat = self.repeat_in_summary.lock().unwrap().clone();
        let mut articles: Vec<Article> = ids.iter().map(|id| make_article(id)).collect();
        if let Some(uid) = repeat.filter(|uid| ids.contains(uid)) {
            articles.push(make_article(&uid));
        }
        Ok(articles)
    }
}

/// Helper function to create a mock article for testing.
pub fn make_article(uid: &str) -> Article {
    ArticleBuilder::new(uid, format!("Article {}", uid))
        .source("Mock J")
        .pubdate("2024 Jan 1")
        .author("Doe J")
        .build()
}
