//! Staggered start of many engines, one per board.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use super::fetch::{LoadMore, QueryFetchEngine};
use super::state::FeedState;
use crate::models::Board;
use crate::sources::LiteratureApi;

/// Gap between the scheduled starts of neighbouring boards
pub const STAGGER_INTERVAL: Duration = Duration::from_millis(1500);

/// Start delay for the board at position `index`
pub fn stagger_delay(index: usize) -> Duration {
    let index = u32::try_from(index).unwrap_or(u32::MAX);
    STAGGER_INTERVAL.saturating_mul(index)
}

/// A board paired with the engine fetching its feed
#[derive(Debug)]
pub struct BoardFeed {
    board: Board,
    engine: QueryFetchEngine,
}

impl BoardFeed {
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn engine(&self) -> &QueryFetchEngine {
        &self.engine
    }
}

/// The board overview: one engine per board, staggered by position.
///
/// The schedule is static. It never looks at latency or errors, so a slow
/// board does not push back the boards after it.
#[derive(Debug)]
pub struct Dashboard {
    api: Arc<dyn LiteratureApi>,
    feeds: Vec<BoardFeed>,
}

impl Dashboard {
    /// Create one engine per board and start each at `stagger_delay(index)`
    pub fn mount(api: Arc<dyn LiteratureApi>, boards: &[Board]) -> Self {
        let mut dashboard = Self {
            api,
            feeds: Vec::with_capacity(boards.len()),
        };
        dashboard.sync(boards);
        dashboard
    }

    /// Reconcile engines with a new board list.
    ///
    /// Engines are matched by board id. A board whose query or position is
    /// unchanged keeps its engine and results; an edited or moved board
    /// restarts; engines of removed boards are dropped.
    pub fn sync(&mut self, boards: &[Board]) {
        let mut existing: HashMap<String, BoardFeed> = self
            .feeds
            .drain(..)
            .map(|feed| (feed.board.id.clone(), feed))
            .collect();

        for (index, board) in boards.iter().enumerate() {
            let delay = stagger_delay(index);
            let feed = match existing.remove(&board.id) {
                Some(mut feed) => {
                    if feed.engine.set_params(board.query.as_str(), delay, true) {
                        tracing::debug!("Restarting board {} at {:?}", board.id, delay);
                    }
                    feed.board = board.clone();
                    feed
                }
                None => {
                    tracing::debug!("Mounting board {} at {:?}", board.id, delay);
                    let engine = QueryFetchEngine::new(Arc::clone(&self.api));
                    engine.start(board.query.as_str(), delay, true);
                    BoardFeed {
                        board: board.clone(),
                        engine,
                    }
                }
            };
            self.feeds.push(feed);
        }

        for id in existing.keys() {
            tracing::debug!("Unmounting board {}", id);
        }
    }

    pub fn feeds(&self) -> &[BoardFeed] {
        &self.feeds
    }

    pub fn get(&self, board_id: &str) -> Option<&BoardFeed> {
        self.feeds.iter().find(|feed| feed.board.id == board_id)
    }

    /// Wait for every board to settle, in board order
    pub async fn settled(&self) -> Vec<FeedState> {
        join_all(self.feeds.iter().map(|feed| feed.engine.settled())).await
    }

    /// Load the next page of one board
    pub async fn load_more(&self, board_id: &str) -> Option<LoadMore> {
        match self.get(board_id) {
            Some(feed) => Some(feed.engine.load_more().await),
            None => None,
        }
    }

    /// Standalone engine for a single board's detail view (no stagger)
    pub fn detail(api: Arc<dyn LiteratureApi>, board: &Board) -> QueryFetchEngine {
        QueryFetchEngine::spawn(api, board.query.as_str(), Duration::ZERO, true)
    }
}
