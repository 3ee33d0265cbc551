//! Favorite articles.
//!
//! The favorite set is a plain set of uids shared across views. Engines never
//! read it: favorites only decorate results for display and, through
//! [`favorites_query`], drive a dedicated feed of their own.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::engine::QueryFetchEngine;
use crate::models::Article;
use crate::sources::LiteratureApi;
use crate::utils::{read_json, write_json_atomic};

/// Errors from a favorite store
#[derive(Debug, thiserror::Error)]
pub enum FavoritesError {
    #[error("Failed to persist favorites to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load favorites from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Favorite store is unavailable")]
    Poisoned,
}

/// Set of favorited uids
pub trait FavoriteStore: Send + Sync + std::fmt::Debug {
    /// Whether `uid` is a favorite
    fn has(&self, uid: &str) -> bool;

    /// Flip the favorite flag of `uid` and persist the change.
    /// Returns the new flag.
    fn toggle(&self, uid: &str) -> Result<bool, FavoritesError>;

    /// All favorites, in the order they were added
    fn ids(&self) -> Vec<String>;
}

fn flip(ids: &mut Vec<String>, uid: &str) -> bool {
    match ids.iter().position(|id| id == uid) {
        Some(index) => {
            ids.remove(index);
            false
        }
        None => {
            ids.push(uid.to_string());
            true
        }
    }
}

/// In-memory favorites
#[derive(Debug, Default)]
pub struct MemoryFavorites {
    ids: Mutex<Vec<String>>,
}

impl MemoryFavorites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        if let Ok(mut current) = store.ids.lock() {
            for id in ids {
                let id = id.into();
                if !current.contains(&id) {
                    current.push(id);
                }
            }
        }
        store
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<String>>, FavoritesError> {
        self.ids.lock().map_err(|_| FavoritesError::Poisoned)
    }
}

impl FavoriteStore for MemoryFavorites {
    fn has(&self, uid: &str) -> bool {
        self.lock().map(|ids| ids.iter().any(|id| id == uid)).unwrap_or(false)
    }

    fn toggle(&self, uid: &str) -> Result<bool, FavoritesError> {
        let mut ids = self.lock()?;
        Ok(flip(&mut ids, uid))
    }

    fn ids(&self) -> Vec<String> {
        self.lock().map(|ids| ids.clone()).unwrap_or_default()
    }
}

/// Favorites persisted as a JSON array of uids.
///
/// Every toggle rewrites the file while holding the lock, so concurrent
/// toggles are serialized and the file always matches memory. A failed write
/// rolls the flip back.
#[derive(Debug)]
pub struct FileFavorites {
    path: PathBuf,
    ids: Mutex<Vec<String>>,
}

impl FileFavorites {
    /// Open the store at `path`; a missing file is an empty set
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FavoritesError> {
        let path = path.into();
        let ids: Vec<String> = read_json(&path)
            .map_err(|source| FavoritesError::Load {
                path: path.clone(),
                source,
            })?
            .unwrap_or_default();

        tracing::debug!("Loaded {} favorites from {}", ids.len(), path.display());
        Ok(Self {
            path,
            ids: Mutex::new(ids),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<String>>, FavoritesError> {
        self.ids.lock().map_err(|_| FavoritesError::Poisoned)
    }
}

impl FavoriteStore for FileFavorites {
    fn has(&self, uid: &str) -> bool {
        self.lock().map(|ids| ids.iter().any(|id| id == uid)).unwrap_or(false)
    }

    fn toggle(&self, uid: &str) -> Result<bool, FavoritesError> {
        let mut ids = self.lock()?;
        let favorited = flip(&mut ids, uid);

        if let Err(source) = write_json_atomic(&self.path, &*ids) {
            flip(&mut ids, uid);
            tracing::warn!("Failed to persist favorites: {}", source);
            return Err(FavoritesError::Persist {
                path: self.path.clone(),
                source,
            });
        }

        Ok(favorited)
    }

    fn ids(&self) -> Vec<String> {
        self.lock().map(|ids| ids.clone()).unwrap_or_default()
    }
}

/// PubMed query matching exactly the given uids: `1[PMID] OR 2[PMID]`
pub fn favorites_query(ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("{}[PMID]", id))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Engine for the favorites view: zero stagger, gated off while the set is
/// empty
pub fn favorites_engine(
    api: Arc<dyn LiteratureApi>,
    store: &dyn FavoriteStore,
) -> QueryFetchEngine {
    let ids = store.ids();
    QueryFetchEngine::spawn(api, favorites_query(&ids), Duration::ZERO, !ids.is_empty())
}

/// Pair each article with its favorite flag, keeping result order
pub fn annotate<'a>(
    results: &'a [Article],
    store: &dyn FavoriteStore,
) -> Vec<(&'a Article, bool)> {
    results
        .iter()
        .map(|article| (article, store.has(&article.uid)))
        .collect()
}
