//! Per-user board persistence.
//!
//! Each user owns one JSON document holding a `boards` array. Writes merge
//! into the document, so fields other than `boards` survive a save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::models::{default_boards, Board, BoardList};
use crate::utils::{read_json, write_json_atomic};

/// Errors from a board store
#[derive(Debug, thiserror::Error)]
pub enum BoardStoreError {
    #[error("Invalid user id: {0:?}")]
    InvalidUser(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed board document for {user}: {source}")]
    Malformed {
        user: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Board store is unavailable")]
    Poisoned,
}

/// Storage of each user's ordered board list
pub trait BoardStore: Send + Sync + std::fmt::Debug {
    /// The saved list, or `None` if the user has never saved one
    fn load(&self, user_id: &str) -> Result<Option<BoardList>, BoardStoreError>;

    /// Replace the user's list
    fn save(&self, user_id: &str, boards: &BoardList) -> Result<(), BoardStoreError>;
}

/// Load the user's boards, seeding and saving the defaults on first use.
///
/// A saved empty list is respected.
pub fn load_or_init(store: &dyn BoardStore, user_id: &str) -> Result<BoardList, BoardStoreError> {
    load_or_init_with(store, user_id, default_boards())
}

/// Like [`load_or_init`] with explicit seed boards
pub fn load_or_init_with(
    store: &dyn BoardStore,
    user_id: &str,
    seed: Vec<Board>,
) -> Result<BoardList, BoardStoreError> {
    if let Some(boards) = store.load(user_id)? {
        return Ok(boards);
    }

    tracing::info!("Initializing {} boards for {}", seed.len(), user_id);
    let boards = BoardList::new(seed);
    store.save(user_id, &boards)?;
    Ok(boards)
}

fn validate_user(user_id: &str) -> Result<(), BoardStoreError> {
    let valid = !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !user_id.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(BoardStoreError::InvalidUser(user_id.to_string()))
    }
}

/// One `<user_id>.json` document per user under a directory
#[derive(Debug, Clone)]
pub struct FileBoardStore {
    dir: PathBuf,
}

impl FileBoardStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the user's document
    pub fn document_path(&self, user_id: &str) -> Result<PathBuf, BoardStoreError> {
        validate_user(user_id)?;
        Ok(self.dir.join(format!("{}.json", user_id)))
    }

    fn read_document(&self, path: &Path) -> Result<Option<Map<String, Value>>, BoardStoreError> {
        read_json(path).map_err(|source| BoardStoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl BoardStore for FileBoardStore {
    fn load(&self, user_id: &str) -> Result<Option<BoardList>, BoardStoreError> {
        let path = self.document_path(user_id)?;
        let Some(mut document) = self.read_document(&path)? else {
            return Ok(None);
        };

        match document.remove("boards") {
            Some(Value::Null) | None => Ok(None),
            Some(boards) => serde_json::from_value(boards)
                .map(Some)
                .map_err(|source| BoardStoreError::Malformed {
                    user: user_id.to_string(),
                    source,
                }),
        }
    }

    fn save(&self, user_id: &str, boards: &BoardList) -> Result<(), BoardStoreError> {
        let path = self.document_path(user_id)?;
        let mut document = self.read_document(&path)?.unwrap_or_default();

        let value = serde_json::to_value(boards).map_err(|source| BoardStoreError::Malformed {
            user: user_id.to_string(),
            source,
        })?;
        document.insert("boards".to_string(), value);

        write_json_atomic(&path, &document).map_err(|source| BoardStoreError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Saved {} boards to {}", boards.len(), path.display());
        Ok(())
    }
}

/// In-memory board store
#[derive(Debug, Default)]
pub struct MemoryBoardStore {
    users: Mutex<HashMap<String, BoardList>>,
}

impl MemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BoardStore for MemoryBoardStore {
    fn load(&self, user_id: &str) -> Result<Option<BoardList>, BoardStoreError> {
        let users = self.users.lock().map_err(|_| BoardStoreError::Poisoned)?;
        Ok(users.get(user_id).cloned())
    }

    fn save(&self, user_id: &str, boards: &BoardList) -> Result<(), BoardStoreError> {
        let mut users = self.users.lock().map_err(|_| BoardStoreError::Poisoned)?;
        users.insert(user_id.to_string(), boards.clone());
        Ok(())
    }
}
