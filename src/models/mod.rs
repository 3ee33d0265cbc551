//! Core data models for articles, boards and search requests.

mod article;
mod board;
mod search;

pub use article::{Article, ArticleBuilder, Author};
pub use board::{default_boards, Board, BoardList};
pub use search::{SearchQuery, SortBy};
