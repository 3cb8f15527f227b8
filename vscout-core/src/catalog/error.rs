use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to open catalog database {path}: {source}")]
    OpenDatabase {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("catalog path not configured")]
    MissingPath,
    #[error("channel already tracked: {youtube_id}")]
    DuplicateChannel { youtube_id: String },
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
    #[error("video not found: {0}")]
    VideoNotFound(String),
    #[error("idea not found: {0}")]
    IdeaNotFound(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
