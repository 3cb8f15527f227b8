use thiserror::Error;

use crate::catalog::CatalogError;
use crate::youtube::YouTubeError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("channel not found on youtube")]
    ChannelNotFound,
    #[error("youtube api error: {0}")]
    Platform(#[from] YouTubeError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

pub type IngestResult<T> = Result<T, IngestError>;
