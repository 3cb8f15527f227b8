use thiserror::Error;

pub type YouTubeResult<T> = Result<T, YouTubeError>;

#[derive(Debug, Error)]
pub enum YouTubeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("youtube api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),
}
