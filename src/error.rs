use thiserror::Error;

/// Returned by URL -> id extraction when a URL does not match any shape the
/// provider knows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} url: {url}")]
pub struct InvalidUrlError {
    pub kind: String,
    pub url: String,
}

impl InvalidUrlError {
    pub fn new(kind: impl Into<String>, url: &str) -> Self {
        Self {
            kind: kind.into(),
            url: url.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    InvalidUrl(#[from] InvalidUrlError),

    #[error("unknown platform: {0}")]
    UnknownProvider(String),

    #[error("platform {0} does not support playlists")]
    PlaylistsUnsupported(String),

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
