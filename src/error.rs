use std::path::PathBuf;

/// Errors surfaced by the library. Binaries wrap these in `anyhow`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cache encoding error: {0}")]
    Cache(#[from] bincode::Error),

    #[error("message in thread {thread_id:?} has no message id")]
    MissingMessageId { thread_id: String },

    #[error("message {message_id:?} has no sender")]
    MissingSender { message_id: String },

    #[error("message {message_id:?} has a recipient without an email address")]
    MissingRecipientEmail { message_id: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
