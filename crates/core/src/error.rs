use thiserror::Error;

/// Errors raised while loading domain data
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Database file not found: {0}")]
    DatabaseNotFound(String),

    #[error("Failed to read database file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid database JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
