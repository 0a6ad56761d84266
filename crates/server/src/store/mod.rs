//! File-backed persistence for user identity and conversation history

mod conversations;
mod identity;

pub use conversations::ConversationStore;
pub use identity::{IdentityStore, UserId};

use std::path::Path;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    NotFound(String),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
