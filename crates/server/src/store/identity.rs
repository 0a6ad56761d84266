//! Per-installation user identity
//!
//! The identity is whatever token sits in the marker file. There is no
//! authentication: whoever can read the file is the user.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use super::StoreError;

/// Opaque user token, safe to use as a directory name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Mint a fresh random token
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts non-empty tokens made of ASCII alphanumerics, `-` and `_`
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim();
        let valid = !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for display
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads and writes the identity marker file
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The stored identity, if the marker exists and holds a usable token
    pub fn load(&self) -> Option<UserId> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read user id file");
                return None;
            }
        };

        let user_id = UserId::parse(&raw);
        if user_id.is_none() && !raw.trim().is_empty() {
            tracing::warn!(path = %self.path.display(), "Ignoring malformed user id file");
        }
        user_id
    }

    pub fn save(&self, user_id: &UserId) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        std::fs::write(&self.path, user_id.as_str()).map_err(|e| StoreError::io(&self.path, e))
    }

    /// Load the stored identity or mint and persist a new one.
    ///
    /// Returns the identity and whether it was freshly created.
    pub fn load_or_create(&self) -> Result<(UserId, bool), StoreError> {
        if let Some(user_id) = self.load() {
            return Ok((user_id, false));
        }

        let user_id = UserId::generate();
        self.save(&user_id)?;
        tracing::info!(user = %user_id.short(), "Created new user identity");
        Ok((user_id, true))
    }

    /// Remove the marker file. A missing marker is not an error.
    pub fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }
}
