//! Conversation history files
//!
//! Layout: `<root>/<user_id>/<conversation_id>.json`. Each save rewrites the
//! whole file. There is no locking; one writer per identity is assumed.

use std::path::{Path, PathBuf};

use inacbg_core::{Conversation, ConversationSummary, timestamp};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use uuid::Uuid;

use super::{StoreError, UserId};

/// Reads and writes per-user conversation files
#[derive(Debug, Clone)]
pub struct ConversationStore {
    root: PathBuf,
}

impl ConversationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn user_dir(&self, user: &UserId) -> PathBuf {
        self.root.join(user.as_str())
    }

    fn file_path(&self, user: &UserId, id: Uuid) -> PathBuf {
        self.user_dir(user).join(format!("{}.json", id))
    }

    /// Stored conversations that have at least one message, most recently
    /// updated first. Unreadable files are logged and skipped.
    pub fn list(&self, user: &UserId) -> Result<Vec<ConversationSummary>, StoreError> {
        let dir = self.user_dir(user);
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let mut summaries = Vec::new();

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                    continue;
                }
            };
            let Some(id) = conversation_id_from_path(&path) else {
                continue;
            };

            match read_conversation(&path) {
                Ok(conversation) if !conversation.is_empty() => {
                    let mut summary = conversation.summary();
                    summary.id = id;
                    summaries.push(summary);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable conversation");
                }
            }
        }

        summaries.sort_by(|a, b| b.updated.cmp(&a.updated).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    /// Load one conversation; `None` when absent or unreadable
    pub fn load(&self, user: &UserId, id: Uuid) -> Option<Conversation> {
        let path = self.file_path(user, id);
        if !path.exists() {
            return None;
        }

        match read_conversation(&path) {
            Ok(mut conversation) => {
                conversation.id = id;
                Some(conversation)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load conversation");
                None
            }
        }
    }

    /// Create or overwrite a conversation file.
    ///
    /// The creation time of an existing file is kept; `updated` is set to now.
    /// Returns the conversation as written.
    pub fn save(&self, user: &UserId, conversation: &Conversation) -> Result<Conversation, StoreError> {
        let dir = self.user_dir(user);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let now = timestamp::now();
        let created = self
            .load(user, conversation.id)
            .map(|existing| existing.created)
            .unwrap_or(now);

        let stored = Conversation {
            created,
            updated: now,
            ..conversation.clone()
        };

        let path = self.file_path(user, stored.id);
        std::fs::write(&path, to_pretty_json(&stored)?).map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(
            user = %user.short(),
            conversation_id = %stored.id,
            messages = stored.messages.len(),
            "Conversation saved"
        );
        Ok(stored)
    }

    /// Delete a conversation file. Returns whether a file was removed.
    pub fn delete(&self, user: &UserId, id: Uuid) -> Result<bool, StoreError> {
        let path = self.file_path(user, id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}

fn conversation_id_from_path(path: &Path) -> Option<Uuid> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| Uuid::try_parse(s).ok())
}

fn read_conversation(path: &Path) -> Result<Conversation, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&raw).map_err(|e| e.to_string())
}

/// Four-space indented JSON, non-ASCII characters kept as-is
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn user() -> UserId {
        UserId::parse("test-user").unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, timestamp::FORMAT).unwrap()
    }

    fn conversation_with_turn(question: &str) -> Conversation {
        let mut conv = Conversation::new();
        conv.push_turn(question, format!("Jawaban untuk {question}"));
        conv
    }

    /// Write a conversation file directly with fixed timestamps
    fn write_raw(store: &ConversationStore, conv: &Conversation) {
        let dir = store.user_dir(&user());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            store.file_path(&user(), conv.id),
            serde_json::to_vec(conv).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path());
        let conv = conversation_with_turn("Kode A01.0?");

        let saved = store.save(&user(), &conv).unwrap();
        let loaded = store.load(&user(), conv.id).unwrap();

        assert_eq!(loaded.messages, conv.messages);
        assert_eq!(loaded.title, "Kode A01.0?");
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_save_preserves_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path());
        let mut conv = conversation_with_turn("Kode A09?");
        conv.created = at("2020-01-01 00:00:00");
        conv.updated = at("2020-01-01 00:00:00");
        write_raw(&store, &conv);

        conv.push_turn("Dan E86?", "Dehidrasi".to_string());
        let first = store.save(&user(), &conv).unwrap();
        let second = store.save(&user(), &conv).unwrap();

        assert_eq!(first.created, at("2020-01-01 00:00:00"));
        assert_eq!(second.created, at("2020-01-01 00:00:00"));
        assert!(second.updated > second.created);
        assert_eq!(store.load(&user(), conv.id).unwrap().messages.len(), 2);
    }

    #[test]
    fn test_list_sorted_by_updated_desc() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path());

        let mut older = conversation_with_turn("lama");
        older.updated = at("2024-01-01 09:00:00");
        let mut newer = conversation_with_turn("baru");
        newer.updated = at("2024-06-01 09:00:00");
        write_raw(&store, &older);
        write_raw(&store, &newer);

        let list = store.list(&user()).unwrap();
        let ids: Vec<_> = list.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert_eq!(list[0].message_count, 1);
    }

    #[test]
    fn test_list_skips_empty_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path());

        let kept = conversation_with_turn("ok");
        write_raw(&store, &kept);
        write_raw(&store, &Conversation::new());

        let user_dir = store.user_dir(&user());
        std::fs::write(user_dir.join(format!("{}.json", Uuid::new_v4())), "{not json").unwrap();
        std::fs::write(user_dir.join("notes.txt"), "ignored").unwrap();
        std::fs::write(user_dir.join("not-a-uuid.json"), "{}").unwrap();

        let list = store.list(&user()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, kept.id);
    }

    #[test]
    fn test_list_creates_missing_user_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path().join("histories"));
        assert!(store.list(&user()).unwrap().is_empty());
        assert!(store.user_dir(&user()).is_dir());
    }

    #[test]
    fn test_delete_removes_from_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path());
        let conv = conversation_with_turn("hapus saya");
        store.save(&user(), &conv).unwrap();

        assert!(store.delete(&user(), conv.id).unwrap());
        assert!(!store.file_path(&user(), conv.id).exists());
        assert!(store.list(&user()).unwrap().is_empty());
        assert!(!store.delete(&user(), conv.id).unwrap());
    }

    #[test]
    fn test_saved_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path());
        let conv = conversation_with_turn("Apa itu tifoid?");
        store.save(&user(), &conv).unwrap();

        let raw = std::fs::read_to_string(store.file_path(&user(), conv.id)).unwrap();
        assert!(raw.contains("\n    \"title\": \"Apa itu tifoid?\""));
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        for key in ["id", "title", "created", "updated", "messages"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["messages"][0]["question"], "Apa itu tifoid?");
    }
}
