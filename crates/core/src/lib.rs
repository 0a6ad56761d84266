//! inacbg-core: Shared case and conversation types
//!
//! This crate provides the domain types used by the coding assistant:
//! the medical case database, the searchable document projection of a case,
//! diagnosis-code scanning, and the persisted conversation model.

pub mod case;
pub mod codes;
pub mod conversation;
pub mod document;
pub mod error;
pub mod timestamp;

pub use case::{Case, CaseDatabase, DatabaseMetadata};
pub use codes::extract_codes;
pub use conversation::{
    Conversation, ConversationSummary, DEFAULT_TITLE, Message, title_from_question,
};
pub use document::{Document, chunk_case, chunk_cases};
pub use error::CoreError;
