//! Session controller.
//!
//! Holds the current identity and conversation explicitly instead of as
//! ambient state. All operations go through one async mutex, so requests for
//! the local identity are applied in order.

use chrono::NaiveDateTime;
use inacbg_core::{Conversation, ConversationSummary, Message, timestamp};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::ai::AnswerGenerator;
use crate::ai::answer::Answer;
use crate::error::AppError;
use crate::store::{ConversationStore, IdentityStore, StoreError, UserId};

struct Session {
    user_id: UserId,
    started: NaiveDateTime,
    current: Conversation,
}

/// Session state as shown to the client
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub user_id: UserId,
    pub display_id: String,
    #[serde(with = "timestamp")]
    pub session_created: NaiveDateTime,
    pub message_count: usize,
    pub conversation: Conversation,
}

/// Result of asking a question
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub answer: Answer,
    pub message: Message,
    pub conversation_id: Uuid,
    pub title: String,
    pub message_count: usize,
}

pub struct SessionController {
    identity: IdentityStore,
    conversations: ConversationStore,
    answers: AnswerGenerator,
    state: Mutex<Option<Session>>,
}

impl SessionController {
    pub fn new(
        identity: IdentityStore,
        conversations: ConversationStore,
        answers: AnswerGenerator,
    ) -> Self {
        Self {
            identity,
            conversations,
            answers,
            state: Mutex::new(None),
        }
    }

    pub fn answers(&self) -> &AnswerGenerator {
        &self.answers
    }

    /// Start a session: resolve identity, then resume the most recently
    /// updated conversation or begin a new one
    fn start(&self) -> Result<Session, StoreError> {
        let (user_id, created) = self.identity.load_or_create()?;
        let current = self
            .conversations
            .list(&user_id)?
            .first()
            .and_then(|latest| self.conversations.load(&user_id, latest.id))
            .unwrap_or_default();

        tracing::info!(
            user = %user_id.short(),
            new_identity = created,
            conversation_id = %current.id,
            messages = current.messages.len(),
            "Session started"
        );

        Ok(Session {
            user_id,
            started: timestamp::now(),
            current,
        })
    }

    fn ensure<'a>(&self, slot: &'a mut Option<Session>) -> Result<&'a mut Session, StoreError> {
        let session = match slot.take() {
            Some(session) => session,
            None => self.start()?,
        };
        Ok(slot.insert(session))
    }

    fn view(session: &Session) -> SessionView {
        SessionView {
            user_id: session.user_id.clone(),
            display_id: format!("{}...", session.user_id.short()),
            session_created: session.started,
            message_count: session.current.messages.len(),
            conversation: session.current.clone(),
        }
    }

    /// Current session, starting one if needed
    pub async fn snapshot(&self) -> Result<SessionView, AppError> {
        let mut state = self.state.lock().await;
        let session = self.ensure(&mut state)?;
        Ok(Self::view(session))
    }

    /// Stored conversations for the current user, most recent first
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, AppError> {
        let mut state = self.state.lock().await;
        let session = self.ensure(&mut state)?;
        Ok(self.conversations.list(&session.user_id)?)
    }

    /// A conversation by id. The current conversation is returned even
    /// before its first save.
    pub async fn conversation(&self, id: Uuid) -> Result<Conversation, AppError> {
        let mut state = self.state.lock().await;
        let session = self.ensure(&mut state)?;
        if session.current.id == id {
            return Ok(session.current.clone());
        }
        self.conversations
            .load(&session.user_id, id)
            .ok_or_else(|| AppError::NotFound(format!("Conversation {} not found", id)))
    }

    /// Switch to an empty, unsaved conversation
    pub async fn new_conversation(&self) -> Result<SessionView, AppError> {
        let mut state = self.state.lock().await;
        let session = self.ensure(&mut state)?;
        session.current = Conversation::new();
        tracing::info!(conversation_id = %session.current.id, "New conversation");
        Ok(Self::view(session))
    }

    /// Make a stored conversation current
    pub async fn select_conversation(&self, id: Uuid) -> Result<SessionView, AppError> {
        let mut state = self.state.lock().await;
        let session = self.ensure(&mut state)?;
        let conversation = self
            .conversations
            .load(&session.user_id, id)
            .ok_or_else(|| AppError::NotFound(format!("Conversation {} not found", id)))?;
        session.current = conversation;
        Ok(Self::view(session))
    }

    /// Delete a conversation. Deleting the current one switches to the most
    /// recent remaining conversation, or a new one if none remain.
    pub async fn delete_conversation(&self, id: Uuid) -> Result<SessionView, AppError> {
        let mut state = self.state.lock().await;
        let session = self.ensure(&mut state)?;

        let removed = self.conversations.delete(&session.user_id, id)?;
        let was_current = session.current.id == id;
        if !removed && !was_current {
            return Err(AppError::NotFound(format!("Conversation {} not found", id)));
        }

        if was_current {
            session.current = self
                .conversations
                .list(&session.user_id)?
                .first()
                .and_then(|latest| self.conversations.load(&session.user_id, latest.id))
                .unwrap_or_default();
        }

        tracing::info!(conversation_id = %id, was_current, "Conversation deleted");
        Ok(Self::view(session))
    }

    /// Ask a question in the current conversation and persist the turn
    pub async fn ask(&self, question: &str) -> Result<ChatOutcome, AppError> {
        if question.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Silakan masukkan pertanyaan terlebih dahulu.".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        let session = self.ensure(&mut state)?;

        let answer = self.answers.answer(question).await;
        let outcome = if answer.error.is_some() { "error" } else { "ok" };
        metrics::counter!("chat_answers_total", "outcome" => outcome).increment(1);
        let message = session
            .current
            .push_turn(question, answer.text.clone())
            .clone();
        session.current = self.conversations.save(&session.user_id, &session.current)?;

        Ok(ChatOutcome {
            answer,
            message,
            conversation_id: session.current.id,
            title: session.current.title.clone(),
            message_count: session.current.messages.len(),
        })
    }

    /// Forget the identity: delete the marker file and drop all session
    /// state. The returned view belongs to the freshly minted identity.
    pub async fn reset(&self) -> Result<SessionView, AppError> {
        let mut state = self.state.lock().await;
        self.identity.clear()?;
        if let Some(old) = state.take() {
            tracing::info!(user = %old.user_id.short(), "Session reset");
        }
        let session = self.ensure(&mut state)?;
        Ok(Self::view(session))
    }
}
