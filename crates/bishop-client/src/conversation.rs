//! The controller flow behind the chat screen:
//! trial gate, session model, service router and dispatcher in one owner.
//!
//! Keeping every read-modify-write of persisted state inside this type
//! means no two event handlers interleave updates to the same key.

use bishop_session::{Message, Service, SessionBook, StorageResult, TrialGate};
use tracing::{debug, info};

use crate::client::ServiceRequest;
use crate::dispatcher::{Applied, Dispatcher};
use crate::router::{route_tile, TileAction};

/// Result of a user action on the chat screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// A request went out for this session.
    Sent { session_id: String },
    /// A prompt session was opened; nothing sent yet.
    Prompted { session_id: String },
    /// The trial gate refused; the login prompt should be shown.
    Blocked,
    /// Empty input or a request is already pending.
    Ignored,
}

pub struct Conversation {
    book: SessionBook,
    gate: TrialGate,
    dispatcher: Dispatcher,
}

impl Conversation {
    pub fn new(book: SessionBook, gate: TrialGate, dispatcher: Dispatcher) -> Self {
        Self {
            book,
            gate,
            dispatcher,
        }
    }

    pub fn book(&self) -> &SessionBook {
        &self.book
    }

    pub fn gate(&self) -> &TrialGate {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut TrialGate {
        &mut self.gate
    }

    pub fn is_pending(&self) -> bool {
        self.dispatcher.is_pending()
    }

    /// Service the next send goes to.
    pub fn current_service(&self) -> Service {
        self.book.active_service()
    }

    pub fn select(&mut self, session_id: &str) -> bool {
        self.book.select(session_id)
    }

    /// Deselect the active session; the next send opens a new one.
    pub fn new_chat(&mut self) {
        self.book.clear_active();
    }

    /// Send what the user typed to the active session's service.
    ///
    /// The request goes out before the transcript is saved, so a failed save
    /// is reported without leaving the message unanswered.
    pub async fn submit(&mut self, input: &str) -> StorageResult<SendOutcome> {
        let text = input.trim();
        if text.is_empty() || self.is_pending() {
            return Ok(SendOutcome::Ignored);
        }
        if !self.gate.admit().await? {
            return Ok(SendOutcome::Blocked);
        }

        let message = Message::user(text);
        let session_id = match self.book.active_id().map(str::to_string) {
            Some(id) => {
                self.book.push_message(&id, message);
                id
            }
            None => self
                .book
                .open_session(Service::Chat, Some(message))
                .id()
                .to_string(),
        };

        let request = match self.book.get(&session_id) {
            Some(session) if session.service() == Service::Chat => {
                ServiceRequest::chat(text, session.backend_session_id())
            }
            Some(session) => ServiceRequest::new(session.service(), text),
            None => ServiceRequest::chat(text, None),
        };

        self.dispatcher.dispatch(session_id.clone(), request);
        self.book.save().await?;
        Ok(SendOutcome::Sent { session_id })
    }

    /// Handle a tap on a service tile.
    pub async fn choose_tile(&mut self, label: &str) -> StorageResult<SendOutcome> {
        if self.is_pending() {
            return Ok(SendOutcome::Ignored);
        }
        if !self.gate.check_attempts().await? {
            return Ok(SendOutcome::Blocked);
        }

        match route_tile(label) {
            TileAction::Prompt { service, prompt } => {
                let session = self
                    .book
                    .create_session(service, Some(Message::assistant(prompt)))
                    .await?;
                info!("Opened {} session {}", service, session.id());
                Ok(SendOutcome::Prompted {
                    session_id: session.id().to_string(),
                })
            }
            TileAction::StartChat { message } => {
                let session = self
                    .book
                    .open_session(Service::Chat, Some(Message::user(message.as_str())));
                let session_id = session.id().to_string();
                self.dispatcher
                    .dispatch(session_id.clone(), ServiceRequest::chat(message, None));

                let saved = self.book.save().await;
                let counted = self.gate.increment_attempts().await;
                saved?;
                counted?;
                Ok(SendOutcome::Sent { session_id })
            }
        }
    }

    /// Apply every completion that is already available. Never blocks.
    pub async fn poll(&mut self) -> StorageResult<usize> {
        let mut applied = 0;
        while let Some(completion) = self.dispatcher.try_next() {
            completion.apply(&mut self.book).await?;
            applied += 1;
        }
        if applied > 0 {
            debug!("Applied {} completions", applied);
        }
        Ok(applied)
    }

    /// Wait for the next completion and apply it. `None` when nothing is in flight.
    pub async fn wait_next(&mut self) -> StorageResult<Option<Applied>> {
        match self.dispatcher.next().await {
            Some(completion) => Ok(Some(completion.apply(&mut self.book).await?)),
            None => Ok(None),
        }
    }
}
