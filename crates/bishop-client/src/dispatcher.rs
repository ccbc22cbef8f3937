//! Request dispatch.
//!
//! Every request is bound to the local session id captured when it was
//! dispatched. Replies come back over a channel and are applied to that
//! session, whichever session happens to be active by then.

use std::sync::Arc;

use bishop_session::{Message, Service, SessionBook, StorageResult};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::client::{FaithBackend, ServiceReply, ServiceRequest};
use crate::error::{ClientError, ClientResult};

/// Assistant text appended when a backend call fails.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// A finished backend call, still bound to its originating session.
#[derive(Debug)]
pub struct Completion {
    pub session_id: String,
    pub service: Service,
    pub outcome: ClientResult<ServiceReply>,
}

/// What applying a completion did to the session book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Reply,
    Apology,
    /// The session no longer exists.
    Dropped,
}

impl Completion {
    /// Reconcile into the book.
    ///
    /// Success appends the reply, records the correlation id and returns the
    /// session to plain chat. Failure appends [`APOLOGY`]. Nothing is retried.
    pub async fn apply(self, book: &mut SessionBook) -> StorageResult<Applied> {
        let Completion {
            session_id,
            service,
            outcome,
        } = self;

        match outcome {
            Ok(reply) => {
                let recorded = book
                    .record_reply(
                        &session_id,
                        Message::assistant(reply.text),
                        reply.backend_session_id.as_deref(),
                    )
                    .await?;
                if !recorded {
                    warn!("Dropping {} reply for unknown session {}", service, session_id);
                    return Ok(Applied::Dropped);
                }
                Ok(Applied::Reply)
            }
            Err(e) => {
                error!("{} request for session {} failed: {}", service, session_id, e);
                if !book
                    .append_message(&session_id, Message::assistant(APOLOGY))
                    .await?
                {
                    return Ok(Applied::Dropped);
                }
                Ok(Applied::Apology)
            }
        }
    }
}

/// Spawns backend calls and collects their completions.
pub struct Dispatcher {
    backend: Arc<dyn FaithBackend>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn FaithBackend>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Send `request` on behalf of `session_id`. Must run inside a tokio runtime.
    pub fn dispatch(&mut self, session_id: impl Into<String>, request: ServiceRequest) {
        let session_id = session_id.into();
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        self.in_flight += 1;

        debug!(
            "Dispatching {} request for session {} ({} in flight)",
            request.service, session_id, self.in_flight
        );

        tokio::spawn(async move {
            let service = request.service;
            // The call runs in its own task so a panic still yields a completion.
            let outcome = match tokio::spawn(async move { backend.send(request).await }).await {
                Ok(outcome) => outcome,
                Err(e) => Err(ClientError::Task(e)),
            };
            // The receiver lives as long as the dispatcher; a send error means it was dropped.
            let _ = tx.send(Completion {
                session_id,
                service,
                outcome,
            });
        });
    }

    /// True while any request, for any session, is outstanding.
    pub fn is_pending(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Next finished completion, if one is ready.
    pub fn try_next(&mut self) -> Option<Completion> {
        let completion = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(completion)
    }

    /// Wait for the next completion. Returns `None` when nothing is in flight.
    pub async fn next(&mut self) -> Option<Completion> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.rx.recv().await?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(completion)
    }
}
