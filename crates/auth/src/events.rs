use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { user_id: i64 },
    Refreshed { user_id: i64 },
    SignedOut { user_id: i64 },
}

impl SessionEvent {
    pub fn user_id(&self) -> i64 {
        match self {
            SessionEvent::SignedIn { user_id }
            | SessionEvent::Refreshed { user_id }
            | SessionEvent::SignedOut { user_id } => *user_id,
        }
    }
}

/// A single subscription to session changes. Dropping it unsubscribes.
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl SessionSubscription {
    pub(crate) fn new(receiver: broadcast::Receiver<SessionEvent>) -> Self {
        Self { receiver }
    }

    /// Next event, or `None` once the authenticator is gone.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Explicit teardown, equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}
