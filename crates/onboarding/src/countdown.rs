use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Expiry of a dispatched WhatsApp code. Display only; the backend is the
/// authority on whether a code is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerificationCountdown {
    pub expires_at: DateTime<Utc>,
}

impl VerificationCountdown {
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self { expires_at }
    }

    /// Whole seconds left, never negative.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) == 0
    }

    /// `mm:ss` as shown next to the code input.
    pub fn display(&self, now: DateTime<Utc>) -> String {
        let remaining = self.remaining_seconds(now);
        format!("{:02}:{:02}", remaining / 60, remaining % 60)
    }
}
