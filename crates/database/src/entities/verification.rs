use chrono::{DateTime, Utc};

/// A WhatsApp number awaiting its verification code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    pub user_id: i64,
    pub phone_number: String,
    pub expires_at: DateTime<Utc>,
}
