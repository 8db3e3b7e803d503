//! Integration flags and onboarding progress, one row per user.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// First onboarding step; a user without a stored row starts here.
pub const FIRST_ONBOARDING_STEP: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IntegrationStatus {
    pub user_id: i64,
    pub calendar_connected: bool,
    pub whatsapp_connected: bool,
    pub onboarding_step: i64,
    pub onboarding_completed: bool,
}

impl IntegrationStatus {
    /// The record assumed for users that never touched onboarding.
    pub fn initial(user_id: i64) -> Self {
        Self {
            user_id,
            calendar_connected: false,
            whatsapp_connected: false,
            onboarding_step: FIRST_ONBOARDING_STEP,
            onboarding_completed: false,
        }
    }
}
