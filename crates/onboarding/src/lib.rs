//! One-time onboarding wizard: calendar, WhatsApp number, code check,
//! meeting preferences.
//!
//! Each step validates locally, makes at most one backend call and then
//! records progress in the integration row. Nothing is rolled back when a
//! later step fails.

mod countdown;
mod step;
mod validation;

pub use countdown::VerificationCountdown;
pub use step::OnboardingStep;
pub use validation::{validate_phone_number, validate_verification_code, MeetingPreferences};

use cadence_auth::User;
use cadence_config::OnboardingConfig;
use cadence_database::{
    DatabaseError, IntegrationRepository, IntegrationStatus, PreferencesRepository,
    StoredPreferences, VerificationRepository,
};
use cadence_workflow::{WorkflowClient, WorkflowError};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;

/// Where the wizard sends the browser once preferences are saved.
pub const COMPLETION_REDIRECT: &str = "/dashboard";

const CALENDAR_SUCCESS: &str = "success";
const MAX_VERIFICATION_TTL_SECONDS: u64 = 86_400;

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),
    #[error("verification code must be 6 digits")]
    InvalidCode,
    #[error("invalid preferences: {0}")]
    InvalidPreferences(String),
    #[error("no verification is pending, submit a phone number first")]
    NoPendingVerification,
    #[error("verification rejected: {0}")]
    VerificationRejected(String),
    #[error("calendar connection failed: {0}")]
    CalendarConnectFailed(String),
    #[error("calendar callback does not belong to the signed-in user")]
    CallbackUserMismatch,
    #[error("onboarding step `{0}` is not reachable yet")]
    StepNotReachable(OnboardingStep),
    #[error("backend error: {0}")]
    Backend(#[from] WorkflowError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Query parameters the calendar provider appends when it redirects back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarCallback {
    pub status: Option<String>,
    pub user_id: Option<String>,
    pub error_message: Option<String>,
}

impl CalendarCallback {
    pub fn is_present(&self) -> bool {
        self.status.is_some() || self.user_id.is_some() || self.error_message.is_some()
    }
}

/// Snapshot rendered by the wizard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OnboardingState {
    pub step: OnboardingStep,
    pub step_number: i64,
    pub calendar_connected: bool,
    pub whatsapp_connected: bool,
    pub completed: bool,
    pub pending_phone_number: Option<String>,
    pub countdown: Option<VerificationCountdown>,
    pub countdown_seconds: Option<i64>,
    pub preferences: MeetingPreferences,
}

/// Outcome of a dispatched WhatsApp code.
#[derive(Debug, Clone)]
pub struct PhoneSubmission {
    pub countdown: VerificationCountdown,
    pub status: IntegrationStatus,
}

/// Step recorded in the integration row, falling back to the first step.
pub fn recorded_step(status: &IntegrationStatus) -> OnboardingStep {
    OnboardingStep::from_number(status.onboarding_step).unwrap_or(OnboardingStep::Calendar)
}

#[derive(Clone)]
pub struct OnboardingService {
    integrations: IntegrationRepository,
    preferences: PreferencesRepository,
    verifications: VerificationRepository,
    workflow: WorkflowClient,
    verification_ttl: Duration,
}

impl OnboardingService {
    pub fn new(pool: SqlitePool, workflow: WorkflowClient, config: &OnboardingConfig) -> Self {
        let ttl_seconds = config.verification_ttl_seconds.min(MAX_VERIFICATION_TTL_SECONDS) as i64;
        Self {
            integrations: IntegrationRepository::new(pool.clone()),
            preferences: PreferencesRepository::new(pool.clone()),
            verifications: VerificationRepository::new(pool),
            workflow,
            verification_ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub async fn integration_status(&self, user: &User) -> Result<IntegrationStatus, OnboardingError> {
        Ok(self.integrations.find(user.id).await?)
    }

    /// Wizard state with the entry step resolved. A requested step is only
    /// honoured up to the furthest step whose prerequisites are met; without
    /// a request the recorded step is used.
    pub async fn state(
        &self,
        user: &User,
        requested: Option<OnboardingStep>,
    ) -> Result<OnboardingState, OnboardingError> {
        let status = self.integrations.find(user.id).await?;
        let pending = self.verifications.find(user.id).await?;
        let preferences = self.preferences(user).await?;

        let furthest = furthest_reachable(&status, pending.is_some());
        let recorded = recorded_step(&status);
        let step = requested.unwrap_or(recorded).min(furthest);

        let now = Utc::now();
        let countdown = pending
            .as_ref()
            .map(|pending| VerificationCountdown::new(pending.expires_at));

        Ok(OnboardingState {
            step,
            step_number: step.number(),
            calendar_connected: status.calendar_connected,
            whatsapp_connected: status.whatsapp_connected,
            completed: status.onboarding_completed,
            pending_phone_number: pending.map(|pending| pending.phone_number),
            countdown_seconds: countdown.map(|countdown| countdown.remaining_seconds(now)),
            countdown,
            preferences,
        })
    }

    /// Step 1: consent URL for the calendar provider. The browser is sent
    /// there with a full page redirect.
    pub async fn start_calendar_connect(
        &self,
        user: &User,
        redirect_uri: &str,
    ) -> Result<String, OnboardingError> {
        let url = self
            .workflow
            .calendar_connect(&user.public_id, redirect_uri)
            .await?;
        info!(user_id = user.id, "calendar authorization requested");
        Ok(url)
    }

    /// Record the outcome of the calendar provider redirect.
    pub async fn complete_calendar_callback(
        &self,
        user: &User,
        callback: &CalendarCallback,
    ) -> Result<IntegrationStatus, OnboardingError> {
        if let Some(callback_user) = callback.user_id.as_deref() {
            if callback_user != user.public_id {
                warn!(user_id = user.id, "calendar callback user mismatch");
                return Err(OnboardingError::CallbackUserMismatch);
            }
        }

        let succeeded = callback
            .status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case(CALENDAR_SUCCESS));

        if !succeeded {
            let message = callback
                .error_message
                .clone()
                .unwrap_or_else(|| "calendar provider did not report success".to_string());
            warn!(user_id = user.id, %message, "calendar connection failed");
            return Err(OnboardingError::CalendarConnectFailed(message));
        }

        let mut status = self.integrations.find(user.id).await?;
        status.calendar_connected = true;
        status.onboarding_step = status.onboarding_step.max(OnboardingStep::Phone.number());
        let status = self.integrations.upsert(&status).await?;

        info!(user_id = user.id, "calendar connected");
        Ok(status)
    }

    /// Step 2: dispatch a WhatsApp code and start the countdown.
    pub async fn submit_phone(
        &self,
        user: &User,
        phone_number: &str,
    ) -> Result<PhoneSubmission, OnboardingError> {
        let phone_number = validate_phone_number(phone_number)?;
        self.require_reachable(user.id, OnboardingStep::Phone).await?;

        self.workflow
            .whatsapp_connect(&user.public_id, &phone_number)
            .await?;

        let expires_at = Utc::now() + self.verification_ttl;
        self.verifications
            .record(user.id, &phone_number, expires_at)
            .await?;
        let status = self.advance_to(user.id, OnboardingStep::Verify).await?;

        info!(user_id = user.id, "whatsapp verification code sent");
        Ok(PhoneSubmission {
            countdown: VerificationCountdown::new(expires_at),
            status,
        })
    }

    /// Step 3: confirm the code against the pending number.
    pub async fn verify_code(
        &self,
        user: &User,
        code: &str,
    ) -> Result<IntegrationStatus, OnboardingError> {
        let code = validate_verification_code(code)?;

        let pending = self
            .verifications
            .find(user.id)
            .await?
            .ok_or(OnboardingError::NoPendingVerification)?;
        self.require_reachable(user.id, OnboardingStep::Verify).await?;

        let outcome = self
            .workflow
            .whatsapp_verify(&user.public_id, &pending.phone_number, &code)
            .await?;

        if !outcome.success {
            let message = outcome
                .message
                .unwrap_or_else(|| "code was not accepted".to_string());
            return Err(OnboardingError::VerificationRejected(message));
        }

        self.integrations
            .set_whatsapp_connected(user.id, true)
            .await?;
        let status = self.advance_to(user.id, OnboardingStep::Preferences).await?;
        self.verifications.clear(user.id).await?;

        info!(user_id = user.id, "whatsapp connected");
        Ok(status)
    }

    /// Step 4: persist preferences and close the wizard.
    pub async fn save_preferences(
        &self,
        user: &User,
        preferences: &MeetingPreferences,
    ) -> Result<IntegrationStatus, OnboardingError> {
        preferences.validate()?;
        self.require_reachable(user.id, OnboardingStep::Preferences).await?;
        self.update_preferences(user, preferences).await?;
        let status = self.integrations.complete_onboarding(user.id).await?;

        info!(user_id = user.id, "onboarding completed");
        Ok(status)
    }

    /// Stored preferences, or the defaults when none were saved yet.
    pub async fn preferences(&self, user: &User) -> Result<MeetingPreferences, OnboardingError> {
        Ok(self
            .preferences
            .find(user.id)
            .await?
            .map(|stored| MeetingPreferences {
                meeting_duration_minutes: stored.meeting_duration_minutes,
                buffer_minutes: stored.buffer_minutes,
                timezone: stored.timezone,
            })
            .unwrap_or_default())
    }

    /// Settings-page update. Leaves onboarding progress untouched.
    pub async fn update_preferences(
        &self,
        user: &User,
        preferences: &MeetingPreferences,
    ) -> Result<MeetingPreferences, OnboardingError> {
        preferences.validate()?;

        self.preferences
            .upsert(&StoredPreferences {
                user_id: user.id,
                meeting_duration_minutes: preferences.meeting_duration_minutes,
                buffer_minutes: preferences.buffer_minutes,
                timezone: preferences.timezone.clone(),
            })
            .await?;

        Ok(preferences.clone())
    }

    /// Disconnect WhatsApp remotely, then clear the local flag.
    pub async fn disconnect_whatsapp(&self, user: &User) -> Result<IntegrationStatus, OnboardingError> {
        self.workflow.whatsapp_disconnect(&user.public_id).await?;
        let status = self
            .integrations
            .set_whatsapp_connected(user.id, false)
            .await?;
        info!(user_id = user.id, "whatsapp disconnected");
        Ok(status)
    }

    /// Mutating steps run only once their prerequisites are recorded.
    async fn require_reachable(
        &self,
        user_id: i64,
        step: OnboardingStep,
    ) -> Result<(), OnboardingError> {
        let status = self.integrations.find(user_id).await?;
        let pending = self.verifications.find(user_id).await?;
        if step > furthest_reachable(&status, pending.is_some()) {
            warn!(user_id, %step, "onboarding step not reachable");
            return Err(OnboardingError::StepNotReachable(step));
        }
        Ok(())
    }

    async fn advance_to(
        &self,
        user_id: i64,
        step: OnboardingStep,
    ) -> Result<IntegrationStatus, OnboardingError> {
        let status = self.integrations.find(user_id).await?;
        if status.onboarding_step >= step.number() {
            return Ok(status);
        }
        Ok(self.integrations.set_step(user_id, step.number()).await?)
    }
}

fn furthest_reachable(status: &IntegrationStatus, verification_pending: bool) -> OnboardingStep {
    if !status.calendar_connected {
        return OnboardingStep::Calendar;
    }
    if !(verification_pending || status.whatsapp_connected) {
        return OnboardingStep::Phone;
    }
    if !status.whatsapp_connected {
        return OnboardingStep::Verify;
    }
    OnboardingStep::Preferences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(calendar: bool, whatsapp: bool) -> IntegrationStatus {
        IntegrationStatus {
            calendar_connected: calendar,
            whatsapp_connected: whatsapp,
            ..IntegrationStatus::initial(1)
        }
    }

    #[test]
    fn furthest_step_follows_prerequisites() {
        assert_eq!(furthest_reachable(&status(false, false), false), OnboardingStep::Calendar);
        assert_eq!(furthest_reachable(&status(false, true), true), OnboardingStep::Calendar);
        assert_eq!(furthest_reachable(&status(true, false), false), OnboardingStep::Phone);
        assert_eq!(furthest_reachable(&status(true, false), true), OnboardingStep::Verify);
        assert_eq!(furthest_reachable(&status(true, true), false), OnboardingStep::Preferences);
    }

    #[test]
    fn calendar_callback_presence() {
        assert!(!CalendarCallback::default().is_present());
        assert!(CalendarCallback {
            status: Some("success".into()),
            ..CalendarCallback::default()
        }
        .is_present());
    }
}
