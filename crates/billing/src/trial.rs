use cadence_workflow::Subscription;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

const SECONDS_PER_DAY: i64 = 86_400;

/// Length of the free window granted from account creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialPolicy {
    trial_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrialStatus {
    pub has_active_subscription: bool,
    pub is_trial_active: bool,
    pub can_create_meetings: bool,
    /// Whole days left in the trial, rounded up and clamped to the trial length.
    pub days_remaining: i64,
    pub trial_ends_at: DateTime<Utc>,
    pub subscription: Option<Subscription>,
}

impl TrialPolicy {
    pub fn new(trial_days: i64) -> Self {
        Self {
            trial_days: trial_days.max(0),
        }
    }

    pub fn trial_days(&self) -> i64 {
        self.trial_days
    }

    /// Decide eligibility. An active subscription always wins; otherwise
    /// access lasts while `now - trial_start` is inside the window.
    ///
    /// ```
    /// use cadence_billing::TrialPolicy;
    /// use chrono::{Duration, Utc};
    ///
    /// let now = Utc::now();
    /// let status = TrialPolicy::new(14).evaluate(now - Duration::days(20), None, now);
    /// assert!(!status.can_create_meetings);
    /// assert_eq!(status.days_remaining, 0);
    /// ```
    pub fn evaluate(
        &self,
        trial_start: DateTime<Utc>,
        subscription: Option<Subscription>,
        now: DateTime<Utc>,
    ) -> TrialStatus {
        let trial_ends_at = trial_start + Duration::days(self.trial_days);
        let is_trial_active = now - trial_start < Duration::days(self.trial_days);

        let remaining_seconds = (trial_ends_at - now).num_seconds();
        let days_remaining = if remaining_seconds <= 0 {
            0
        } else {
            (remaining_seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
        }
        .clamp(0, self.trial_days);

        let has_active_subscription = subscription
            .as_ref()
            .is_some_and(Subscription::is_active);

        TrialStatus {
            has_active_subscription,
            is_trial_active,
            can_create_meetings: has_active_subscription || is_trial_active,
            days_remaining,
            trial_ends_at,
            subscription,
        }
    }
}
