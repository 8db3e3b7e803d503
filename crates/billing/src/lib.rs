//! Trial gate and payment redirects.
//!
//! Subscriptions live with the payment provider and are read through the
//! workflow backend. The trial start is cached locally per user.

mod trial;

pub use cadence_workflow::Subscription;
pub use trial::{TrialPolicy, TrialStatus};

use cadence_auth::User;
use cadence_config::{BillingConfig, HttpConfig};
use cadence_database::{DatabaseError, TrialRepository};
use cadence_workflow::{CheckoutRequest, PortalRequest, WorkflowClient, WorkflowError};
use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const KNOWN_PLANS: &[&str] = &["starter", "pro", "team"];

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("unknown plan: {0}")]
    UnknownPlan(String),
    #[error("payment provider did not return a redirect url")]
    MissingRedirectUrl,
    #[error("backend error: {0}")]
    Backend(#[from] WorkflowError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

#[derive(Clone)]
pub struct BillingService {
    trials: TrialRepository,
    workflow: WorkflowClient,
    policy: TrialPolicy,
    success_url: String,
    cancel_url: String,
    portal_return_url: String,
}

impl BillingService {
    pub fn new(
        pool: SqlitePool,
        workflow: WorkflowClient,
        billing: &BillingConfig,
        http: &HttpConfig,
    ) -> Self {
        Self {
            trials: TrialRepository::new(pool),
            workflow,
            policy: TrialPolicy::new(billing.trial_days),
            success_url: http.absolute_url(&billing.success_path),
            cancel_url: http.absolute_url(&billing.cancel_path),
            portal_return_url: http.absolute_url("/dashboard/billing"),
        }
    }

    pub fn policy(&self) -> TrialPolicy {
        self.policy
    }

    /// Trial and subscription state for `user`. A failed subscription
    /// lookup is logged and the trial window alone decides.
    pub async fn trial_status(&self, user: &User) -> Result<TrialStatus, BillingError> {
        let trial_start = self.trials.trial_start(user.id, user.created_at).await?;

        let subscription = match user.email.as_deref() {
            Some(email) => match self.workflow.subscription(email).await {
                Ok(subscription) => subscription,
                Err(error) => {
                    warn!(user_id = user.id, %error, "subscription lookup failed, using trial window only");
                    None
                }
            },
            None => {
                debug!(user_id = user.id, "user has no email, skipping subscription lookup");
                None
            }
        };

        Ok(self.policy.evaluate(trial_start, subscription, Utc::now()))
    }

    /// Checkout URL for `plan_id`. The caller redirects the browser there.
    pub async fn checkout_url(&self, user: &User, plan_id: &str) -> Result<String, BillingError> {
        let plan_id = plan_id.trim().to_ascii_lowercase();
        if !KNOWN_PLANS.contains(&plan_id.as_str()) {
            return Err(BillingError::UnknownPlan(plan_id));
        }

        let session = self
            .workflow
            .checkout_session(&CheckoutRequest {
                user_id: user.public_id.clone(),
                email: user.email.clone(),
                plan_id: plan_id.clone(),
                success_url: self.success_url.clone(),
                cancel_url: self.cancel_url.clone(),
            })
            .await?;

        let url = redirect_target(session.url)?;
        info!(user_id = user.id, plan = %plan_id, "checkout session created");
        Ok(url)
    }

    pub async fn portal_url(&self, user: &User) -> Result<String, BillingError> {
        let session = self
            .workflow
            .portal_session(&PortalRequest {
                user_id: user.public_id.clone(),
                email: user.email.clone(),
                return_url: self.portal_return_url.clone(),
            })
            .await?;

        let url = redirect_target(session.url)?;
        info!(user_id = user.id, "billing portal session created");
        Ok(url)
    }
}

fn redirect_target(url: Option<String>) -> Result<String, BillingError> {
    url.map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or(BillingError::MissingRedirectUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_missing_url_is_an_error() {
        assert!(matches!(redirect_target(None), Err(BillingError::MissingRedirectUrl)));
        assert!(matches!(
            redirect_target(Some("  ".into())),
            Err(BillingError::MissingRedirectUrl)
        ));
        assert_eq!(
            redirect_target(Some("https://pay.example.com/s/1".into())).unwrap(),
            "https://pay.example.com/s/1"
        );
    }
}
