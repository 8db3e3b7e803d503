use std::{sync::Arc, time::Duration};

use axum::http::HeaderMap;
use cadence_auth::{AuthSession, Authenticator, OAuthStateStore, SessionContext, User};
use cadence_billing::BillingService;
use cadence_config::AppConfig;
use cadence_onboarding::OnboardingService;
use cadence_workflow::WorkflowClient;

use crate::util::session_token;
use crate::ApiError;

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    authenticator: Authenticator,
    workflow: WorkflowClient,
    onboarding: OnboardingService,
    billing: BillingService,
    oauth_state: OAuthStateStore,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, authenticator: Authenticator, workflow: WorkflowClient) -> Self {
        Self::with_oauth_store(config, authenticator, workflow, OAuthStateStore::default())
    }

    pub fn with_oauth_store(
        config: Arc<AppConfig>,
        authenticator: Authenticator,
        workflow: WorkflowClient,
        oauth_state: OAuthStateStore,
    ) -> Self {
        let pool = authenticator.pool();
        let onboarding = OnboardingService::new(pool.clone(), workflow.clone(), &config.onboarding);
        let billing = BillingService::new(pool, workflow.clone(), &config.billing, &config.http);

        Self {
            config,
            authenticator,
            workflow,
            onboarding,
            billing,
            oauth_state,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn workflow(&self) -> &WorkflowClient {
        &self.workflow
    }

    pub fn onboarding(&self) -> &OnboardingService {
        &self.onboarding
    }

    pub fn billing(&self) -> &BillingService {
        &self.billing
    }

    pub fn oauth_state(&self) -> &OAuthStateStore {
        &self.oauth_state
    }

    pub fn session_cookie(&self) -> &str {
        &self.config.auth.session_cookie
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.config.onboarding.callback_timeout_seconds.max(1))
    }

    /// Absolute URI the identity and calendar providers redirect back to.
    pub fn callback_url(&self) -> String {
        self.config.http.absolute_url("/auth/callback")
    }

    pub async fn authenticate(&self, token: &str) -> Result<(User, AuthSession), ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }

    /// The signed-in user for a request carrying a bearer token or the
    /// session cookie.
    pub async fn current_user(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let token = session_token(headers, self.session_cookie())
            .ok_or_else(|| ApiError::unauthorized("missing session"))?;
        let (user, _) = self.authenticate(&token).await?;
        Ok(user)
    }

    pub async fn session_context(&self, headers: &HeaderMap) -> SessionContext {
        let token = session_token(headers, self.session_cookie());
        self.authenticator.resolve(token.as_deref()).await
    }
}
