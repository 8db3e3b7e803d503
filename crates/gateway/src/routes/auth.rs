//! Login, OAuth callbacks, session refresh and logout.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use cadence_auth::{SessionContext, User};
use cadence_onboarding::{recorded_step, CalendarCallback, OnboardingStep};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use super::UserResponse;
use crate::util::{expired_cookie, safe_return_path, session_cookie, session_token};
use crate::{ApiError, AppState};

const DASHBOARD: &str = "/dashboard";

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub authorize_url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LoginQuery {
    pub redirect_to: Option<String>,
}

/// Both providers return to the same URI; the query decides which flow
/// the visit belongs to.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub status: Option<String>,
    pub user_id: Option<String>,
    pub error_message: Option<String>,
}

impl CallbackQuery {
    fn calendar(&self) -> CalendarCallback {
        CalendarCallback {
            status: self.status.clone(),
            user_id: self.user_id.clone(),
            error_message: self.error_message.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
    pub expires_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionContextResponse {
    pub user: Option<UserResponse>,
    pub is_authenticated: bool,
    pub loading: bool,
}

impl From<SessionContext> for SessionContextResponse {
    fn from(context: SessionContext) -> Self {
        Self {
            user: context.user.map(UserResponse::from),
            is_authenticated: context.is_authenticated,
            loading: context.loading,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/login",
    tag = "Auth",
    params(LoginQuery),
    responses(
        (status = 200, description = "Identity provider authorize URL", body = LoginResponse),
        (status = 503, description = "Identity provider not configured", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Json<LoginResponse>, ApiError> {
    if !state.authenticator().identity_enabled() {
        return Err(cadence_auth::AuthError::IdentityDisabled.into());
    }

    let return_to = safe_return_path(query.redirect_to.as_deref());
    let oauth_state = state.oauth_state().issue(return_to).await;
    let authorize_url = state
        .authenticator()
        .authorization_url(&oauth_state, &state.callback_url())?;

    Ok(Json(LoginResponse { authorize_url }))
}

/// Provider redirect target. Always answers with a redirect; a callback
/// that does not finish within the configured window goes to the
/// dashboard, where the session guard takes over.
#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = "Auth",
    params(CallbackQuery),
    responses((status = 303, description = "Redirect to the next page"))
)]
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let timeout = state.callback_timeout();
    match tokio::time::timeout(timeout, dispatch_callback(&state, query, &headers, jar)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "oauth callback timed out");
            Redirect::to(DASHBOARD).into_response()
        }
    }
}

async fn dispatch_callback(
    state: &AppState,
    query: CallbackQuery,
    headers: &HeaderMap,
    jar: CookieJar,
) -> Response {
    if let Some(error) = query.error.as_deref() {
        warn!(%error, "identity provider returned an error");
        return Redirect::to(&auth_error("login_failed")).into_response();
    }

    if let (Some(code), Some(oauth_state)) = (query.code.as_deref(), query.state.as_deref()) {
        return identity_callback(state, code, oauth_state, jar).await;
    }

    let calendar = query.calendar();
    if calendar.is_present() {
        return calendar_callback(state, &calendar, headers).await;
    }

    Redirect::to(&auth_error("invalid_callback")).into_response()
}

async fn identity_callback(
    state: &AppState,
    code: &str,
    oauth_state: &str,
    jar: CookieJar,
) -> Response {
    let Some(intent) = state.oauth_state().consume(oauth_state).await else {
        warn!("unknown or expired oauth state");
        return Redirect::to(&auth_error("invalid_state")).into_response();
    };

    let session = match state
        .authenticator()
        .login_with_code(code, &state.callback_url())
        .await
    {
        Ok(session) => session,
        Err(error) => {
            warn!(%error, "identity login failed");
            return Redirect::to(&auth_error("login_failed")).into_response();
        }
    };

    let user = match state.authenticator().user_profile(session.user_id).await {
        Ok(user) => user,
        Err(error) => {
            warn!(%error, "signed-in user could not be loaded");
            return Redirect::to(&auth_error("login_failed")).into_response();
        }
    };

    let cookie = session_cookie(
        state.session_cookie(),
        session.token,
        session.expires_at,
        state.config().http.secure_cookies(),
    );
    let target = post_login_target(state, &user, intent.return_to).await;
    info!(user_id = user.id, %target, "user signed in");

    (jar.add(cookie), Redirect::to(&target)).into_response()
}

/// Unfinished onboarding wins over any requested destination.
async fn post_login_target(state: &AppState, user: &User, return_to: Option<String>) -> String {
    match state.onboarding().integration_status(user).await {
        Ok(status) if !status.onboarding_completed => {
            onboarding_target(recorded_step(&status), None)
        }
        Ok(_) => return_to.unwrap_or_else(|| DASHBOARD.to_string()),
        Err(error) => {
            warn!(%error, user_id = user.id, "integration status unavailable after login");
            DASHBOARD.to_string()
        }
    }
}

async fn calendar_callback(
    state: &AppState,
    callback: &CalendarCallback,
    headers: &HeaderMap,
) -> Response {
    let user = match state.current_user(headers).await {
        Ok(user) => user,
        Err(_) => return Redirect::to("/auth").into_response(),
    };

    let target = match state
        .onboarding()
        .complete_calendar_callback(&user, callback)
        .await
    {
        Ok(_) => onboarding_target(OnboardingStep::Phone, None),
        Err(error) => onboarding_target(OnboardingStep::Calendar, Some(&error.to_string())),
    };

    Redirect::to(&target).into_response()
}

fn onboarding_target(step: OnboardingStep, error: Option<&str>) -> String {
    let mut target = format!("/dashboard/onboarding?step={}", step.number());
    if let Some(error) = error {
        let encoded: String = url::form_urlencoded::byte_serialize(error.as_bytes()).collect();
        target.push_str("&error=");
        target.push_str(&encoded);
    }
    target
}

fn auth_error(code: &str) -> String {
    format!("/auth?error={code}")
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    tag = "Auth",
    responses((status = 200, description = "Current session state", body = SessionContextResponse))
)]
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<SessionContextResponse> {
    Json(state.session_context(&headers).await.into())
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "Rotated session", body = SessionResponse),
        (status = 401, description = "No live session", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let token = session_token(&headers, state.session_cookie())
        .ok_or_else(|| ApiError::unauthorized("missing session"))?;
    let (user, session) = state.authenticator().refresh_session(&token).await?;

    let cookie = session_cookie(
        state.session_cookie(),
        session.token.clone(),
        session.expires_at,
        state.config().http.secure_cookies(),
    );

    Ok((
        jar.add(cookie),
        Json(SessionResponse {
            token: session.token,
            user: user.into(),
            expires_at: session.expires_at.to_rfc3339(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 204, description = "Session revoked")),
    security(("bearerAuth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar), ApiError> {
    if let Some(token) = session_token(&headers, state.session_cookie()) {
        state.authenticator().revoke_session(&token).await?;
    }

    Ok((
        StatusCode::NO_CONTENT,
        jar.add(expired_cookie(state.session_cookie())),
    ))
}
