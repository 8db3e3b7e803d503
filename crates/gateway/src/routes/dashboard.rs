//! Authenticated dashboard shell.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use cadence_auth::{SessionContext, User};
use cadence_billing::TrialStatus;
use serde::Serialize;
use utoipa::ToSchema;

use super::public::{nav_links, NavLink};
use super::UserResponse;
use crate::util::login_redirect;
use crate::{ApiError, AppState};

const SIDEBAR: &[(&str, &str)] = &[
    ("Overview", "/dashboard"),
    ("Meetings", "/dashboard/meetings"),
    ("Calendar", "/dashboard/calendar"),
    ("Integrations", "/dashboard/integrations"),
    ("Settings", "/dashboard/settings"),
    ("Billing", "/dashboard/billing"),
    ("Support", "/dashboard/support"),
];

const PAGES: &[&str] = &[
    "overview",
    "meetings",
    "calendar",
    "integrations",
    "settings",
    "billing",
    "support",
    "onboarding",
];

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardShell {
    pub user: UserResponse,
    pub active_page: String,
    pub sidebar: Vec<NavLink>,
    pub trial: TrialStatus,
    pub calendar_connected: bool,
    pub whatsapp_connected: bool,
    pub onboarding_required: bool,
}

#[utoipa::path(get, path = "/dashboard", tag = "Dashboard",
    responses(
        (status = 200, description = "Dashboard shell", body = DashboardShell),
        (status = 303, description = "Not signed in")
    ))]
pub async fn overview(State(state): State<AppState>, headers: HeaderMap) -> Response {
    render(&state, &headers, "overview", "/dashboard").await
}

#[utoipa::path(get, path = "/dashboard/{page}", tag = "Dashboard",
    params(("page" = String, Path, description = "Sidebar page")),
    responses(
        (status = 200, description = "Dashboard shell", body = DashboardShell),
        (status = 303, description = "Not signed in"),
        (status = 404, description = "Unknown page", body = crate::error::ErrorResponse)
    ))]
pub async fn page(
    State(state): State<AppState>,
    Path(page): Path<String>,
    headers: HeaderMap,
) -> Response {
    let path = format!("/dashboard/{page}");
    render(&state, &headers, &page, &path).await
}

/// The guard runs only once the session lookup has finished; anything
/// short of an authenticated user leaves for the sign-in page.
async fn render(state: &AppState, headers: &HeaderMap, page: &str, path: &str) -> Response {
    let Some(user) = signed_in_user(state.session_context(headers).await) else {
        return Redirect::to(&login_redirect(path)).into_response();
    };

    if !PAGES.contains(&page) {
        return ApiError::not_found(format!("unknown dashboard page `{page}`")).into_response();
    }

    match build_shell(state, user, page).await {
        Ok(shell) => Json(shell).into_response(),
        Err(error) => error.into_response(),
    }
}

fn signed_in_user(context: SessionContext) -> Option<User> {
    match context.user {
        Some(user) if context.is_authenticated && !context.loading => Some(user),
        _ => None,
    }
}

async fn build_shell(
    state: &AppState,
    user: User,
    page: &str,
) -> Result<DashboardShell, ApiError> {
    let status = state.onboarding().integration_status(&user).await?;
    let trial = state.billing().trial_status(&user).await?;

    Ok(DashboardShell {
        user: user.into(),
        active_page: page.to_string(),
        sidebar: nav_links(SIDEBAR),
        trial,
        calendar_connected: status.calendar_connected,
        whatsapp_connected: status.whatsapp_connected,
        onboarding_required: !status.onboarding_completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: 7,
            public_id: "u-7".into(),
            email: Some("guard@example.com".into()),
            display_name: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn guard_waits_for_the_session_lookup() {
        assert!(signed_in_user(SessionContext::loading()).is_none());
        assert!(signed_in_user(SessionContext {
            loading: true,
            ..SessionContext::authenticated(user())
        })
        .is_none());
    }

    #[test]
    fn guard_admits_only_authenticated_users() {
        assert!(signed_in_user(SessionContext::anonymous()).is_none());
        let admitted = signed_in_user(SessionContext::authenticated(user()));
        assert_eq!(admitted.map(|user| user.public_id), Some("u-7".to_string()));
    }
}
