use axum::{extract::State, http::HeaderMap, Json};
use cadence_onboarding::MeetingPreferences;

use crate::{ApiError, AppState};

#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    responses((status = 200, description = "Meeting preferences", body = MeetingPreferences)),
    security(("bearerAuth" = []))
)]
pub async fn get_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeetingPreferences>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(state.onboarding().preferences(&user).await?))
}

#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "Settings",
    request_body = MeetingPreferences,
    responses(
        (status = 200, description = "Preferences saved", body = MeetingPreferences),
        (status = 400, description = "Out of range", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(preferences): Json<MeetingPreferences>,
) -> Result<Json<MeetingPreferences>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state
            .onboarding()
            .update_preferences(&user, &preferences)
            .await?,
    ))
}
