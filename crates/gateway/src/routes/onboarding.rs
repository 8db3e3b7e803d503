use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use cadence_onboarding::{
    recorded_step, MeetingPreferences, OnboardingState, OnboardingStep, VerificationCountdown,
    COMPLETION_REDIRECT,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct OnboardingQuery {
    /// Step number (1-4) or name.
    pub step: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalendarConnectResponse {
    pub authorize_url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PhoneRequest {
    pub phone_number: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PhoneResponse {
    pub step: OnboardingStep,
    pub countdown: VerificationCountdown,
    pub countdown_seconds: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StepResponse {
    pub step: OnboardingStep,
    pub calendar_connected: bool,
    pub whatsapp_connected: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompletionResponse {
    pub completed: bool,
    pub redirect_to: String,
}

#[utoipa::path(
    get,
    path = "/api/onboarding",
    tag = "Onboarding",
    params(OnboardingQuery),
    responses(
        (status = 200, description = "Wizard state", body = OnboardingState),
        (status = 400, description = "Unknown step", body = crate::error::ErrorResponse),
        (status = 401, description = "Not signed in", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn state(
    State(state): State<AppState>,
    Query(query): Query<OnboardingQuery>,
    headers: HeaderMap,
) -> Result<Json<OnboardingState>, ApiError> {
    let user = state.current_user(&headers).await?;

    let requested = match query.step.as_deref() {
        Some(raw) => Some(
            OnboardingStep::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("unknown onboarding step `{raw}`")))?,
        ),
        None => None,
    };

    Ok(Json(state.onboarding().state(&user, requested).await?))
}

#[utoipa::path(
    post,
    path = "/api/onboarding/calendar",
    tag = "Onboarding",
    responses(
        (status = 200, description = "Calendar consent URL", body = CalendarConnectResponse),
        (status = 502, description = "Backend failure", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn connect_calendar(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CalendarConnectResponse>, ApiError> {
    let user = state.current_user(&headers).await?;
    let authorize_url = state
        .onboarding()
        .start_calendar_connect(&user, &state.callback_url())
        .await?;

    Ok(Json(CalendarConnectResponse { authorize_url }))
}

#[utoipa::path(
    post,
    path = "/api/onboarding/phone",
    tag = "Onboarding",
    request_body = PhoneRequest,
    responses(
        (status = 200, description = "Code dispatched", body = PhoneResponse),
        (status = 400, description = "Invalid phone number", body = crate::error::ErrorResponse),
        (status = 409, description = "Calendar not connected yet", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn submit_phone(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PhoneRequest>,
) -> Result<Json<PhoneResponse>, ApiError> {
    let user = state.current_user(&headers).await?;
    let submission = state
        .onboarding()
        .submit_phone(&user, &request.phone_number)
        .await?;

    Ok(Json(PhoneResponse {
        step: recorded_step(&submission.status),
        countdown_seconds: submission.countdown.remaining_seconds(chrono::Utc::now()),
        countdown: submission.countdown,
    }))
}

#[utoipa::path(
    post,
    path = "/api/onboarding/verify",
    tag = "Onboarding",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "WhatsApp connected", body = StepResponse),
        (status = 400, description = "Invalid or rejected code", body = crate::error::ErrorResponse),
        (status = 409, description = "No code was sent or step not reachable", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn verify_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<StepResponse>, ApiError> {
    let user = state.current_user(&headers).await?;
    let status = state.onboarding().verify_code(&user, &request.code).await?;

    Ok(Json(StepResponse {
        step: recorded_step(&status),
        calendar_connected: status.calendar_connected,
        whatsapp_connected: status.whatsapp_connected,
    }))
}

#[utoipa::path(
    post,
    path = "/api/onboarding/preferences",
    tag = "Onboarding",
    request_body = MeetingPreferences,
    responses(
        (status = 200, description = "Onboarding finished", body = CompletionResponse),
        (status = 400, description = "Invalid preferences", body = crate::error::ErrorResponse),
        (status = 409, description = "WhatsApp not connected yet", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn save_preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(preferences): Json<MeetingPreferences>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let user = state.current_user(&headers).await?;
    let status = state
        .onboarding()
        .save_preferences(&user, &preferences)
        .await?;

    Ok(Json(CompletionResponse {
        completed: status.onboarding_completed,
        redirect_to: COMPLETION_REDIRECT.to_string(),
    }))
}
