//! Integration flags plus the calendar and WhatsApp passthroughs.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use cadence_workflow::{CalendarEvent, CalendarSyncStatus, EventRange, WhatsAppStatus};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct IntegrationsResponse {
    pub calendar_connected: bool,
    pub whatsapp_connected: bool,
    pub onboarding_step: i64,
    pub onboarding_completed: bool,
}

#[utoipa::path(
    get,
    path = "/api/integrations",
    tag = "Integrations",
    responses((status = 200, description = "Stored integration flags", body = IntegrationsResponse)),
    security(("bearerAuth" = []))
)]
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<IntegrationsResponse>, ApiError> {
    let user = state.current_user(&headers).await?;
    let status = state.onboarding().integration_status(&user).await?;

    Ok(Json(IntegrationsResponse {
        calendar_connected: status.calendar_connected,
        whatsapp_connected: status.whatsapp_connected,
        onboarding_step: status.onboarding_step,
        onboarding_completed: status.onboarding_completed,
    }))
}

#[utoipa::path(
    get,
    path = "/api/whatsapp/status",
    tag = "Integrations",
    responses((status = 200, description = "WhatsApp link as the backend sees it", body = WhatsAppStatus)),
    security(("bearerAuth" = []))
)]
pub async fn whatsapp_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<WhatsAppStatus>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(state.workflow().whatsapp_status(&user.public_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/whatsapp/disconnect",
    tag = "Integrations",
    responses((status = 200, description = "WhatsApp unlinked", body = IntegrationsResponse)),
    security(("bearerAuth" = []))
)]
pub async fn whatsapp_disconnect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<IntegrationsResponse>, ApiError> {
    let user = state.current_user(&headers).await?;
    let status = state.onboarding().disconnect_whatsapp(&user).await?;

    Ok(Json(IntegrationsResponse {
        calendar_connected: status.calendar_connected,
        whatsapp_connected: status.whatsapp_connected,
        onboarding_step: status.onboarding_step,
        onboarding_completed: status.onboarding_completed,
    }))
}

#[utoipa::path(
    get,
    path = "/api/calendar/status",
    tag = "Integrations",
    responses((status = 200, description = "Calendar sync state", body = CalendarSyncStatus)),
    security(("bearerAuth" = []))
)]
pub async fn calendar_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CalendarSyncStatus>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state.workflow().calendar_sync_status(&user.public_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/calendar/events",
    tag = "Integrations",
    params(
        ("from" = Option<String>, Query, description = "RFC 3339 lower bound"),
        ("to" = Option<String>, Query, description = "RFC 3339 upper bound")
    ),
    responses((status = 200, description = "Calendar events", body = [cadence_workflow::Meeting])),
    security(("bearerAuth" = []))
)]
pub async fn calendar_events(
    State(state): State<AppState>,
    Query(range): Query<EventRange>,
    headers: HeaderMap,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state
            .workflow()
            .calendar_events(&user.public_id, &range)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/calendar/sync",
    tag = "Integrations",
    responses((status = 200, description = "Sync triggered", body = CalendarSyncStatus)),
    security(("bearerAuth" = []))
)]
pub async fn calendar_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CalendarSyncStatus>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(state.workflow().calendar_sync(&user.public_id).await?))
}
