use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use cadence_workflow::{EventRange, Meeting, MeetingUpdate, NewMeeting};
use tracing::info;

use crate::{ApiError, AppState};

#[utoipa::path(
    get,
    path = "/api/meetings",
    tag = "Meetings",
    params(
        ("from" = Option<String>, Query, description = "RFC 3339 lower bound"),
        ("to" = Option<String>, Query, description = "RFC 3339 upper bound")
    ),
    responses((status = 200, description = "Meetings booked by the assistant", body = [Meeting])),
    security(("bearerAuth" = []))
)]
pub async fn list_meetings(
    State(state): State<AppState>,
    Query(range): Query<EventRange>,
    headers: HeaderMap,
) -> Result<Json<Vec<Meeting>>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state.workflow().list_meetings(&user.public_id, &range).await?,
    ))
}

/// Creation is the one action the trial gate blocks.
#[utoipa::path(
    post,
    path = "/api/meetings",
    tag = "Meetings",
    request_body = NewMeeting,
    responses(
        (status = 201, description = "Meeting created", body = Meeting),
        (status = 402, description = "Trial over and no active subscription", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_meeting(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(meeting): Json<NewMeeting>,
) -> Result<(StatusCode, Json<Meeting>), ApiError> {
    let user = state.current_user(&headers).await?;

    let trial = state.billing().trial_status(&user).await?;
    if !trial.can_create_meetings {
        return Err(ApiError::payment_required(
            "trial has ended, choose a plan to keep scheduling meetings",
        ));
    }

    if meeting.end <= meeting.start {
        return Err(ApiError::bad_request("meeting must end after it starts"));
    }

    let created = state
        .workflow()
        .create_meeting(&user.public_id, &meeting)
        .await?;
    info!(user_id = user.id, meeting_id = %created.id, "meeting created");

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/meetings/{id}",
    tag = "Meetings",
    params(("id" = String, Path, description = "Meeting id")),
    request_body = MeetingUpdate,
    responses((status = 200, description = "Meeting updated", body = Meeting)),
    security(("bearerAuth" = []))
)]
pub async fn update_meeting(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<MeetingUpdate>,
) -> Result<Json<Meeting>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state
            .workflow()
            .update_meeting(&user.public_id, &meeting_id, &update)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/meetings/{id}",
    tag = "Meetings",
    params(("id" = String, Path, description = "Meeting id")),
    responses((status = 204, description = "Meeting deleted")),
    security(("bearerAuth" = []))
)]
pub async fn delete_meeting(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let user = state.current_user(&headers).await?;
    state
        .workflow()
        .delete_meeting(&user.public_id, &meeting_id)
        .await?;
    info!(user_id = user.id, %meeting_id, "meeting deleted");

    Ok(StatusCode::NO_CONTENT)
}
