//! Calendar-connect function. Stateless: verify the bearer token, stamp the
//! verified user id onto the request, relay the backend reply as is.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::debug;

use crate::util::require_bearer;
use crate::{ApiError, AppState};

#[utoipa::path(
    post,
    path = "/functions/calendar-connect",
    tag = "Functions",
    request_body(content = Object, description = "Forwarded to the backend with `user_id` set"),
    responses(
        (status = 200, description = "Backend reply, status preserved"),
        (status = 401, description = "Missing or invalid bearer token", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn calendar_connect(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let payload = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|error| ApiError::bad_request(format!("invalid JSON body: {error}")))?
    };

    let forwarded = state
        .workflow()
        .forward_calendar_connect(&user.public_id, payload)
        .await?;
    debug!(user_id = user.id, status = forwarded.status, "calendar connect relayed");

    let status = StatusCode::from_u16(forwarded.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(forwarded.body)).into_response())
}
