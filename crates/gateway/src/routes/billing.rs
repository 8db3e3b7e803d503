//! Trial banner data and the payment-provider redirects.

use axum::{
    extract::State,
    http::HeaderMap,
    response::Redirect,
    Json,
};
use cadence_billing::TrialStatus;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub plan_id: String,
}

#[utoipa::path(
    get,
    path = "/api/billing/trial",
    tag = "Billing",
    responses((status = 200, description = "Trial and subscription state", body = TrialStatus)),
    security(("bearerAuth" = []))
)]
pub async fn trial(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TrialStatus>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(state.billing().trial_status(&user).await?))
}

#[utoipa::path(
    post,
    path = "/api/billing/checkout",
    tag = "Billing",
    request_body = CheckoutRequest,
    responses(
        (status = 303, description = "Redirect to the hosted checkout"),
        (status = 400, description = "Unknown plan", body = crate::error::ErrorResponse),
        (status = 502, description = "Backend returned no checkout url", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<Redirect, ApiError> {
    let user = state.current_user(&headers).await?;
    let url = state.billing().checkout_url(&user, &request.plan_id).await?;

    info!(user_id = user.id, plan_id = %request.plan_id, "redirecting to checkout");
    Ok(Redirect::to(&url))
}

#[utoipa::path(
    post,
    path = "/api/billing/portal",
    tag = "Billing",
    responses(
        (status = 303, description = "Redirect to the billing portal"),
        (status = 502, description = "Backend returned no portal url", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn portal(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let user = state.current_user(&headers).await?;
    let url = state.billing().portal_url(&user).await?;
    Ok(Redirect::to(&url))
}
