use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cadence_auth::AuthError;
use cadence_billing::BillingError;
use cadence_database::DatabaseError;
use cadence_onboarding::OnboardingError;
use cadence_workflow::WorkflowError;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn payment_required(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYMENT_REQUIRED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        error!(error = ?error, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let status = match error {
            AuthError::IdentityDisabled => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Identity(_) => StatusCode::BAD_GATEWAY,
            AuthError::SessionNotFound
            | AuthError::SessionExpired
            | AuthError::InvalidSession
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::Database(_) | AuthError::CorruptRecord(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!(error = ?error, "auth error");
        } else {
            warn!(error = %error, "auth rejected");
        }
        Self::new(status, error.to_string())
    }
}

impl From<WorkflowError> for ApiError {
    fn from(error: WorkflowError) -> Self {
        error!(error = ?error, "workflow backend error");
        let status = match &error {
            WorkflowError::Status { status, .. } if matches!(status, 401 | 403) => {
                StatusCode::BAD_GATEWAY
            }
            WorkflowError::Status { status, .. } if (400..500).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            WorkflowError::Http(inner) if inner.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        };
        let message = match error {
            WorkflowError::Status { message, .. } => message,
            other => other.to_string(),
        };
        Self::new(status, message)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(error: DatabaseError) -> Self {
        error!(error = ?error, "database error");
        Self::internal_server_error(error.to_string())
    }
}

impl From<OnboardingError> for ApiError {
    fn from(error: OnboardingError) -> Self {
        match error {
            OnboardingError::Backend(inner) => inner.into(),
            OnboardingError::Database(inner) => inner.into(),
            OnboardingError::NoPendingVerification | OnboardingError::StepNotReachable(_) => {
                Self::new(StatusCode::CONFLICT, error.to_string())
            }
            OnboardingError::CallbackUserMismatch => Self::forbidden(error.to_string()),
            OnboardingError::InvalidPhone(_)
            | OnboardingError::InvalidCode
            | OnboardingError::InvalidPreferences(_)
            | OnboardingError::VerificationRejected(_)
            | OnboardingError::CalendarConnectFailed(_) => Self::bad_request(error.to_string()),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(error: BillingError) -> Self {
        match error {
            BillingError::Backend(inner) => inner.into(),
            BillingError::Database(inner) => inner.into(),
            BillingError::UnknownPlan(_) => Self::bad_request(error.to_string()),
            BillingError::MissingRedirectUrl => {
                error!("payment redirect missing from backend response");
                Self::bad_gateway(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_client_errors_keep_their_status() {
        let error: ApiError = WorkflowError::Status {
            status: 422,
            message: "bad number".into(),
        }
        .into();
        assert_eq!(error.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error.message, "bad number");
    }

    #[test]
    fn backend_auth_and_server_errors_become_bad_gateway() {
        for status in [401, 403, 500, 503] {
            let error: ApiError = WorkflowError::Status {
                status,
                message: "nope".into(),
            }
            .into();
            assert_eq!(error.status, StatusCode::BAD_GATEWAY, "status {status}");
        }
    }

    #[test]
    fn local_validation_errors_are_bad_requests() {
        let error: ApiError = OnboardingError::InvalidCode.into();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);

        let error: ApiError = BillingError::UnknownPlan("gold".into()).into();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_redirect_url_is_surfaced() {
        let error: ApiError = BillingError::MissingRedirectUrl.into();
        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        assert!(error.message.contains("redirect url"));
    }
}
