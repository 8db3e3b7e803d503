//! Client for the workflow backend that owns calendars, WhatsApp messaging,
//! meetings and billing.
//!
//! Every operation is a single HTTP request. Non-2xx replies are surfaced as
//! [`WorkflowError::Status`] and nothing is retried.

mod types;

pub use types::{
    CalendarEvent, CalendarSyncStatus, CheckoutRequest, EventRange, ForwardedResponse, Meeting,
    MeetingUpdate, NewMeeting, PortalRequest, RedirectSession, Subscription, VerificationOutcome,
    WhatsAppStatus,
};

use std::time::Duration;

use cadence_config::BackendConfig;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use types::{
    CalendarConnectRequest, CalendarConnectResponse, UserOnly, UserScoped, WhatsAppConnectRequest,
    WhatsAppVerifyRequest,
};

const MAX_ERROR_MESSAGE_LEN: usize = 512;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("workflow backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid workflow response: {0}")]
    InvalidResponse(String),
}

impl WorkflowError {
    pub fn status(&self) -> Option<u16> {
        match self {
            WorkflowError::Status { status, .. } => Some(*status),
            WorkflowError::Http(error) => error.status().map(|status| status.as_u16()),
            WorkflowError::InvalidResponse(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct WorkflowClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl WorkflowClient {
    pub fn new(config: &BackendConfig) -> Result<Self, WorkflowError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(1)))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the backend for the calendar provider's consent URL.
    pub async fn calendar_connect(
        &self,
        user_id: &str,
        redirect_uri: &str,
    ) -> Result<String, WorkflowError> {
        let response: CalendarConnectResponse = self
            .send_json(
                self.request(Method::POST, "/calendar/connect")
                    .json(&CalendarConnectRequest {
                        user_id,
                        redirect_uri,
                    }),
            )
            .await?;

        response
            .auth_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| WorkflowError::InvalidResponse("missing auth_url".into()))
    }

    pub async fn calendar_events(
        &self,
        user_id: &str,
        range: &EventRange,
    ) -> Result<Vec<CalendarEvent>, WorkflowError> {
        let query = range_query(user_id, range);

        self.send_json(self.request(Method::GET, "/calendar/events").query(&query))
            .await
    }

    pub async fn calendar_sync_status(
        &self,
        user_id: &str,
    ) -> Result<CalendarSyncStatus, WorkflowError> {
        self.send_json(
            self.request(Method::GET, "/calendar/sync-status")
                .query(&[("user_id", user_id)]),
        )
        .await
    }

    pub async fn calendar_sync(&self, user_id: &str) -> Result<CalendarSyncStatus, WorkflowError> {
        self.send_json(
            self.request(Method::POST, "/calendar/sync")
                .json(&UserOnly { user_id }),
        )
        .await
    }

    /// Send a verification code to `phone_number` over WhatsApp.
    pub async fn whatsapp_connect(
        &self,
        user_id: &str,
        phone_number: &str,
    ) -> Result<(), WorkflowError> {
        self.send_empty(
            self.request(Method::POST, "/whatsapp/connect")
                .json(&WhatsAppConnectRequest {
                    user_id,
                    phone_number,
                }),
        )
        .await
    }

    pub async fn whatsapp_verify(
        &self,
        user_id: &str,
        phone_number: &str,
        code: &str,
    ) -> Result<VerificationOutcome, WorkflowError> {
        self.send_json(
            self.request(Method::POST, "/whatsapp/verify")
                .json(&WhatsAppVerifyRequest {
                    user_id,
                    phone_number,
                    code,
                }),
        )
        .await
    }

    pub async fn whatsapp_disconnect(&self, user_id: &str) -> Result<(), WorkflowError> {
        self.send_empty(
            self.request(Method::POST, "/whatsapp/disconnect")
                .json(&UserOnly { user_id }),
        )
        .await
    }

    pub async fn whatsapp_status(&self, user_id: &str) -> Result<WhatsAppStatus, WorkflowError> {
        self.send_json(
            self.request(Method::GET, "/whatsapp/status")
                .query(&[("user_id", user_id)]),
        )
        .await
    }

    pub async fn list_meetings(
        &self,
        user_id: &str,
        range: &EventRange,
    ) -> Result<Vec<Meeting>, WorkflowError> {
        let query = range_query(user_id, range);

        self.send_json(self.request(Method::GET, "/meetings").query(&query))
            .await
    }

    pub async fn create_meeting(
        &self,
        user_id: &str,
        meeting: &NewMeeting,
    ) -> Result<Meeting, WorkflowError> {
        self.send_json(self.request(Method::POST, "/meetings").json(&UserScoped {
            user_id,
            body: meeting,
        }))
        .await
    }

    pub async fn update_meeting(
        &self,
        user_id: &str,
        meeting_id: &str,
        update: &MeetingUpdate,
    ) -> Result<Meeting, WorkflowError> {
        let path = format!("/meetings/{meeting_id}");
        self.send_json(self.request(Method::PUT, &path).json(&UserScoped {
            user_id,
            body: update,
        }))
        .await
    }

    pub async fn delete_meeting(&self, user_id: &str, meeting_id: &str) -> Result<(), WorkflowError> {
        let path = format!("/meetings/{meeting_id}");
        self.send_empty(
            self.request(Method::DELETE, &path)
                .query(&[("user_id", user_id)]),
        )
        .await
    }

    /// Subscription for `email`. A 404 means the user never subscribed.
    pub async fn subscription(&self, email: &str) -> Result<Option<Subscription>, WorkflowError> {
        let response = self
            .request(Method::GET, "/user/subscription")
            .query(&[("email", email)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(email, "no subscription on record");
            return Ok(None);
        }

        let response = check_status(response).await?;
        let subscription = response.json::<Subscription>().await?;
        Ok(Some(subscription))
    }

    pub async fn checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<RedirectSession, WorkflowError> {
        self.send_json(
            self.request(Method::POST, "/stripe/create-checkout-session")
                .json(request),
        )
        .await
    }

    pub async fn portal_session(
        &self,
        request: &PortalRequest,
    ) -> Result<RedirectSession, WorkflowError> {
        self.send_json(
            self.request(Method::POST, "/stripe/create-portal-session")
                .json(request),
        )
        .await
    }

    /// Relay a calendar-connect request on behalf of a verified user. The
    /// backend status and body are passed back untouched.
    pub async fn forward_calendar_connect(
        &self,
        user_id: &str,
        body: serde_json::Value,
    ) -> Result<ForwardedResponse, WorkflowError> {
        let mut payload = match body {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("payload".into(), other);
                map
            }
        };
        payload.insert("user_id".into(), serde_json::Value::String(user_id.into()));

        let response = self
            .request(Method::POST, "/calendar/connect")
            .json(&payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
        };

        Ok(ForwardedResponse { status, body })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, WorkflowError> {
        let response = check_status(builder.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|error| {
            warn!(%error, "workflow backend returned an unexpected body");
            WorkflowError::InvalidResponse(error.to_string())
        })
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), WorkflowError> {
        check_status(builder.send().await?).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn check_status(response: Response) -> Result<Response, WorkflowError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.error.or(body.message))
        .unwrap_or_else(|| truncate(text.trim()));

    warn!(status = status.as_u16(), path = %url, %message, "workflow backend request failed");
    Err(WorkflowError::Status {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            message
        },
    })
}

fn range_query(user_id: &str, range: &EventRange) -> Vec<(&'static str, String)> {
    let mut query = vec![("user_id", user_id.to_string())];
    if let Some(from) = range.from {
        query.push(("from", from.to_rfc3339()));
    }
    if let Some(to) = range.to {
        query.push(("to", to.to_rfc3339()));
    }
    query
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_MESSAGE_LEN) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
