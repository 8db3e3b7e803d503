use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CalendarConnectRequest<'a> {
    pub user_id: &'a str,
    pub redirect_uri: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CalendarConnectResponse {
    pub auth_url: Option<String>,
}

/// Optional time window for calendar and meeting listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EventRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

/// A calendar entry as stored by the backend. Meetings booked through the
/// assistant use the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Meeting {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

pub type CalendarEvent = Meeting;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewMeeting {
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MeetingUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UserScoped<'a, T: Serialize> {
    pub user_id: &'a str,
    #[serde(flatten)]
    pub body: &'a T,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UserOnly<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CalendarSyncStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WhatsAppStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WhatsAppConnectRequest<'a> {
    pub user_id: &'a str,
    pub phone_number: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WhatsAppVerifyRequest<'a> {
    pub user_id: &'a str,
    pub phone_number: &'a str,
    pub code: &'a str,
}

/// Backend verdict on a submitted verification code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VerificationOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Payment-provider subscription as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    pub plan_name: String,
    pub status: String,
    #[serde(default)]
    pub meetings_used: i64,
    #[serde(default)]
    pub meetings_limit: Option<i64>,
    #[serde(default)]
    pub current_period_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
}

impl Subscription {
    /// `active` and `trialing` both grant access.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "active" | "trialing"
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub email: Option<String>,
    pub plan_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalRequest {
    pub user_id: String,
    pub email: Option<String>,
    pub return_url: String,
}

/// Checkout or portal session. The backend omits `url` when the payment
/// provider refused to create one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedirectSession {
    #[serde(default)]
    pub url: Option<String>,
}

/// Verbatim backend reply relayed by the proxy function.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardedResponse {
    pub status: u16,
    pub body: serde_json::Value,
}
