pub mod auth;
pub mod billing;
pub mod dashboard;
pub mod health;
pub mod integrations;
pub mod meetings;
pub mod onboarding;
pub mod proxy;
pub mod public;
pub mod settings;

use cadence_auth::User;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        Self {
            id: value.public_id,
            email: value.email,
            display_name: value.display_name,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}
