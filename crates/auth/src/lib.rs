//! Identity provider integration and session store.
//!
//! Users sign in through an external OAuth identity provider; this crate
//! links the provider identity to a local user row, issues opaque session
//! tokens, and broadcasts session changes to subscribers.

mod context;
mod events;
mod identity;
mod login_state;

pub use context::SessionContext;
pub use events::{SessionEvent, SessionSubscription};
pub use identity::IdentityProfile;
pub use login_state::{LoginIntent, OAuthStateStore};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use cadence_config::AuthConfig;
use chrono::{DateTime, Duration, Utc};
use cuid2::CuidConstructor;
use identity::IdentityOAuth;
use once_cell::sync::Lazy;
use rand::RngCore;
use serde::Serialize;
use sqlx::{FromRow, Row, SqlitePool, Transaction};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

const IDENTITY_PROVIDER: &str = "oidc";
const SESSION_EVENT_CAPACITY: usize = 64;
const MAX_SESSION_TTL_SECONDS: u64 = 10 * 365 * 86_400;

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    session_ttl: Duration,
    identity: Option<IdentityOAuth>,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity provider is not configured")]
    IdentityDisabled,
    #[error("identity provider error: {0}")]
    Identity(#[from] anyhow::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user not found")]
    UserNotFound,
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
    #[error("corrupt stored record: {0}")]
    CorruptRecord(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    public_id: String,
    email: Option<String>,
    display_name: Option<String>,
    created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|error| AuthError::CorruptRecord(format!("user created_at: {error}")))?
            .with_timezone(&Utc);

        Ok(Self {
            id: row.id,
            public_id: row.public_id,
            email: row.email,
            display_name: row.display_name,
            created_at,
        })
    }
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: AuthConfig) -> Self {
        let ttl_seconds = config.session_ttl_seconds.min(MAX_SESSION_TTL_SECONDS) as i64;
        let session_ttl = Duration::seconds(ttl_seconds);
        let identity = IdentityOAuth::from_config(&config.identity);
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Self {
            pool,
            session_ttl,
            identity,
            events,
        }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub fn identity_enabled(&self) -> bool {
        self.identity.is_some()
    }

    /// Register interest in session changes. Dropping the returned handle
    /// unsubscribes.
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.events.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<String, AuthError> {
        let identity = self.identity.as_ref().ok_or(AuthError::IdentityDisabled)?;
        identity
            .authorize_url(state, redirect_uri)
            .map_err(AuthError::Identity)
    }

    pub async fn login_with_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AuthSession, AuthError> {
        let identity = self.identity.as_ref().ok_or(AuthError::IdentityDisabled)?;

        let profile = identity
            .exchange_code(code, redirect_uri)
            .await
            .map_err(AuthError::Identity)?;

        self.login_with_profile(profile).await
    }

    /// Resolve the provider profile to a local user and open a session.
    ///
    /// Lookup order: existing identity link, then matching email, then a new
    /// user row.
    pub async fn login_with_profile(
        &self,
        profile: IdentityProfile,
    ) -> Result<AuthSession, AuthError> {
        let mut tx = self.pool.begin().await?;

        if let Some(row) = sqlx::query(
            "SELECT user_id FROM user_identities WHERE provider = ? AND provider_uid = ?",
        )
        .bind(IDENTITY_PROVIDER)
        .bind(&profile.subject)
        .fetch_optional(&mut *tx)
        .await?
        {
            let user_id: i64 = row.try_get("user_id")?;
            tx.commit().await?;
            return self.open_session(user_id).await;
        }

        let existing = match profile.email.as_ref() {
            Some(email) => sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&mut *tx)
                .await?,
            None => None,
        };

        let user_id = match existing {
            Some(user_id) => user_id,
            None => {
                self.insert_user(&mut tx, profile.email.clone(), profile.name.clone())
                    .await?
            }
        };

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO user_identities (user_id, provider, provider_uid, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(IDENTITY_PROVIDER)
        .bind(&profile.subject)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user_id, email = ?profile.email, "linked identity provider account");
        self.open_session(user_id).await
    }

    pub async fn authenticate_token(&self, token: &str) -> Result<(User, AuthSession), AuthError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::SessionNotFound);
        };

        let user_id: i64 = row.try_get("user_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(AuthError::SessionExpired);
        }

        let user = self.fetch_user(user_id).await?;
        let session = AuthSession {
            token: token.to_owned(),
            user_id,
            expires_at,
        };

        Ok((user, session))
    }

    /// Exchange a live token for a fresh one with a new expiry.
    pub async fn refresh_session(&self, token: &str) -> Result<(User, AuthSession), AuthError> {
        let (user, _) = self.authenticate_token(token).await?;

        let session = self.issue_session(user.id).await?;
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        debug!(user_id = user.id, "session refreshed");
        self.notify(SessionEvent::Refreshed { user_id: user.id });
        Ok((user, session))
    }

    /// Delete the session behind `token`. Unknown tokens are not an error.
    pub async fn revoke_session(&self, token: &str) -> Result<(), AuthError> {
        let user_id: Option<i64> =
            sqlx::query_scalar("DELETE FROM sessions WHERE token = ? RETURNING user_id")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;

        if let Some(user_id) = user_id {
            info!(user_id, "session revoked");
            self.notify(SessionEvent::SignedOut { user_id });
        }

        Ok(())
    }

    /// Session state for an optional token. Provider failures collapse to the
    /// signed-out state.
    pub async fn resolve(&self, token: Option<&str>) -> SessionContext {
        let Some(token) = token else {
            return SessionContext::anonymous();
        };

        match self.authenticate_token(token).await {
            Ok((user, _)) => SessionContext::authenticated(user),
            Err(error) => {
                debug!(%error, "session lookup failed, treating visitor as signed out");
                SessionContext::anonymous()
            }
        }
    }

    pub async fn user_profile(&self, user_id: i64) -> Result<User, AuthError> {
        self.fetch_user(user_id).await
    }

    async fn open_session(&self, user_id: i64) -> Result<AuthSession, AuthError> {
        let session = self.issue_session(user_id).await?;
        self.notify(SessionEvent::SignedIn { user_id });
        Ok(session)
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is the normal state outside the server.
        let _ = self.events.send(event);
    }

    async fn insert_user(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        email: Option<String>,
        display_name: Option<String>,
    ) -> Result<i64, AuthError> {
        let now = Utc::now().to_rfc3339();
        let public_id = CUID.create_id();

        let result = sqlx::query(
            "INSERT INTO users (public_id, email, display_name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(email.as_deref())
        .bind(display_name.as_deref())
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn fetch_user(&self, id: i64) -> Result<User, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, public_id, email, display_name, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthError::UserNotFound)?;

        User::try_from(row)
    }

    async fn issue_session(&self, user_id: i64) -> Result<AuthSession, AuthError> {
        let token = generate_session_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        sqlx::query(
            "INSERT INTO sessions (user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AuthSession {
            token,
            user_id,
            expires_at,
        })
    }
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
