use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use cadence_auth::{AuthError, Authenticator, IdentityProfile, SessionEvent};
use cadence_config::{AuthConfig, IdentityProviderConfig};
use chrono::{DateTime, Duration, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tempfile::TempDir;
use url::Url;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

fn default_auth_config() -> AuthConfig {
    AuthConfig {
        session_ttl_seconds: 3_600,
        ..AuthConfig::default()
    }
}

fn identity_auth_config() -> AuthConfig {
    AuthConfig {
        session_ttl_seconds: 3_600,
        identity: IdentityProviderConfig {
            client_id: Some("test-client-id".into()),
            client_secret: Some("test-client-secret".into()),
            ..IdentityProviderConfig::default()
        },
        ..AuthConfig::default()
    }
}

fn profile(subject: &str, email: Option<&str>, name: Option<&str>) -> IdentityProfile {
    IdentityProfile {
        subject: subject.to_string(),
        email: email.map(str::to_string),
        name: name.map(str::to_string),
    }
}

struct TestContext {
    pool: SqlitePool,
    authenticator: Authenticator,
    _temp_dir: TempDir,
    config: AuthConfig,
}

impl TestContext {
    async fn new(config: AuthConfig) -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("auth.sqlite");
        let db_url = format!("sqlite://{}", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        let authenticator = Authenticator::new(pool.clone(), config.clone());

        Ok(Self {
            pool,
            authenticator,
            _temp_dir: temp_dir,
            config,
        })
    }

    async fn new_default() -> TestResult<Self> {
        Self::new(default_auth_config()).await
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }
}

#[tokio::test]
async fn login_with_profile_creates_user_and_identity_link() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let session = ctx
        .authenticator()
        .login_with_profile(profile("sub-1", Some("new@example.com"), Some("New User")))
        .await?;

    let (email, display_name): (String, Option<String>) =
        sqlx::query_as("SELECT email, display_name FROM users WHERE id = ?")
            .bind(session.user_id)
            .fetch_one(ctx.pool())
            .await?;
    assert_eq!(email, "new@example.com");
    assert_eq!(display_name.as_deref(), Some("New User"));

    let identity_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_identities WHERE user_id = ? AND provider_uid = 'sub-1'",
    )
    .bind(session.user_id)
    .fetch_one(ctx.pool())
    .await?;
    assert_eq!(identity_exists, 1);

    Ok(())
}

#[tokio::test]
async fn login_with_profile_reuses_existing_identity() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let first = ctx
        .authenticator()
        .login_with_profile(profile("sub-2", Some("ada@example.com"), None))
        .await?;
    let second = ctx
        .authenticator()
        .login_with_profile(profile("sub-2", Some("ada@example.com"), None))
        .await?;

    assert_eq!(first.user_id, second.user_id);
    assert_ne!(first.token, second.token);

    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(user_count, 1, "user should not be duplicated");

    Ok(())
}

#[tokio::test]
async fn login_with_profile_links_existing_user_by_email() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let now = Utc::now().to_rfc3339();
    let existing_id = sqlx::query(
        "INSERT INTO users (public_id, email, display_name, created_at, updated_at) VALUES ('pub-1', 'linked@example.com', NULL, ?, ?)",
    )
    .bind(&now)
    .bind(&now)
    .execute(ctx.pool())
    .await?
    .last_insert_rowid();

    let session = ctx
        .authenticator()
        .login_with_profile(profile("sub-3", Some("linked@example.com"), None))
        .await?;

    assert_eq!(session.user_id, existing_id);
    let provider_uid: String =
        sqlx::query_scalar("SELECT provider_uid FROM user_identities WHERE user_id = ?")
            .bind(existing_id)
            .fetch_one(ctx.pool())
            .await?;
    assert_eq!(provider_uid, "sub-3");

    Ok(())
}

#[tokio::test]
async fn login_with_profile_handles_missing_email() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let session = ctx
        .authenticator()
        .login_with_profile(profile("sub-4", None, Some("No Email")))
        .await?;

    let user = ctx.authenticator().user_profile(session.user_id).await?;
    assert!(user.email.is_none(), "email should remain NULL");
    assert_eq!(user.display_name.as_deref(), Some("No Email"));

    Ok(())
}

#[tokio::test]
async fn login_with_code_requires_identity_configuration() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let err = ctx
        .authenticator()
        .login_with_code("code", "http://localhost/auth/callback")
        .await
        .expect_err("login without identity provider should fail");

    assert!(matches!(err, AuthError::IdentityDisabled));
    Ok(())
}

#[tokio::test]
async fn authenticate_token_returns_user_and_session_for_active_token() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let session = ctx
        .authenticator()
        .login_with_profile(profile("sub-5", Some("active@example.com"), None))
        .await?;

    let (user, resolved) = ctx.authenticator().authenticate_token(&session.token).await?;

    assert_eq!(user.id, session.user_id);
    assert_eq!(resolved.token, session.token);
    assert!(Utc::now() - user.created_at < Duration::minutes(1));

    Ok(())
}

#[tokio::test]
async fn authenticate_token_deletes_expired_sessions() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let session = ctx
        .authenticator()
        .login_with_profile(profile("sub-6", Some("expired@example.com"), None))
        .await?;

    let past = (Utc::now() - Duration::minutes(5)).to_rfc3339();
    sqlx::query("UPDATE sessions SET expires_at = ? WHERE token = ?")
        .bind(past)
        .bind(&session.token)
        .execute(ctx.pool())
        .await?;

    let err = ctx
        .authenticator()
        .authenticate_token(&session.token)
        .await
        .expect_err("expired session should be rejected");
    assert!(matches!(err, AuthError::SessionExpired));

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE token = ?")
        .bind(&session.token)
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(remaining, 0, "expired session should be purged");

    Ok(())
}

#[tokio::test]
async fn authenticate_token_rejects_unknown_token() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let err = ctx
        .authenticator()
        .authenticate_token("does-not-exist")
        .await
        .expect_err("unknown token should fail");

    assert!(matches!(err, AuthError::SessionNotFound));
    Ok(())
}

#[tokio::test]
async fn issued_sessions_respect_configured_ttl() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let session = ctx
        .authenticator()
        .login_with_profile(profile("sub-7", Some("ttl@example.com"), None))
        .await?;

    let ttl = Duration::seconds(ctx.config.session_ttl_seconds as i64);
    let remaining = session.expires_at - Utc::now();
    assert!((remaining - ttl).num_seconds().abs() <= 2);

    let stored: String = sqlx::query_scalar("SELECT expires_at FROM sessions WHERE token = ?")
        .bind(&session.token)
        .fetch_one(ctx.pool())
        .await?;
    let parsed = DateTime::parse_from_rfc3339(&stored)?.with_timezone(&Utc);
    assert_eq!(parsed, session.expires_at);

    Ok(())
}

#[tokio::test]
async fn session_tokens_are_unique_and_urlsafe() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let mut seen = std::collections::HashSet::new();

    for _ in 0..10 {
        let session = ctx
            .authenticator()
            .login_with_profile(profile("sub-8", Some("tokens@example.com"), None))
            .await?;
        let decoded = URL_SAFE_NO_PAD.decode(&session.token)?;
        assert_eq!(decoded.len(), 32);
        assert!(seen.insert(session.token), "tokens must not repeat");
    }

    Ok(())
}

#[tokio::test]
async fn refresh_session_rotates_token() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let session = ctx
        .authenticator()
        .login_with_profile(profile("sub-9", Some("refresh@example.com"), None))
        .await?;

    let (user, refreshed) = ctx.authenticator().refresh_session(&session.token).await?;

    assert_eq!(user.id, session.user_id);
    assert_ne!(refreshed.token, session.token);
    assert!(matches!(
        ctx.authenticator().authenticate_token(&session.token).await,
        Err(AuthError::SessionNotFound)
    ));
    ctx.authenticator().authenticate_token(&refreshed.token).await?;

    Ok(())
}

#[tokio::test]
async fn revoke_session_signs_out_and_tolerates_unknown_tokens() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let session = ctx
        .authenticator()
        .login_with_profile(profile("sub-10", Some("bye@example.com"), None))
        .await?;

    ctx.authenticator().revoke_session(&session.token).await?;
    ctx.authenticator().revoke_session(&session.token).await?;

    let context = ctx.authenticator().resolve(Some(&session.token)).await;
    assert!(!context.is_authenticated);
    assert!(!context.loading);
    assert!(context.user.is_none());

    Ok(())
}

#[tokio::test]
async fn subscribers_receive_session_events_until_dropped() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let mut subscription = ctx.authenticator().subscribe();
    assert_eq!(ctx.authenticator().subscriber_count(), 1);

    let session = ctx
        .authenticator()
        .login_with_profile(profile("sub-11", Some("events@example.com"), None))
        .await?;
    let (_, refreshed) = ctx.authenticator().refresh_session(&session.token).await?;
    ctx.authenticator().revoke_session(&refreshed.token).await?;

    let user_id = session.user_id;
    assert_eq!(subscription.next().await, Some(SessionEvent::SignedIn { user_id }));
    assert_eq!(subscription.next().await, Some(SessionEvent::Refreshed { user_id }));
    assert_eq!(subscription.next().await, Some(SessionEvent::SignedOut { user_id }));

    subscription.unsubscribe();
    assert_eq!(ctx.authenticator().subscriber_count(), 0);

    Ok(())
}

#[tokio::test]
async fn resolve_without_token_is_anonymous_and_settled() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let context = ctx.authenticator().resolve(None).await;

    assert!(!context.loading);
    assert!(!context.is_authenticated);
    Ok(())
}

#[tokio::test]
async fn authorization_url_includes_scopes_state_and_redirect() -> TestResult {
    let ctx = TestContext::new(identity_auth_config()).await?;
    assert!(ctx.authenticator().identity_enabled());

    let url = ctx
        .authenticator()
        .authorization_url("state-123", "http://localhost:7070/auth/callback")?;
    let parsed = Url::parse(&url)?;
    let query: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    assert!(query.iter().any(|(k, v)| k == "state" && v == "state-123"));
    assert!(query
        .iter()
        .any(|(k, v)| k == "redirect_uri" && v == "http://localhost:7070/auth/callback"));
    assert!(query
        .iter()
        .any(|(k, v)| k == "scope" && v.contains("openid") && v.contains("email")));
    assert!(query
        .iter()
        .any(|(k, v)| k == "client_id" && v == "test-client-id"));

    Ok(())
}

#[tokio::test]
async fn identity_requires_both_client_credentials() -> TestResult {
    let mut config = identity_auth_config();
    config.identity.client_secret = None;
    let ctx = TestContext::new(config).await?;

    assert!(!ctx.authenticator().identity_enabled());
    assert!(matches!(
        ctx.authenticator().authorization_url("s", "http://localhost/cb"),
        Err(AuthError::IdentityDisabled)
    ));

    Ok(())
}
