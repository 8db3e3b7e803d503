use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "cadence.toml",
    "config/cadence.toml",
    "crates/config/cadence.toml",
    "../cadence.toml",
    "../config/cadence.toml",
    "../crates/config/cadence.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub onboarding: OnboardingConfig,
    #[serde(default)]
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
    /// Externally visible origin used to build absolute redirect URIs.
    #[serde(default = "HttpConfig::default_public_url")]
    pub public_url: String,
}

impl HttpConfig {
    fn default_public_url() -> String {
        "http://localhost:7070".to_string()
    }

    /// Join a site-relative path onto the public origin.
    ///
    /// ```
    /// use cadence_config::HttpConfig;
    ///
    /// let http = HttpConfig::default();
    /// assert_eq!(http.absolute_url("/auth/callback"), "http://localhost:7070/auth/callback");
    /// ```
    pub fn absolute_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.public_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Cookies carry the `Secure` flag whenever the public origin is https.
    ///
    /// ```
    /// use cadence_config::HttpConfig;
    ///
    /// let mut http = HttpConfig::default();
    /// assert!(!http.secure_cookies());
    /// http.public_url = "https://app.cadence.example".into();
    /// assert!(http.secure_cookies());
    /// ```
    pub fn secure_cookies(&self) -> bool {
        self.public_url.starts_with("https://")
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
            public_url: Self::default_public_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://cadence.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_seconds: u64,
    #[serde(default = "AuthConfig::default_session_cookie")]
    pub session_cookie: String,
    #[serde(default)]
    pub identity: IdentityProviderConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: 86_400,
            session_cookie: Self::default_session_cookie(),
            identity: IdentityProviderConfig::default(),
        }
    }
}

impl AuthConfig {
    fn default_session_ttl() -> u64 {
        86_400
    }

    fn default_session_cookie() -> String {
        "cadence_session".to_string()
    }
}

/// OAuth endpoints of the identity provider. Login stays disabled until both
/// client credentials are present.
///
/// ```
/// use cadence_config::IdentityProviderConfig;
///
/// let identity = IdentityProviderConfig::default();
/// assert!(identity.client_id.is_none());
/// assert!(identity.authorize_url.starts_with("https://accounts.google.com"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProviderConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "IdentityProviderConfig::default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "IdentityProviderConfig::default_token_url")]
    pub token_url: String,
    #[serde(default = "IdentityProviderConfig::default_userinfo_url")]
    pub userinfo_url: String,
}

impl IdentityProviderConfig {
    fn default_authorize_url() -> String {
        "https://accounts.google.com/o/oauth2/v2/auth".to_string()
    }

    fn default_token_url() -> String {
        "https://oauth2.googleapis.com/token".to_string()
    }

    fn default_userinfo_url() -> String {
        "https://openidconnect.googleapis.com/v1/userinfo".to_string()
    }
}

impl Default for IdentityProviderConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            authorize_url: Self::default_authorize_url(),
            token_url: Self::default_token_url(),
            userinfo_url: Self::default_userinfo_url(),
        }
    }
}

/// Connection settings for the workflow backend that owns calendars,
/// messaging, meetings and billing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "BackendConfig::default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "BackendConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl BackendConfig {
    fn default_base_url() -> String {
        "http://localhost:5678/webhook".to_string()
    }

    const fn default_request_timeout() -> u64 {
        30
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_key: None,
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingConfig {
    #[serde(default = "OnboardingConfig::default_verification_ttl")]
    pub verification_ttl_seconds: u64,
    #[serde(default = "OnboardingConfig::default_callback_timeout")]
    pub callback_timeout_seconds: u64,
}

impl OnboardingConfig {
    const fn default_verification_ttl() -> u64 {
        600
    }

    const fn default_callback_timeout() -> u64 {
        10
    }
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            verification_ttl_seconds: Self::default_verification_ttl(),
            callback_timeout_seconds: Self::default_callback_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    #[serde(default = "BillingConfig::default_trial_days")]
    pub trial_days: i64,
    #[serde(default = "BillingConfig::default_success_path")]
    pub success_path: String,
    #[serde(default = "BillingConfig::default_cancel_path")]
    pub cancel_path: String,
}

impl BillingConfig {
    const fn default_trial_days() -> i64 {
        14
    }

    fn default_success_path() -> String {
        "/dashboard/billing?checkout=success".to_string()
    }

    fn default_cancel_path() -> String {
        "/pricing".to_string()
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            trial_days: Self::default_trial_days(),
            success_path: Self::default_success_path(),
            cancel_path: Self::default_cancel_path(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use cadence_config::load;
///
/// std::env::remove_var("CADENCE_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let session_ttl = defaults.auth.session_ttl_seconds;
    let session_ttl_i64 = i64::try_from(session_ttl).unwrap_or(i64::MAX);

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())
        .context("invalid default for http.address")?
        .set_default("http.port", i64::from(defaults.http.port))
        .context("invalid default for http.port")?
        .set_default("database.url", defaults.database.url.clone())
        .context("invalid default for database.url")?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .context("invalid default for database.max_connections")?
        .set_default("auth.session_ttl_seconds", session_ttl_i64)
        .context("invalid default for auth.session_ttl_seconds")?
        .set_default("backend.base_url", defaults.backend.base_url.clone())
        .context("invalid default for backend.base_url")?;

    let environment_overrides = config::Environment::with_prefix("CADENCE").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("CADENCE_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via CADENCE_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.session_ttl_seconds > i64::MAX as u64 {
        config.auth.session_ttl_seconds = i64::MAX as u64;
    }

    debug!(?config, "loaded cadence configuration");
    Ok(config)
}
