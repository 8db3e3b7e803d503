use anyhow::Context;
use cadence_config::IdentityProviderConfig;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, warn};

/// The subset of the provider's userinfo document we rely on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone)]
pub(crate) struct IdentityOAuth {
    client: BasicClient,
    http: reqwest::Client,
    userinfo_url: String,
}

impl IdentityOAuth {
    pub(crate) fn from_config(config: &IdentityProviderConfig) -> Option<Self> {
        let client_id = config.client_id.clone()?;
        let client_secret = config.client_secret.clone()?;

        match Self::new(config, client_id, client_secret) {
            Ok(identity) => Some(identity),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "identity provider disabled");
                None
            }
        }
    }

    fn new(
        config: &IdentityProviderConfig,
        client_id: String,
        client_secret: String,
    ) -> anyhow::Result<Self> {
        let auth_url = AuthUrl::new(config.authorize_url.clone())
            .context("invalid identity provider authorize url")?;
        let token_url =
            TokenUrl::new(config.token_url.clone()).context("invalid identity provider token url")?;

        let client = BasicClient::new(
            ClientId::new(client_id),
            Some(ClientSecret::new(client_secret)),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(oauth2::AuthType::RequestBody);

        let http = reqwest::Client::builder()
            .user_agent("cadence-dashboard")
            .build()
            .context("failed to build identity provider http client")?;

        Ok(Self {
            client,
            http,
            userinfo_url: config.userinfo_url.clone(),
        })
    }

    pub(crate) fn authorize_url(&self, state: &str, redirect_uri: &str) -> anyhow::Result<String> {
        let redirect = RedirectUrl::new(redirect_uri.to_owned())
            .context("invalid redirect uri for identity provider")?;

        let (url, _) = self
            .client
            .clone()
            .set_redirect_uri(redirect)
            .authorize_url(|| CsrfToken::new(state.to_owned()))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url();

        Ok(url.to_string())
    }

    pub(crate) async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> anyhow::Result<IdentityProfile> {
        let redirect = RedirectUrl::new(redirect_uri.to_owned())
            .context("invalid redirect uri for identity provider")?;

        let token_response = self
            .client
            .clone()
            .set_redirect_uri(redirect)
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .request_async(async_http_client)
            .await
            .context("failed to exchange authorization code")?;

        let access_token = token_response.access_token().secret();

        let info: UserInfoResponse = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .context("failed to call userinfo endpoint")?
            .error_for_status()
            .context("userinfo endpoint returned error")?
            .json()
            .await
            .context("failed to decode userinfo response")?;

        debug!(subject = %info.sub, "fetched identity provider profile");

        Ok(IdentityProfile {
            subject: info.sub,
            email: info.email,
            name: info.name,
        })
    }
}

#[derive(Deserialize)]
struct UserInfoResponse {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}
