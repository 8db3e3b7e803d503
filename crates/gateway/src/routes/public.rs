//! Marketing pages. Each renders on its own; the only shared piece is the
//! navigation list.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::util::safe_return_path;
use crate::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NavLink {
    pub label: String,
    pub path: String,
}

const PUBLIC_NAV: &[(&str, &str)] = &[
    ("Home", "/"),
    ("Pricing", "/pricing"),
    ("Blog", "/blog"),
    ("Sign in", "/auth"),
];

pub(crate) fn nav_links(entries: &[(&str, &str)]) -> Vec<NavLink> {
    entries
        .iter()
        .map(|(label, path)| NavLink {
            label: label.to_string(),
            path: path.to_string(),
        })
        .collect()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PageDescriptor {
    pub page: String,
    pub title: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub nav: Vec<NavLink>,
}

impl PageDescriptor {
    fn new(page: &str, title: &str, path: impl Into<String>) -> Self {
        Self {
            page: page.to_string(),
            title: title.to_string(),
            path: path.into(),
            slug: None,
            nav: nav_links(PUBLIC_NAV),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthPage {
    #[serde(flatten)]
    pub descriptor: PageDescriptor,
    pub identity_enabled: bool,
    pub login_url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuthPageQuery {
    pub redirect_to: Option<String>,
}

#[utoipa::path(get, path = "/", tag = "Public",
    responses((status = 200, description = "Landing page", body = PageDescriptor)))]
pub async fn landing() -> Json<PageDescriptor> {
    Json(PageDescriptor::new("landing", "Cadence", "/"))
}

#[utoipa::path(get, path = "/pricing", tag = "Public",
    responses((status = 200, description = "Pricing page", body = PageDescriptor)))]
pub async fn pricing() -> Json<PageDescriptor> {
    Json(PageDescriptor::new("pricing", "Pricing", "/pricing"))
}

#[utoipa::path(get, path = "/blog", tag = "Public",
    responses((status = 200, description = "Blog index", body = PageDescriptor)))]
pub async fn blog_index() -> Json<PageDescriptor> {
    Json(PageDescriptor::new("blog", "Blog", "/blog"))
}

#[utoipa::path(get, path = "/blog/{slug}", tag = "Public",
    params(("slug" = String, Path, description = "Post slug")),
    responses((status = 200, description = "Blog post", body = PageDescriptor)))]
pub async fn blog_post(Path(slug): Path<String>) -> Json<PageDescriptor> {
    let mut page = PageDescriptor::new("blog_post", "Blog", format!("/blog/{slug}"));
    page.slug = Some(slug);
    Json(page)
}

#[utoipa::path(get, path = "/privacy", tag = "Public",
    responses((status = 200, description = "Privacy policy", body = PageDescriptor)))]
pub async fn privacy() -> Json<PageDescriptor> {
    Json(PageDescriptor::new("privacy", "Privacy Policy", "/privacy"))
}

#[utoipa::path(get, path = "/terms", tag = "Public",
    responses((status = 200, description = "Terms of service", body = PageDescriptor)))]
pub async fn terms() -> Json<PageDescriptor> {
    Json(PageDescriptor::new("terms", "Terms of Service", "/terms"))
}

/// Sign-in page. Visitors who already hold a session go straight on.
#[utoipa::path(get, path = "/auth", tag = "Public",
    params(AuthPageQuery),
    responses(
        (status = 200, description = "Sign-in page", body = AuthPage),
        (status = 303, description = "Already signed in")
    ))]
pub async fn auth_page(
    State(state): State<AppState>,
    Query(query): Query<AuthPageQuery>,
    headers: HeaderMap,
) -> Response {
    let return_to = safe_return_path(query.redirect_to.as_deref());
    let context = state.session_context(&headers).await;
    if context.is_authenticated {
        let target = return_to.unwrap_or_else(|| "/dashboard".to_string());
        return Redirect::to(&target).into_response();
    }

    let login_url = match return_to {
        Some(path) => {
            let encoded: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
            format!("/api/auth/login?redirect_to={encoded}")
        }
        None => "/api/auth/login".to_string(),
    };

    Json(AuthPage {
        descriptor: PageDescriptor::new("auth", "Sign in", "/auth"),
        identity_enabled: state.authenticator().identity_enabled(),
        login_url,
    })
    .into_response()
}
