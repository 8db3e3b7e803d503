//! HTTP surface of the Cadence dashboard: public pages, the guarded
//! dashboard shell, onboarding and billing APIs, OAuth callbacks and the
//! calendar-connect function.

mod docs;
mod error;
mod middleware;
mod state;
mod util;

pub mod routes;

pub use docs::ApiDoc;
pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use axum::{
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(routes::health::health_check))
        // Public zone
        .route("/", get(routes::public::landing))
        .route("/pricing", get(routes::public::pricing))
        .route("/blog", get(routes::public::blog_index))
        .route("/blog/:slug", get(routes::public::blog_post))
        .route("/privacy", get(routes::public::privacy))
        .route("/terms", get(routes::public::terms))
        .route("/auth", get(routes::public::auth_page))
        // Auth
        .route("/api/auth/login", get(routes::auth::login))
        .route("/auth/callback", get(routes::auth::callback))
        .route("/api/auth/session", get(routes::auth::session))
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .route("/api/auth/logout", post(routes::auth::logout))
        // Dashboard shell
        .route("/dashboard", get(routes::dashboard::overview))
        .route("/dashboard/*page", get(routes::dashboard::page))
        // Onboarding
        .route("/api/onboarding", get(routes::onboarding::state))
        .route(
            "/api/onboarding/calendar",
            post(routes::onboarding::connect_calendar),
        )
        .route("/api/onboarding/phone", post(routes::onboarding::submit_phone))
        .route("/api/onboarding/verify", post(routes::onboarding::verify_code))
        .route(
            "/api/onboarding/preferences",
            post(routes::onboarding::save_preferences),
        )
        // Integrations
        .route("/api/integrations", get(routes::integrations::status))
        .route(
            "/api/whatsapp/status",
            get(routes::integrations::whatsapp_status),
        )
        .route(
            "/api/whatsapp/disconnect",
            post(routes::integrations::whatsapp_disconnect),
        )
        .route(
            "/api/calendar/status",
            get(routes::integrations::calendar_status),
        )
        .route(
            "/api/calendar/events",
            get(routes::integrations::calendar_events),
        )
        .route("/api/calendar/sync", post(routes::integrations::calendar_sync))
        // Meetings
        .route(
            "/api/meetings",
            get(routes::meetings::list_meetings).post(routes::meetings::create_meeting),
        )
        .route(
            "/api/meetings/:id",
            put(routes::meetings::update_meeting).delete(routes::meetings::delete_meeting),
        )
        // Settings
        .route(
            "/api/settings",
            get(routes::settings::get_settings).put(routes::settings::update_settings),
        )
        // Billing
        .route("/api/billing/trial", get(routes::billing::trial))
        .route("/api/billing/checkout", post(routes::billing::checkout))
        .route("/api/billing/portal", post(routes::billing::portal))
        // Functions
        .route(
            "/functions/calendar-connect",
            post(routes::proxy::calendar_connect),
        )
        .with_state(state);

    with_docs(router)
        .layer(cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(middleware::trace_layer())
}

#[cfg(debug_assertions)]
fn with_docs(router: Router) -> Router {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(not(debug_assertions))]
fn with_docs(router: Router) -> Router {
    router
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
