use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::public::landing,
        crate::routes::public::pricing,
        crate::routes::public::blog_index,
        crate::routes::public::blog_post,
        crate::routes::public::privacy,
        crate::routes::public::terms,
        crate::routes::public::auth_page,
        crate::routes::auth::login,
        crate::routes::auth::callback,
        crate::routes::auth::session,
        crate::routes::auth::refresh,
        crate::routes::auth::logout,
        crate::routes::dashboard::overview,
        crate::routes::dashboard::page,
        crate::routes::onboarding::state,
        crate::routes::onboarding::connect_calendar,
        crate::routes::onboarding::submit_phone,
        crate::routes::onboarding::verify_code,
        crate::routes::onboarding::save_preferences,
        crate::routes::integrations::status,
        crate::routes::integrations::whatsapp_status,
        crate::routes::integrations::whatsapp_disconnect,
        crate::routes::integrations::calendar_status,
        crate::routes::integrations::calendar_events,
        crate::routes::integrations::calendar_sync,
        crate::routes::meetings::list_meetings,
        crate::routes::meetings::create_meeting,
        crate::routes::meetings::update_meeting,
        crate::routes::meetings::delete_meeting,
        crate::routes::settings::get_settings,
        crate::routes::settings::update_settings,
        crate::routes::billing::trial,
        crate::routes::billing::checkout,
        crate::routes::billing::portal,
        crate::routes::proxy::calendar_connect
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::UserResponse,
            crate::routes::health::HealthResponse,
            crate::routes::public::NavLink,
            crate::routes::public::PageDescriptor,
            crate::routes::public::AuthPage,
            crate::routes::auth::LoginResponse,
            crate::routes::auth::SessionResponse,
            crate::routes::auth::SessionContextResponse,
            crate::routes::dashboard::DashboardShell,
            crate::routes::onboarding::CalendarConnectResponse,
            crate::routes::onboarding::PhoneRequest,
            crate::routes::onboarding::PhoneResponse,
            crate::routes::onboarding::VerifyRequest,
            crate::routes::onboarding::StepResponse,
            crate::routes::onboarding::CompletionResponse,
            crate::routes::integrations::IntegrationsResponse,
            crate::routes::billing::CheckoutRequest,
            cadence_onboarding::OnboardingState,
            cadence_onboarding::OnboardingStep,
            cadence_onboarding::VerificationCountdown,
            cadence_onboarding::MeetingPreferences,
            cadence_billing::TrialStatus,
            cadence_workflow::Subscription,
            cadence_workflow::Meeting,
            cadence_workflow::NewMeeting,
            cadence_workflow::MeetingUpdate,
            cadence_workflow::CalendarSyncStatus,
            cadence_workflow::WhatsAppStatus
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Public", description = "Marketing and sign-in pages"),
        (name = "Auth", description = "Login, OAuth callbacks and sessions"),
        (name = "Dashboard", description = "Authenticated dashboard shell"),
        (name = "Onboarding", description = "First-run setup wizard"),
        (name = "Integrations", description = "Calendar and WhatsApp links"),
        (name = "Meetings", description = "Meetings booked by the assistant"),
        (name = "Settings", description = "Meeting preferences"),
        (name = "Billing", description = "Trial state and payment redirects"),
        (name = "Functions", description = "Server-side functions called by the browser")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("Bearer".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
