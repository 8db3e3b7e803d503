use cadence_auth::{Authenticator, IdentityProfile, User};
use cadence_config::{AuthConfig, BackendConfig, DatabaseConfig, OnboardingConfig};
use cadence_database::{initialize_database, IntegrationRepository};
use cadence_onboarding::{
    CalendarCallback, MeetingPreferences, OnboardingError, OnboardingService, OnboardingStep,
};
use cadence_workflow::WorkflowClient;
use chrono::Utc;
use httpmock::prelude::*;
use serde_json::json;
use sqlx::SqlitePool;
use tempfile::TempDir;

struct TestContext {
    pool: SqlitePool,
    service: OnboardingService,
    server: MockServer,
    user: User,
    _temp_dir: TempDir,
}

impl TestContext {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let pool = initialize_database(&DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("onboarding.db").display()),
            max_connections: 2,
        })
        .await
        .expect("database initialises");

        let authenticator = Authenticator::new(pool.clone(), AuthConfig::default());
        let session = authenticator
            .login_with_profile(IdentityProfile {
                subject: "subject-1".into(),
                email: Some("onboard@example.com".into()),
                name: Some("Onboarding User".into()),
            })
            .await
            .expect("user created");
        let user = authenticator
            .user_profile(session.user_id)
            .await
            .expect("user loads");

        let server = MockServer::start_async().await;
        let workflow = WorkflowClient::new(&BackendConfig {
            base_url: server.base_url(),
            api_key: None,
            request_timeout_seconds: 5,
        })
        .expect("client builds");

        let service = OnboardingService::new(pool.clone(), workflow, &OnboardingConfig::default());

        Self {
            pool,
            service,
            server,
            user,
            _temp_dir: temp_dir,
        }
    }

    fn integrations(&self) -> IntegrationRepository {
        IntegrationRepository::new(self.pool.clone())
    }

    async fn connect_calendar(&self) {
        self.service
            .complete_calendar_callback(
                &self.user,
                &CalendarCallback {
                    status: Some("success".into()),
                    user_id: Some(self.user.public_id.clone()),
                    error_message: None,
                },
            )
            .await
            .expect("calendar callback succeeds");
    }
}

#[tokio::test]
async fn fresh_user_starts_at_calendar_even_when_later_step_requested() {
    let ctx = TestContext::new().await;

    let state = ctx
        .service
        .state(&ctx.user, Some(OnboardingStep::Preferences))
        .await
        .unwrap();

    assert_eq!(state.step, OnboardingStep::Calendar);
    assert!(!state.completed);
    assert_eq!(state.preferences, MeetingPreferences::default());
}

#[tokio::test]
async fn start_calendar_connect_returns_backend_url() {
    let ctx = TestContext::new().await;
    let mock = ctx
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/calendar/connect");
            then.status(200)
                .json_body(json!({"auth_url": "https://calendar.example.com/oauth"}));
        })
        .await;

    let url = ctx
        .service
        .start_calendar_connect(&ctx.user, "http://localhost:7070/auth/callback")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(url, "https://calendar.example.com/oauth");
}

#[tokio::test]
async fn calendar_callback_marks_connected_and_advances_to_phone() {
    let ctx = TestContext::new().await;

    ctx.connect_calendar().await;

    let status = ctx.integrations().find(ctx.user.id).await.unwrap();
    assert!(status.calendar_connected);
    assert_eq!(status.onboarding_step, OnboardingStep::Phone.number());

    let state = ctx.service.state(&ctx.user, None).await.unwrap();
    assert_eq!(state.step, OnboardingStep::Phone);
}

#[tokio::test]
async fn calendar_callback_errors_leave_state_unchanged() {
    let ctx = TestContext::new().await;

    let mismatch = ctx
        .service
        .complete_calendar_callback(
            &ctx.user,
            &CalendarCallback {
                status: Some("success".into()),
                user_id: Some("someone-else".into()),
                error_message: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(mismatch, OnboardingError::CallbackUserMismatch));

    let failed = ctx
        .service
        .complete_calendar_callback(
            &ctx.user,
            &CalendarCallback {
                status: Some("error".into()),
                user_id: Some(ctx.user.public_id.clone()),
                error_message: Some("access_denied".into()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(failed, OnboardingError::CalendarConnectFailed(message) if message == "access_denied"));

    let status = ctx.integrations().find(ctx.user.id).await.unwrap();
    assert!(!status.calendar_connected);
}

#[tokio::test]
async fn phone_without_plus_is_rejected_without_network_call() {
    let ctx = TestContext::new().await;
    let mock = ctx
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/whatsapp/connect");
            then.status(200);
        })
        .await;

    let err = ctx
        .service
        .submit_phone(&ctx.user, "4915112345678")
        .await
        .unwrap_err();

    assert!(matches!(err, OnboardingError::InvalidPhone(_)));
    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn submit_phone_records_countdown_and_advances_to_verify() {
    let ctx = TestContext::new().await;
    ctx.connect_calendar().await;
    let mock = ctx
        .server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/whatsapp/connect")
                .json_body_partial(r#"{"phone_number": "+4915112345678"}"#);
            then.status(200).json_body(json!({"sent": true}));
        })
        .await;

    let submission = ctx
        .service
        .submit_phone(&ctx.user, "+49 151 12345678")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(submission.status.onboarding_step, OnboardingStep::Verify.number());
    let remaining = submission.countdown.remaining_seconds(Utc::now());
    assert!((595..=600).contains(&remaining), "remaining was {remaining}");

    let state = ctx.service.state(&ctx.user, None).await.unwrap();
    assert_eq!(state.step, OnboardingStep::Verify);
    assert_eq!(state.pending_phone_number.as_deref(), Some("+4915112345678"));
    assert!(state.countdown.is_some());
}

#[tokio::test]
async fn backend_failure_on_phone_leaves_step_unchanged() {
    let ctx = TestContext::new().await;
    ctx.connect_calendar().await;
    ctx.server
        .mock_async(|when, then| {
            when.method(POST).path("/whatsapp/connect");
            then.status(500).json_body(json!({"error": "provider down"}));
        })
        .await;

    let err = ctx
        .service
        .submit_phone(&ctx.user, "+4915112345678")
        .await
        .unwrap_err();

    assert!(matches!(err, OnboardingError::Backend(_)));
    let state = ctx.service.state(&ctx.user, None).await.unwrap();
    assert_eq!(state.step, OnboardingStep::Phone);
    assert!(state.pending_phone_number.is_none());
}

#[tokio::test]
async fn short_code_is_rejected_without_network_call() {
    let ctx = TestContext::new().await;
    let mock = ctx
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/whatsapp/verify");
            then.status(200).json_body(json!({"success": true}));
        })
        .await;

    for code in ["12345", "1234567", "abcdef"] {
        let err = ctx.service.verify_code(&ctx.user, code).await.unwrap_err();
        assert!(matches!(err, OnboardingError::InvalidCode));
    }

    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn verify_without_pending_number_fails() {
    let ctx = TestContext::new().await;

    let err = ctx.service.verify_code(&ctx.user, "123456").await.unwrap_err();

    assert!(matches!(err, OnboardingError::NoPendingVerification));
}

#[tokio::test]
async fn full_wizard_completes_and_keeps_earlier_flags() {
    let ctx = TestContext::new().await;
    ctx.connect_calendar().await;
    ctx.server
        .mock_async(|when, then| {
            when.method(POST).path("/whatsapp/connect");
            then.status(200);
        })
        .await;
    let verify = ctx
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/whatsapp/verify").json_body(json!({
                "user_id": ctx.user.public_id,
                "phone_number": "+4915112345678",
                "code": "123456"
            }));
            then.status(200).json_body(json!({"success": true}));
        })
        .await;

    ctx.service
        .submit_phone(&ctx.user, "+4915112345678")
        .await
        .unwrap();
    let status = ctx.service.verify_code(&ctx.user, "123456").await.unwrap();
    verify.assert_async().await;
    assert!(status.whatsapp_connected);
    assert_eq!(status.onboarding_step, OnboardingStep::Preferences.number());

    let invalid = MeetingPreferences {
        meeting_duration_minutes: 5,
        ..MeetingPreferences::default()
    };
    assert!(matches!(
        ctx.service.save_preferences(&ctx.user, &invalid).await,
        Err(OnboardingError::InvalidPreferences(_))
    ));

    let preferences = MeetingPreferences {
        meeting_duration_minutes: 45,
        buffer_minutes: 10,
        timezone: "Europe/Berlin".into(),
    };
    let status = ctx
        .service
        .save_preferences(&ctx.user, &preferences)
        .await
        .unwrap();

    assert!(status.onboarding_completed);
    assert!(status.calendar_connected);
    assert!(status.whatsapp_connected);
    assert_eq!(ctx.service.preferences(&ctx.user).await.unwrap(), preferences);

    let state = ctx.service.state(&ctx.user, None).await.unwrap();
    assert!(state.pending_phone_number.is_none());
    assert_eq!(state.step, OnboardingStep::Preferences);
}

#[tokio::test]
async fn rejected_code_keeps_verification_pending() {
    let ctx = TestContext::new().await;
    ctx.connect_calendar().await;
    ctx.server
        .mock_async(|when, then| {
            when.method(POST).path("/whatsapp/connect");
            then.status(200);
        })
        .await;
    ctx.server
        .mock_async(|when, then| {
            when.method(POST).path("/whatsapp/verify");
            then.status(200)
                .json_body(json!({"success": false, "message": "wrong code"}));
        })
        .await;

    ctx.service
        .submit_phone(&ctx.user, "+4915112345678")
        .await
        .unwrap();
    let err = ctx.service.verify_code(&ctx.user, "000000").await.unwrap_err();

    assert!(matches!(err, OnboardingError::VerificationRejected(message) if message == "wrong code"));
    let state = ctx.service.state(&ctx.user, Some(OnboardingStep::Preferences)).await.unwrap();
    assert_eq!(state.step, OnboardingStep::Verify);
    assert!(!state.whatsapp_connected);
}

#[tokio::test]
async fn disconnect_clears_whatsapp_flag() {
    let ctx = TestContext::new().await;
    ctx.integrations()
        .set_whatsapp_connected(ctx.user.id, true)
        .await
        .unwrap();
    let mock = ctx
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/whatsapp/disconnect");
            then.status(204);
        })
        .await;

    let status = ctx.service.disconnect_whatsapp(&ctx.user).await.unwrap();

    mock.assert_async().await;
    assert!(!status.whatsapp_connected);
}

#[tokio::test]
async fn mutating_steps_refuse_to_skip_ahead() {
    let ctx = TestContext::new().await;
    let connect = ctx
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/whatsapp/connect");
            then.status(200);
        })
        .await;

    let err = ctx
        .service
        .submit_phone(&ctx.user, "+4915112345678")
        .await
        .unwrap_err();
    assert!(matches!(err, OnboardingError::StepNotReachable(OnboardingStep::Phone)));
    connect.assert_hits_async(0).await;

    let err = ctx
        .service
        .save_preferences(&ctx.user, &MeetingPreferences::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OnboardingError::StepNotReachable(OnboardingStep::Preferences)));

    let status = ctx.integrations().find(ctx.user.id).await.unwrap();
    assert!(!status.onboarding_completed);
    assert_eq!(status.onboarding_step, OnboardingStep::Calendar.number());
    assert_eq!(ctx.service.preferences(&ctx.user).await.unwrap(), MeetingPreferences::default());
}

#[tokio::test]
async fn preferences_wait_for_whatsapp_after_calendar() {
    let ctx = TestContext::new().await;
    ctx.connect_calendar().await;

    let err = ctx
        .service
        .save_preferences(&ctx.user, &MeetingPreferences::default())
        .await
        .unwrap_err();

    assert!(matches!(err, OnboardingError::StepNotReachable(OnboardingStep::Preferences)));
    let status = ctx.integrations().find(ctx.user.id).await.unwrap();
    assert!(!status.onboarding_completed);
    assert_eq!(status.onboarding_step, OnboardingStep::Phone.number());
}
