//! Repository implementations for database operations

pub mod integration_repository;
pub mod preferences_repository;
pub mod trial_repository;
pub mod verification_repository;

pub use integration_repository::IntegrationRepository;
pub use preferences_repository::PreferencesRepository;
pub use trial_repository::TrialRepository;
pub use verification_repository::VerificationRepository;
