//! Row types owned by the dashboard service.

pub mod integration;
pub mod preferences;
pub mod verification;

pub use integration::IntegrationStatus;
pub use preferences::StoredPreferences;
pub use verification::PendingVerification;
