//! Local input checks. A value rejected here never reaches the backend.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::OnboardingError;

pub const VERIFICATION_CODE_LEN: usize = 6;

const MIN_PHONE_DIGITS: usize = 8;
const MAX_PHONE_DIGITS: usize = 15;

pub const MIN_MEETING_DURATION: i64 = 15;
pub const MAX_MEETING_DURATION: i64 = 240;
pub const MAX_BUFFER_MINUTES: i64 = 120;

/// Normalise and check an E.164 number. Spaces, dashes, dots and
/// parentheses are stripped before matching.
///
/// ```
/// use cadence_onboarding::validate_phone_number;
///
/// assert_eq!(validate_phone_number("+49 151 1234-5678").unwrap(), "+4915112345678");
/// assert!(validate_phone_number("015112345678").is_err());
/// ```
pub fn validate_phone_number(input: &str) -> Result<String, OnboardingError> {
    let trimmed = input.trim();
    if !trimmed.starts_with('+') {
        return Err(OnboardingError::InvalidPhone(
            "phone number must start with + and a country code".into(),
        ));
    }

    let normalized: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let digits = &normalized[1..];
    let well_formed = (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !digits.starts_with('0');

    if !well_formed {
        return Err(OnboardingError::InvalidPhone(
            "phone number must be in E.164 format".into(),
        ));
    }

    Ok(normalized)
}

pub fn validate_verification_code(input: &str) -> Result<String, OnboardingError> {
    let code = input.trim();
    if code.len() != VERIFICATION_CODE_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OnboardingError::InvalidCode);
    }
    Ok(code.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MeetingPreferences {
    pub meeting_duration_minutes: i64,
    pub buffer_minutes: i64,
    /// IANA zone name, e.g. `Europe/Berlin`.
    pub timezone: String,
}

impl Default for MeetingPreferences {
    fn default() -> Self {
        Self {
            meeting_duration_minutes: 30,
            buffer_minutes: 15,
            timezone: "UTC".to_string(),
        }
    }
}

impl MeetingPreferences {
    pub fn validate(&self) -> Result<(), OnboardingError> {
        if !(MIN_MEETING_DURATION..=MAX_MEETING_DURATION).contains(&self.meeting_duration_minutes) {
            return Err(OnboardingError::InvalidPreferences(format!(
                "meeting duration must be between {MIN_MEETING_DURATION} and {MAX_MEETING_DURATION} minutes"
            )));
        }

        if !(0..=MAX_BUFFER_MINUTES).contains(&self.buffer_minutes) {
            return Err(OnboardingError::InvalidPreferences(format!(
                "buffer must be between 0 and {MAX_BUFFER_MINUTES} minutes"
            )));
        }

        self.timezone
            .parse::<Tz>()
            .map_err(|_| OnboardingError::InvalidPreferences(format!(
                "unknown timezone {}",
                self.timezone
            )))?;

        Ok(())
    }
}
