use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The four wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Calendar,
    Phone,
    Verify,
    Preferences,
}

impl OnboardingStep {
    pub const ALL: [OnboardingStep; 4] = [
        OnboardingStep::Calendar,
        OnboardingStep::Phone,
        OnboardingStep::Verify,
        OnboardingStep::Preferences,
    ];

    /// Accepts the step number (`"2"`) or its name (`"phone"`).
    ///
    /// ```
    /// use cadence_onboarding::OnboardingStep;
    ///
    /// assert_eq!(OnboardingStep::parse("3"), Some(OnboardingStep::Verify));
    /// assert_eq!(OnboardingStep::parse("Preferences"), Some(OnboardingStep::Preferences));
    /// assert_eq!(OnboardingStep::parse("5"), None);
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(number) = value.parse::<i64>() {
            return Self::from_number(number);
        }

        match value.to_ascii_lowercase().as_str() {
            "calendar" => Some(Self::Calendar),
            "phone" => Some(Self::Phone),
            "verify" => Some(Self::Verify),
            "preferences" => Some(Self::Preferences),
            _ => None,
        }
    }

    pub fn from_number(number: i64) -> Option<Self> {
        match number {
            1 => Some(Self::Calendar),
            2 => Some(Self::Phone),
            3 => Some(Self::Verify),
            4 => Some(Self::Preferences),
            _ => None,
        }
    }

    pub fn number(self) -> i64 {
        match self {
            Self::Calendar => 1,
            Self::Phone => 2,
            Self::Verify => 3,
            Self::Preferences => 4,
        }
    }

    /// `None` after the last step.
    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Phone => "phone",
            Self::Verify => "verify",
            Self::Preferences => "preferences",
        }
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_advance_linearly_and_stop_after_preferences() {
        let mut step = OnboardingStep::Calendar;
        let mut visited = vec![step];
        while let Some(next) = step.next() {
            visited.push(next);
            step = next;
        }
        assert_eq!(visited, OnboardingStep::ALL.to_vec());
    }

    #[test]
    fn numbers_round_trip() {
        for step in OnboardingStep::ALL {
            assert_eq!(OnboardingStep::from_number(step.number()), Some(step));
        }
        assert_eq!(OnboardingStep::from_number(0), None);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(OnboardingStep::parse(""), None);
        assert_eq!(OnboardingStep::parse("billing"), None);
        assert_eq!(OnboardingStep::parse(" phone "), Some(OnboardingStep::Phone));
    }
}
