use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest duration accepted for any phase, in minutes.
pub const MAX_DURATION_MIN: u32 = 24 * 60;

/// Durations and cycle rules for the timer.
///
/// Durations are in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroSettings {
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_short_break_duration")]
    pub short_break_duration: u32,
    #[serde(default = "default_long_break_duration")]
    pub long_break_duration: u32,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
    #[serde(default)]
    pub auto_start_next_session: bool,
}

fn default_work_duration() -> u32 {
    25
}
fn default_short_break_duration() -> u32 {
    5
}
fn default_long_break_duration() -> u32 {
    15
}
fn default_sessions_until_long_break() -> u32 {
    4
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            short_break_duration: default_short_break_duration(),
            long_break_duration: default_long_break_duration(),
            sessions_until_long_break: default_sessions_until_long_break(),
            auto_start_next_session: false,
        }
    }
}

impl PomodoroSettings {
    pub fn work_secs(&self) -> u32 {
        self.work_duration.saturating_mul(60)
    }

    pub fn short_break_secs(&self) -> u32 {
        self.short_break_duration.saturating_mul(60)
    }

    pub fn long_break_secs(&self) -> u32 {
        self.long_break_duration.saturating_mul(60)
    }

    /// Check durations and the long-break threshold.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("work_duration", self.work_duration),
            ("short_break_duration", self.short_break_duration),
            ("long_break_duration", self.long_break_duration),
        ] {
            if value == 0 || value > MAX_DURATION_MIN {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: format!("must be between 1 and {MAX_DURATION_MIN} minutes, got {value}"),
                });
            }
        }
        if self.sessions_until_long_break == 0 {
            return Err(ValidationError::InvalidValue {
                field: "sessions_until_long_break".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_classic_pomodoro() {
        let s = PomodoroSettings::default();
        assert_eq!(s.work_secs(), 1500);
        assert_eq!(s.short_break_secs(), 300);
        assert_eq!(s.long_break_secs(), 900);
        assert_eq!(s.sessions_until_long_break, 4);
        assert!(!s.auto_start_next_session);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn zero_duration_is_rejected() {
        let s = PomodoroSettings {
            short_break_duration: 0,
            ..Default::default()
        };
        match s.validate() {
            Err(ValidationError::InvalidValue { field, .. }) => {
                assert_eq!(field, "short_break_duration")
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let s = PomodoroSettings {
            sessions_until_long_break: 0,
            ..Default::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let s: PomodoroSettings = toml::from_str("work_duration = 50").unwrap();
        assert_eq!(s.work_duration, 50);
        assert_eq!(s.short_break_duration, 5);
        assert_eq!(s.sessions_until_long_break, 4);
    }
}
