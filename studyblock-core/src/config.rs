//! Scheduler configuration shared by availability discovery and distribution.

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::urgency::UrgencyWeights;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// IANA timezone the day envelope is expressed in.
    pub timezone: String,

    /// Local start/end of the usable day.
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,

    /// Optional preferred study envelope; both or neither.
    pub preferred_study_start: Option<NaiveTime>,
    pub preferred_study_end: Option<NaiveTime>,

    /// Slack consumed after every placed task.
    pub session_buffer_minutes: i64,
    pub max_continuous_work_minutes: i64,
    pub break_duration_minutes: i64,

    pub allow_session_splitting: bool,
    pub min_session_split_minutes: i64,

    /// Free gaps shorter than this are not offered as windows.
    pub min_window_minutes: i64,
    pub day_range_days: u32,

    pub urgency: UrgencyWeights,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            day_start: hm(9, 0),
            day_end: hm(22, 0),
            preferred_study_start: None,
            preferred_study_end: None,
            session_buffer_minutes: 30,
            max_continuous_work_minutes: 120,
            break_duration_minutes: 15,
            allow_session_splitting: false,
            min_session_split_minutes: 30,
            min_window_minutes: 15,
            day_range_days: 7,
            urgency: UrgencyWeights::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    pub fn preferred_hours(&self) -> Option<(NaiveTime, NaiveTime)> {
        self.preferred_study_start.zip(self.preferred_study_end)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;
        if self.day_end <= self.day_start {
            return Err(ConfigError::InvalidEnvelope {
                start: self.day_start.to_string(),
                end: self.day_end.to_string(),
            });
        }
        match (self.preferred_study_start, self.preferred_study_end) {
            (Some(start), Some(end)) if end <= start => {
                return Err(ConfigError::InvalidPreferredHours {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
            (Some(_), None) | (None, Some(_)) => return Err(ConfigError::HalfOpenPreferredHours),
            _ => {}
        }
        if self.session_buffer_minutes < 0 {
            return Err(ConfigError::NonPositive {
                field: "session_buffer_minutes",
            });
        }
        if self.max_continuous_work_minutes <= 0 {
            return Err(ConfigError::NonPositive {
                field: "max_continuous_work_minutes",
            });
        }
        if self.break_duration_minutes < 0 {
            return Err(ConfigError::NonPositive {
                field: "break_duration_minutes",
            });
        }
        if self.min_session_split_minutes <= 0 {
            return Err(ConfigError::NonPositive {
                field: "min_session_split_minutes",
            });
        }
        if self.day_range_days == 0 {
            return Err(ConfigError::NonPositive {
                field: "day_range_days",
            });
        }
        Ok(())
    }
}

pub(crate) fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}
