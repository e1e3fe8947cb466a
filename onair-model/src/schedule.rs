use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::ModelError,
    ids::{JobId, ScheduleId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    #[default]
    OneTime,
    Recurring,
}

impl ScheduleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleKind::OneTime => "one_time",
            ScheduleKind::Recurring => "recurring",
        }
    }
}

impl FromStr for ScheduleKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_time" => Ok(ScheduleKind::OneTime),
            "recurring" => Ok(ScheduleKind::Recurring),
            other => Err(ModelError::unknown("schedule kind", other)),
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time window during which a job should be live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub job_id: JobId,
    #[serde(rename = "type")]
    pub kind: ScheduleKind,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub duration_s: Option<i64>,
    pub retry_policy: Option<Value>,
    pub enabled: bool,
}

impl Schedule {
    /// When a session materialized from this schedule should stop.
    ///
    /// `duration_s` wins over `end_at`; with neither the session is open-ended.
    /// Fails when `start_at + duration_s` is not a representable instant.
    pub fn planned_end_at(&self) -> Result<Option<DateTime<Utc>>, ModelError> {
        match (self.duration_s, self.end_at) {
            (Some(seconds), _) => Duration::try_seconds(seconds)
                .and_then(|duration| self.start_at.checked_add_signed(duration))
                .map(Some)
                .ok_or_else(|| {
                    ModelError::InvalidValue(format!(
                        "duration_s {seconds} overflows start_at {}",
                        self.start_at
                    ))
                }),
            (None, Some(end_at)) => Ok(Some(end_at)),
            (None, None) => Ok(None),
        }
    }

    pub fn is_open_ended(&self) -> bool {
        self.duration_s.is_none() && self.end_at.is_none()
    }

    /// Enabled and already started. `end_at` is deliberately not consulted.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.start_at <= now
    }
}

/// Payload accepted when registering a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSchedule {
    pub job_id: JobId,
    #[serde(rename = "type", default)]
    pub kind: ScheduleKind,
    pub start_at: DateTime<Utc>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_s: Option<i64>,
    #[serde(default)]
    pub retry_policy: Option<Value>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl NewSchedule {
    pub fn into_schedule(self) -> Schedule {
        Schedule {
            id: ScheduleId::new(),
            job_id: self.job_id,
            kind: self.kind,
            start_at: self.start_at,
            end_at: self.end_at,
            duration_s: self.duration_s,
            retry_policy: self.retry_policy,
            enabled: self.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule() -> Schedule {
        Schedule {
            id: ScheduleId::new(),
            job_id: JobId::new(),
            kind: ScheduleKind::OneTime,
            start_at: Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap(),
            end_at: None,
            duration_s: None,
            retry_policy: None,
            enabled: true,
        }
    }

    #[test]
    fn duration_takes_precedence_over_end_at() {
        let mut schedule = schedule();
        schedule.end_at = Some(schedule.start_at + Duration::hours(5));
        schedule.duration_s = Some(3_600);
        assert_eq!(
            schedule.planned_end_at(),
            Ok(Some(schedule.start_at + Duration::hours(1)))
        );

        schedule.duration_s = None;
        assert_eq!(schedule.planned_end_at(), Ok(schedule.end_at));
    }

    #[test]
    fn open_ended_without_duration_or_end() {
        let schedule = schedule();
        assert!(schedule.is_open_ended());
        assert_eq!(schedule.planned_end_at(), Ok(None));
    }

    #[test]
    fn unrepresentable_end_is_an_error() {
        let mut schedule = schedule();
        for seconds in [i64::MAX, i64::MAX / 1_000, 400_000 * 365 * 86_400] {
            schedule.duration_s = Some(seconds);
            assert!(matches!(
                schedule.planned_end_at(),
                Err(ModelError::InvalidValue(_))
            ));
        }
    }

    #[test]
    fn eligibility_ignores_end_at() {
        let mut schedule = schedule();
        schedule.end_at = Some(schedule.start_at + Duration::minutes(10));
        let long_after = schedule.start_at + Duration::days(30);
        assert!(schedule.is_eligible(long_after));
        assert!(!schedule.is_eligible(schedule.start_at - Duration::seconds(1)));

        schedule.enabled = false;
        assert!(!schedule.is_eligible(long_after));
    }

    #[test]
    fn new_schedule_defaults_to_enabled_one_time() {
        let payload = serde_json::json!({
            "job_id": JobId::new(),
            "start_at": "2026-03-01T20:00:00Z",
        });
        let parsed: NewSchedule = serde_json::from_value(payload).unwrap();
        assert!(parsed.enabled);
        assert_eq!(parsed.kind, ScheduleKind::OneTime);
    }
}
