//! Time intervals: free windows, fixed commitments, and the day range of a run.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A contiguous free interval available for study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: Option<String>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn contains(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start <= start && end <= self.end
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentKind {
    Class,
    Work,
    /// Already on the calendar.
    Event,
    Personal,
}

impl std::str::FromStr for CommitmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "class" | "lecture" | "lab" => Ok(CommitmentKind::Class),
            "work" | "shift" => Ok(CommitmentKind::Work),
            "event" | "calendar" => Ok(CommitmentKind::Event),
            "personal" => Ok(CommitmentKind::Personal),
            other => Err(format!("unknown commitment kind: {other}")),
        }
    }
}

/// A fixed, non-negotiable interval (class, work shift, posted event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: CommitmentKind,
    pub title: String,
}

impl Commitment {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        kind: CommitmentKind,
        title: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            kind,
            title: title.into(),
        }
    }
}

/// Consecutive local calendar days covered by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub first_day: NaiveDate,
    pub days: u32,
}

impl DayRange {
    pub fn new(first_day: NaiveDate, days: u32) -> Self {
        Self { first_day, days }
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + Clone + use<> {
        let first = self.first_day;
        (0..self.days).map(move |i| first + Duration::days(i64::from(i)))
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.iter_days().last()
    }
}
