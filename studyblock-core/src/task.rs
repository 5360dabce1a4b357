//! Task model: one schedulable unit of study work derived from an assignment.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Declared importance. Ordered so that `Low < Urgent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// 1-based ordinal (Low = 1, Urgent = 4).
    pub fn ordinal(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

/// Where the duration estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationSource {
    /// Set by the user or the upstream record.
    #[default]
    Explicit,
    /// Filled in from the assignment-kind heuristic.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub course: Option<String>,

    /// Minutes. Must be positive to enter a run.
    pub estimated_duration: i64,
    pub duration_source: DurationSource,

    /// Optional hard deadline (UTC).
    pub due: Option<DateTime<Utc>>,
    pub priority: Priority,

    /// Derived by `UrgencyScorer`; not authoritative.
    pub urgency_score: f64,
    pub scheduled: bool,

    /// Let an already-overdue task into the run (placed late if at all).
    pub allow_late: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            course: None,
            estimated_duration: 90,
            duration_source: DurationSource::Explicit,
            due: None,
            priority: Priority::Medium,
            urgency_score: 0.0,
            scheduled: false,
            allow_late: false,
        }
    }

    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.estimated_duration = minutes;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_course(mut self, course: impl Into<String>) -> Self {
        self.course = Some(course.into());
        self
    }

    pub fn with_duration_source(mut self, source: DurationSource) -> Self {
        self.duration_source = source;
        self
    }

    pub fn allowing_late(mut self) -> Self {
        self.allow_late = true;
        self
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due.is_some_and(|due| due < now)
    }

    /// Boundary check run before a task may enter the distributor.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), TaskError> {
        if self.estimated_duration <= 0 {
            return Err(TaskError::NonPositiveDuration {
                id: self.id.clone(),
                minutes: self.estimated_duration,
            });
        }
        if let Some(due) = self.due {
            if due < now && !self.allow_late {
                return Err(TaskError::PastDue {
                    id: self.id.clone(),
                    due,
                });
            }
        }
        Ok(())
    }
}

/// Split tasks into those that may enter a run and those rejected with a reason.
///
/// Ids must be unique within a run: the first task carrying an id owns it and
/// later ones are rejected as duplicates.
pub fn partition_valid(tasks: Vec<Task>, now: DateTime<Utc>) -> (Vec<Task>, Vec<TaskError>) {
    let mut valid = Vec::with_capacity(tasks.len());
    let mut rejected = Vec::new();
    let mut seen: HashSet<String> = HashSet::with_capacity(tasks.len());
    for task in tasks {
        let checked = if seen.insert(task.id.clone()) {
            task.validate(now)
        } else {
            Err(TaskError::DuplicateId {
                id: task.id.clone(),
            })
        };
        match checked {
            Ok(()) => valid.push(task),
            Err(e) => {
                tracing::warn!(task = %task.id, error = %e, "rejecting task");
                rejected.push(e);
            }
        }
    }
    (valid, rejected)
}
