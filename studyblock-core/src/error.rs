//! Error types for the allocation core.
//!
//! Per-task problems (`TaskError`) are filtered out with a reason and never
//! abort a run. Collection-level problems (`ScheduleError`) mean the caller
//! broke a precondition and are returned as-is, without repairing the input.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Why a single task was rejected before distribution.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TaskError {
    #[error("task {id}: estimated duration must be positive (got {minutes} min)")]
    NonPositiveDuration { id: String, minutes: i64 },

    #[error("task {id}: due {due} is already in the past")]
    PastDue { id: String, due: DateTime<Utc> },

    #[error("task {id}: id already used by an earlier task")]
    DuplicateId { id: String },
}

impl TaskError {
    pub fn task_id(&self) -> &str {
        match self {
            TaskError::NonPositiveDuration { id, .. }
            | TaskError::PastDue { id, .. }
            | TaskError::DuplicateId { id } => id,
        }
    }
}

/// Broken preconditions on the inputs of a distribution run, or a violated
/// output invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("window {index} ends before it starts")]
    EmptyWindow { index: usize },

    #[error("window {index} starts before window {previous}")]
    UnsortedWindows { index: usize, previous: usize },

    #[error("window {index} overlaps window {previous}")]
    OverlappingWindows { index: usize, previous: usize },

    #[error("task at position {index} ({id}) is out of urgency order")]
    UnsortedTasks { index: usize, id: String },

    #[error("unvalidated task reached the distributor: {0}")]
    InvalidTask(#[from] TaskError),

    #[error("schedule invariant violated: {0}")]
    Invariant(String),
}

/// Invalid scheduler configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("day envelope {start}..{end} is empty")]
    InvalidEnvelope { start: String, end: String },

    #[error("preferred study hours {start}..{end} are empty")]
    InvalidPreferredHours { start: String, end: String },

    #[error("preferred study hours need both a start and an end")]
    HalfOpenPreferredHours,

    #[error("{field} must be positive")]
    NonPositive { field: &'static str },
}

/// Anything that stops `Planner::plan` from producing a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
