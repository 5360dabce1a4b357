//! studyblock-core: time-block allocation of study tasks into free windows.

pub mod availability;
pub mod config;
pub mod distributor;
pub mod error;
pub mod planner;
pub mod result;
pub mod task;
pub mod time;
pub mod urgency;
pub mod window;

pub use availability::{AvailabilityCalculator, Busy, FreeWindows, merge_commitments};
pub use config::SchedulerConfig;
pub use distributor::{DistributionPolicy, TaskDistributor};
pub use error::{ConfigError, PlanError, ScheduleError, TaskError};
pub use planner::{PlanOutcome, Planner};
pub use result::{
    BreakMarker, DaySummary, Placement, PlacementKind, RunSummary, ScheduleResult, SessionPart,
    UnscheduledReason, UnscheduledTask,
};
pub use task::{DurationSource, Priority, Task, partition_valid};
pub use urgency::{UrgencyScorer, UrgencyWeights, sort_by_urgency, urgency_order};
pub use window::{Commitment, CommitmentKind, DayRange, TimeWindow};
