//! Planner: availability → validation → urgency → distribution → result.
//!
//! Every step is pure with respect to `now`; the planner owns its copies of
//! the tasks and windows for the duration of a run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::availability::AvailabilityCalculator;
use crate::config::SchedulerConfig;
use crate::distributor::TaskDistributor;
use crate::error::{PlanError, TaskError};
use crate::result::ScheduleResult;
use crate::task::{Task, partition_valid};
use crate::urgency::UrgencyScorer;
use crate::window::{Commitment, DayRange, TimeWindow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOutcome {
    pub result: ScheduleResult,
    /// Tasks that failed validation, with the reason.
    pub rejected: Vec<TaskError>,
    /// The windows the run distributed into; placement indices point here.
    pub windows: Vec<TimeWindow>,
    pub range: DayRange,
}

impl PlanOutcome {
    pub fn run_days(&self) -> u32 {
        self.range.days
    }
}

#[derive(Debug, Clone)]
pub struct Planner {
    config: SchedulerConfig,
    availability: AvailabilityCalculator,
    scorer: UrgencyScorer,
    distributor: TaskDistributor,
}

impl Planner {
    pub fn new(config: SchedulerConfig) -> Result<Self, PlanError> {
        let availability = AvailabilityCalculator::from_config(&config)?;
        Ok(Self {
            scorer: UrgencyScorer::new(config.urgency.clone()),
            distributor: TaskDistributor::from_config(&config),
            availability,
            config,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn availability(&self) -> &AvailabilityCalculator {
        &self.availability
    }

    /// The configured number of days starting at the local date of `now`.
    pub fn default_range(&self, now: DateTime<Utc>) -> DayRange {
        let today = now.with_timezone(&self.availability.tz()).date_naive();
        DayRange::new(today, self.config.day_range_days)
    }

    /// Free windows for `range` from `now` onward, eagerly collected.
    pub fn windows(
        &self,
        range: DayRange,
        commitments: &[Commitment],
        now: DateTime<Utc>,
    ) -> Vec<TimeWindow> {
        self.availability
            .free_windows(range, commitments)
            .not_before(now)
            .collect()
    }

    pub fn plan(
        &self,
        tasks: Vec<Task>,
        commitments: &[Commitment],
        range: DayRange,
        now: DateTime<Utc>,
    ) -> Result<PlanOutcome, PlanError> {
        let windows = self.windows(range, commitments, now);
        self.plan_into(tasks, windows, range, now)
    }

    /// Run against precomputed windows (ascending, disjoint).
    pub fn plan_into(
        &self,
        tasks: Vec<Task>,
        windows: Vec<TimeWindow>,
        range: DayRange,
        now: DateTime<Utc>,
    ) -> Result<PlanOutcome, PlanError> {
        let (mut valid, rejected) = partition_valid(tasks, now);
        self.scorer.rank(&mut valid, now);

        info!(
            tasks = valid.len(),
            rejected = rejected.len(),
            windows = windows.len(),
            days = range.days,
            "planning run"
        );

        let result = self.distributor.distribute(valid, &windows, now)?;
        Ok(PlanOutcome {
            result,
            rejected,
            windows,
            range,
        })
    }
}
