//! Task distribution: greedy first-fit of urgency-ordered tasks into
//! chronological free windows.
//!
//! Algorithm (deterministic):
//! 1) for each task, take the first window whose remaining capacity holds
//!    (pending break) + duration + buffer and where the task would finish by
//!    its due date
//! 2) place it at the window cursor and consume duration + buffer
//! 3) insert a break first when the task would push the window's continuous
//!    work past the configured maximum
//! 4) overdue tasks that fit nowhere on time are retried ignoring the due
//!    date and marked late
//! 5) with splitting enabled, a task that fits no single window is spread
//!    over several, every piece at least the minimum session length
//! 6) anything left is reported unscheduled with a reason

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::ScheduleError;
use crate::result::{
    BreakMarker, Placement, PlacementKind, ScheduleResult, SessionPart, UnscheduledReason,
    UnscheduledTask,
};
use crate::task::Task;
use crate::urgency::urgency_order;
use crate::window::TimeWindow;

/// The subset of `SchedulerConfig` the distributor acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionPolicy {
    pub session_buffer_minutes: i64,
    pub max_continuous_work_minutes: i64,
    pub break_duration_minutes: i64,
    pub allow_session_splitting: bool,
    pub min_session_split_minutes: i64,
}

impl From<&SchedulerConfig> for DistributionPolicy {
    fn from(cfg: &SchedulerConfig) -> Self {
        Self {
            session_buffer_minutes: cfg.session_buffer_minutes,
            max_continuous_work_minutes: cfg.max_continuous_work_minutes,
            break_duration_minutes: cfg.break_duration_minutes,
            allow_session_splitting: cfg.allow_session_splitting,
            min_session_split_minutes: cfg.min_session_split_minutes,
        }
    }
}

impl Default for DistributionPolicy {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskDistributor {
    policy: DistributionPolicy,
}

impl TaskDistributor {
    pub fn new(policy: DistributionPolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(cfg: &SchedulerConfig) -> Self {
        Self::new(DistributionPolicy::from(cfg))
    }

    pub fn policy(&self) -> &DistributionPolicy {
        &self.policy
    }

    /// Assign `tasks` (urgency order) to `windows` (ascending, disjoint).
    ///
    /// Broken preconditions are returned as errors; the input is never
    /// reordered or repaired.
    pub fn distribute(
        &self,
        tasks: Vec<Task>,
        windows: &[TimeWindow],
        now: DateTime<Utc>,
    ) -> Result<ScheduleResult, ScheduleError> {
        check_windows(windows)?;
        check_tasks(&tasks, now)?;

        let largest_window = windows
            .iter()
            .map(TimeWindow::duration_minutes)
            .max()
            .unwrap_or(0);

        let mut alloc = Allocation::new(self.policy, windows);
        let mut unscheduled = Vec::new();

        for mut task in tasks {
            if windows.is_empty() {
                unscheduled.push(UnscheduledTask {
                    task,
                    reason: UnscheduledReason::NoAvailability,
                });
                continue;
            }

            if alloc.place(&mut task, true, PlacementKind::OnTime) {
                continue;
            }

            let overdue = task.is_overdue(now);
            if overdue && alloc.place(&mut task, false, PlacementKind::Late) {
                continue;
            }

            let reason = if task.estimated_duration + self.policy.session_buffer_minutes
                > largest_window
            {
                UnscheduledReason::Overflow
            } else if !overdue && task.due.is_some() && alloc.has_room_ignoring_due(&task) {
                UnscheduledReason::DueDateInfeasible
            } else {
                UnscheduledReason::NoCapacity
            };
            debug!(task = %task.id, %reason, "task left unscheduled");
            unscheduled.push(UnscheduledTask { task, reason });
        }

        let (placements, breaks) = alloc.finish();
        let result = ScheduleResult::assemble(windows, placements, breaks, unscheduled)?;
        info!(
            placed = result.placements.len(),
            breaks = result.breaks.len(),
            unscheduled = result.unscheduled.len(),
            efficiency = result.efficiency,
            "distribution finished"
        );
        Ok(result)
    }
}

/// Per-window consumption state.
#[derive(Debug, Clone, Copy)]
struct Ledger {
    /// Next free instant.
    cursor: DateTime<Utc>,
    end: DateTime<Utc>,
    /// Task minutes since the last break.
    run_minutes: i64,
}

impl Ledger {
    fn remaining(&self) -> i64 {
        (self.end - self.cursor).num_minutes()
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    window_index: usize,
    rest_from: DateTime<Utc>,
    with_break: bool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

struct Allocation<'a> {
    policy: DistributionPolicy,
    windows: &'a [TimeWindow],
    ledgers: Vec<Ledger>,
    placements: Vec<Placement>,
    breaks: Vec<BreakMarker>,
}

impl<'a> Allocation<'a> {
    fn new(policy: DistributionPolicy, windows: &'a [TimeWindow]) -> Self {
        Self {
            policy,
            windows,
            ledgers: windows
                .iter()
                .map(|w| Ledger {
                    cursor: w.start,
                    end: w.end,
                    run_minutes: 0,
                })
                .collect(),
            placements: Vec::new(),
            breaks: Vec::new(),
        }
    }

    fn finish(self) -> (Vec<Placement>, Vec<BreakMarker>) {
        (self.placements, self.breaks)
    }

    fn needs_break(&self, ledger: &Ledger, minutes: i64) -> bool {
        ledger.run_minutes > 0
            && ledger.run_minutes + minutes > self.policy.max_continuous_work_minutes
    }

    fn slot_in(
        &self,
        window_index: usize,
        ledger: &Ledger,
        minutes: i64,
        due: Option<DateTime<Utc>>,
    ) -> Option<Slot> {
        let with_break = self.needs_break(ledger, minutes);
        let rest = if with_break {
            self.policy.break_duration_minutes
        } else {
            0
        };
        if rest + minutes + self.policy.session_buffer_minutes > ledger.remaining() {
            return None;
        }
        let start = ledger.cursor + Duration::minutes(rest);
        let end = start + Duration::minutes(minutes);
        if due.is_some_and(|d| end > d) {
            return None;
        }
        Some(Slot {
            window_index,
            rest_from: ledger.cursor,
            with_break,
            start,
            end,
        })
    }

    /// Whether some window could take the whole task if the due date did not matter.
    fn has_room_ignoring_due(&self, task: &Task) -> bool {
        self.ledgers
            .iter()
            .enumerate()
            .any(|(i, l)| self.slot_in(i, l, task.estimated_duration, None).is_some())
    }

    /// Try whole placement, then splitting; on success mark the task scheduled.
    fn place(&mut self, task: &mut Task, respect_due: bool, kind: PlacementKind) -> bool {
        let due = if respect_due { task.due } else { None };
        let minutes = task.estimated_duration;

        let whole = self
            .ledgers
            .iter()
            .enumerate()
            .find_map(|(i, l)| self.slot_in(i, l, minutes, due));

        if let Some(slot) = whole {
            let mut breaks = Vec::new();
            commit(&mut self.ledgers, &mut breaks, self.policy, slot, minutes);
            self.breaks.extend(breaks);
            task.scheduled = true;
            self.record(task, slot, kind, None);
            return true;
        }

        if !self.policy.allow_session_splitting {
            return false;
        }

        let Some((ledgers, breaks, pieces)) = self.plan_split(minutes, due) else {
            return false;
        };
        self.ledgers = ledgers;
        self.breaks.extend(breaks);
        task.scheduled = true;

        let total = pieces.len() as u32;
        debug!(task = %task.id, pieces = total, "task split across windows");
        for (i, slot) in pieces.into_iter().enumerate() {
            let part = (total > 1).then_some(SessionPart {
                index: i as u32 + 1,
                total,
            });
            self.record(task, slot, kind, part);
        }
        true
    }

    /// Spread `minutes` over windows in order; all-or-nothing.
    fn plan_split(
        &self,
        minutes: i64,
        due: Option<DateTime<Utc>>,
    ) -> Option<(Vec<Ledger>, Vec<BreakMarker>, Vec<Slot>)> {
        let min_piece = self.policy.min_session_split_minutes;
        let buffer = self.policy.session_buffer_minutes;

        let mut ledgers = self.ledgers.clone();
        let mut breaks = Vec::new();
        let mut pieces = Vec::new();
        let mut left = minutes;

        for i in 0..ledgers.len() {
            if left == 0 {
                break;
            }
            let ledger = ledgers[i];
            let avail = ledger.remaining() - buffer;

            let without_break = if ledger.run_minutes > 0 {
                avail.min(self.policy.max_continuous_work_minutes - ledger.run_minutes)
            } else {
                avail
            };
            let with_break = if ledger.run_minutes > 0 {
                avail - self.policy.break_duration_minutes
            } else {
                without_break
            };
            let mut piece = left.min(without_break.max(with_break));

            if let Some(d) = due {
                let rest = if self.needs_break(&ledger, piece) {
                    self.policy.break_duration_minutes
                } else {
                    0
                };
                let until_due = (d - (ledger.cursor + Duration::minutes(rest))).num_minutes();
                piece = piece.min(until_due);
            }

            let rest_after = left - piece;
            if rest_after > 0 && rest_after < min_piece {
                piece = left - min_piece;
            }
            if piece < min_piece {
                continue;
            }

            let Some(slot) = self.slot_in(i, &ledger, piece, due) else {
                continue;
            };
            commit(&mut ledgers, &mut breaks, self.policy, slot, piece);
            pieces.push(slot);
            left -= piece;
        }

        (left == 0).then_some((ledgers, breaks, pieces))
    }

    fn record(&mut self, task: &Task, slot: Slot, kind: PlacementKind, part: Option<SessionPart>) {
        debug!(
            task = %task.id,
            window = slot.window_index,
            start = %slot.start,
            end = %slot.end,
            late = kind == PlacementKind::Late,
            "placed"
        );
        debug_assert!(self.windows[slot.window_index].contains(slot.start, slot.end));
        self.placements.push(Placement {
            task: task.clone(),
            window_index: slot.window_index,
            start: slot.start,
            end: slot.end,
            kind,
            part,
        });
    }
}

fn commit(
    ledgers: &mut [Ledger],
    breaks: &mut Vec<BreakMarker>,
    policy: DistributionPolicy,
    slot: Slot,
    minutes: i64,
) {
    let ledger = &mut ledgers[slot.window_index];
    if slot.with_break {
        if slot.start > slot.rest_from {
            debug!(window = slot.window_index, at = %slot.rest_from, "break inserted");
            breaks.push(BreakMarker {
                window_index: slot.window_index,
                start: slot.rest_from,
                end: slot.start,
            });
        }
        ledger.run_minutes = 0;
    }
    ledger.cursor = slot.end + Duration::minutes(policy.session_buffer_minutes);
    ledger.run_minutes += minutes;
}

fn check_windows(windows: &[TimeWindow]) -> Result<(), ScheduleError> {
    for (i, w) in windows.iter().enumerate() {
        if w.end <= w.start {
            return Err(ScheduleError::EmptyWindow { index: i });
        }
        if i == 0 {
            continue;
        }
        let prev = &windows[i - 1];
        if w.start < prev.start {
            return Err(ScheduleError::UnsortedWindows {
                index: i,
                previous: i - 1,
            });
        }
        if w.start < prev.end {
            return Err(ScheduleError::OverlappingWindows {
                index: i,
                previous: i - 1,
            });
        }
    }
    Ok(())
}

fn check_tasks(tasks: &[Task], now: DateTime<Utc>) -> Result<(), ScheduleError> {
    for t in tasks {
        t.validate(now)?;
    }
    if let Some(i) = tasks
        .windows(2)
        .position(|pair| urgency_order(&pair[0], &pair[1]).is_gt())
    {
        return Err(ScheduleError::UnsortedTasks {
            index: i + 1,
            id: tasks[i + 1].id.clone(),
        });
    }
    Ok(())
}
