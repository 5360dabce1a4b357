//! Output of a distribution run, plus the invariant checks applied when it is
//! assembled.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::task::Task;
use crate::time::local_date;
use crate::window::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    OnTime,
    /// Overdue task placed after its due date.
    Late,
}

/// 1-based piece number of a split task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPart {
    pub index: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub task: Task,
    pub window_index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: PlacementKind,
    pub part: Option<SessionPart>,
}

impl Placement {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// A rest period inserted between study blocks; rendered, never a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakMarker {
    pub window_index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BreakMarker {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscheduledReason {
    /// The run had no free windows at all.
    NoAvailability,
    /// Longer than every window and could not be split.
    Overflow,
    /// Would fit an empty window, but the remaining capacity was taken.
    NoCapacity,
    /// Capacity existed only after the due date.
    DueDateInfeasible,
}

impl UnscheduledReason {
    pub fn as_str(self) -> &'static str {
        match self {
            UnscheduledReason::NoAvailability => "no_availability",
            UnscheduledReason::Overflow => "overflow",
            UnscheduledReason::NoCapacity => "no_capacity",
            UnscheduledReason::DueDateInfeasible => "due_date_infeasible",
        }
    }
}

impl fmt::Display for UnscheduledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnscheduledTask {
    pub task: Task,
    pub reason: UnscheduledReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// Chronological.
    pub placements: Vec<Placement>,
    pub breaks: Vec<BreakMarker>,
    pub unscheduled: Vec<UnscheduledTask>,
    pub placed_minutes: i64,
    pub capacity_minutes: i64,
    /// placed / capacity, within [0, 1].
    pub efficiency: f64,
}

/// Per-local-day totals for the summary renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub study_minutes: i64,
    pub break_minutes: i64,
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub days: usize,
    pub placed_tasks: usize,
    pub late_placements: usize,
    pub unscheduled_tasks: usize,
    pub total_study_minutes: i64,
    pub total_break_minutes: i64,
    pub average_study_minutes_per_day: f64,
    pub efficiency: f64,
}

impl ScheduleResult {
    /// Aggregate distributor output, checking the result invariants.
    pub fn assemble(
        windows: &[TimeWindow],
        mut placements: Vec<Placement>,
        mut breaks: Vec<BreakMarker>,
        unscheduled: Vec<UnscheduledTask>,
    ) -> Result<Self, ScheduleError> {
        let mut per_window: BTreeMap<usize, Vec<(DateTime<Utc>, DateTime<Utc>)>> = BTreeMap::new();

        for p in &placements {
            check_inside(windows, p.window_index, p.start, p.end, &p.task.id)?;
            if !p.task.scheduled {
                return Err(ScheduleError::Invariant(format!(
                    "placed task {} is not marked scheduled",
                    p.task.id
                )));
            }
            per_window.entry(p.window_index).or_default().push((p.start, p.end));
        }
        for b in &breaks {
            check_inside(windows, b.window_index, b.start, b.end, "break")?;
            per_window.entry(b.window_index).or_default().push((b.start, b.end));
        }

        for (idx, spans) in per_window.iter_mut() {
            spans.sort();
            if let Some(pair) = spans.windows(2).find(|pair| pair[1].0 < pair[0].1) {
                return Err(ScheduleError::Invariant(format!(
                    "blocks {}..{} and {}..{} overlap in window {idx}",
                    pair[0].0, pair[0].1, pair[1].0, pair[1].1
                )));
            }
        }

        let placed_ids: BTreeSet<&str> = placements.iter().map(|p| p.task.id.as_str()).collect();
        if let Some(u) = unscheduled
            .iter()
            .find(|u| u.task.scheduled || placed_ids.contains(u.task.id.as_str()))
        {
            return Err(ScheduleError::Invariant(format!(
                "task {} is both placed and unscheduled",
                u.task.id
            )));
        }

        placements.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.window_index.cmp(&b.window_index))
        });
        breaks.sort_by_key(|b| b.start);

        let placed_minutes: i64 = placements.iter().map(Placement::duration_minutes).sum();
        let capacity_minutes: i64 = windows.iter().map(TimeWindow::duration_minutes).sum();
        if placed_minutes > capacity_minutes {
            return Err(ScheduleError::Invariant(format!(
                "placed {placed_minutes} min exceeds capacity {capacity_minutes} min"
            )));
        }

        let efficiency = if capacity_minutes > 0 {
            (placed_minutes as f64 / capacity_minutes as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(Self {
            placements,
            breaks,
            unscheduled,
            placed_minutes,
            capacity_minutes,
            efficiency,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.unscheduled.is_empty()
    }

    /// Distinct tasks with at least one placement.
    pub fn placed_task_count(&self) -> usize {
        self.placements
            .iter()
            .map(|p| p.task.id.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn placements_for(&self, task_id: &str) -> Vec<&Placement> {
        self.placements.iter().filter(|p| p.task.id == task_id).collect()
    }

    pub fn day_summaries(&self, tz: Tz) -> Vec<DaySummary> {
        let mut days: BTreeMap<NaiveDate, DaySummary> = BTreeMap::new();
        for p in &self.placements {
            let date = local_date(p.start, tz);
            let d = days.entry(date).or_insert_with(|| empty_day(date));
            d.study_minutes += p.duration_minutes();
            d.sessions += 1;
        }
        for b in &self.breaks {
            let date = local_date(b.start, tz);
            days.entry(date).or_insert_with(|| empty_day(date)).break_minutes += b.duration_minutes();
        }
        days.into_values().collect()
    }

    /// Totals over the run; days with no placements still count toward the
    /// per-day average.
    pub fn summary(&self, run_days: u32) -> RunSummary {
        let total_break_minutes = self.breaks.iter().map(BreakMarker::duration_minutes).sum();
        let days = run_days.max(1);
        RunSummary {
            days: run_days as usize,
            placed_tasks: self.placed_task_count(),
            late_placements: self
                .placements
                .iter()
                .filter(|p| p.kind == PlacementKind::Late)
                .count(),
            unscheduled_tasks: self.unscheduled.len(),
            total_study_minutes: self.placed_minutes,
            total_break_minutes,
            average_study_minutes_per_day: self.placed_minutes as f64 / f64::from(days),
            efficiency: self.efficiency,
        }
    }
}

fn empty_day(date: NaiveDate) -> DaySummary {
    DaySummary {
        date,
        study_minutes: 0,
        break_minutes: 0,
        sessions: 0,
    }
}

fn check_inside(
    windows: &[TimeWindow],
    index: usize,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    what: &str,
) -> Result<(), ScheduleError> {
    let window = windows.get(index).ok_or_else(|| {
        ScheduleError::Invariant(format!("{what} refers to missing window {index}"))
    })?;
    if end <= start || !window.contains(start, end) {
        return Err(ScheduleError::Invariant(format!(
            "{what} block {start}..{end} is outside window {index}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn placed(id: &str, from: i64, to: i64) -> Placement {
        let mut task = Task::new(id, id).with_duration(to - from);
        task.scheduled = true;
        Placement {
            task,
            window_index: 0,
            start: t0() + Duration::minutes(from),
            end: t0() + Duration::minutes(to),
            kind: PlacementKind::OnTime,
            part: None,
        }
    }

    fn window() -> Vec<TimeWindow> {
        vec![TimeWindow::new(t0(), t0() + Duration::minutes(180))]
    }

    #[test]
    fn assembles_sorted_with_efficiency() {
        let r = ScheduleResult::assemble(
            &window(),
            vec![placed("b", 60, 90), placed("a", 0, 30)],
            vec![],
            vec![],
        )
        .unwrap();
        assert_eq!(r.placements[0].task.id, "a");
        assert_eq!(r.placed_minutes, 60);
        assert!((r.efficiency - 60.0 / 180.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_overlap_within_window() {
        let err = ScheduleResult::assemble(
            &window(),
            vec![placed("a", 0, 60), placed("b", 30, 90)],
            vec![],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::Invariant(_)));
    }

    #[test]
    fn rejects_break_overlapping_a_placement() {
        let brk = BreakMarker {
            window_index: 0,
            start: t0() + Duration::minutes(50),
            end: t0() + Duration::minutes(65),
        };
        assert!(ScheduleResult::assemble(&window(), vec![placed("a", 0, 60)], vec![brk], vec![]).is_err());
    }

    #[test]
    fn rejects_unmarked_or_doubly_reported_tasks() {
        let mut p = placed("a", 0, 30);
        p.task.scheduled = false;
        assert!(ScheduleResult::assemble(&window(), vec![p], vec![], vec![]).is_err());

        let p = placed("a", 0, 30);
        let u = UnscheduledTask {
            task: Task::new("a", "a"),
            reason: UnscheduledReason::NoCapacity,
        };
        assert!(ScheduleResult::assemble(&window(), vec![p], vec![], vec![u]).is_err());
    }

    #[test]
    fn rejects_placement_outside_window() {
        assert!(ScheduleResult::assemble(&window(), vec![placed("a", 150, 200)], vec![], vec![]).is_err());
    }

    #[test]
    fn zero_capacity_has_zero_efficiency() {
        let r = ScheduleResult::assemble(&[], vec![], vec![], vec![]).unwrap();
        assert_eq!(r.efficiency, 0.0);
        assert!(r.is_complete());
    }

    #[test]
    fn day_summaries_group_by_local_date() {
        let brk = BreakMarker {
            window_index: 0,
            start: t0() + Duration::minutes(30),
            end: t0() + Duration::minutes(45),
        };
        let r = ScheduleResult::assemble(
            &window(),
            vec![placed("a", 0, 30), placed("b", 45, 105)],
            vec![brk],
            vec![],
        )
        .unwrap();
        let days = r.day_summaries(chrono_tz::UTC);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].study_minutes, 90);
        assert_eq!(days[0].break_minutes, 15);
        assert_eq!(days[0].sessions, 2);

        let s = r.summary(1);
        assert_eq!(s.placed_tasks, 2);
        assert_eq!(s.total_break_minutes, 15);
        assert!((s.average_study_minutes_per_day - 90.0).abs() < 1e-9);
    }
}
