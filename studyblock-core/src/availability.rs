//! Free-window discovery: each day's envelope minus fixed commitments.
//!
//! Commitments are merged once per run; days are then produced lazily by
//! `FreeWindows`, which is `Clone` so a caller can restart the sequence.

use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::error::ConfigError;
use crate::time::local_to_utc;
use crate::window::{Commitment, DayRange, TimeWindow};

/// A merged busy interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Busy {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Sort by start and merge overlapping or touching commitments. Zero-length
/// and inverted intervals carry no busy time and are skipped.
pub fn merge_commitments(commitments: &[Commitment]) -> Vec<Busy> {
    let mut spans: Vec<Busy> = commitments
        .iter()
        .filter(|c| c.end > c.start)
        .map(|c| Busy {
            start: c.start,
            end: c.end,
        })
        .collect();
    spans.sort_by_key(|b| (b.start, b.end));

    let mut merged: Vec<Busy> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => {
                if span.end > last.end {
                    last.end = span.end;
                }
            }
            _ => merged.push(span),
        }
    }
    merged
}

/// Complement of sorted, merged `busy` inside `[start, end)`.
fn subtract(start: DateTime<Utc>, end: DateTime<Utc>, busy: &[Busy]) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut gaps = Vec::new();
    let mut cursor = start;

    for b in busy {
        if b.end <= cursor {
            continue;
        }
        if b.start >= end {
            break;
        }
        if b.start > cursor {
            gaps.push((cursor, b.start));
        }
        cursor = cursor.max(b.end.min(end));
    }

    if cursor < end {
        gaps.push((cursor, end));
    }
    gaps
}

#[derive(Debug, Clone)]
pub struct AvailabilityCalculator {
    tz: Tz,
    day_start: NaiveTime,
    day_end: NaiveTime,
    preferred: Option<(NaiveTime, NaiveTime)>,
    min_window_minutes: i64,
}

impl AvailabilityCalculator {
    pub fn from_config(config: &SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tz: config.tz()?,
            day_start: config.day_start,
            day_end: config.day_end,
            preferred: config.preferred_hours(),
            min_window_minutes: config.min_window_minutes,
        })
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Lazy, chronologically ordered free windows for every day in `range`.
    pub fn free_windows(&self, range: DayRange, commitments: &[Commitment]) -> FreeWindows {
        FreeWindows {
            calc: self.clone(),
            busy: merge_commitments(commitments),
            range,
            next_day: 0,
            not_before: None,
            pending: VecDeque::new(),
        }
    }

    /// Free windows of a single local day.
    pub fn windows_for_day(&self, day: NaiveDate, busy: &[Busy]) -> Vec<TimeWindow> {
        let (Some(env_start), Some(env_end)) = (
            local_to_utc(day, self.day_start, self.tz),
            local_to_utc(day, self.day_end, self.tz),
        ) else {
            debug!(%day, "day envelope falls in a DST gap; skipping");
            return Vec::new();
        };

        let gaps = subtract(env_start, env_end, busy);

        if let Some((pref_start, pref_end)) = self.preferred {
            if let (Some(ps), Some(pe)) = (
                local_to_utc(day, pref_start, self.tz),
                local_to_utc(day, pref_end, self.tz),
            ) {
                let clipped: Vec<TimeWindow> = gaps
                    .iter()
                    .map(|&(s, e)| (s.max(ps), e.min(pe)))
                    .filter(|&(s, e)| e > s)
                    .filter_map(|(s, e)| self.to_window(s, e))
                    .collect();

                if !clipped.is_empty() {
                    return clipped;
                }
                debug!(%day, "no free time inside preferred hours; falling back to the full day");
            }
        }

        gaps.into_iter()
            .filter_map(|(s, e)| self.to_window(s, e))
            .collect()
    }

    /// Drop the part of `w` before `at`; `None` if too little is left.
    fn clip_start(&self, w: TimeWindow, at: DateTime<Utc>) -> Option<TimeWindow> {
        if w.start >= at {
            return Some(w);
        }
        if w.end <= at {
            return None;
        }
        self.to_window(at, w.end)
    }

    fn to_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<TimeWindow> {
        let w = TimeWindow::new(start, end);
        if w.duration_minutes() < self.min_window_minutes.max(1) {
            return None;
        }
        let hour = start.with_timezone(&self.tz).hour();
        let label = if hour < 12 {
            "morning study block"
        } else if hour < 17 {
            "afternoon study block"
        } else {
            "evening study block"
        };
        Some(w.with_label(label))
    }
}

/// Day-by-day free windows; bounded by the day range.
#[derive(Debug, Clone)]
pub struct FreeWindows {
    calc: AvailabilityCalculator,
    busy: Vec<Busy>,
    range: DayRange,
    next_day: u32,
    not_before: Option<DateTime<Utc>>,
    pending: VecDeque<TimeWindow>,
}

impl FreeWindows {
    /// Only yield time from `at` onward. Windows already over are skipped and
    /// the one containing `at` is trimmed.
    pub fn not_before(mut self, at: DateTime<Utc>) -> Self {
        self.not_before = Some(at);
        self
    }
}

impl Iterator for FreeWindows {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<TimeWindow> {
        loop {
            if let Some(w) = self.pending.pop_front() {
                return Some(w);
            }
            if self.next_day >= self.range.days {
                return None;
            }
            let day = self.range.first_day + chrono::Duration::days(i64::from(self.next_day));
            self.next_day += 1;
            let windows = self.calc.windows_for_day(day, &self.busy);
            match self.not_before {
                Some(at) => self
                    .pending
                    .extend(windows.into_iter().filter_map(|w| self.calc.clip_start(w, at))),
                None => self.pending.extend(windows),
            }
        }
    }
}
