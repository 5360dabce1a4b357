//! Urgency scoring: due-date proximity × declared importance.
//!
//! Score = priority weight × time multiplier. The multiplier is a step
//! function of the days left before the due date, so the score never drops as
//! the due date gets closer, and never drops as priority goes up. Undated tasks
//! get a small multiplier: they sort behind dated work but still get placed
//! whenever capacity remains.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Priority, Task};

/// Tunable constants for `UrgencyScorer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyWeights {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub urgent: f64,

    /// Overdue or due within a day.
    pub within_1_day: f64,
    pub within_3_days: f64,
    pub within_7_days: f64,
    pub within_14_days: f64,
    pub later: f64,

    pub undated: f64,
}

impl Default for UrgencyWeights {
    fn default() -> Self {
        Self {
            low: 1.0,
            medium: 2.0,
            high: 3.0,
            urgent: 4.0,
            within_1_day: 4.0,
            within_3_days: 3.0,
            within_7_days: 2.0,
            within_14_days: 1.5,
            later: 1.0,
            undated: 0.25,
        }
    }
}

impl UrgencyWeights {
    pub fn priority_weight(&self, priority: Priority) -> f64 {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
            Priority::Urgent => self.urgent,
        }
    }

    /// Multiplier for a task due in `hours_left` hours (negative when overdue).
    pub fn time_multiplier(&self, hours_left: f64) -> f64 {
        let days_left = hours_left / 24.0;
        if days_left <= 1.0 {
            self.within_1_day
        } else if days_left <= 3.0 {
            self.within_3_days
        } else if days_left <= 7.0 {
            self.within_7_days
        } else if days_left <= 14.0 {
            self.within_14_days
        } else {
            self.later
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UrgencyScorer {
    weights: UrgencyWeights,
}

impl UrgencyScorer {
    pub fn new(weights: UrgencyWeights) -> Self {
        Self { weights }
    }

    /// Pure score; does not touch the task.
    pub fn score(&self, task: &Task, now: DateTime<Utc>) -> f64 {
        let base = self.weights.priority_weight(task.priority);
        match task.due {
            Some(due) => {
                let hours_left = (due - now).num_minutes() as f64 / 60.0;
                base * self.weights.time_multiplier(hours_left)
            }
            None => base * self.weights.undated,
        }
    }

    /// Set `urgency_score` on every task.
    pub fn score_all(&self, tasks: &mut [Task], now: DateTime<Utc>) {
        for t in tasks.iter_mut() {
            t.urgency_score = self.score(t, now);
        }
    }

    /// Score, then sort into distribution order.
    pub fn rank(&self, tasks: &mut [Task], now: DateTime<Utc>) {
        self.score_all(tasks, now);
        sort_by_urgency(tasks);
    }
}

/// Distribution order: score DESC, then earlier due date (undated last), then
/// longer duration, then id.
pub fn urgency_order(a: &Task, b: &Task) -> Ordering {
    b.urgency_score
        .total_cmp(&a.urgency_score)
        .then_with(|| match (a.due, b.due) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.estimated_duration.cmp(&a.estimated_duration))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_by_urgency(tasks: &mut [Task]) {
    tasks.sort_by(urgency_order);
}
