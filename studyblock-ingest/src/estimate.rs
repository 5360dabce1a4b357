//! Heuristics for assignment records that arrive without an estimate or a
//! priority: kind inference from the name, minutes per kind, and a
//! due-date/points priority ladder.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use studyblock_core::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentKind {
    Homework,
    Quiz,
    Exam,
    Project,
    Discussion,
    Essay,
    LabReport,
}

impl AssignmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentKind::Homework => "homework",
            AssignmentKind::Quiz => "quiz",
            AssignmentKind::Exam => "exam",
            AssignmentKind::Project => "project",
            AssignmentKind::Discussion => "discussion",
            AssignmentKind::Essay => "essay",
            AssignmentKind::LabReport => "lab_report",
        }
    }

    /// Working minutes before point and keyword scaling.
    pub fn base_minutes(self) -> i64 {
        match self {
            AssignmentKind::Quiz => 30,
            AssignmentKind::Exam => 120,
            AssignmentKind::Project => 180,
            AssignmentKind::Discussion => 45,
            AssignmentKind::Homework => 90,
            AssignmentKind::Essay => 120,
            AssignmentKind::LabReport => 90,
        }
    }

    /// Extra study time ahead of the work itself.
    pub fn preparation_minutes(self) -> i64 {
        match self {
            AssignmentKind::Exam => 60,
            AssignmentKind::Project => 45,
            AssignmentKind::Essay => 30,
            _ => 0,
        }
    }
}

pub const MIN_ESTIMATE_MINUTES: i64 = 30;
pub const MAX_ESTIMATE_MINUTES: i64 = 300;

/// Name/submission-type classifier. Rules are tried in order; the first hit wins.
#[derive(Debug, Clone)]
pub struct AssignmentClassifier {
    rules: Vec<(Regex, AssignmentKind)>,
    longer: Regex,
    shorter: Regex,
}

impl AssignmentClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        let rules = vec![
            (Regex::new(r"(?i)\bquiz(zes)?\b")?, AssignmentKind::Quiz),
            (
                Regex::new(r"(?i)\b(exam|test|midterm|final)s?\b")?,
                AssignmentKind::Exam,
            ),
            (Regex::new(r"(?i)\bprojects?\b")?, AssignmentKind::Project),
            (Regex::new(r"(?i)\bdiscussions?\b")?, AssignmentKind::Discussion),
            (Regex::new(r"(?i)\b(essay|paper)s?\b")?, AssignmentKind::Essay),
            (Regex::new(r"(?i)\blab\b")?, AssignmentKind::LabReport),
        ];
        Ok(Self {
            rules,
            longer: Regex::new(r"(?i)\b(essay|paper|research)")?,
            shorter: Regex::new(r"(?i)\b(short|quick|simple)\b")?,
        })
    }

    pub fn classify(&self, name: &str, submission_types: &[String]) -> AssignmentKind {
        if submission_types.iter().any(|s| s.contains("quiz")) {
            return AssignmentKind::Quiz;
        }
        if let Some((_, kind)) = self.rules.iter().find(|(re, _)| re.is_match(name)) {
            return *kind;
        }
        if submission_types.iter().any(|s| s.contains("discussion")) {
            return AssignmentKind::Discussion;
        }
        AssignmentKind::Homework
    }

    /// Minutes for a record without an explicit estimate.
    ///
    /// Base minutes scale with points (points/50, held to 0.5..2.0), then by
    /// name keywords; the working time is held to 30..300 and preparation is
    /// added on top.
    pub fn estimate_minutes(&self, kind: AssignmentKind, name: &str, points: Option<f64>) -> i64 {
        let mut minutes = kind.base_minutes() as f64;
        if let Some(p) = points.filter(|p| *p > 0.0) {
            minutes = (minutes * (p / 50.0).clamp(0.5, 2.0)).trunc();
        }
        if self.longer.is_match(name) {
            minutes = (minutes * 1.5).trunc();
        } else if self.shorter.is_match(name) {
            minutes = (minutes * 0.7).trunc();
        }
        let work = (minutes as i64).clamp(MIN_ESTIMATE_MINUTES, MAX_ESTIMATE_MINUTES);
        work + kind.preparation_minutes()
    }
}

/// Priority for a record that did not declare one.
pub fn infer_priority(due: Option<DateTime<Utc>>, points: Option<f64>, now: DateTime<Utc>) -> Priority {
    let Some(due) = due else {
        return Priority::Medium;
    };
    let days = (due - now).num_days();
    let points = points.unwrap_or(0.0);
    if days <= 2 {
        Priority::Urgent
    } else if days <= 7 || points >= 100.0 {
        Priority::High
    } else if days <= 14 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn classifier() -> AssignmentClassifier {
        AssignmentClassifier::new().unwrap()
    }

    #[test]
    fn classifies_by_name() {
        let c = classifier();
        assert_eq!(c.classify("Quiz 3: Recursion", &[]), AssignmentKind::Quiz);
        assert_eq!(c.classify("Midterm Exam", &[]), AssignmentKind::Exam);
        assert_eq!(c.classify("Group Project Proposal", &[]), AssignmentKind::Project);
        assert_eq!(c.classify("Week 4 Discussion", &[]), AssignmentKind::Discussion);
        assert_eq!(c.classify("Reflection Essay", &[]), AssignmentKind::Essay);
        assert_eq!(c.classify("Lab 2 writeup", &[]), AssignmentKind::LabReport);
        assert_eq!(c.classify("Problem Set 5", &[]), AssignmentKind::Homework);
    }

    #[test]
    fn word_boundaries_avoid_false_hits() {
        let c = classifier();
        assert_eq!(c.classify("Contest entry", &[]), AssignmentKind::Homework);
        assert_eq!(c.classify("Collaboration log", &[]), AssignmentKind::Homework);
    }

    #[test]
    fn submission_types_classify() {
        let c = classifier();
        assert_eq!(
            c.classify("Chapter 4", &["online_quiz".to_string()]),
            AssignmentKind::Quiz
        );
        assert_eq!(
            c.classify("Week 2", &["discussion_topic".to_string()]),
            AssignmentKind::Discussion
        );
    }

    #[test]
    fn estimate_scales_with_points() {
        let c = classifier();
        // 90 * clamp(100/50) = 180
        assert_eq!(c.estimate_minutes(AssignmentKind::Homework, "Problem Set", Some(100.0)), 180);
        // 90 * 0.5 = 45
        assert_eq!(c.estimate_minutes(AssignmentKind::Homework, "Problem Set", Some(5.0)), 45);
        // no points, base only
        assert_eq!(c.estimate_minutes(AssignmentKind::Homework, "Problem Set", None), 90);
    }

    #[test]
    fn estimate_applies_keywords_clamp_and_prep() {
        let c = classifier();
        // 30 * 0.7 = 21 -> held to 30
        assert_eq!(c.estimate_minutes(AssignmentKind::Quiz, "Quick quiz", None), 30);
        // 180 * 2 = 360 -> 300, plus 45 prep
        assert_eq!(c.estimate_minutes(AssignmentKind::Project, "Capstone project", Some(200.0)), 345);
        // 120 * 1.5 = 180, plus 30 prep
        assert_eq!(c.estimate_minutes(AssignmentKind::Essay, "Research essay", None), 210);
    }

    #[test]
    fn priority_ladder() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let due = |d: i64| Some(now + Duration::days(d) + Duration::hours(1));
        assert_eq!(infer_priority(None, None, now), Priority::Medium);
        assert_eq!(infer_priority(due(1), None, now), Priority::Urgent);
        assert_eq!(infer_priority(due(5), None, now), Priority::High);
        assert_eq!(infer_priority(due(30), Some(150.0), now), Priority::High);
        assert_eq!(infer_priority(due(10), Some(20.0), now), Priority::Medium);
        assert_eq!(infer_priority(due(30), Some(20.0), now), Priority::Low);
    }
}
