use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use studyblock_core::{DurationSource, Priority, Task};

use crate::estimate::{AssignmentClassifier, infer_priority};

/// Normalized assignment record (LMS-agnostic). This is the shape the JSON
/// loader and the Canvas client both produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    /// Accepts a JSON string or number.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub submission_types: Vec<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub allow_late: bool,
}

impl AssignmentRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            course_name: None,
            due_at: None,
            points_possible: None,
            submission_types: Vec::new(),
            priority: None,
            estimated_minutes: None,
            completed: false,
            allow_late: false,
        }
    }

    /// Build the core task. Completed records yield `None`; missing estimates
    /// and priorities are filled in by the heuristics.
    pub fn into_task(self, classifier: &AssignmentClassifier, now: DateTime<Utc>) -> Option<Task> {
        if self.completed {
            return None;
        }

        let (minutes, source) = match self.estimated_minutes {
            Some(m) => (m, DurationSource::Explicit),
            None => {
                let kind = classifier.classify(&self.name, &self.submission_types);
                (
                    classifier.estimate_minutes(kind, &self.name, self.points_possible),
                    DurationSource::Heuristic,
                )
            }
        };
        let priority = self
            .priority
            .unwrap_or_else(|| infer_priority(self.due_at, self.points_possible, now));

        let mut task = Task::new(self.id, self.name)
            .with_duration(minutes)
            .with_duration_source(source)
            .with_priority(priority);
        if let Some(course) = self.course_name {
            task = task.with_course(course);
        }
        if let Some(due) = self.due_at {
            task = task.with_due(due);
        }
        if self.allow_late {
            task = task.allowing_late();
        }
        Some(task)
    }
}

fn string_or_number<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }
    Ok(match Id::deserialize(de)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Read a JSON array of `AssignmentRecord`s.
pub fn load_assignments_json(path: impl AsRef<Path>) -> Result<Vec<AssignmentRecord>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let records: Vec<AssignmentRecord> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    tracing::debug!(path = %path.display(), count = records.len(), "loaded assignment records");
    Ok(records)
}

/// Convert records into tasks, dropping completed ones.
pub fn records_into_tasks(records: Vec<AssignmentRecord>, now: DateTime<Utc>) -> Result<Vec<Task>> {
    let classifier = AssignmentClassifier::new().context("building assignment classifier")?;
    Ok(records
        .into_iter()
        .filter_map(|r| r.into_task(&classifier, now))
        .collect())
}
