//! Canvas LMS client: active courses, then each course's assignments.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::types::AssignmentRecord;

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasCourse {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub course_code: Option<String>,
}

impl CanvasCourse {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.course_code.clone())
            .unwrap_or_else(|| format!("course {}", self.id))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CanvasSubmission {
    #[serde(default)]
    workflow_state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CanvasAssignment {
    id: i64,
    name: String,
    #[serde(default)]
    due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    points_possible: Option<f64>,
    #[serde(default)]
    submission_types: Vec<String>,
    #[serde(default)]
    submission: Option<CanvasSubmission>,
}

impl CanvasAssignment {
    fn into_record(self, course: &CanvasCourse) -> AssignmentRecord {
        let completed = self
            .submission
            .and_then(|s| s.workflow_state)
            .is_some_and(|s| s == "submitted" || s == "graded");
        AssignmentRecord {
            id: format!("canvas-{}", self.id),
            name: self.name,
            course_name: Some(course.display_name()),
            due_at: self.due_at,
            points_possible: self.points_possible,
            submission_types: self.submission_types,
            priority: None,
            estimated_minutes: None,
            completed,
            allow_late: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasUser {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CanvasClient {
    base_url: String,
    http: reqwest::Client,
}

impl CanvasClient {
    /// `base_url` is the institution root, e.g. `https://school.instructure.com`.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            bail!("canvas token is empty; set [canvas] token in config.toml");
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .context("canvas token is not a valid header value")?,
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("building http client")?;
        Ok(Self {
            base_url: format!("{}/api/v1", base_url.trim_end_matches('/')),
            http,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("canvas request {path}"))?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("canvas error on {path}: {status} {txt}");
        }
        resp.json().await.with_context(|| format!("parse canvas response {path}"))
    }

    pub async fn current_user(&self) -> Result<CanvasUser> {
        self.get_json("/users/self", &[]).await
    }

    /// `Ok(true)` when the token is accepted.
    pub async fn check_connection(&self) -> Result<bool> {
        match self.current_user().await {
            Ok(user) => {
                info!(user = user.id, "canvas connection ok");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "canvas connection failed");
                Ok(false)
            }
        }
    }

    pub async fn active_courses(&self) -> Result<Vec<CanvasCourse>> {
        self.get_json("/courses", &[("enrollment_state", "active"), ("per_page", "100")])
            .await
    }

    pub async fn course_assignments(&self, course: &CanvasCourse) -> Result<Vec<AssignmentRecord>> {
        let path = format!("/courses/{}/assignments", course.id);
        let raw: Vec<CanvasAssignment> = self
            .get_json(&path, &[("per_page", "100"), ("include[]", "submission")])
            .await?;
        Ok(raw.into_iter().map(|a| a.into_record(course)).collect())
    }

    /// Open assignments across active courses, due within `upcoming_days`.
    /// A course that fails to load is logged and skipped.
    pub async fn upcoming_assignments(&self, upcoming_days: i64, now: DateTime<Utc>) -> Result<Vec<AssignmentRecord>> {
        let courses = self.active_courses().await?;
        let cutoff = now + Duration::days(upcoming_days);

        let mut out = Vec::new();
        for course in &courses {
            match self.course_assignments(course).await {
                Ok(records) => out.extend(records),
                Err(e) => warn!(course = course.id, error = %format!("{e:#}"), "skipping course"),
            }
        }

        let mut upcoming = filter_upcoming(out, now, cutoff);
        upcoming.sort_by_key(|r| r.due_at);
        debug!(courses = courses.len(), assignments = upcoming.len(), "canvas fetch done");
        Ok(upcoming)
    }
}

/// Keep open, dated records with `now <= due <= cutoff`.
pub fn filter_upcoming(records: Vec<AssignmentRecord>, now: DateTime<Utc>, cutoff: DateTime<Utc>) -> Vec<AssignmentRecord> {
    records
        .into_iter()
        .filter(|r| !r.completed)
        .filter(|r| r.due_at.is_some_and(|d| d >= now && d <= cutoff))
        .collect()
}
