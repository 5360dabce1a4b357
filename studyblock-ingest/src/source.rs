//! Commitment sources: anything that can report fixed busy intervals for a
//! day range. Sources without a backing feed return an empty set.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use studyblock_core::{Commitment, CommitmentKind, DayRange};
use tracing::{debug, warn};

pub trait AvailabilitySource {
    fn name(&self) -> &str;

    /// Commitments that touch `range`.
    fn fetch(&self, range: DayRange) -> Result<Vec<Commitment>>;
}

/// No feed configured (e.g. a work-shift source that is not wired up yet).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCommitments;

impl AvailabilitySource for NoCommitments {
    fn name(&self) -> &str {
        "none"
    }

    fn fetch(&self, _range: DayRange) -> Result<Vec<Commitment>> {
        Ok(Vec::new())
    }
}

/// In-memory list; returned in full, the availability calculator clips it.
#[derive(Debug, Clone, Default)]
pub struct StaticCommitments {
    commitments: Vec<Commitment>,
}

impl StaticCommitments {
    pub fn new(commitments: Vec<Commitment>) -> Self {
        Self { commitments }
    }
}

impl AvailabilitySource for StaticCommitments {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self, _range: DayRange) -> Result<Vec<Commitment>> {
        Ok(self.commitments.clone())
    }
}

#[derive(Debug, Deserialize)]
struct CommitmentRow {
    start: String,
    end: String,
    kind: String,
    #[serde(default)]
    title: String,
}

/// CSV file with a `start,end,kind,title` header; times are local
/// "YYYY-MM-DD HH:MM" in the configured timezone.
#[derive(Debug, Clone)]
pub struct CsvCommitments {
    path: PathBuf,
    tz: Tz,
}

impl CsvCommitments {
    pub fn new(path: impl Into<PathBuf>, tz: Tz) -> Self {
        Self {
            path: path.into(),
            tz,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_local(&self, s: &str) -> Option<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M").ok()?;
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn touches(&self, c: &Commitment, range: DayRange) -> bool {
        let Some(last) = range.last_day() else {
            return false;
        };
        let first = c.start.with_timezone(&self.tz).date_naive();
        let final_day = c.end.with_timezone(&self.tz).date_naive();
        first <= last && final_day >= range.first_day
    }
}

impl AvailabilitySource for CsvCommitments {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, range: DayRange) -> Result<Vec<Commitment>> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;

        let mut out = Vec::new();
        for (line, row) in rdr.deserialize::<CommitmentRow>().enumerate() {
            let row = row.with_context(|| format!("{} row {}", self.path.display(), line + 1))?;

            let (Some(start), Some(end)) = (self.parse_local(&row.start), self.parse_local(&row.end)) else {
                warn!(row = line + 1, start = %row.start, end = %row.end, "skipping commitment with unreadable time");
                continue;
            };
            let kind: CommitmentKind = match row.kind.parse() {
                Ok(k) => k,
                Err(e) => {
                    warn!(row = line + 1, error = %e, "skipping commitment");
                    continue;
                }
            };

            let c = Commitment::new(start, end, kind, row.title);
            if self.touches(&c, range) {
                out.push(c);
            }
        }

        debug!(path = %self.path.display(), count = out.len(), "loaded commitments");
        Ok(out)
    }
}

/// Concatenation of several sources; the first failure aborts the fetch.
#[derive(Default)]
pub struct CombinedSource {
    sources: Vec<Box<dyn AvailabilitySource + Send + Sync>>,
}

impl CombinedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl AvailabilitySource + Send + Sync + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl AvailabilitySource for CombinedSource {
    fn name(&self) -> &str {
        "combined"
    }

    fn fetch(&self, range: DayRange) -> Result<Vec<Commitment>> {
        let mut all = Vec::new();
        for s in &self.sources {
            let mut got = s
                .fetch(range)
                .with_context(|| format!("fetching commitments from {}", s.name()))?;
            all.append(&mut got);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    fn range() -> DayRange {
        DayRange::new(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), 2)
    }

    fn ny() -> Tz {
        "America/New_York".parse().unwrap()
    }

    #[test]
    fn no_commitments_is_empty() {
        assert!(NoCommitments.fetch(range()).unwrap().is_empty());
    }

    #[test]
    fn csv_rows_in_range_are_loaded() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "start,end,kind,title").unwrap();
        writeln!(f, "2026-03-02 10:00,2026-03-02 11:15,lecture,CS 101").unwrap();
        writeln!(f, "2026-03-03 17:00,2026-03-03 21:00,shift,Library desk").unwrap();
        writeln!(f, "2026-03-09 10:00,2026-03-09 11:15,class,Out of range").unwrap();
        writeln!(f, "2026-03-02 12:00,2026-03-02 13:00,gym,Unknown kind").unwrap();
        writeln!(f, "tomorrow,later,class,Bad time").unwrap();

        let src = CsvCommitments::new(f.path(), ny());
        let got = src.fetch(range()).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].kind, CommitmentKind::Class);
        assert_eq!(got[0].start.to_rfc3339(), "2026-03-02T15:00:00+00:00");
        assert_eq!(got[1].kind, CommitmentKind::Work);
        assert_eq!(got[1].title, "Library desk");
    }

    #[test]
    fn missing_csv_is_an_error() {
        let src = CsvCommitments::new("/definitely/not/here.csv", ny());
        assert!(src.fetch(range()).is_err());
    }

    #[test]
    fn combined_concatenates() {
        let t = Utc::now();
        let one = Commitment::new(t, t + chrono::Duration::hours(1), CommitmentKind::Event, "a");
        let combined = CombinedSource::new()
            .with(NoCommitments)
            .with(StaticCommitments::new(vec![one.clone(), one]));
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.fetch(range()).unwrap().len(), 2);
    }
}
