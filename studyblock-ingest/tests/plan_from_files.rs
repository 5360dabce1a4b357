use chrono::{NaiveDate, TimeZone, Utc};
use std::io::Write;
use studyblock_core::{DayRange, DurationSource, Planner, SchedulerConfig, UnscheduledReason};
use studyblock_ingest::{AvailabilitySource, CsvCommitments, load_assignments_json, records_into_tasks};

fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

#[test]
fn json_and_csv_feed_a_full_run() {
    let assignments = write_tmp(
        r#"[
            {"id": 1, "name": "Quiz 4", "course_name": "BIO 110",
             "due_at": "2026-03-03T22:00:00Z", "points_possible": 20},
            {"id": 2, "name": "Lab 3 report", "course_name": "CHEM 121",
             "due_at": "2026-03-06T22:00:00Z", "estimated_minutes": 100},
            {"id": 3, "name": "Old homework", "completed": true},
            {"id": 4, "name": "Capstone project", "estimated_minutes": 900}
        ]"#,
    );
    let commitments = write_tmp(
        "start,end,kind,title\n\
         2026-03-02 09:00,2026-03-02 12:00,class,Morning lectures\n\
         2026-03-02 13:00,2026-03-02 22:00,shift,Library desk\n",
    );

    let now = Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap();
    let cfg = SchedulerConfig {
        timezone: "America/New_York".to_string(),
        ..SchedulerConfig::default()
    };
    let tz = cfg.tz().unwrap();
    let planner = Planner::new(cfg).unwrap();
    let range = DayRange::new(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), 2);

    let records = load_assignments_json(assignments.path()).unwrap();
    let tasks = records_into_tasks(records, now).unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].duration_source, DurationSource::Heuristic);

    let fixed = CsvCommitments::new(commitments.path(), tz).fetch(range).unwrap();
    assert_eq!(fixed.len(), 2);

    let outcome = planner.plan(tasks, &fixed, range, now).unwrap();

    // Day one only has 12:00-13:00 local free; day two is open 09:00-22:00.
    assert_eq!(outcome.windows.len(), 2);
    assert_eq!(outcome.windows[0].duration_minutes(), 60);

    let quiz = outcome.result.placements_for("1");
    assert_eq!(quiz.len(), 1);
    assert_eq!(quiz[0].start, Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap());

    assert_eq!(outcome.result.placements_for("2").len(), 1);

    let capstone = &outcome.result.unscheduled[0];
    assert_eq!(capstone.task.id, "4");
    assert_eq!(capstone.reason, UnscheduledReason::Overflow);
}
