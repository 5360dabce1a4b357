use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use std::io::Write;

use studyblock_core::{PlacementKind, ScheduleResult};

use crate::config::CalendarSection;

/// Google Calendar color ids.
pub const STUDY_COLOR: &str = "9";
pub const LATE_COLOR: &str = "11";
pub const BREAK_COLOR: &str = "2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderMethod {
    Popup,
    Email,
}

impl ReminderMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderMethod::Popup => "popup",
            ReminderMethod::Email => "email",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    pub color_id: &'static str,
    pub reminders: Vec<Reminder>,
}

/// Study blocks and breaks as calendar events, in chronological order.
pub fn schedule_to_events(result: &ScheduleResult, cal: &CalendarSection) -> Vec<CalendarEvent> {
    let reminders = vec![
        Reminder {
            method: ReminderMethod::Popup,
            minutes: cal.popup_reminder_minutes,
        },
        Reminder {
            method: ReminderMethod::Email,
            minutes: cal.email_reminder_minutes,
        },
    ];

    let mut events: Vec<CalendarEvent> = result
        .placements
        .iter()
        .map(|p| {
            let mut summary = format!("{}Study: {}", cal.event_prefix, p.task.title);
            if let Some(part) = p.part {
                summary.push_str(&format!(" (Part {}/{})", part.index, part.total));
            }
            let late = p.kind == PlacementKind::Late;
            if late {
                summary.push_str(" [LATE]");
            }

            let mut description = String::new();
            if let Some(course) = &p.task.course {
                description.push_str(&format!("Course: {course}\n"));
            }
            description.push_str(&format!(
                "Task: {}\nPriority: {}\nUrgency: {:.2}\nEstimated: {} min\n",
                p.task.id,
                p.task.priority.as_str(),
                p.task.urgency_score,
                p.task.estimated_duration
            ));
            if let Some(due) = p.task.due {
                description.push_str(&format!("Due: {}\n", due.to_rfc3339()));
            }

            CalendarEvent {
                start_utc: p.start,
                end_utc: p.end,
                summary,
                description,
                color_id: if late { LATE_COLOR } else { STUDY_COLOR },
                reminders: reminders.clone(),
            }
        })
        .collect();

    events.extend(result.breaks.iter().map(|b| CalendarEvent {
        start_utc: b.start,
        end_utc: b.end,
        summary: format!("{}Break", cal.event_prefix),
        description: format!("{} min rest between study blocks\n", b.duration_minutes()),
        color_id: BREAK_COLOR,
        reminders: Vec::new(),
    }));

    events.sort_by_key(|e| e.start_utc);
    events
}

/// Emit a minimal ICS calendar containing VEVENT blocks (UTC times).
pub fn events_to_ics(events: &[CalendarEvent]) -> String {
    let mut s = String::new();
    s.push_str("BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:-//studyblock//EN\n");

    for e in events {
        let dtstart = e.start_utc.format("%Y%m%dT%H%M%SZ");
        let dtend = e.end_utc.format("%Y%m%dT%H%M%SZ");

        s.push_str("BEGIN:VEVENT\n");
        s.push_str(&format!("UID:studyblock-{dtstart}-{}@studyblock\n", uid_slug(&e.summary)));
        s.push_str(&format!("DTSTART:{dtstart}\n"));
        s.push_str(&format!("DTEND:{dtend}\n"));
        s.push_str(&format!("SUMMARY:{}\n", escape_ics(&e.summary)));
        s.push_str(&format!("DESCRIPTION:{}\n", escape_ics(&e.description)));
        for r in &e.reminders {
            if r.method == ReminderMethod::Popup {
                s.push_str("BEGIN:VALARM\nACTION:DISPLAY\n");
                s.push_str(&format!("DESCRIPTION:{}\n", escape_ics(&e.summary)));
                s.push_str(&format!("TRIGGER:-PT{}M\n", r.minutes));
                s.push_str("END:VALARM\n");
            }
        }
        s.push_str("END:VEVENT\n");
    }

    s.push_str("END:VCALENDAR\n");
    s
}

fn uid_slug(summary: &str) -> String {
    summary
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(24)
        .collect::<String>()
        .to_ascii_lowercase()
}

fn escape_ics(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Push ICS to Google Calendar using gcalcli import.
///
/// This requires `gcalcli` installed and authenticated on the machine.
pub fn push_ics_via_gcalcli(ics: &str, calendar: Option<&str>) -> Result<()> {
    if which::which("gcalcli").is_err() {
        bail!(
            "gcalcli is not installed. Install it, authenticate, then retry.\n\nmacOS (brew):  brew install gcalcli\nUbuntu (pipx): pipx install gcalcli\n\nOr use: studyblock plan --ics schedule.ics"
        );
    }

    let mut cmd = std::process::Command::new("gcalcli");
    cmd.arg("import");
    if let Some(cal) = calendar {
        cmd.args(["--calendar", cal]);
    }

    let mut child = cmd
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::inherit())
        .stderr(std::process::Stdio::inherit())
        .spawn()
        .context("spawning gcalcli import")?;

    {
        let stdin = child.stdin.as_mut().context("no stdin")?;
        stdin
            .write_all(ics.as_bytes())
            .context("writing ICS to gcalcli")?;
    }

    let status = child.wait().context("waiting on gcalcli")?;
    if !status.success() {
        bail!("gcalcli import failed: {status}");
    }

    Ok(())
}
