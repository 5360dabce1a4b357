use std::fmt::Write;

use chrono_tz::Tz;
use studyblock_core::{PlacementKind, PlanOutcome, TimeWindow};
use studyblock_core::time::local_hm;

fn hours(minutes: i64) -> f64 {
    minutes as f64 / 60.0
}

/// Chronological list of study blocks and breaks grouped by local day.
pub fn render_schedule(outcome: &PlanOutcome, tz: Tz) -> String {
    let r = &outcome.result;
    let mut s = String::new();

    let mut current_day = None;
    let mut blocks: Vec<(chrono::DateTime<chrono::Utc>, String)> = r
        .placements
        .iter()
        .map(|p| {
            let mut line = format!(
                "  {}-{}  {}",
                local_hm(p.start, tz),
                local_hm(p.end, tz),
                p.task.title
            );
            if let Some(course) = &p.task.course {
                let _ = write!(line, " [{course}]");
            }
            if let Some(part) = p.part {
                let _ = write!(line, " (part {}/{})", part.index, part.total);
            }
            if p.kind == PlacementKind::Late {
                line.push_str(" LATE");
            }
            (p.start, line)
        })
        .chain(r.breaks.iter().map(|b| {
            (
                b.start,
                format!("  {}-{}  break", local_hm(b.start, tz), local_hm(b.end, tz)),
            )
        }))
        .collect();
    blocks.sort_by_key(|(start, _)| *start);

    for (start, line) in blocks {
        let day = start.with_timezone(&tz).date_naive();
        if current_day != Some(day) {
            let _ = writeln!(s, "{}", day.format("%A %Y-%m-%d"));
            current_day = Some(day);
        }
        let _ = writeln!(s, "{line}");
    }
    if r.placements.is_empty() {
        s.push_str("(nothing scheduled)\n");
    }
    if !outcome.rejected.is_empty() {
        let _ = writeln!(s, "\nRejected ({}):", outcome.rejected.len());
        for e in &outcome.rejected {
            let _ = writeln!(s, "  - {e}");
        }
    }
    s
}

/// Per-day table plus run totals and the unscheduled list.
pub fn render_summary(outcome: &PlanOutcome, tz: Tz) -> String {
    let r = &outcome.result;
    let summary = r.summary(outcome.run_days());
    let mut s = String::new();

    let _ = writeln!(s, "{:<12} {:>8} {:>8} {:>9}", "date", "study h", "break h", "sessions");
    for d in r.day_summaries(tz) {
        let _ = writeln!(
            s,
            "{:<12} {:>8.1} {:>8.1} {:>9}",
            d.date.format("%Y-%m-%d"),
            hours(d.study_minutes),
            hours(d.break_minutes),
            d.sessions
        );
    }

    let _ = writeln!(s);
    let _ = writeln!(s, "Tasks placed:        {}", summary.placed_tasks);
    if summary.late_placements > 0 {
        let _ = writeln!(s, "Late blocks:         {}", summary.late_placements);
    }
    let _ = writeln!(s, "Total study time:    {:.1} h", hours(summary.total_study_minutes));
    let _ = writeln!(s, "Total break time:    {:.1} h", hours(summary.total_break_minutes));
    let _ = writeln!(
        s,
        "Average per day:     {:.1} h over {} days",
        summary.average_study_minutes_per_day / 60.0,
        summary.days
    );
    let _ = writeln!(s, "Efficiency:          {:.1}%", summary.efficiency * 100.0);

    if !r.unscheduled.is_empty() {
        let _ = writeln!(s, "\nUnscheduled ({}):", r.unscheduled.len());
        for u in &r.unscheduled {
            let _ = writeln!(
                s,
                "  - {} ({} min): {}",
                u.task.title, u.task.estimated_duration, u.reason
            );
        }
    }
    s
}

pub fn render_windows(windows: &[TimeWindow], tz: Tz) -> String {
    let mut s = String::new();
    let mut total = 0;
    for w in windows {
        total += w.duration_minutes();
        let _ = writeln!(
            s,
            "{} {}-{}  {:>4} min  {}",
            w.start.with_timezone(&tz).format("%a %m-%d"),
            local_hm(w.start, tz),
            local_hm(w.end, tz),
            w.duration_minutes(),
            w.label.as_deref().unwrap_or("")
        );
    }
    let _ = writeln!(s, "{} windows, {:.1} h free", windows.len(), hours(total));
    s
}
