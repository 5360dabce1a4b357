use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use studyblock_core::{
    DistributionPolicy, PlacementKind, Priority, ScheduleResult, Task, TaskDistributor,
    TimeWindow, UnscheduledReason, UrgencyScorer,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap()
}

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn priority_from(n: u8) -> Priority {
    match n % 4 {
        0 => Priority::Low,
        1 => Priority::Medium,
        2 => Priority::High,
        _ => Priority::Urgent,
    }
}

/// Windows from (gap before, length) pairs, laid out back to back from `base()`.
fn layout(spans: &[(i64, i64)]) -> Vec<TimeWindow> {
    let mut cursor = base();
    spans
        .iter()
        .map(|&(gap, len)| {
            let start = cursor + Duration::minutes(gap);
            let end = start + Duration::minutes(len);
            cursor = end;
            TimeWindow::new(start, end)
        })
        .collect()
}

fn build_tasks(specs: &[(i64, u8, Option<i64>)]) -> Vec<Task> {
    let mut tasks: Vec<Task> = specs
        .iter()
        .enumerate()
        .map(|(i, &(minutes, p, due_hours))| {
            let t = Task::new(format!("t{i:02}"), format!("task {i}"))
                .with_duration(minutes)
                .with_priority(priority_from(p));
            match due_hours {
                Some(h) => t.with_due(now() + Duration::hours(h)),
                None => t,
            }
        })
        .collect();
    UrgencyScorer::default().rank(&mut tasks, now());
    tasks
}

fn policy_strategy() -> impl Strategy<Value = DistributionPolicy> {
    (0i64..=45, 30i64..=180, 0i64..=30, any::<bool>(), 15i64..=45).prop_map(
        |(buffer, max_run, brk, split, min_split)| DistributionPolicy {
            session_buffer_minutes: buffer,
            max_continuous_work_minutes: max_run,
            break_duration_minutes: brk,
            allow_session_splitting: split,
            min_session_split_minutes: min_split,
        },
    )
}

fn run(policy: DistributionPolicy, tasks: Vec<Task>, windows: &[TimeWindow]) -> ScheduleResult {
    TaskDistributor::new(policy)
        .distribute(tasks, windows, now())
        .expect("well-formed input must distribute")
}

proptest! {
    #[test]
    fn blocks_never_overlap_and_stay_inside_windows(
        spans in prop::collection::vec((0i64..=120, 15i64..=240), 0..8),
        specs in prop::collection::vec((1i64..=300, 0u8..4, prop::option::of(1i64..=400)), 0..12),
        policy in policy_strategy(),
    ) {
        let windows = layout(&spans);
        let result = run(policy, build_tasks(&specs), &windows);

        for (i, w) in windows.iter().enumerate() {
            let mut blocks: Vec<_> = result
                .placements
                .iter()
                .filter(|p| p.window_index == i)
                .map(|p| (p.start, p.end))
                .chain(result.breaks.iter().filter(|b| b.window_index == i).map(|b| (b.start, b.end)))
                .collect();
            blocks.sort();
            for (s, e) in &blocks {
                prop_assert!(w.contains(*s, *e));
            }
            for pair in blocks.windows(2) {
                prop_assert!(pair[0].1 <= pair[1].0);
            }
        }
    }

    #[test]
    fn placed_minutes_never_exceed_capacity(
        spans in prop::collection::vec((0i64..=120, 15i64..=240), 0..8),
        specs in prop::collection::vec((1i64..=300, 0u8..4, prop::option::of(1i64..=400)), 0..12),
        policy in policy_strategy(),
    ) {
        let windows = layout(&spans);
        let result = run(policy, build_tasks(&specs), &windows);
        let capacity: i64 = windows.iter().map(TimeWindow::duration_minutes).sum();
        prop_assert!(result.placed_minutes <= capacity);
        prop_assert!((0.0..=1.0).contains(&result.efficiency));
    }

    #[test]
    fn every_task_is_placed_or_reported(
        spans in prop::collection::vec((0i64..=120, 15i64..=240), 0..8),
        specs in prop::collection::vec((1i64..=300, 0u8..4, prop::option::of(1i64..=400)), 0..12),
        policy in policy_strategy(),
    ) {
        let windows = layout(&spans);
        let tasks = build_tasks(&specs);
        let result = run(policy, tasks.clone(), &windows);

        for t in &tasks {
            let placed: i64 = result.placements_for(&t.id).iter().map(|p| p.duration_minutes()).sum();
            let unscheduled = result.unscheduled.iter().filter(|u| u.task.id == t.id).count();
            if placed > 0 {
                prop_assert_eq!(placed, t.estimated_duration);
                prop_assert_eq!(unscheduled, 0);
            } else {
                prop_assert_eq!(unscheduled, 1);
            }
        }
    }

    #[test]
    fn on_time_placements_finish_by_due(
        spans in prop::collection::vec((0i64..=120, 15i64..=240), 0..8),
        specs in prop::collection::vec((1i64..=300, 0u8..4, prop::option::of(1i64..=400)), 0..12),
        policy in policy_strategy(),
    ) {
        let windows = layout(&spans);
        let result = run(policy, build_tasks(&specs), &windows);
        for p in result.placements.iter().filter(|p| p.kind == PlacementKind::OnTime) {
            if let Some(due) = p.task.due {
                prop_assert!(p.end <= due);
            }
        }
    }

    #[test]
    fn identical_inputs_give_identical_bytes(
        spans in prop::collection::vec((0i64..=120, 15i64..=240), 0..8),
        specs in prop::collection::vec((1i64..=300, 0u8..4, prop::option::of(1i64..=400)), 0..12),
        policy in policy_strategy(),
    ) {
        let windows = layout(&spans);
        let tasks = build_tasks(&specs);
        let first = serde_json::to_vec(&run(policy, tasks.clone(), &windows)).unwrap();
        let second = serde_json::to_vec(&run(policy, tasks, &windows)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn raising_priority_never_lowers_score(
        minutes in 1i64..=300,
        due_hours in prop::option::of(-48i64..=800),
        p in 0u8..3,
    ) {
        let scorer = UrgencyScorer::default();
        let mut t = Task::new("t", "x").with_duration(minutes).with_priority(priority_from(p));
        t.due = due_hours.map(|h| now() + Duration::hours(h));
        let lower = scorer.score(&t, now());
        let higher = scorer.score(&t.clone().with_priority(priority_from(p + 1)), now());
        prop_assert!(higher >= lower);
    }

    /// With one roomy window per task and every due date after the last
    /// window, nothing is skipped, undated work included.
    #[test]
    fn undated_tasks_are_not_starved_given_room(
        dated in prop::collection::vec((1i64..=120, 0u8..4), 0..6),
        undated in prop::collection::vec((1i64..=120, 0u8..4), 1..4),
        policy in policy_strategy(),
    ) {
        let count = dated.len() + undated.len();
        let roomy = 120 + policy.session_buffer_minutes + policy.break_duration_minutes;
        let windows = layout(&vec![(30, roomy); count]);
        let last_end = windows.last().map(|w| w.end).unwrap_or_else(base);
        let hours_after = (last_end - now()).num_hours() + 1;

        let specs: Vec<_> = dated
            .iter()
            .map(|&(m, p)| (m, p, Some(hours_after)))
            .chain(undated.iter().map(|&(m, p)| (m, p, None)))
            .collect();
        let result = run(policy, build_tasks(&specs), &windows);
        prop_assert!(result.unscheduled.is_empty(), "{:?}", result.unscheduled);
    }
}

#[test]
fn scenario_single_task_single_window() {
    let windows = layout(&[(0, 180)]);
    let tasks = build_tasks(&[(60, 2, Some(24))]);
    let policy = DistributionPolicy {
        session_buffer_minutes: 0,
        ..DistributionPolicy::default()
    };
    let result = run(policy, tasks, &windows);
    assert_eq!(result.placements.len(), 1);
    assert_eq!(result.placements[0].start, base());
    assert_eq!(result.placements[0].end, base() + Duration::minutes(60));
    assert!((result.efficiency - 0.333).abs() < 1e-3);
}

#[test]
fn scenario_no_windows() {
    let tasks = build_tasks(&[(30, 0, None), (45, 1, Some(10)), (60, 3, Some(30))]);
    let result = run(DistributionPolicy::default(), tasks, &[]);
    assert_eq!(result.unscheduled.len(), 3);
    assert!(result
        .unscheduled
        .iter()
        .all(|u| u.reason == UnscheduledReason::NoAvailability));
    assert_eq!(result.efficiency, 0.0);
}

#[test]
fn scenario_second_task_does_not_fit() {
    let windows = layout(&[(0, 120)]);
    let tasks = build_tasks(&[(90, 3, Some(20)), (90, 0, Some(20))]);
    let first_id = tasks[0].id.clone();
    let policy = DistributionPolicy {
        session_buffer_minutes: 0,
        allow_session_splitting: false,
        ..DistributionPolicy::default()
    };
    let result = run(policy, tasks, &windows);
    assert_eq!(result.placements.len(), 1);
    assert_eq!(result.placements[0].task.id, first_id);
    assert_eq!(result.placements[0].start, base());
    assert_eq!(result.placements[0].duration_minutes(), 90);
    assert_eq!(result.unscheduled.len(), 1);
    assert_eq!(result.unscheduled[0].reason, UnscheduledReason::NoCapacity);
}

#[test]
fn scenario_break_before_threshold() {
    let windows = layout(&[(0, 180)]);
    let tasks = build_tasks(&[(40, 1, Some(30)), (40, 1, Some(31))]);
    let policy = DistributionPolicy {
        session_buffer_minutes: 0,
        max_continuous_work_minutes: 50,
        break_duration_minutes: 15,
        ..DistributionPolicy::default()
    };
    let result = run(policy, tasks, &windows);
    assert_eq!(result.placements.len(), 2);
    assert_eq!(result.breaks.len(), 1);
    let brk = &result.breaks[0];
    assert_eq!(brk.start, result.placements[0].end);
    assert_eq!(brk.duration_minutes(), 15);
    assert_eq!(result.placements[1].start, brk.end);
}

#[test]
fn undated_task_lands_once_windows_grow() {
    // Each run has one more window; dated work fills the first ones.
    let dated = [(60, 3, Some(200)), (60, 3, Some(200))];
    let policy = DistributionPolicy {
        session_buffer_minutes: 0,
        ..DistributionPolicy::default()
    };
    let mut placed_on = None;
    for n in 1..=4 {
        let windows = layout(&vec![(60, 60); n]);
        let mut specs = dated.to_vec();
        specs.push((60, 0, None));
        let result = run(policy, build_tasks(&specs), &windows);
        if result.unscheduled.iter().all(|u| u.task.due.is_some()) {
            placed_on = Some(n);
            break;
        }
    }
    assert_eq!(placed_on, Some(3));
}
