use chrono::{DateTime, Duration, TimeZone, Utc};
use recall_core::{
    JsonFileStore, MemorySink, ModelConfig, NewTask, PriorityModel, ReminderKind, RetrainOutcome,
    ScheduleConfig, SchedulerConfig, SchedulerError, Session, Task, TaskStore, build_plan,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap()
}

fn config() -> SchedulerConfig {
    SchedulerConfig {
        model: ModelConfig {
            bootstrap_examples: 80,
            bootstrap_epochs: 8,
            grid_search: false,
            ..ModelConfig::default()
        },
        schedule: ScheduleConfig {
            timezone: "America/Chicago".to_string(),
            reminder_lead_minutes: 10,
        },
    }
}

fn new_task(subject: &str, hours: i64, review: bool) -> NewTask {
    NewTask {
        subject: subject.to_string(),
        duration_minutes: 40.0,
        deadline: now() + Duration::hours(hours),
        difficulty: 4,
        is_review_task: review,
    }
}

#[tokio::test]
async fn study_week_round_trips_through_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");

    let (math_id, vocab_id) = {
        let mut s = Session::open(JsonFileStore::new(&path), MemorySink::new(), config()).unwrap();
        let math = s.add_task(new_task("Math", 6, false), now()).unwrap();
        let vocab = s
            .add_task(new_task("Vocab", 72, true), now() + Duration::milliseconds(5))
            .unwrap();

        let (_, outcome) = s.complete_task(&math.id, 60.0, now()).await.unwrap();
        assert!(matches!(outcome, RetrainOutcome::Refit { .. }));

        s.review_task(&vocab.id, 4, None, now()).await.unwrap();
        let second = s
            .review_task(&vocab.id, 4, None, now() + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(second.task.review_state.interval_days, 6);

        let reminders = s.notifier().for_task(&math.id);
        assert_eq!(reminders[0].send_at_utc, now() + Duration::hours(6) - Duration::minutes(10));
        assert!(s
            .notifier()
            .for_task(&vocab.id)
            .iter()
            .any(|r| r.kind == ReminderKind::Review));

        (math.id, vocab.id)
    };

    let s = Session::open(JsonFileStore::new(&path), MemorySink::new(), config()).unwrap();
    assert_eq!(s.tasks().len(), 2);
    let math = s.task(&math_id).unwrap();
    assert_eq!(math.history.len(), 1);
    // 15:00 UTC is 09:00 in Chicago (CST).
    assert_eq!(math.preferred_hour, Some(9));

    let vocab = s.task(&vocab_id).unwrap();
    assert_eq!(vocab.review_state.repetition_count, 2);
    assert_eq!(
        vocab.review_state.next_review_at,
        Some(now() + Duration::days(7))
    );

    assert!(matches!(s.warm_model(now()).await, RetrainOutcome::Refit { .. }));
    let later = now() + Duration::days(7);
    let plan = s.plan(later).await;
    assert_eq!(plan[0].task.id, vocab_id);
    assert_eq!(plan[0].score, 1.1);
}

#[tokio::test]
async fn failed_recall_resets_the_schedule() {
    let mut s = Session::open(
        recall_core::MemoryStore::new(),
        MemorySink::new(),
        config(),
    )
    .unwrap();
    let t = s.add_task(new_task("Vocab", 48, true), now()).unwrap();
    s.review_task(&t.id, 5, None, now()).await.unwrap();
    s.review_task(&t.id, 5, None, now() + Duration::days(1)).await.unwrap();
    let ef_before = s.task(&t.id).unwrap().review_state.easiness_factor;

    let out = s
        .review_task(&t.id, 1, None, now() + Duration::days(7))
        .await
        .unwrap();
    let rs = out.task.review_state;
    assert_eq!(rs.repetition_count, 0);
    assert_eq!(rs.interval_days, 1);
    assert_eq!(rs.easiness_factor, ef_before);
    assert_eq!(rs.next_review_at, Some(now() + Duration::days(8)));
}

#[tokio::test]
async fn unknown_ids_are_reported() {
    let mut s = Session::open(
        recall_core::MemoryStore::new(),
        MemorySink::new(),
        config(),
    )
    .unwrap();
    let err = s.complete_task("task-0", 10.0, now()).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<SchedulerError>(),
        Some(&SchedulerError::TaskNotFound("task-0".to_string()))
    );
    assert!(s.move_deadline("task-0", now(), now()).is_err());
}

#[test]
fn corrupt_records_are_repaired_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    std::fs::write(
        &path,
        r#"[{"id":"t1","subject":"Bio","duration_estimate_minutes":-1.0,
            "deadline":"2026-03-03T09:00:00Z","difficulty":11}]"#,
    )
    .unwrap();

    let s = Session::open(JsonFileStore::new(&path), MemorySink::new(), config()).unwrap();
    let t = s.task("t1").unwrap();
    assert_eq!(t.difficulty, 3);
    assert_eq!(t.duration_estimate_minutes, 30.0);
    assert_eq!(t.review_state.easiness_factor, 2.5);

    let on_disk = JsonFileStore::new(&path).get_all().unwrap();
    assert_eq!(on_disk[0].difficulty, 3);
}

#[test]
fn scores_stay_in_unit_range_after_refit() {
    let mut model = PriorityModel::new(config().model);
    model.initialize();

    let mut slow = Task::new("a", "Math", now() + Duration::hours(3)).with_duration(20.0);
    slow.record_completion(200.0, now(), 9).unwrap();
    let examples: Vec<_> = recall_core::features::training_example(&slow, now())
        .into_iter()
        .collect();
    model.refit(&examples).unwrap();

    let tasks = vec![
        slow,
        Task::new("b", "Bio", now() - Duration::days(3)),
        Task::new("c", "Art", now() + Duration::days(60)).with_duration(600.0),
    ];
    for p in build_plan(&tasks, &model, now()) {
        assert!((0.0..=1.0).contains(&p.score), "score {} out of range", p.score);
    }
}
