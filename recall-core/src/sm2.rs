//! SM-2 spaced repetition.
//!
//! Quality ratings (0-5):
//! - 0: complete blackout
//! - 1-2: incorrect recall
//! - 3: correct with serious difficulty
//! - 4: correct after hesitation
//! - 5: perfect recall
//!
//! A failed recall resets the repetition count and interval but leaves the
//! easiness factor alone.

use chrono::{DateTime, Duration, Utc};

use crate::error::{SchedulerError, SchedulerResult};
use crate::task::{MAX_INTERVAL_DAYS, MIN_EASINESS_FACTOR, ReviewState};

/// Apply one review. `now` is injected so the transition stays deterministic.
pub fn apply_review(
    state: &ReviewState,
    quality: i32,
    now: DateTime<Utc>,
) -> SchedulerResult<ReviewState> {
    if !(0..=5).contains(&quality) {
        return Err(SchedulerError::invalid(format!(
            "recall quality must be 0..=5, got {quality}"
        )));
    }

    let mut repetition_count = state.repetition_count;
    let mut easiness_factor = state.easiness_factor;
    let interval_days;

    if quality < 3 {
        repetition_count = 0;
        interval_days = 1;
    } else {
        repetition_count = repetition_count.saturating_add(1);
        interval_days = match repetition_count {
            1 => 1,
            2 => 6,
            _ => {
                let next = (state.interval_days as f64 * state.easiness_factor).round();
                if next.is_finite() {
                    next.clamp(1.0, MAX_INTERVAL_DAYS as f64) as i32
                } else {
                    MAX_INTERVAL_DAYS
                }
            }
        };

        // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
        let q = (5 - quality) as f64;
        easiness_factor = (easiness_factor + (0.1 - q * (0.08 + q * 0.02))).max(MIN_EASINESS_FACTOR);
    }

    Ok(ReviewState {
        repetition_count,
        easiness_factor,
        interval_days,
        next_review_at: Some(
            now.checked_add_signed(Duration::days(interval_days as i64))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        ),
        is_review_task: true,
    })
}

/// A review task is due once its next review time has arrived.
pub fn is_due(state: &ReviewState, now: DateTime<Utc>) -> bool {
    state.is_review_task && state.next_review_at.is_some_and(|at| at <= now)
}

/// Interval in days each quality 0..=5 would produce from `state`.
pub fn preview_intervals(state: &ReviewState, now: DateTime<Utc>) -> [i32; 6] {
    let mut out = [0; 6];
    for (q, slot) in out.iter_mut().enumerate() {
        if let Ok(next) = apply_review(state, q as i32, now) {
            *slot = next.interval_days;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn state(rep: i32, ef: f64, interval: i32) -> ReviewState {
        ReviewState {
            repetition_count: rep,
            easiness_factor: ef,
            interval_days: interval,
            next_review_at: None,
            is_review_task: false,
        }
    }

    #[test]
    fn second_success_gives_six_days() {
        let next = apply_review(&state(1, 2.5, 1), 4, now()).unwrap();
        assert_eq!(next.repetition_count, 2);
        assert_eq!(next.interval_days, 6);
        assert!((next.easiness_factor - 2.5).abs() < 1e-9);
        assert_eq!(next.next_review_at, Some(now() + Duration::days(6)));
        assert!(next.is_review_task);
    }

    #[test]
    fn quality_four_keeps_ef_and_quality_five_raises_it() {
        // q=4: 0.1 - 1 * (0.08 + 0.02) = 0.0
        let four = apply_review(&state(0, 2.5, 0), 4, now()).unwrap();
        assert!((four.easiness_factor - 2.5).abs() < 1e-9);

        let five = apply_review(&state(0, 2.5, 0), 5, now()).unwrap();
        assert!((five.easiness_factor - 2.6).abs() < 1e-9);
        assert_eq!(five.interval_days, 1);
    }

    #[test]
    fn failure_resets_and_keeps_ef() {
        let next = apply_review(&state(2, 2.0, 6), 2, now()).unwrap();
        assert_eq!(next.repetition_count, 0);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.easiness_factor, 2.0);
        assert_eq!(next.next_review_at, Some(now() + Duration::days(1)));
    }

    #[test]
    fn every_failing_quality_resets() {
        for q in 0..3 {
            let next = apply_review(&state(5, 1.7, 40), q, now()).unwrap();
            assert_eq!((next.repetition_count, next.interval_days), (0, 1));
            assert_eq!(next.easiness_factor, 1.7);
        }
    }

    #[test]
    fn ef_never_drops_below_floor() {
        let mut s = state(0, 1.35, 0);
        for _ in 0..10 {
            s = apply_review(&s, 3, now()).unwrap();
            assert!(s.easiness_factor >= MIN_EASINESS_FACTOR);
        }
        assert_eq!(s.easiness_factor, MIN_EASINESS_FACTOR);
    }

    #[test]
    fn intervals_grow_after_second_repetition() {
        for q in 3..=5 {
            let mut s = state(0, 1.3, 0);
            let mut last = 0;
            for rep in 1..=8 {
                s = apply_review(&s, q, now()).unwrap();
                if rep >= 2 {
                    assert!(s.interval_days > last, "q={q} rep={rep}");
                }
                last = s.interval_days;
            }
        }
    }

    #[test]
    fn third_repetition_uses_previous_interval_times_ef() {
        let next = apply_review(&state(2, 2.5, 6), 5, now()).unwrap();
        assert_eq!(next.interval_days, 15);
        assert!(next.next_review_at.unwrap() > now());
    }

    #[test]
    fn long_streak_of_perfect_reviews_stays_bounded() {
        let mut s = state(0, 2.5, 0);
        for i in 0..40 {
            s = apply_review(&s, 5, now()).unwrap();
            assert!(s.next_review_at.unwrap() > now(), "review {i}");
            assert!(s.interval_days <= MAX_INTERVAL_DAYS, "review {i}");
        }
        assert_eq!(s.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(s.next_review_at, Some(now() + Duration::days(MAX_INTERVAL_DAYS as i64)));
    }

    #[test]
    fn oversized_stored_interval_is_capped() {
        let s = state(i32::MAX, 2.5, i32::MAX);
        let next = apply_review(&s, 4, now()).unwrap();
        assert_eq!(next.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(next.repetition_count, i32::MAX);
        assert_eq!(preview_intervals(&s, now())[5], MAX_INTERVAL_DAYS);
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        assert!(matches!(
            apply_review(&state(0, 2.5, 0), 6, now()),
            Err(SchedulerError::InvalidInput(_))
        ));
        assert!(apply_review(&state(0, 2.5, 0), -1, now()).is_err());
    }

    #[test]
    fn due_only_for_reviewed_tasks_past_their_time() {
        let mut s = state(1, 2.5, 1);
        assert!(!is_due(&s, now()));
        s.is_review_task = true;
        assert!(!is_due(&s, now()));
        s.next_review_at = Some(now());
        assert!(is_due(&s, now()));
        s.next_review_at = Some(now() + Duration::seconds(1));
        assert!(!is_due(&s, now()));
    }

    #[test]
    fn preview_covers_all_qualities() {
        let p = preview_intervals(&state(2, 2.5, 6), now());
        assert_eq!(p, [1, 1, 1, 15, 15, 15]);
    }
}
