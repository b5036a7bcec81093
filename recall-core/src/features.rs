//! Feature extraction for the priority model.
//!
//! Five features, fixed order:
//! 1. hours until deadline (negative when overdue)
//! 2. estimated minutes
//! 3. mean actual/estimated ratio over history (1.0 without history)
//! 4. preferred hour / 23 (0.5 when unknown)
//! 5. difficulty (3 when out of range)
//!
//! Hours and minutes stay in natural units; scaling belongs to the model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{DEFAULT_DIFFICULTY, HistoryRecord, Task};

pub const FEATURE_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(
        hours_until_deadline: f64,
        estimated_minutes: f64,
        performance_ratio: f64,
        preferred_hour_norm: f64,
        difficulty: f64,
    ) -> Self {
        Self([
            hours_until_deadline,
            estimated_minutes,
            performance_ratio,
            preferred_hour_norm,
            difficulty,
        ])
    }

    pub fn hours_until_deadline(&self) -> f64 {
        self.0[0]
    }

    pub fn estimated_minutes(&self) -> f64 {
        self.0[1]
    }

    pub fn performance_ratio(&self) -> f64 {
        self.0[2]
    }

    pub fn preferred_hour_norm(&self) -> f64 {
        self.0[3]
    }

    pub fn difficulty(&self) -> f64 {
        self.0[4]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

/// A `(features, label)` pair used for fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub features: FeatureVector,
    pub label: f64,
}

pub fn extract(task: &Task, now: DateTime<Utc>) -> FeatureVector {
    let hours_left = (task.deadline - now).num_milliseconds() as f64 / 3_600_000.0;

    let hour_norm = match task.preferred_hour {
        Some(h) if (0..=23).contains(&h) => h as f64 / 23.0,
        _ => 0.5,
    };

    let difficulty = if (1..=5).contains(&task.difficulty) {
        task.difficulty
    } else {
        DEFAULT_DIFFICULTY
    };

    FeatureVector::new(
        hours_left,
        task.duration_estimate_minutes,
        performance_ratio(&task.history),
        hour_norm,
        difficulty as f64,
    )
}

/// Mean of actual/estimated over history; 1.0 absent evidence.
pub fn performance_ratio(history: &[HistoryRecord]) -> f64 {
    let (sum, n) = history
        .iter()
        .filter_map(HistoryRecord::ratio)
        .fold((0.0, 0usize), |(s, n), r| (s + r, n + 1));
    if n == 0 { 1.0 } else { sum / n as f64 }
}

/// Training example for a task, or `None` when it has never been completed.
pub fn training_example(task: &Task, now: DateTime<Utc>) -> Option<TrainingExample> {
    if !task.has_history() {
        return None;
    }
    let features = extract(task, now);
    Some(TrainingExample {
        features,
        label: features.performance_ratio(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn record(estimated: f64, actual: f64) -> HistoryRecord {
        HistoryRecord {
            estimated_minutes: estimated,
            actual_minutes: actual,
            completed_at: now(),
        }
    }

    #[test]
    fn fresh_task_uses_defaults() {
        let t = Task::new("t1", "Math", now() + Duration::hours(36)).with_duration(90.0);
        let f = extract(&t, now());
        assert_eq!(f.hours_until_deadline(), 36.0);
        assert_eq!(f.estimated_minutes(), 90.0);
        assert_eq!(f.performance_ratio(), 1.0);
        assert_eq!(f.preferred_hour_norm(), 0.5);
        assert_eq!(f.difficulty(), 3.0);
    }

    #[test]
    fn overdue_deadline_is_negative() {
        let t = Task::new("t1", "Math", now() - Duration::minutes(90));
        assert_eq!(extract(&t, now()).hours_until_deadline(), -1.5);
    }

    #[test]
    fn ratio_is_mean_of_history() {
        let mut t = Task::new("t1", "Math", now()).with_preferred_hour(23).with_difficulty(5);
        t.history = vec![record(30.0, 45.0), record(60.0, 30.0)];
        let f = extract(&t, now());
        assert!((f.performance_ratio() - 1.0).abs() < 1e-12);
        assert_eq!(f.preferred_hour_norm(), 1.0);
        assert_eq!(f.difficulty(), 5.0);

        t.history.push(record(10.0, 40.0));
        assert!((extract(&t, now()).performance_ratio() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_records_and_fields_fall_back() {
        let mut t = Task::new("t1", "Math", now()).with_difficulty(11);
        t.preferred_hour = Some(40);
        t.history = vec![record(0.0, 20.0)];
        let f = extract(&t, now());
        assert_eq!(f.performance_ratio(), 1.0);
        assert_eq!(f.preferred_hour_norm(), 0.5);
        assert_eq!(f.difficulty(), 3.0);
        assert!(f.is_finite());
    }

    #[test]
    fn only_completed_tasks_yield_examples() {
        let mut t = Task::new("t1", "Math", now());
        assert!(training_example(&t, now()).is_none());

        t.history.push(record(20.0, 30.0));
        let ex = training_example(&t, now()).unwrap();
        assert_eq!(ex.label, 1.5);
        assert_eq!(ex.features.performance_ratio(), 1.5);
    }
}
