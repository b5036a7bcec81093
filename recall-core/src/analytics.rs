//! Study analytics: scheduled minutes per subject, tasks due per day and how
//! well estimates have held up.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::features::performance_ratio;
use crate::task::{HistoryRecord, Task};

/// Total estimated minutes per subject, subjects in first-seen order.
pub fn minutes_by_subject(tasks: &[Task]) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64)> = Vec::new();
    for t in tasks {
        match out.iter_mut().find(|(s, _)| *s == t.subject) {
            Some((_, total)) => *total += t.duration_estimate_minutes,
            None => out.push((t.subject.clone(), t.duration_estimate_minutes)),
        }
    }
    out
}

/// Deadline count per local calendar day.
pub fn tasks_due_per_day(tasks: &[Task], tz: Tz) -> BTreeMap<NaiveDate, usize> {
    let mut out = BTreeMap::new();
    for t in tasks {
        *out.entry(t.deadline.with_timezone(&tz).date_naive()).or_insert(0) += 1;
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationSummary {
    pub completions: usize,
    /// Mean actual/estimated across every completion; 1.0 with none.
    pub mean_ratio: f64,
    pub tasks_completed: usize,
}

pub fn estimation_summary(tasks: &[Task]) -> EstimationSummary {
    let records: Vec<HistoryRecord> = tasks.iter().flat_map(|t| t.history.iter().cloned()).collect();
    EstimationSummary {
        completions: records.len(),
        mean_ratio: performance_ratio(&records),
        tasks_completed: tasks.iter().filter(|t| t.has_history()).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap()
    }

    #[test]
    fn sums_minutes_per_subject() {
        let tasks = vec![
            Task::new("1", "Math", at(2, 9)).with_duration(30.0),
            Task::new("2", "Bio", at(2, 9)).with_duration(45.0),
            Task::new("3", "Math", at(3, 9)).with_duration(60.0),
        ];
        assert_eq!(
            minutes_by_subject(&tasks),
            vec![("Math".to_string(), 90.0), ("Bio".to_string(), 45.0)]
        );
    }

    #[test]
    fn groups_deadlines_by_local_day() {
        let tasks = vec![
            Task::new("1", "Math", at(2, 3)),
            Task::new("2", "Bio", at(2, 20)),
            Task::new("3", "Art", at(3, 9)),
        ];
        // 03:00 UTC on the 2nd is still the 1st in Chicago.
        let days = tasks_due_per_day(&tasks, chrono_tz::America::Chicago);
        let counts: Vec<usize> = days.values().copied().collect();
        assert_eq!(counts, vec![1, 1, 1]);

        let utc_days = tasks_due_per_day(&tasks, chrono_tz::UTC);
        assert_eq!(utc_days.get(&NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()), Some(&2));
    }

    #[test]
    fn summarises_estimation_accuracy() {
        let mut a = Task::new("1", "Math", at(2, 9)).with_duration(30.0);
        a.record_completion(60.0, at(2, 10), 10).unwrap();
        let mut b = Task::new("2", "Bio", at(2, 9)).with_duration(40.0);
        b.record_completion(20.0, at(2, 11), 11).unwrap();
        let c = Task::new("3", "Art", at(2, 9));

        let s = estimation_summary(&[a, b, c]);
        assert_eq!(s.completions, 2);
        assert_eq!(s.tasks_completed, 2);
        assert!((s.mean_ratio - 1.25).abs() < 1e-12);

        assert_eq!(estimation_summary(&[]).mean_ratio, 1.0);
    }
}
