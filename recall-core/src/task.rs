//! Study task model.
//!
//! Tasks are plain serializable values. Every event (completion, review,
//! deadline move) produces an updated value that replaces the old one in the
//! store; nothing holds a shared mutable reference to a task.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SchedulerError, SchedulerResult};

pub const MIN_EASINESS_FACTOR: f64 = 1.3;
pub const DEFAULT_EASINESS_FACTOR: f64 = 2.5;
pub const DEFAULT_DIFFICULTY: i32 = 3;
pub const DEFAULT_DURATION_MINUTES: f64 = 30.0;
/// Longest review interval (about a century).
pub const MAX_INTERVAL_DAYS: i32 = 36_500;

/// One completion event. Appended, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub estimated_minutes: f64,
    pub actual_minutes: f64,
    pub completed_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// `actual / estimated`, or `None` when the estimate cannot divide.
    pub fn ratio(&self) -> Option<f64> {
        if self.estimated_minutes > 0.0 && self.estimated_minutes.is_finite() {
            let r = self.actual_minutes / self.estimated_minutes;
            r.is_finite().then_some(r)
        } else {
            None
        }
    }
}

/// SM-2 review state. Present on every task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub repetition_count: i32,
    pub easiness_factor: f64,
    pub interval_days: i32,
    #[serde(default)]
    pub next_review_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_review_task: bool,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            repetition_count: 0,
            easiness_factor: DEFAULT_EASINESS_FACTOR,
            interval_days: 0,
            next_review_at: None,
            is_review_task: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub subject: String,

    /// Minutes, user supplied.
    pub duration_estimate_minutes: f64,

    /// May be in the past; overdue tasks stay schedulable.
    pub deadline: DateTime<Utc>,

    /// 1-5.
    #[serde(default = "default_difficulty")]
    pub difficulty: i32,

    #[serde(default)]
    pub history: Vec<HistoryRecord>,

    /// Local hour (0-23) of the most recent completion.
    #[serde(default)]
    pub preferred_hour: Option<i32>,

    #[serde(default)]
    pub review_state: ReviewState,
}

fn default_difficulty() -> i32 {
    DEFAULT_DIFFICULTY
}

impl Task {
    pub fn new(id: impl Into<String>, subject: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            duration_estimate_minutes: DEFAULT_DURATION_MINUTES,
            deadline,
            difficulty: DEFAULT_DIFFICULTY,
            history: Vec::new(),
            preferred_hour: None,
            review_state: ReviewState::default(),
        }
    }

    pub fn with_duration(mut self, minutes: f64) -> Self {
        self.duration_estimate_minutes = minutes;
        self
    }

    pub fn with_difficulty(mut self, difficulty: i32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_preferred_hour(mut self, hour: i32) -> Self {
        self.preferred_hour = Some(hour);
        self
    }

    pub fn as_review_task(mut self) -> Self {
        self.review_state.is_review_task = true;
        self
    }

    pub fn with_review_state(mut self, state: ReviewState) -> Self {
        self.review_state = state;
        self
    }

    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }

    /// Append a completion and overwrite the preferred hour.
    ///
    /// `local_hour` is the hour-of-day of `completed_at` in the learner's
    /// timezone; the caller owns the timezone.
    pub fn record_completion(
        &mut self,
        actual_minutes: f64,
        completed_at: DateTime<Utc>,
        local_hour: u32,
    ) -> SchedulerResult<()> {
        validate_positive_minutes("actual minutes", actual_minutes)?;
        if local_hour > 23 {
            return Err(SchedulerError::invalid(format!(
                "hour of day must be 0..=23, got {local_hour}"
            )));
        }

        self.history.push(HistoryRecord {
            estimated_minutes: self.duration_estimate_minutes,
            actual_minutes,
            completed_at,
        });
        self.preferred_hour = Some(local_hour as i32);
        Ok(())
    }

    /// Bring a task loaded from an untrusted store back within invariants.
    ///
    /// Returns the names of the fields that had to be repaired.
    pub fn repair(&mut self) -> Vec<&'static str> {
        let mut fixed = Vec::new();

        if !(1..=5).contains(&self.difficulty) {
            self.difficulty = DEFAULT_DIFFICULTY;
            fixed.push("difficulty");
        }
        if !(self.duration_estimate_minutes > 0.0 && self.duration_estimate_minutes.is_finite()) {
            self.duration_estimate_minutes = DEFAULT_DURATION_MINUTES;
            fixed.push("duration_estimate_minutes");
        }
        if let Some(h) = self.preferred_hour {
            if !(0..=23).contains(&h) {
                self.preferred_hour = None;
                fixed.push("preferred_hour");
            }
        }

        let rs = &mut self.review_state;
        if !rs.easiness_factor.is_finite() {
            rs.easiness_factor = DEFAULT_EASINESS_FACTOR;
            fixed.push("easiness_factor");
        } else if rs.easiness_factor < MIN_EASINESS_FACTOR {
            rs.easiness_factor = MIN_EASINESS_FACTOR;
            fixed.push("easiness_factor");
        }
        if rs.interval_days < 0 {
            rs.interval_days = 0;
            fixed.push("interval_days");
        } else if rs.interval_days > MAX_INTERVAL_DAYS {
            rs.interval_days = MAX_INTERVAL_DAYS;
            fixed.push("interval_days");
        }
        if rs.repetition_count < 0 {
            rs.repetition_count = 0;
            fixed.push("repetition_count");
        }
        if rs.next_review_at.is_some() && !rs.is_review_task {
            rs.next_review_at = None;
            fixed.push("next_review_at");
        }

        fixed
    }
}

/// Input-surface payload for creating a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub subject: String,
    pub duration_minutes: f64,
    pub deadline: DateTime<Utc>,
    pub difficulty: i32,
    #[serde(default)]
    pub is_review_task: bool,
}

impl NewTask {
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.subject.trim().is_empty() {
            return Err(SchedulerError::invalid("subject must not be empty"));
        }
        validate_positive_minutes("duration", self.duration_minutes)?;
        if !(1..=5).contains(&self.difficulty) {
            return Err(SchedulerError::invalid(format!(
                "difficulty must be 1..=5, got {}",
                self.difficulty
            )));
        }
        Ok(())
    }

    pub fn into_task(self, id: String) -> Task {
        let mut task = Task::new(id, self.subject.trim(), self.deadline)
            .with_duration(self.duration_minutes)
            .with_difficulty(self.difficulty);
        task.review_state.is_review_task = self.is_review_task;
        task
    }
}

pub(crate) fn validate_positive_minutes(what: &str, minutes: f64) -> SchedulerResult<()> {
    if minutes > 0.0 && minutes.is_finite() {
        Ok(())
    } else {
        Err(SchedulerError::invalid(format!(
            "{what} must be a positive number of minutes, got {minutes}"
        )))
    }
}

/// Time-derived id (`task-<unix millis>`), bumped past any collision.
pub fn next_task_id<'a>(existing: impl IntoIterator<Item = &'a str>, now: DateTime<Utc>) -> String {
    let taken: std::collections::HashSet<&str> = existing.into_iter().collect();
    let mut at = now;
    loop {
        let id = format!("task-{}", at.timestamp_millis());
        if !taken.contains(id.as_str()) {
            return id;
        }
        at += Duration::milliseconds(1);
    }
}
