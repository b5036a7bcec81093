//! Reminder projection + the notification seam.
//!
//! One reminder per deadline and one per scheduled review. The core does
//! not remember what it already scheduled: a deadline move cancels all of a
//! task's reminders and projects them again, so repeated moves can produce
//! duplicate deliveries on sinks that cannot cancel.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Task;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReminderKind {
    Deadline,
    Review,
}

impl ReminderKind {
    fn as_str(self) -> &'static str {
        match self {
            ReminderKind::Deadline => "deadline",
            ReminderKind::Review => "review",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderIntent {
    pub intent_id: String,
    pub task_id: String,
    pub kind: ReminderKind,
    pub title: String,
    pub body: String,
    pub send_at_utc: DateTime<Utc>,
    pub dedupe_key: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderPolicy {
    /// Deadline reminders fire this many minutes before the deadline.
    pub deadline_lead_minutes: i64,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            deadline_lead_minutes: 0,
        }
    }
}

/// External notification service.
pub trait ReminderSink {
    fn schedule_one_shot(&mut self, intent: ReminderIntent) -> Result<()>;

    /// Best effort; sinks that cannot cancel may ignore this.
    fn cancel_for_task(&mut self, task_id: &str) -> Result<()>;
}

/// Deterministically project a task into reminder intents. Past send times
/// are dropped.
pub fn project_task_reminders(
    task: &Task,
    now: DateTime<Utc>,
    policy: ReminderPolicy,
) -> Vec<ReminderIntent> {
    let mut slots = Vec::new();
    // A lead too large to represent would land before any `now`.
    let deadline_at = Duration::try_minutes(policy.deadline_lead_minutes.max(0))
        .and_then(|lead| task.deadline.checked_sub_signed(lead));
    if let Some(at) = deadline_at {
        slots.push((ReminderKind::Deadline, at, format!("Time to study {}!", task.subject)));
    }
    if task.review_state.is_review_task {
        if let Some(at) = task.review_state.next_review_at {
            slots.push((ReminderKind::Review, at, format!("Review due: {}", task.subject)));
        }
    }

    slots
        .into_iter()
        .filter(|(_, send_at, _)| *send_at > now)
        .map(|(kind, send_at, body)| ReminderIntent {
            intent_id: format!("ri-{}-{}", task.id, kind.as_str()),
            task_id: task.id.clone(),
            kind,
            title: "Study Reminder".to_string(),
            body,
            send_at_utc: send_at,
            dedupe_key: format!("{}:{}:{}", task.id, kind.as_str(), send_at.timestamp()),
        })
        .collect()
}

/// In-memory sink; keeps what was scheduled and honours cancellation.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub scheduled: Vec<ReminderIntent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_task(&self, task_id: &str) -> Vec<&ReminderIntent> {
        self.scheduled.iter().filter(|r| r.task_id == task_id).collect()
    }
}

impl ReminderSink for MemorySink {
    fn schedule_one_shot(&mut self, intent: ReminderIntent) -> Result<()> {
        self.scheduled.push(intent);
        Ok(())
    }

    fn cancel_for_task(&mut self, task_id: &str) -> Result<()> {
        self.scheduled.retain(|r| r.task_id != task_id);
        Ok(())
    }
}
