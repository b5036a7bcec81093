//! Session orchestrator.
//!
//! Wires the task store and reminder seams to the scheduling core. One
//! session is one logical actor: every event validates, builds the updated
//! task value, writes it to the store, swaps it into the cache, and then
//! notifies and retrains. Validation failures touch neither cache nor store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::config::{ScheduleConfig, SchedulerConfig};
use crate::error::SchedulerError;
use crate::planner::{PlannedTask, build_plan};
use crate::priority_model::{InitReport, PriorityModel};
use crate::reminders::{ReminderPolicy, ReminderSink, project_task_reminders};
use crate::retraining::{RetrainOutcome, RetrainingCoordinator, SharedModel, shared_model};
use crate::sm2;
use crate::store::TaskStore;
use crate::task::{NewTask, Task, next_task_id, validate_positive_minutes};
use crate::time::local_hour;

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub task: Task,
    /// Present only when the review also recorded study time.
    pub retrain: Option<RetrainOutcome>,
}

pub struct Session<S: TaskStore, N: ReminderSink> {
    store: S,
    notifier: N,
    tasks: Vec<Task>,
    coordinator: RetrainingCoordinator,
    schedule: ScheduleConfig,
    tz: Tz,
}

impl<S: TaskStore, N: ReminderSink> Session<S, N> {
    /// Load and repair the task set. The model starts uninitialized and
    /// scores neutrally until `initialize_model` (or the first retrain).
    pub fn open(mut store: S, notifier: N, config: SchedulerConfig) -> Result<Self> {
        let tz = config.schedule.tz()?;
        let mut tasks = store.get_all().context("load tasks from store")?;

        let mut repaired = 0usize;
        for t in tasks.iter_mut() {
            let fixed = t.repair();
            if !fixed.is_empty() {
                tracing::warn!(task = %t.id, fields = ?fixed, "repaired task loaded from store");
                store.put(t).with_context(|| format!("write back repaired task {}", t.id))?;
                repaired += 1;
            }
        }
        tracing::info!(tasks = tasks.len(), repaired, "session opened");

        Ok(Self {
            store,
            notifier,
            tasks,
            coordinator: RetrainingCoordinator::new(shared_model(PriorityModel::new(config.model))),
            schedule: config.schedule,
            tz,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn model(&self) -> &SharedModel {
        self.coordinator.model()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub async fn initialize_model(&self) -> Result<InitReport> {
        self.coordinator.initialize().await
    }

    /// Bootstrap, then fit on all recorded history.
    pub async fn warm_model(&self, now: DateTime<Utc>) -> RetrainOutcome {
        self.coordinator.on_reload(&self.tasks, now).await
    }

    pub async fn plan(&self, now: DateTime<Utc>) -> Vec<PlannedTask> {
        let model = self.coordinator.model().lock().await;
        build_plan(&self.tasks, &model, now)
    }

    pub fn add_task(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<Task> {
        new.validate()?;
        let id = next_task_id(self.tasks.iter().map(|t| t.id.as_str()), now);
        let task = new.into_task(id);

        self.store.put(&task).with_context(|| format!("store task {}", task.id))?;
        self.tasks.push(task.clone());
        self.schedule_reminders(&task, now);

        tracing::info!(task = %task.id, subject = %task.subject, "task added");
        Ok(task)
    }

    /// Record actual study time, then retrain.
    pub async fn complete_task(
        &mut self,
        id: &str,
        actual_minutes: f64,
        now: DateTime<Utc>,
    ) -> Result<(Task, RetrainOutcome)> {
        let idx = self.position(id)?;
        let mut updated = self.tasks[idx].clone();
        updated.record_completion(actual_minutes, now, local_hour(now, self.tz))?;

        self.commit(idx, &updated)?;
        tracing::info!(task = %id, actual_minutes, "task completed");

        let outcome = self.coordinator.on_history_event(&self.tasks, &updated, now).await;
        Ok((updated, outcome))
    }

    /// Apply an SM-2 review. When `actual_minutes` is given the review also
    /// counts as a completion and triggers a retrain.
    pub async fn review_task(
        &mut self,
        id: &str,
        quality: i32,
        actual_minutes: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome> {
        let idx = self.position(id)?;
        if let Some(m) = actual_minutes {
            validate_positive_minutes("actual minutes", m)?;
        }

        let mut updated = self.tasks[idx].clone();
        updated.review_state = sm2::apply_review(&updated.review_state, quality, now)?;
        if let Some(m) = actual_minutes {
            updated.record_completion(m, now, local_hour(now, self.tz))?;
        }

        self.commit(idx, &updated)?;
        self.cancel_reminders(id);
        self.schedule_reminders(&updated, now);
        tracing::info!(
            task = %id,
            quality,
            interval_days = updated.review_state.interval_days,
            "review applied"
        );

        let retrain = match actual_minutes {
            Some(_) => Some(self.coordinator.on_history_event(&self.tasks, &updated, now).await),
            None => None,
        };
        Ok(ReviewOutcome {
            task: updated,
            retrain,
        })
    }

    /// Cancel-then-reschedule; earlier reminders are not tracked.
    pub fn move_deadline(&mut self, id: &str, deadline: DateTime<Utc>, now: DateTime<Utc>) -> Result<Task> {
        let idx = self.position(id)?;
        let mut updated = self.tasks[idx].clone();
        updated.deadline = deadline;

        self.commit(idx, &updated)?;
        self.cancel_reminders(id);
        self.schedule_reminders(&updated, now);
        tracing::info!(task = %id, %deadline, "deadline moved");
        Ok(updated)
    }

    pub fn delete_task(&mut self, id: &str) -> Result<()> {
        let idx = self.position(id)?;
        self.store.delete(id).with_context(|| format!("delete task {id}"))?;
        self.tasks.remove(idx);
        self.cancel_reminders(id);
        tracing::info!(task = %id, "task deleted");
        Ok(())
    }

    fn position(&self, id: &str) -> Result<usize, SchedulerError> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| SchedulerError::TaskNotFound(id.to_string()))
    }

    /// Store first, so a failed write leaves the cache as it was.
    fn commit(&mut self, idx: usize, updated: &Task) -> Result<()> {
        self.store
            .put(updated)
            .with_context(|| format!("store task {}", updated.id))?;
        self.tasks[idx] = updated.clone();
        Ok(())
    }

    fn schedule_reminders(&mut self, task: &Task, now: DateTime<Utc>) {
        let policy = ReminderPolicy {
            deadline_lead_minutes: self.schedule.reminder_lead_minutes,
        };
        for intent in project_task_reminders(task, now, policy) {
            if let Err(err) = self.notifier.schedule_one_shot(intent) {
                tracing::warn!(task = %task.id, error = %err, "reminder not scheduled");
            }
        }
    }

    fn cancel_reminders(&mut self, id: &str) {
        if let Err(err) = self.notifier.cancel_for_task(id) {
            tracing::warn!(task = %id, error = %err, "reminder cancel failed");
        }
    }
}
