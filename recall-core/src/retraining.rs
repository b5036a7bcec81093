//! Retraining coordinator.
//!
//! Runs after every event that appends to a task's history. Fits are
//! serialised on the shared model: the tokio mutex hands out the model in
//! FIFO order, so at most one fit is in flight and later events queue behind
//! it. A queued refit that finds a newer event already waiting is skipped,
//! because the newer snapshot carries every history record this one had.
//!
//! Training runs on the blocking pool so async callers are never stalled.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::features::{self, TrainingExample};
use crate::priority_model::{InitReport, PriorityModel, RefitSummary};
use crate::task::Task;

pub type SharedModel = Arc<Mutex<PriorityModel>>;

pub fn shared_model(model: PriorityModel) -> SharedModel {
    Arc::new(Mutex::new(model))
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetrainOutcome {
    Refit {
        summary: RefitSummary,
        /// The model had to be bootstrapped first.
        initialized: bool,
    },
    /// A newer event was already queued; its refit covers this one.
    Superseded,
    /// Non-fatal. The previous model state is kept.
    Failed(String),
}

#[derive(Debug)]
pub struct RetrainingCoordinator {
    model: SharedModel,
    latest_ticket: AtomicU64,
}

impl RetrainingCoordinator {
    pub fn new(model: SharedModel) -> Self {
        Self {
            model,
            latest_ticket: AtomicU64::new(0),
        }
    }

    pub fn model(&self) -> &SharedModel {
        &self.model
    }

    /// Training set for the current task collection. `updated` replaces the
    /// cached copy with the same id (or is added if the cache lacks it).
    pub fn collect_examples(tasks: &[Task], updated: &Task, now: DateTime<Utc>) -> Vec<TrainingExample> {
        let mut seen = false;
        let mut out = Vec::new();
        for t in tasks {
            let t = if t.id == updated.id {
                seen = true;
                updated
            } else {
                t
            };
            out.extend(features::training_example(t, now));
        }
        if !seen {
            out.extend(features::training_example(updated, now));
        }
        out
    }

    /// Bootstrap the model on the blocking pool.
    pub async fn initialize(&self) -> anyhow::Result<InitReport> {
        let mut guard = self.model.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || guard.initialize())
            .await
            .context("model bootstrap task failed")
    }

    pub async fn on_history_event(
        &self,
        tasks: &[Task],
        updated: &Task,
        now: DateTime<Utc>,
    ) -> RetrainOutcome {
        let examples = Self::collect_examples(tasks, updated, now);
        self.retrain(examples).await
    }

    /// Fit on every task's history, e.g. after a fresh process loads the
    /// store. The model does not outlive the process.
    pub async fn on_reload(&self, tasks: &[Task], now: DateTime<Utc>) -> RetrainOutcome {
        let examples = tasks
            .iter()
            .filter_map(|t| features::training_example(t, now))
            .collect();
        self.retrain(examples).await
    }

    async fn retrain(&self, examples: Vec<TrainingExample>) -> RetrainOutcome {
        let ticket = self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let mut guard = self.model.clone().lock_owned().await;

        if self.latest_ticket.load(Ordering::SeqCst) != ticket {
            tracing::debug!(ticket, "refit superseded by a newer event");
            return RetrainOutcome::Superseded;
        }

        let joined = tokio::task::spawn_blocking(move || {
            let initialized = !guard.is_initialized();
            if initialized {
                guard.initialize();
            }
            guard.refit(&examples).map(|summary| (summary, initialized))
        })
        .await;

        match joined {
            Ok(Ok((summary, initialized))) => {
                tracing::debug!(ticket, examples = summary.examples, initialized, "refit complete");
                RetrainOutcome::Refit {
                    summary,
                    initialized,
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(ticket, error = %err, "refit skipped");
                RetrainOutcome::Failed(err.to_string())
            }
            Err(err) => {
                tracing::warn!(ticket, error = %err, "refit task failed");
                RetrainOutcome::Failed(format!("training task failed: {err}"))
            }
        }
    }
}
