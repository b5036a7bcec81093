//! recall-core: adaptive study scheduling (SM-2 reviews + learned priority)

pub mod analytics;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod features;
mod network;
pub mod planner;
pub mod priority_model;
pub mod reminders;
pub mod retraining;
pub mod session;
pub mod sm2;
pub mod store;
pub mod task;
pub mod time;

pub use analytics::{EstimationSummary, estimation_summary, minutes_by_subject, tasks_due_per_day};
pub use bootstrap::Hyperparameters;
pub use config::{ModelConfig, ScheduleConfig, SchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
pub use features::{FeatureVector, TrainingExample};
pub use planner::{PlannedTask, build_plan};
pub use priority_model::{InitReport, PriorityModel, RefitSummary};
pub use reminders::{
    MemorySink, ReminderIntent, ReminderKind, ReminderPolicy, ReminderSink, project_task_reminders,
};
pub use retraining::{RetrainOutcome, RetrainingCoordinator, SharedModel, shared_model};
pub use session::{ReviewOutcome, Session};
pub use store::{JsonFileStore, MemoryStore, TaskStore};
pub use task::{HistoryRecord, NewTask, ReviewState, Task};
