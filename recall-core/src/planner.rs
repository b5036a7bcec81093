//! Plan builder: the single ranking entry point.
//!
//! Each task gets its model score, except review tasks whose next review has
//! arrived: those get `REVIEW_DUE_SCORE`, which sits above the model's [0,1]
//! range so overdue reviews always lead. The sort is stable, so exact ties
//! keep input order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::priority_model::PriorityModel;
use crate::sm2;
use crate::task::Task;

pub const REVIEW_DUE_SCORE: f64 = 1.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub task: Task,
    /// Ranking score (`REVIEW_DUE_SCORE` for due reviews).
    pub score: f64,
    /// What the model alone said.
    pub model_score: f64,
    pub review_due: bool,
}

pub fn build_plan(tasks: &[Task], model: &PriorityModel, now: DateTime<Utc>) -> Vec<PlannedTask> {
    let mut plan: Vec<PlannedTask> = tasks
        .iter()
        .map(|task| {
            let model_score = model.score(task, now);
            let review_due = sm2::is_due(&task.review_state, now);
            PlannedTask {
                task: task.clone(),
                score: if review_due { REVIEW_DUE_SCORE } else { model_score },
                model_score,
                review_due,
            }
        })
        .collect();

    // sort_by is stable
    plan.sort_by(|a, b| b.score.total_cmp(&a.score));

    tracing::debug!(
        tasks = plan.len(),
        reviews_due = plan.iter().filter(|p| p.review_due).count(),
        "plan built"
    );
    plan
}
