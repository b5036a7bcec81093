//! Scheduler configuration.
//!
//! Every field has a serde default so a partial `config.toml` (or none at
//! all) still yields a complete configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Seeds synthetic data, weight initialisation and shuffling.
    pub seed: u64,
    pub bootstrap_examples: usize,
    /// Share of the bootstrap set held out for hyperparameter selection.
    pub validation_fraction: f64,
    pub bootstrap_epochs: usize,

    /// When false, the first entry of each grid list is used as-is.
    pub grid_search: bool,
    pub learning_rates: Vec<f64>,
    pub hidden_widths: Vec<Vec<usize>>,
    pub batch_sizes: Vec<usize>,

    pub refit_epochs: usize,
    pub refit_batch_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            bootstrap_examples: 300,
            validation_fraction: 0.2,
            bootstrap_epochs: 60,
            grid_search: true,
            learning_rates: vec![0.001, 0.01],
            hidden_widths: vec![vec![16, 8], vec![32, 16]],
            batch_sizes: vec![16, 32],
            refit_epochs: 5,
            refit_batch_size: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA timezone used for preferred hours, deadline parsing and analytics.
    pub timezone: String,
    /// Deadline reminders fire this many minutes early.
    pub reminder_lead_minutes: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Chicago".to_string(),
            reminder_lead_minutes: 0,
        }
    }
}

impl ScheduleConfig {
    pub fn tz(&self) -> anyhow::Result<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timezone: {}", self.timezone))
    }
}
