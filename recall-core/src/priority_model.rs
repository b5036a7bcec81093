//! Learned study-urgency model.
//!
//! Lifecycle: `new` (uninitialized, scores 0.5) -> `initialize` (bootstrap
//! prior + grid search) -> any number of `refit`s on real feedback. Nothing
//! is persisted; a new session starts cold.
//!
//! `score` is clamped to [0,1] on the way out. The plan builder's review-due
//! sentinel depends on that bound.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::bootstrap::{self, Hyperparameters};
use crate::config::ModelConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::features::{self, FEATURE_COUNT, FeatureVector, TrainingExample};
use crate::network::{Network, Sample, Standardizer};
use crate::task::Task;

pub const NEUTRAL_SCORE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitReport {
    pub hyperparameters: Hyperparameters,
    pub validation_loss: f64,
    pub training_loss: Option<f64>,
    pub bootstrap_examples: usize,
}

/// Result of a refit. Zero examples means the call was a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefitSummary {
    pub examples: usize,
    pub loss: Option<f64>,
}

#[derive(Debug, Clone)]
struct Trained {
    network: Network,
    scaler: Standardizer,
    hyperparameters: Hyperparameters,
    rng: StdRng,
}

#[derive(Debug, Clone)]
pub struct PriorityModel {
    config: ModelConfig,
    trained: Option<Trained>,
}

impl PriorityModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            trained: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.trained.is_some()
    }

    pub fn hyperparameters(&self) -> Option<&Hyperparameters> {
        self.trained.as_ref().map(|t| &t.hyperparameters)
    }

    /// Build the bootstrap prior from scratch, replacing any previous state.
    pub fn initialize(&mut self) -> InitReport {
        let cfg = &self.config;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let data = bootstrap::synthetic_dataset(cfg.bootstrap_examples.max(2), &mut rng);

        let rows: Vec<Vec<f64>> = data.iter().map(|ex| ex.features.0.to_vec()).collect();
        let scaler = Standardizer::fit(&rows);
        let samples = to_samples(&scaler, &data);

        let selection = bootstrap::select_hyperparameters(cfg, &samples);
        let hp = selection.hyperparameters;

        let mut network = Network::new(FEATURE_COUNT, &hp.hidden_widths, &mut rng);
        let training_loss = network.fit(
            &samples,
            cfg.bootstrap_epochs,
            hp.batch_size,
            hp.learning_rate,
            &mut rng,
        );

        tracing::info!(
            learning_rate = hp.learning_rate,
            hidden = ?hp.hidden_widths,
            batch_size = hp.batch_size,
            validation_loss = selection.validation_loss,
            "priority model bootstrapped"
        );

        let report = InitReport {
            hyperparameters: hp.clone(),
            validation_loss: selection.validation_loss,
            training_loss,
            bootstrap_examples: data.len(),
        };

        self.trained = Some(Trained {
            network,
            scaler,
            hyperparameters: hp,
            rng,
        });
        report
    }

    pub fn score(&self, task: &Task, now: DateTime<Utc>) -> f64 {
        self.score_features(&features::extract(task, now))
    }

    /// Urgency in [0,1]. Uninitialized models and non-finite inputs or
    /// outputs resolve to the neutral score.
    pub fn score_features(&self, features: &FeatureVector) -> f64 {
        let Some(trained) = &self.trained else {
            return NEUTRAL_SCORE;
        };
        if !features.is_finite() {
            return NEUTRAL_SCORE;
        }
        let x = trained.scaler.transform(features.as_slice());
        let y = trained.network.predict(&x);
        if y.is_finite() { y.clamp(0.0, 1.0) } else { NEUTRAL_SCORE }
    }

    /// Incremental fit on real feedback, continuing from current weights.
    pub fn refit(&mut self, examples: &[TrainingExample]) -> SchedulerResult<RefitSummary> {
        let cfg = &self.config;
        let trained = self
            .trained
            .as_mut()
            .ok_or(SchedulerError::UninitializedModel)?;

        let usable: Vec<TrainingExample> = examples
            .iter()
            .filter(|ex| ex.features.is_finite() && ex.label.is_finite())
            .copied()
            .collect();
        if usable.is_empty() {
            return Ok(RefitSummary {
                examples: 0,
                loss: None,
            });
        }

        let samples = to_samples(&trained.scaler, &usable);
        let lr = trained.hyperparameters.learning_rate;
        let loss = trained.network.fit(
            &samples,
            cfg.refit_epochs,
            cfg.refit_batch_size,
            lr,
            &mut trained.rng,
        );

        tracing::debug!(examples = samples.len(), ?loss, "priority model refit");
        Ok(RefitSummary {
            examples: samples.len(),
            loss,
        })
    }
}

fn to_samples(scaler: &Standardizer, examples: &[TrainingExample]) -> Vec<Sample> {
    examples
        .iter()
        .map(|ex| Sample {
            input: scaler.transform(ex.features.as_slice()),
            target: ex.label,
        })
        .collect()
}
