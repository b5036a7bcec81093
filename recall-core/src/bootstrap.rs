//! Synthetic bootstrap data and hyperparameter selection.
//!
//! The prior is a fixed linear rule: sooner deadlines, shorter estimates,
//! higher historical ratio, later preferred hour and higher difficulty all
//! push urgency up. It only has to keep early rankings sane until real
//! feedback arrives.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::features::{FEATURE_COUNT, FeatureVector, TrainingExample};
use crate::network::{Network, Sample};

pub const PRIOR_BIAS: f64 = 0.4;
/// hours, minutes, ratio, hour_norm, difficulty
pub const PRIOR_WEIGHTS: [f64; FEATURE_COUNT] = [-0.005, -0.001, 0.2, 0.1, 0.05];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub learning_rate: f64,
    pub hidden_widths: Vec<usize>,
    pub batch_size: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            hidden_widths: vec![16, 8],
            batch_size: 16,
        }
    }
}

pub fn prior_label(features: &FeatureVector) -> f64 {
    let raw = PRIOR_WEIGHTS
        .iter()
        .zip(features.as_slice())
        .map(|(w, x)| w * x)
        .sum::<f64>()
        + PRIOR_BIAS;
    raw.clamp(0.0, 1.0)
}

pub fn synthetic_dataset(n: usize, rng: &mut StdRng) -> Vec<TrainingExample> {
    (0..n)
        .map(|_| {
            let features = FeatureVector::new(
                rng.gen_range(0.0..=72.0),
                rng.gen_range(10.0..=190.0),
                rng.gen_range(0.0..=1.0),
                rng.gen_range(0.0..=1.0),
                rng.gen_range(1..=5) as f64,
            );
            TrainingExample {
                features,
                label: prior_label(&features),
            }
        })
        .collect()
}

/// Cartesian grid in config order. Empty lists fall back to defaults.
pub(crate) fn candidates(config: &ModelConfig) -> Vec<Hyperparameters> {
    let defaults = Hyperparameters::default();
    let lrs = non_empty(&config.learning_rates, defaults.learning_rate);
    let widths = non_empty(&config.hidden_widths, defaults.hidden_widths.clone());
    let batches = non_empty(&config.batch_sizes, defaults.batch_size);

    if !config.grid_search {
        return vec![Hyperparameters {
            learning_rate: lrs[0],
            hidden_widths: widths[0].clone(),
            batch_size: batches[0],
        }];
    }

    let mut out = Vec::with_capacity(lrs.len() * widths.len() * batches.len());
    for &learning_rate in &lrs {
        for hidden_widths in &widths {
            for &batch_size in &batches {
                out.push(Hyperparameters {
                    learning_rate,
                    hidden_widths: hidden_widths.clone(),
                    batch_size,
                });
            }
        }
    }
    out
}

fn non_empty<T: Clone>(values: &[T], fallback: T) -> Vec<T> {
    if values.is_empty() {
        vec![fallback]
    } else {
        values.to_vec()
    }
}

/// Tail of the (already random) sample list becomes the validation set.
pub(crate) fn holdout_split(samples: &[Sample], fraction: f64) -> (Vec<Sample>, Vec<Sample>) {
    let n = samples.len();
    if n < 2 {
        return (samples.to_vec(), samples.to_vec());
    }
    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.2 };
    let val = ((n as f64 * fraction).round() as usize).clamp(1, n - 1);
    let (train, validation) = samples.split_at(n - val);
    (train.to_vec(), validation.to_vec())
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selection {
    pub hyperparameters: Hyperparameters,
    pub validation_loss: f64,
}

/// Pick the grid point with the lowest hold-out MSE; earlier points win ties.
pub(crate) fn select_hyperparameters(config: &ModelConfig, samples: &[Sample]) -> Selection {
    let grid = candidates(config);
    let (train, validation) = holdout_split(samples, config.validation_fraction);

    let mut best: Option<Selection> = None;
    for (idx, hp) in grid.into_iter().enumerate() {
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(idx as u64 + 1));
        let mut net = Network::new(FEATURE_COUNT, &hp.hidden_widths, &mut rng);
        net.fit(&train, config.bootstrap_epochs, hp.batch_size, hp.learning_rate, &mut rng);
        let loss = net.mse(&validation);

        tracing::debug!(
            learning_rate = hp.learning_rate,
            hidden = ?hp.hidden_widths,
            batch_size = hp.batch_size,
            validation_loss = loss,
            "grid point evaluated"
        );

        let better = match &best {
            None => true,
            Some(b) => loss.is_finite() && (loss < b.validation_loss || !b.validation_loss.is_finite()),
        };
        if better {
            best = Some(Selection {
                hyperparameters: hp,
                validation_loss: loss,
            });
        }
    }

    best.unwrap_or_else(|| Selection {
        hyperparameters: Hyperparameters::default(),
        validation_loss: f64::NAN,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_prefers_urgent_hard_tasks() {
        let urgent = FeatureVector::new(1.0, 15.0, 1.0, 1.0, 5.0);
        let relaxed = FeatureVector::new(70.0, 180.0, 0.0, 0.0, 1.0);
        assert!((prior_label(&urgent) - 0.93).abs() < 1e-9);
        assert_eq!(prior_label(&relaxed), 0.0);
    }

    #[test]
    fn synthetic_data_respects_ranges() {
        let mut rng = StdRng::seed_from_u64(42);
        let data = synthetic_dataset(300, &mut rng);
        assert_eq!(data.len(), 300);
        for ex in &data {
            let f = ex.features;
            assert!((0.0..=72.0).contains(&f.hours_until_deadline()));
            assert!((10.0..=190.0).contains(&f.estimated_minutes()));
            assert!((0.0..=1.0).contains(&f.performance_ratio()));
            assert!((0.0..=1.0).contains(&f.preferred_hour_norm()));
            assert!([1.0, 2.0, 3.0, 4.0, 5.0].contains(&f.difficulty()));
            assert!((0.0..=1.0).contains(&ex.label));
        }
    }

    #[test]
    fn synthetic_data_is_seed_deterministic() {
        let a = synthetic_dataset(20, &mut StdRng::seed_from_u64(9));
        let b = synthetic_dataset(20, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn grid_is_full_cartesian_product() {
        let cfg = ModelConfig::default();
        let grid = candidates(&cfg);
        assert_eq!(grid.len(), 8);
        assert_eq!(grid[0].learning_rate, 0.001);
        assert_eq!(grid[0].hidden_widths, vec![16, 8]);
        assert_eq!(grid[0].batch_size, 16);

        let single = candidates(&ModelConfig {
            grid_search: false,
            ..ModelConfig::default()
        });
        assert_eq!(single, vec![grid[0].clone()]);
    }

    #[test]
    fn holdout_takes_twenty_percent() {
        let samples: Vec<Sample> = (0..10)
            .map(|i| Sample {
                input: vec![i as f64],
                target: 0.0,
            })
            .collect();
        let (train, val) = holdout_split(&samples, 0.2);
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
        assert_eq!(val[0].input, vec![8.0]);
    }

    #[test]
    fn selection_is_deterministic() {
        let cfg = ModelConfig {
            bootstrap_examples: 80,
            bootstrap_epochs: 5,
            learning_rates: vec![0.001, 0.01],
            hidden_widths: vec![vec![4]],
            batch_sizes: vec![16],
            ..ModelConfig::default()
        };
        let samples: Vec<Sample> = synthetic_dataset(80, &mut StdRng::seed_from_u64(cfg.seed))
            .into_iter()
            .map(|ex| Sample {
                input: ex.features.0.to_vec(),
                target: ex.label,
            })
            .collect();

        let a = select_hyperparameters(&cfg, &samples);
        let b = select_hyperparameters(&cfg, &samples);
        assert_eq!(a, b);
        assert!(a.validation_loss.is_finite());
    }
}
