//! Small dense regression network: ReLU hidden layers, sigmoid output,
//! mean squared error, Adam.
//!
//! Sized for a handful of inputs and a few hundred samples, so everything is
//! plain `Vec<f64>` math on the calling thread.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Sample {
    pub input: Vec<f64>,
    pub target: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-z).exp()),
        }
    }

    /// Derivative w.r.t. the pre-activation `z`, given its output `a`.
    fn derivative(self, z: f64, a: f64) -> f64 {
        match self {
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => a * (1.0 - a),
        }
    }
}

#[derive(Debug, Clone)]
struct Dense {
    inputs: usize,
    outputs: usize,
    // outputs x inputs, row-major
    weights: Vec<f64>,
    biases: Vec<f64>,
    activation: Activation,

    m_w: Vec<f64>,
    v_w: Vec<f64>,
    m_b: Vec<f64>,
    v_b: Vec<f64>,
}

impl Dense {
    fn new(inputs: usize, outputs: usize, activation: Activation, rng: &mut StdRng) -> Self {
        // He uniform.
        let limit = (6.0 / inputs.max(1) as f64).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();

        Self {
            inputs,
            outputs,
            weights,
            biases: vec![0.0; outputs],
            activation,
            m_w: vec![0.0; inputs * outputs],
            v_w: vec![0.0; inputs * outputs],
            m_b: vec![0.0; outputs],
            v_b: vec![0.0; outputs],
        }
    }

    /// Returns `(pre_activations, activations)`.
    fn forward(&self, x: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut z = Vec::with_capacity(self.outputs);
        let mut a = Vec::with_capacity(self.outputs);
        for j in 0..self.outputs {
            let row = &self.weights[j * self.inputs..(j + 1) * self.inputs];
            let sum = row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + self.biases[j];
            z.push(sum);
            a.push(self.activation.apply(sum));
        }
        (z, a)
    }

    fn adam_update(&mut self, grad_w: &[f64], grad_b: &[f64], lr: f64, step: i32) {
        let bc1 = 1.0 - BETA1.powi(step);
        let bc2 = 1.0 - BETA2.powi(step);
        adam_step(&mut self.weights, &mut self.m_w, &mut self.v_w, grad_w, lr, bc1, bc2);
        adam_step(&mut self.biases, &mut self.m_b, &mut self.v_b, grad_b, lr, bc1, bc2);
    }
}

fn adam_step(
    params: &mut [f64],
    m: &mut [f64],
    v: &mut [f64],
    grad: &[f64],
    lr: f64,
    bc1: f64,
    bc2: f64,
) {
    for i in 0..params.len() {
        m[i] = BETA1 * m[i] + (1.0 - BETA1) * grad[i];
        v[i] = BETA2 * v[i] + (1.0 - BETA2) * grad[i] * grad[i];
        let m_hat = m[i] / bc1;
        let v_hat = v[i] / bc2;
        params[i] -= lr * m_hat / (v_hat.sqrt() + EPSILON);
    }
}

/// `inputs -> hidden.. (ReLU) -> 1 (sigmoid)`.
#[derive(Debug, Clone)]
pub(crate) struct Network {
    layers: Vec<Dense>,
    step: i32,
}

impl Network {
    pub(crate) fn new(inputs: usize, hidden: &[usize], rng: &mut StdRng) -> Self {
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut fan_in = inputs;
        for &width in hidden {
            let width = width.max(1);
            layers.push(Dense::new(fan_in, width, Activation::Relu, rng));
            fan_in = width;
        }
        layers.push(Dense::new(fan_in, 1, Activation::Sigmoid, rng));
        Self { layers, step: 0 }
    }

    pub(crate) fn predict(&self, x: &[f64]) -> f64 {
        let mut a = x.to_vec();
        for layer in &self.layers {
            a = layer.forward(&a).1;
        }
        a.first().copied().unwrap_or(0.5)
    }

    pub(crate) fn mse(&self, samples: &[Sample]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples
            .iter()
            .map(|s| (self.predict(&s.input) - s.target).powi(2))
            .sum::<f64>()
            / samples.len() as f64
    }

    /// Mini-batch training. Returns the mean loss of the last epoch, or
    /// `None` when there was nothing to train on.
    pub(crate) fn fit(
        &mut self,
        samples: &[Sample],
        epochs: usize,
        batch_size: usize,
        lr: f64,
        rng: &mut StdRng,
    ) -> Option<f64> {
        if samples.is_empty() || epochs == 0 {
            return None;
        }

        let batch_size = batch_size.max(1);
        let mut order: Vec<usize> = (0..samples.len()).collect();
        let mut last = 0.0;

        for _ in 0..epochs {
            order.shuffle(rng);
            let mut total = 0.0;
            for chunk in order.chunks(batch_size) {
                let batch: Vec<&Sample> = chunk.iter().map(|&i| &samples[i]).collect();
                total += self.train_batch(&batch, lr) * batch.len() as f64;
            }
            last = total / samples.len() as f64;
        }

        Some(last)
    }

    fn train_batch(&mut self, batch: &[&Sample], lr: f64) -> f64 {
        let n = batch.len() as f64;
        let mut grads: Vec<(Vec<f64>, Vec<f64>)> = self
            .layers
            .iter()
            .map(|l| (vec![0.0; l.weights.len()], vec![0.0; l.biases.len()]))
            .collect();
        let mut loss = 0.0;

        for sample in batch {
            // Forward, keeping each layer's input, pre-activation and output.
            let mut inputs: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len());
            let mut zs: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len());
            let mut outs: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len());
            let mut a = sample.input.clone();
            for layer in &self.layers {
                let (z, next) = layer.forward(&a);
                inputs.push(a);
                zs.push(z);
                outs.push(next.clone());
                a = next;
            }

            let prediction = a.first().copied().unwrap_or(0.0);
            let err = prediction - sample.target;
            loss += err * err;

            // Backward. `delta` is dL/da for the current layer's outputs.
            let mut delta = vec![2.0 * err / n];
            for li in (0..self.layers.len()).rev() {
                let layer = &self.layers[li];
                let dz: Vec<f64> = delta
                    .iter()
                    .enumerate()
                    .map(|(j, d)| d * layer.activation.derivative(zs[li][j], outs[li][j]))
                    .collect();

                let (gw, gb) = &mut grads[li];
                for j in 0..layer.outputs {
                    gb[j] += dz[j];
                    for i in 0..layer.inputs {
                        gw[j * layer.inputs + i] += dz[j] * inputs[li][i];
                    }
                }

                if li > 0 {
                    delta = (0..layer.inputs)
                        .map(|i| {
                            (0..layer.outputs)
                                .map(|j| layer.weights[j * layer.inputs + i] * dz[j])
                                .sum()
                        })
                        .collect();
                }
            }
        }

        self.step = self.step.saturating_add(1);
        let step = self.step;
        for (layer, (gw, gb)) in self.layers.iter_mut().zip(grads) {
            layer.adam_update(&gw, &gb, lr, step);
        }

        loss / n
    }
}

/// Per-feature standardisation fitted once and then frozen.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Standardizer {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl Standardizer {
    pub(crate) fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let n = rows.len().max(1) as f64;

        let mean: Vec<f64> = (0..width)
            .map(|c| rows.iter().map(|r| r[c]).sum::<f64>() / n)
            .collect();
        let std = (0..width)
            .map(|c| {
                let var = rows.iter().map(|r| (r[c] - mean[c]).powi(2)).sum::<f64>() / n;
                let s = var.sqrt();
                if s > 1e-9 { s } else { 1.0 }
            })
            .collect();

        Self { mean, std }
    }

    pub(crate) fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(c, v)| match (self.mean.get(c), self.std.get(c)) {
                (Some(m), Some(s)) => (v - m) / s,
                _ => *v,
            })
            .collect()
    }
}
