//! A single neuron: weights, bias, per-weight RMSProp state, gradient
//! accumulator.

use num_traits::Float;
use rand::Rng;

/// One neuron of width `n_in`.
///
/// Invariant: `weights.len() == squared_grad_avg.len() == grad_accum.len()
/// == n_in`, upheld by construction and never violated by any mutator.
#[derive(Debug, Clone)]
pub struct Node<F: Float> {
    weights: Vec<F>,
    bias: F,
    squared_grad_avg: Vec<F>,
    bias_squared_grad_avg: F,
    grad_accum: Vec<F>,
    bias_grad_accum: F,
    last_pre_activation: F,
}

impl<F: Float> Node<F> {
    /// A node with every weight and the bias set to `value`.
    pub fn constant(n_in: usize, value: F) -> Self {
        Node {
            weights: vec![value; n_in],
            bias: value,
            squared_grad_avg: vec![F::zero(); n_in],
            bias_squared_grad_avg: F::zero(),
            grad_accum: vec![F::zero(); n_in],
            bias_grad_accum: F::zero(),
            last_pre_activation: F::zero(),
        }
    }

    /// A node with weights and bias drawn uniformly from `[-1, 1]`.
    pub fn random(n_in: usize, rng: &mut impl Rng) -> Self {
        let mut node = Self::constant(n_in, F::zero());
        for w in node.weights.iter_mut() {
            *w = uniform(rng, -F::one(), F::one());
        }
        node.bias = uniform(rng, -F::one(), F::one());
        node
    }

    pub fn n_in(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[F] {
        &self.weights
    }

    pub fn bias(&self) -> F {
        self.bias
    }

    pub fn set_weights(&mut self, weights: Vec<F>, bias: F) {
        debug_assert_eq!(weights.len(), self.weights.len());
        self.weights = weights;
        self.bias = bias;
    }

    pub fn last_pre_activation(&self) -> F {
        self.last_pre_activation
    }

    /// `inner = sum_j w_j * input_j + bias`; caches and returns it.
    ///
    /// Precondition: `input.len() == n_in`.
    pub fn forward(&mut self, input: &[F]) -> F {
        debug_assert_eq!(input.len(), self.weights.len());
        let mut inner = self.bias;
        for (w, x) in self.weights.iter().zip(input) {
            inner = inner + *w * *x;
        }
        self.last_pre_activation = inner;
        inner
    }

    /// Accumulates `signal = dE/d(inner)` scaled by `input` into the
    /// gradient accumulator. Additive across calls within a batch.
    pub fn accumulate(&mut self, input: &[F], signal: F) {
        for (g, x) in self.grad_accum.iter_mut().zip(input) {
            *g = *g + *x * signal;
        }
        self.bias_grad_accum = self.bias_grad_accum + signal;
    }

    /// Applies one RMSProp-style adaptive step using the accumulated
    /// gradient, then resets the accumulator to zero.
    pub fn apply_step(&mut self, lr: F, inv_batch: F) {
        let clip = F::from(10.0).unwrap();
        let decay = F::from(0.9).unwrap();
        let complement = F::from(0.1).unwrap();
        let avg_ceiling = F::from(1e6).unwrap();
        let lr_ceiling = F::one();
        let eps = F::from(1e-6).unwrap();

        for i in 0..self.weights.len() {
            let g = clamp(self.grad_accum[i] * inv_batch, -clip, clip);
            let mut avg = decay * self.squared_grad_avg[i] + complement * g * g;
            if avg > avg_ceiling {
                avg = avg_ceiling;
            }
            self.squared_grad_avg[i] = avg;
            let eta = min(lr / (avg.sqrt() + eps), lr_ceiling);
            self.weights[i] = self.weights[i] - eta * g;
            self.grad_accum[i] = F::zero();
        }

        let g = clamp(self.bias_grad_accum * inv_batch, -clip, clip);
        let mut avg = decay * self.bias_squared_grad_avg + complement * g * g;
        if avg > avg_ceiling {
            avg = avg_ceiling;
        }
        self.bias_squared_grad_avg = avg;
        let eta = min(lr / (avg.sqrt() + eps), lr_ceiling);
        self.bias = self.bias - eta * g;
        self.bias_grad_accum = F::zero();
    }

    /// Per-sample direct weight update (used only by per-sample training).
    pub fn update_direct(&mut self, input: &[F], signal: F, lr: F) {
        for (w, x) in self.weights.iter_mut().zip(input) {
            *w = *w + lr * *x * signal;
        }
        self.bias = self.bias + lr * signal;
    }

    /// Draws each weight uniformly in `[-scale, scale]`.
    ///
    /// The bias is intentionally left untouched here — see the
    /// `randomise_weights` open question in DESIGN.md.
    pub fn randomise(&mut self, rng: &mut impl Rng, scale: F) {
        for w in self.weights.iter_mut() {
            *w = uniform(rng, -scale, scale);
        }
    }

    /// Adds a sum-of-three-uniform-draws noise term, scaled by `3 * speed`,
    /// to each weight.
    pub fn perturb(&mut self, rng: &mut impl Rng, speed: F) {
        let three = F::from(3.0).unwrap();
        for w in self.weights.iter_mut() {
            let noise = uniform(rng, -F::one(), F::one())
                + uniform(rng, -F::one(), F::one())
                + uniform(rng, -F::one(), F::one());
            *w = *w + three * speed * noise;
        }
    }

    /// Replaces each weight with `(1 - alpha) * w + alpha * other`.
    pub fn smooth_update(&mut self, other_weights: &[F], alpha: F) {
        debug_assert_eq!(other_weights.len(), self.weights.len());
        let one = F::one();
        for (w, o) in self.weights.iter_mut().zip(other_weights) {
            *w = (one - alpha) * *w + alpha * *o;
        }
    }

    pub fn reset_optimiser(&mut self) {
        for a in self.squared_grad_avg.iter_mut() {
            *a = F::zero();
        }
        self.bias_squared_grad_avg = F::zero();
    }

    pub fn init_accumulators(&mut self) {
        self.clear_accumulators();
    }

    pub fn clear_accumulators(&mut self) {
        for g in self.grad_accum.iter_mut() {
            *g = F::zero();
        }
        self.bias_grad_accum = F::zero();
    }

    /// Sum of squares of the scaled per-weight gradient accumulator (used
    /// for global gradient-norm clipping in mini-batch training). The bias
    /// accumulator is deliberately excluded, matching the literal `Σ_j
    /// (grad_accum_j · inv_batch)²` definition over weights only.
    pub fn grad_sumsq(&self, inv_batch: F) -> F {
        let mut sum = F::zero();
        for g in &self.grad_accum {
            let scaled = *g * inv_batch;
            sum = sum + scaled * scaled;
        }
        sum
    }

    pub fn scale_grads(&mut self, c: F) {
        for g in self.grad_accum.iter_mut() {
            *g = *g * c;
        }
        self.bias_grad_accum = self.bias_grad_accum * c;
    }

    /// Replaces any non-finite weight, bias, or running average with zero.
    /// Returns whether any substitution occurred.
    pub fn sanitise(&mut self) -> bool {
        let mut corrupted = false;
        for w in self.weights.iter_mut() {
            if !w.is_finite() {
                *w = F::zero();
                corrupted = true;
            }
        }
        if !self.bias.is_finite() {
            self.bias = F::zero();
            corrupted = true;
        }
        for a in self.squared_grad_avg.iter_mut() {
            if !a.is_finite() {
                *a = F::zero();
                corrupted = true;
            }
        }
        if !self.bias_squared_grad_avg.is_finite() {
            self.bias_squared_grad_avg = F::zero();
            corrupted = true;
        }
        corrupted
    }
}

fn uniform<F: Float>(rng: &mut impl Rng, lo: F, hi: F) -> F {
    let t: f64 = rng.gen_range(0.0..1.0);
    let t = F::from(t).unwrap();
    lo + (hi - lo) * t
}

fn clamp<F: Float>(x: F, lo: F, hi: F) -> F {
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

fn min<F: Float>(a: F, b: F) -> F {
    if a < b {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn forward_zero_weights_zero_bias() {
        let mut node = Node::<f64>::constant(3, 0.0);
        assert_eq!(node.forward(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(node.last_pre_activation(), 0.0);
    }

    #[test]
    fn apply_step_resets_accumulator() {
        let mut node = Node::<f64>::constant(2, 0.5);
        node.forward(&[1.0, 1.0]);
        node.accumulate(&[1.0, 1.0], 0.3);
        node.apply_step(0.1, 1.0);
        assert_eq!(node.grad_accum, vec![0.0, 0.0]);
        assert_eq!(node.bias_grad_accum, 0.0);
    }

    #[test]
    fn sanitise_replaces_nan_weight_only() {
        let mut node = Node::<f64>::constant(2, 0.5);
        node.weights[0] = f64::NAN;
        let corrupted = node.sanitise();
        assert!(corrupted);
        assert_eq!(node.weights[0], 0.0);
        assert_eq!(node.weights[1], 0.5);
        assert_eq!(node.squared_grad_avg[0], 0.0);
    }

    #[test]
    fn randomise_draws_within_scale() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut node = Node::<f64>::constant(5, 0.0);
        node.randomise(&mut rng, 2.0);
        assert!(node.weights.iter().all(|&w| (-2.0..=2.0).contains(&w)));
    }
}
