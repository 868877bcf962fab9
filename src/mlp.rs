//! Ordered sequence of layers: forward pass, backward pass, weight
//! read/write, perturbation/randomisation, and the two training loops.

use num_traits::Float;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[cfg(feature = "logging")]
use tracing::debug;

use crate::activation::Activation;
use crate::error::EngineError;
use crate::layer::Layer;
use crate::loss::Loss;

/// How a freshly-constructed [`Mlp`]'s weights and biases are filled.
#[derive(Debug, Clone, Copy)]
pub enum WeightInit<F> {
    /// Every weight and bias set to the same constant.
    Constant(F),
    /// Weights and biases drawn uniformly from `[-1, 1]`.
    Random,
}

/// A single node's weights and bias, as returned by [`Mlp::get_weights`].
pub type NodeWeights<F> = (Vec<F>, F);
/// A full weight snapshot: one entry per layer, one entry per node.
pub type WeightSnapshot<F> = Vec<Vec<NodeWeights<F>>>;

/// The progress callback invoked during training: `(iteration, loss)`.
pub type ProgressCallback<'a, F> = dyn FnMut(u32, F) + 'a;

/// An ordered sequence of layers `L_1 .. L_K` with `L_i.n_out ==
/// L_{i+1}.n_in`, `L_1.n_in == n_inputs`, `L_K.n_out == n_outputs`.
pub struct Mlp<F: Float> {
    layers: Vec<Layer<F>>,
    n_inputs: usize,
    n_outputs: usize,
    loss: Loss,
    rng: StdRng,
}

impl<F: Float + std::fmt::Debug> Mlp<F> {
    /// Builds an MLP from adjacent `layer_sizes` pairs, one [`Layer`] per
    /// pair, each using the matching entry of `activations`.
    ///
    /// Requires `layer_sizes.len() >= 2` and `activations.len() ==
    /// layer_sizes.len() - 1`.
    pub fn new(
        layer_sizes: &[usize],
        activations: &[Activation],
        loss: Loss,
        init: WeightInit<F>,
    ) -> Result<Self, EngineError> {
        Self::with_seed(layer_sizes, activations, loss, init, rand::random())
    }

    /// Same as [`Mlp::new`] but with an explicit RNG seed, for
    /// reproducible construction in tests and demos.
    pub fn with_seed(
        layer_sizes: &[usize],
        activations: &[Activation],
        loss: Loss,
        init: WeightInit<F>,
        seed: u64,
    ) -> Result<Self, EngineError> {
        if layer_sizes.len() < 2 {
            return Err(EngineError::InvalidConfig(
                "an MLP needs at least one layer (layer_sizes.len() >= 2)".to_string(),
            ));
        }
        if activations.len() != layer_sizes.len() - 1 {
            return Err(EngineError::InvalidConfig(format!(
                "expected {} activations, got {}",
                layer_sizes.len() - 1,
                activations.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers = Vec::with_capacity(layer_sizes.len() - 1);
        for (pair, &activation) in layer_sizes.windows(2).zip(activations) {
            let (n_in, n_out) = (pair[0], pair[1]);
            let layer = match init {
                WeightInit::Constant(value) => Layer::constant(n_in, n_out, activation, value),
                WeightInit::Random => Layer::random(n_in, n_out, activation, &mut rng),
            };
            layers.push(layer);
        }

        Ok(Mlp {
            n_inputs: layer_sizes[0],
            n_outputs: *layer_sizes.last().unwrap(),
            layers,
            loss,
            rng,
        })
    }

    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    pub fn n_hidden(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn loss(&self) -> Loss {
        self.loss
    }

    /// Runs `input` through every layer in order. When `capture` is set,
    /// returns the per-layer input history alongside the output (one
    /// entry per layer, `K` entries total) for use by [`Mlp::train`] and
    /// the mini-batch accumulation path. When `for_inference` is set and
    /// the configured loss is cross-entropy with more than one output,
    /// softmax is applied to the returned output vector.
    pub fn forward(
        &mut self,
        input: &[F],
        capture: bool,
        for_inference: bool,
    ) -> Result<(Vec<F>, Option<Vec<Vec<F>>>), EngineError> {
        if input.len() != self.n_inputs {
            return Err(EngineError::ShapeMismatch {
                expected: self.n_inputs,
                actual: input.len(),
            });
        }

        let mut history = if capture { Some(Vec::with_capacity(self.layers.len())) } else { None };
        let mut current = input.to_vec();
        for layer in self.layers.iter_mut() {
            current = layer.forward(&current, history.as_mut());
        }

        if for_inference && self.loss == Loss::CrossEntropy && self.n_outputs > 1 {
            softmax_in_place(&mut current);
        }

        Ok((current, history))
    }

    /// Per-sample online training: one weight update per example, `lr`
    /// fixed, RMSProp not involved (that lives in [`Mlp::train_batch`]).
    pub fn train(
        &mut self,
        features: &[Vec<F>],
        labels: &[Vec<F>],
        lr: F,
        max_iter: u32,
        convergence_threshold: F,
        mut progress: Option<&mut ProgressCallback<'_, F>>,
    ) -> Result<(), EngineError> {
        if features.is_empty() {
            return Err(EngineError::EmptyInput);
        }
        if features.len() != labels.len() {
            return Err(EngineError::ShapeMismatch {
                expected: features.len(),
                actual: labels.len(),
            });
        }

        let n_samples = features.len();
        let scale = F::one() / F::from(n_samples).unwrap();
        let mut out_grad = vec![F::zero(); self.n_outputs];

        for iter in 0..max_iter {
            let mut epoch_loss = F::zero();
            for (feature, label) in features.iter().zip(labels) {
                let (output, history) = self.forward(feature, true, false)?;
                let history = history.expect("capture was requested");
                let loss_s = self.loss.compute(label, &output, &mut out_grad, scale)?;

                let mut grad = out_grad.clone();
                for (layer, input_acts) in self.layers.iter_mut().rev().zip(history.iter().rev()) {
                    grad = layer.update(input_acts, &grad, lr);
                }
                epoch_loss = epoch_loss + loss_s;
            }
            // Matches the source system's literal averaging: the per-sample
            // loss already carries a 1/N factor via `scale`, and the epoch
            // total is scaled by 1/N again here. Preserved verbatim rather
            // than "corrected", per the numeric-policy-fidelity requirement.
            epoch_loss = epoch_loss * scale;

            let is_periodic = iter % 32 == 0;
            let converged = epoch_loss < convergence_threshold;
            let is_last = iter + 1 == max_iter;
            if let Some(cb) = progress.as_deref_mut() {
                if is_periodic || converged || is_last {
                    cb(iter, epoch_loss);
                }
            }
            #[cfg(feature = "logging")]
            debug!(iter, loss = ?epoch_loss, "per-sample training iteration");
            if converged {
                break;
            }
        }

        Ok(())
    }

    /// Mini-batch training with RMSProp and global-gradient-norm clipping.
    pub fn train_batch(
        &mut self,
        features: &[Vec<F>],
        labels: &[Vec<F>],
        lr: F,
        max_iter: u32,
        batch_size: usize,
        convergence_threshold: F,
        mut progress: Option<&mut ProgressCallback<'_, F>>,
    ) -> Result<(), EngineError> {
        if features.is_empty() {
            return Err(EngineError::EmptyInput);
        }
        if features.len() != labels.len() {
            return Err(EngineError::ShapeMismatch {
                expected: features.len(),
                actual: labels.len(),
            });
        }
        let batch_size = batch_size.max(1);
        let norm_clip = F::from(5.0).unwrap();
        let mut out_grad = vec![F::zero(); self.n_outputs];
        let n = features.len();

        for iter in 0..max_iter {
            let mut order: Vec<usize> = (0..n).collect();
            shuffle(&mut order, &mut self.rng);

            let mut epoch_loss = F::zero();
            let mut n_batches = 0usize;

            for batch in order.chunks(batch_size) {
                for layer in self.layers.iter_mut() {
                    layer.init_accumulators();
                }

                let mut batch_loss = F::zero();
                for &idx in batch {
                    let (output, history) = self.forward(&features[idx], true, false)?;
                    let history = history.expect("capture was requested");
                    let loss_s =
                        self.loss.compute(&labels[idx], &output, &mut out_grad, F::one())?;
                    batch_loss = batch_loss + loss_s;

                    let mut grad = out_grad.clone();
                    for (layer, input_acts) in
                        self.layers.iter_mut().rev().zip(history.iter().rev())
                    {
                        grad = layer.accumulate(input_acts, &grad);
                    }
                }

                let inv_batch = F::one() / F::from(batch.len()).unwrap();
                let grad_sumsq = self
                    .layers
                    .iter()
                    .fold(F::zero(), |acc, l| acc + l.grad_sumsq(inv_batch));
                let grad_norm = grad_sumsq.sqrt();
                if grad_norm > norm_clip {
                    let c = norm_clip / grad_norm;
                    for layer in self.layers.iter_mut() {
                        layer.scale_grads(c);
                    }
                }

                for layer in self.layers.iter_mut() {
                    layer.apply_step(lr, inv_batch);
                }

                epoch_loss = epoch_loss + batch_loss * inv_batch;
                n_batches += 1;
            }

            epoch_loss = epoch_loss / F::from(n_batches.max(1)).unwrap();

            let converged = epoch_loss < convergence_threshold;
            if let Some(cb) = progress.as_deref_mut() {
                cb(iter, epoch_loss);
            }
            #[cfg(feature = "logging")]
            debug!(iter, loss = ?epoch_loss, "mini-batch training iteration");
            if converged {
                break;
            }
        }

        Ok(())
    }

    pub fn get_weights(&self) -> WeightSnapshot<F> {
        self.layers.iter().map(Layer::get_weights).collect()
    }

    pub fn set_weights(&mut self, weights: &WeightSnapshot<F>) {
        debug_assert_eq!(weights.len(), self.layers.len());
        for (layer, layer_weights) in self.layers.iter_mut().zip(weights) {
            layer.set_weights(layer_weights);
        }
    }

    pub fn randomise_all(&mut self, scale: F) {
        let rng = &mut self.rng;
        for layer in self.layers.iter_mut() {
            layer.randomise_all(rng, scale);
        }
    }

    pub fn perturb_all(&mut self, speed: F) {
        let rng = &mut self.rng;
        for layer in self.layers.iter_mut() {
            layer.perturb_all(rng, speed);
        }
    }

    pub fn smooth_update(&mut self, other: &Mlp<F>, alpha: F) {
        debug_assert_eq!(other.layers.len(), self.layers.len());
        for (layer, other_layer) in self.layers.iter_mut().zip(&other.layers) {
            layer.smooth_update(other_layer, alpha);
        }
    }

    /// Replaces any non-finite weight/optimiser state across every layer
    /// with zero. The corruption is already repaired by the time this
    /// returns; `Err(NumericCorruption)` is a recovery signal, not a hard
    /// failure. Callers that want the bare fact without matching on the
    /// error can use `.is_err()`.
    pub fn sanitise_all(&mut self) -> Result<(), EngineError> {
        let mut corrupted = false;
        for layer in self.layers.iter_mut() {
            corrupted |= layer.sanitise();
        }
        if corrupted {
            Err(EngineError::NumericCorruption)
        } else {
            Ok(())
        }
    }

    pub fn reset_optimiser_all(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.reset_optimiser();
        }
    }
}

fn softmax_in_place<F: Float>(values: &mut [F]) {
    let max = values.iter().cloned().fold(values[0], F::max);
    let mut sum = F::zero();
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum = sum + *v;
    }
    for v in values.iter_mut() {
        *v = *v / sum;
    }
}

fn shuffle<R: rand::Rng>(order: &mut [usize], rng: &mut R) {
    use rand::seq::SliceRandom;
    order.shuffle(rng);
}
