//! A fixed-width slab of homogeneous neurons sharing one activation.

use num_traits::Float;
use rand::Rng;

use crate::activation::Activation;
use crate::node::Node;

/// `n_out` [`Node`]s, all of width `n_in`, sharing one [`Activation`].
#[derive(Debug, Clone)]
pub struct Layer<F: Float> {
    nodes: Vec<Node<F>>,
    activation: Activation,
}

impl<F: Float> Layer<F> {
    pub fn constant(n_in: usize, n_out: usize, activation: Activation, value: F) -> Self {
        Layer {
            nodes: (0..n_out).map(|_| Node::constant(n_in, value)).collect(),
            activation,
        }
    }

    pub fn random(n_in: usize, n_out: usize, activation: Activation, rng: &mut impl Rng) -> Self {
        Layer {
            nodes: (0..n_out).map(|_| Node::random(n_in, rng)).collect(),
            activation,
        }
    }

    pub fn n_in(&self) -> usize {
        self.nodes.first().map(Node::n_in).unwrap_or(0)
    }

    pub fn n_out(&self) -> usize {
        self.nodes.len()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn nodes(&self) -> &[Node<F>] {
        &self.nodes
    }

    /// Computes the layer's output for `input`. If `history` is supplied,
    /// `input` is appended to it before the output is computed — the
    /// mechanism by which [`crate::mlp::Mlp::forward`] captures per-layer
    /// activations for the backward pass.
    pub fn forward(&mut self, input: &[F], history: Option<&mut Vec<Vec<F>>>) -> Vec<F> {
        if let Some(history) = history {
            history.push(input.to_vec());
        }
        let activation = self.activation;
        self.nodes
            .iter_mut()
            .map(|node| activation.forward(node.forward(input)))
            .collect()
    }

    /// Backward pass with gradient accumulation (mini-batch path). Returns
    /// the downstream gradient (length `n_in`).
    pub fn accumulate(&mut self, input_activations: &[F], upstream_grad: &[F]) -> Vec<F> {
        debug_assert_eq!(upstream_grad.len(), self.nodes.len());
        let mut downstream = vec![F::zero(); self.n_in()];
        let activation = self.activation;
        for (node, &grad) in self.nodes.iter_mut().zip(upstream_grad) {
            let signal = grad * activation.derivative(node.last_pre_activation());
            for (d, w) in downstream.iter_mut().zip(node.weights()) {
                *d = *d + signal * *w;
            }
            node.accumulate(input_activations, signal);
        }
        downstream
    }

    /// Backward pass with an immediate per-sample weight update. Returns
    /// the downstream gradient computed from the pre-update weights.
    pub fn update(&mut self, input_activations: &[F], upstream_grad: &[F], lr: F) -> Vec<F> {
        debug_assert_eq!(upstream_grad.len(), self.nodes.len());
        let mut downstream = vec![F::zero(); self.n_in()];
        let activation = self.activation;
        for (node, &grad) in self.nodes.iter_mut().zip(upstream_grad) {
            let signal = grad * activation.derivative(node.last_pre_activation());
            for (d, w) in downstream.iter_mut().zip(node.weights()) {
                *d = *d + signal * *w;
            }
            node.update_direct(input_activations, -signal, lr);
        }
        downstream
    }

    pub fn grad_sumsq(&self, inv_batch: F) -> F {
        self.nodes
            .iter()
            .fold(F::zero(), |acc, node| acc + node.grad_sumsq(inv_batch))
    }

    pub fn scale_grads(&mut self, c: F) {
        for node in self.nodes.iter_mut() {
            node.scale_grads(c);
        }
    }

    pub fn init_accumulators(&mut self) {
        for node in self.nodes.iter_mut() {
            node.init_accumulators();
        }
    }

    pub fn clear_accumulators(&mut self) {
        for node in self.nodes.iter_mut() {
            node.clear_accumulators();
        }
    }

    pub fn apply_step(&mut self, lr: F, inv_batch: F) {
        for node in self.nodes.iter_mut() {
            node.apply_step(lr, inv_batch);
        }
    }

    pub fn reset_optimiser(&mut self) {
        for node in self.nodes.iter_mut() {
            node.reset_optimiser();
        }
    }

    pub fn sanitise(&mut self) -> bool {
        let mut corrupted = false;
        for node in self.nodes.iter_mut() {
            corrupted |= node.sanitise();
        }
        corrupted
    }

    pub fn randomise_all(&mut self, rng: &mut impl Rng, scale: F) {
        for node in self.nodes.iter_mut() {
            node.randomise(rng, scale);
        }
    }

    pub fn perturb_all(&mut self, rng: &mut impl Rng, speed: F) {
        for node in self.nodes.iter_mut() {
            node.perturb(rng, speed);
        }
    }

    pub fn smooth_update(&mut self, other: &Layer<F>, alpha: F) {
        debug_assert_eq!(other.nodes.len(), self.nodes.len());
        for (node, other_node) in self.nodes.iter_mut().zip(&other.nodes) {
            node.smooth_update(other_node.weights(), alpha);
        }
    }

    pub fn get_weights(&self) -> Vec<(Vec<F>, F)> {
        self.nodes
            .iter()
            .map(|n| (n.weights().to_vec(), n.bias()))
            .collect()
    }

    pub fn set_weights(&mut self, weights: &[(Vec<F>, F)]) {
        debug_assert_eq!(weights.len(), self.nodes.len());
        for (node, (w, b)) in self.nodes.iter_mut().zip(weights) {
            node.set_weights(w.clone(), *b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_shape_matches_n_out() {
        let mut layer = Layer::<f64>::constant(4, 3, Activation::Linear, 0.0);
        let out = layer.forward(&[1.0, 1.0, 1.0, 1.0], None);
        assert_eq!(out.len(), 3);
        assert_eq!(out, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn forward_records_history_when_requested() {
        let mut layer = Layer::<f64>::constant(2, 2, Activation::Linear, 1.0);
        let mut history = Vec::new();
        layer.forward(&[1.0, 2.0], Some(&mut history));
        assert_eq!(history, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn apply_step_zeroes_all_node_accumulators() {
        let mut layer = Layer::<f64>::constant(2, 2, Activation::Linear, 0.1);
        layer.forward(&[1.0, 1.0], None);
        let grad = layer.accumulate(&[1.0, 1.0], &[1.0, 1.0]);
        assert_eq!(grad.len(), 2);
        layer.apply_step(0.1, 1.0);
        assert_eq!(layer.grad_sumsq(1.0), 0.0);
    }
}
