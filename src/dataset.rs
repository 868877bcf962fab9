//! Bounded store of (feature, label) pairs with a selectable eviction
//! policy and random full-dataset sampling.

use num_traits::Float;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "logging")]
use tracing::debug;

use crate::error::EngineError;

/// Eviction policy applied when [`Dataset::add`] is called at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgetMode {
    /// Evict the oldest example.
    Fifo,
    /// Evict a uniformly random example.
    RandomEqual,
    /// Evict an example with probability proportional to its age.
    RandomOlder,
}

/// A bounded, optionally-replayed store of training examples.
///
/// Invariants: `N <= max_examples`; all feature vectors share one width,
/// all label vectors share another; when `N > 0`, `timestamps` is
/// strictly increasing.
pub struct Dataset<F: Float> {
    features: Vec<Vec<F>>,
    labels: Vec<Vec<F>>,
    timestamps: Vec<u64>,
    max_examples: usize,
    replay_enabled: bool,
    forget_mode: ForgetMode,
    next_timestamp: u64,
    rng: StdRng,
}

impl<F: Float> Dataset<F> {
    pub fn new(max_examples: usize, replay_enabled: bool, forget_mode: ForgetMode) -> Self {
        Self::with_seed(max_examples, replay_enabled, forget_mode, rand::random())
    }

    pub fn with_seed(
        max_examples: usize,
        replay_enabled: bool,
        forget_mode: ForgetMode,
        seed: u64,
    ) -> Self {
        Dataset {
            features: Vec::new(),
            labels: Vec::new(),
            timestamps: Vec::new(),
            max_examples,
            replay_enabled,
            forget_mode,
            next_timestamp: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn size(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn max_examples(&self) -> usize {
        self.max_examples
    }

    pub fn replay_enabled(&self) -> bool {
        self.replay_enabled
    }

    pub fn forget_mode(&self) -> ForgetMode {
        self.forget_mode
    }

    /// Appends `(feature, label)`, evicting per [`ForgetMode`] if the
    /// dataset is at capacity and replay is enabled. Returns whether an
    /// existing example was evicted to make room.
    pub fn add(&mut self, feature: Vec<F>, label: Vec<F>) -> Result<bool, EngineError> {
        if let Some(existing) = self.features.first() {
            if existing.len() != feature.len() {
                return Err(EngineError::ShapeMismatch {
                    expected: existing.len(),
                    actual: feature.len(),
                });
            }
        }
        if let Some(existing) = self.labels.first() {
            if existing.len() != label.len() {
                return Err(EngineError::ShapeMismatch {
                    expected: existing.len(),
                    actual: label.len(),
                });
            }
        }

        let mut evicted = false;
        if self.features.len() == self.max_examples {
            if !self.replay_enabled {
                return Err(EngineError::CapacityExceeded);
            }
            self.evict_one();
            evicted = true;
        }

        self.features.push(feature);
        self.labels.push(label);
        self.timestamps.push(self.next_timestamp);
        self.next_timestamp += 1;
        Ok(evicted)
    }

    fn evict_one(&mut self) {
        let n = self.features.len();
        if n == 0 {
            return;
        }
        let index = match self.forget_mode {
            ForgetMode::Fifo => 0,
            ForgetMode::RandomEqual => self.rng.gen_range(0..n),
            ForgetMode::RandomOlder => self.weighted_older_index(),
        };
        self.features.remove(index);
        self.labels.remove(index);
        self.timestamps.remove(index);
        #[cfg(feature = "logging")]
        debug!(index, mode = ?self.forget_mode, "evicted example");
    }

    fn weighted_older_index(&mut self) -> usize {
        let n = self.timestamps.len();
        let total_weight: u64 = self
            .timestamps
            .iter()
            .map(|&t| self.next_timestamp - t)
            .sum();
        if total_weight == 0 {
            return self.rng.gen_range(0..n);
        }
        let mut draw = self.rng.gen_range(0..total_weight);
        for (i, &t) in self.timestamps.iter().enumerate() {
            let weight = self.next_timestamp - t;
            if draw < weight {
                return i;
            }
            draw -= weight;
        }
        n - 1
    }

    /// A copy of the stored features. When `with_bias`, a trailing `1.0`
    /// is appended to every vector.
    pub fn features(&self, with_bias: bool) -> Vec<Vec<F>> {
        if with_bias {
            self.features
                .iter()
                .map(|f| {
                    let mut v = f.clone();
                    v.push(F::one());
                    v
                })
                .collect()
        } else {
            self.features.clone()
        }
    }

    pub fn labels(&self) -> Vec<Vec<F>> {
        self.labels.clone()
    }

    /// When replay is enabled, returns the entire dataset shuffled
    /// uniformly; otherwise returns it in insertion order.
    pub fn sample(&mut self, with_bias: bool) -> (Vec<Vec<F>>, Vec<Vec<F>>) {
        if !self.replay_enabled {
            return (self.features(with_bias), self.labels());
        }
        let mut order: Vec<usize> = (0..self.features.len()).collect();
        use rand::seq::SliceRandom;
        order.shuffle(&mut self.rng);

        let features = order
            .iter()
            .map(|&i| {
                let mut v = self.features[i].clone();
                if with_bias {
                    v.push(F::one());
                }
                v
            })
            .collect();
        let labels = order.iter().map(|&i| self.labels[i].clone()).collect();
        (features, labels)
    }

    pub fn clear(&mut self) {
        self.features.clear();
        self.labels.clear();
        self.timestamps.clear();
        self.next_timestamp = 0;
    }

    /// Shrinks the dataset to `m`, evicting per [`ForgetMode`] when replay
    /// is enabled, or right-truncating the insertion order otherwise.
    pub fn set_max_examples(&mut self, m: usize) {
        self.max_examples = m;
        if self.replay_enabled {
            while self.features.len() > m {
                self.evict_one();
            }
        } else {
            self.features.truncate(m);
            self.labels.truncate(m);
            self.timestamps.truncate(m);
        }
    }

    pub fn set_replay_enabled(&mut self, enabled: bool) {
        self.replay_enabled = enabled;
    }

    pub fn set_forget_mode(&mut self, mode: ForgetMode) {
        self.forget_mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_at_capacity_minus_one_succeeds() {
        let mut ds = Dataset::<f64>::new(3, true, ForgetMode::Fifo);
        ds.add(vec![0.0], vec![0.0]).unwrap();
        ds.add(vec![1.0], vec![1.0]).unwrap();
        assert_eq!(ds.size(), 2);
    }

    #[test]
    fn fifo_eviction_keeps_most_recent_three() {
        let mut ds = Dataset::<f64>::new(3, true, ForgetMode::Fifo);
        for i in 0..4 {
            ds.add(vec![i as f64], vec![i as f64]).unwrap();
        }
        let features = ds.features(false);
        assert_eq!(features, vec![vec![1.0], vec![2.0], vec![3.0]]);
        assert_eq!(ds.timestamps, vec![1, 2, 3]);
    }

    #[test]
    fn capacity_exceeded_when_replay_disabled() {
        let mut ds = Dataset::<f64>::new(1, false, ForgetMode::Fifo);
        ds.add(vec![0.0], vec![0.0]).unwrap();
        let err = ds.add(vec![1.0], vec![1.0]);
        assert!(matches!(err, Err(EngineError::CapacityExceeded)));
    }

    #[test]
    fn shape_mismatch_on_differing_feature_width() {
        let mut ds = Dataset::<f64>::new(4, true, ForgetMode::Fifo);
        ds.add(vec![0.0, 0.0], vec![0.0]).unwrap();
        let err = ds.add(vec![0.0], vec![0.0]);
        assert!(matches!(err, Err(EngineError::ShapeMismatch { .. })));
    }

    #[test]
    fn random_older_with_single_example_always_evicts_it() {
        let mut ds = Dataset::<f64>::with_seed(1, true, ForgetMode::RandomOlder, 9);
        ds.add(vec![0.0], vec![0.0]).unwrap();
        // `next_timestamp` is incremented right after the add above, so the
        // stored example already has age 1 by the time this second add
        // evicts it: the normal weighted draw runs here, not the
        // zero-total-weight fallback (see
        // `weighted_older_index_falls_back_to_uniform_on_zero_total_weight`
        // for that branch).
        ds.add(vec![1.0], vec![1.0]).unwrap();
        assert_eq!(ds.size(), 1);
    }

    #[test]
    fn weighted_older_index_falls_back_to_uniform_on_zero_total_weight() {
        // `weighted_older_index` can only see `total_weight == 0` if every
        // stored timestamp equals `next_timestamp`, which `add` never
        // produces (it increments `next_timestamp` immediately after
        // storing, so a stored age is always >= 1). Force the scenario
        // directly via private field access to exercise the fallback.
        let mut ds = Dataset::<f64>::with_seed(2, true, ForgetMode::RandomOlder, 5);
        ds.features = vec![vec![0.0], vec![1.0]];
        ds.labels = vec![vec![0.0], vec![1.0]];
        ds.timestamps = vec![3, 3];
        ds.next_timestamp = 3;
        let index = ds.weighted_older_index();
        assert!(index == 0 || index == 1);
    }

    #[test]
    fn clear_resets_timestamps() {
        let mut ds = Dataset::<f64>::new(3, true, ForgetMode::Fifo);
        ds.add(vec![0.0], vec![0.0]).unwrap();
        ds.clear();
        assert_eq!(ds.size(), 0);
        ds.add(vec![1.0], vec![1.0]).unwrap();
        assert_eq!(ds.timestamps, vec![0]);
    }

    #[test]
    fn features_with_bias_appends_one() {
        let mut ds = Dataset::<f64>::new(3, true, ForgetMode::Fifo);
        ds.add(vec![0.5, 0.25], vec![1.0]).unwrap();
        let features = ds.features(true);
        assert_eq!(features, vec![vec![0.5, 0.25, 1.0]]);
    }

    #[test]
    fn set_max_examples_truncates_when_replay_disabled() {
        let mut ds = Dataset::<f64>::new(5, false, ForgetMode::Fifo);
        for i in 0..4 {
            ds.add(vec![i as f64], vec![i as f64]).unwrap();
        }
        ds.set_max_examples(2);
        assert_eq!(ds.features(false), vec![vec![0.0], vec![1.0]]);
    }
}
