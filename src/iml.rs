//! The interactive-ML facade: holds the input/output vectors, the mode
//! flag, and the two-step save protocol; drives the MLP for inference and
//! training.

use num_traits::Float;

use crate::activation::Activation;
use crate::dataset::{Dataset, ForgetMode};
use crate::error::EngineError;
use crate::loss::Loss;
use crate::mlp::{Mlp, WeightInit, WeightSnapshot};

/// Whether the facade is accepting interactive edits (`Training`) or
/// driving inference from the trained network (`Inference`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Inference,
    Training,
}

/// State of the two-call `save_example` protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Caller has positioned the input; the next `save_example` call
    /// suppresses inference so the output vector is free to edit.
    AwaitingInput,
    /// Caller is positioning the desired output; the next `save_example`
    /// call commits the pair to the dataset.
    AwaitingOutput,
}

/// Construction parameters for [`Iml`].
#[derive(Debug, Clone)]
pub struct ImlConfig<F> {
    pub n_inputs: usize,
    pub n_outputs: usize,
    /// Widths of the hidden layers, in order. May be empty for a direct
    /// input-to-output mapping.
    pub hidden_layers: Vec<usize>,
    /// One activation per layer (`hidden_layers.len() + 1` entries: each
    /// hidden layer, then the output layer).
    pub activations: Vec<Activation>,
    pub loss: Loss,
    pub weight_init: WeightInit<F>,
    pub learning_rate: F,
    pub max_iter: u32,
    pub convergence_threshold: F,
    pub dataset_max_examples: usize,
    pub replay_enabled: bool,
    pub forget_mode: ForgetMode,
    pub seed: Option<u64>,
}

impl<F: Float> Default for ImlConfig<F> {
    fn default() -> Self {
        ImlConfig {
            n_inputs: 1,
            n_outputs: 1,
            hidden_layers: vec![8, 8],
            activations: vec![Activation::Tanh, Activation::Tanh, Activation::Linear],
            loss: Loss::Mse,
            weight_init: WeightInit::Random,
            learning_rate: F::from(1.0).unwrap(),
            max_iter: 3000,
            convergence_threshold: F::from(1e-5).unwrap(),
            dataset_max_examples: 256,
            replay_enabled: true,
            forget_mode: ForgetMode::Fifo,
            seed: None,
        }
    }
}

/// Composes one [`Mlp`] and one [`Dataset`] behind a stable,
/// control-rate-friendly API.
pub struct Iml<F: Float> {
    mlp: Mlp<F>,
    dataset: Dataset<F>,
    input_state: Vec<F>,
    output_state: Vec<F>,
    mode: Mode,
    perform_inference: bool,
    input_dirty: bool,
    stored_weights: Option<WeightSnapshot<F>>,
    weights_were_perturbed: bool,
    save_state: SaveState,
    learning_rate: F,
    max_iter: u32,
    convergence_threshold: F,
    log: Option<Box<dyn FnMut(&str)>>,
}

impl<F: Float + std::fmt::Debug> Iml<F> {
    pub fn new(config: ImlConfig<F>) -> Result<Self, EngineError> {
        let mut layer_sizes = Vec::with_capacity(config.hidden_layers.len() + 2);
        // The bias unit is appended to the input vector at inference/train
        // time (see `process`), not stored in the dataset, so the first
        // layer's width is one more than the facade's own `n_inputs`.
        layer_sizes.push(config.n_inputs + 1);
        layer_sizes.extend(&config.hidden_layers);
        layer_sizes.push(config.n_outputs);

        let seed = config.seed.unwrap_or_else(rand::random);
        let mlp = Mlp::with_seed(
            &layer_sizes,
            &config.activations,
            config.loss,
            config.weight_init,
            seed,
        )?;
        let dataset = Dataset::with_seed(
            config.dataset_max_examples,
            config.replay_enabled,
            config.forget_mode,
            seed.wrapping_add(1),
        );

        Ok(Iml {
            mlp,
            dataset,
            input_state: vec![F::from(0.5).unwrap(); config.n_inputs],
            output_state: vec![F::zero(); config.n_outputs],
            mode: Mode::Training,
            perform_inference: true,
            input_dirty: false,
            stored_weights: None,
            weights_were_perturbed: false,
            save_state: SaveState::AwaitingInput,
            learning_rate: config.learning_rate,
            max_iter: config.max_iter,
            convergence_threshold: config.convergence_threshold,
            log: None,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn save_state(&self) -> SaveState {
        self.save_state
    }

    pub fn input_state(&self) -> &[F] {
        &self.input_state
    }

    pub fn get_outputs(&self) -> &[F] {
        &self.output_state
    }

    pub fn dataset(&self) -> &Dataset<F> {
        &self.dataset
    }

    pub fn set_logger(&mut self, logger: impl FnMut(&str) + 'static) {
        self.log = Some(Box::new(logger));
    }

    fn emit(&mut self, message: &str) {
        if let Some(log) = self.log.as_mut() {
            log(message);
        }
        #[cfg(feature = "logging")]
        tracing::info!("{}", message);
    }

    pub fn set_input(&mut self, i: usize, v: F) {
        self.input_state[i] = clamp01(v);
        self.input_dirty = true;
    }

    pub fn set_inputs(&mut self, values: &[F]) {
        for (i, &v) in values.iter().enumerate() {
            self.input_state[i] = clamp01(v);
        }
        self.input_dirty = true;
    }

    pub fn set_output(&mut self, j: usize, v: F) {
        self.output_state[j] = clamp01(v);
    }

    pub fn set_outputs(&mut self, values: &[F]) {
        for (j, &v) in values.iter().enumerate() {
            self.output_state[j] = clamp01(v);
        }
    }

    /// Runs inference into `output_state` iff `perform_inference` is set
    /// and the input has changed since the last call. Otherwise a no-op.
    pub fn process(&mut self) -> Result<(), EngineError> {
        if self.perform_inference && self.input_dirty {
            self.run_inference()?;
            self.input_dirty = false;
        }
        Ok(())
    }

    /// Unconditional forward pass into `output_state`, bypassing the
    /// dirty-flag gate. Used by the save protocol, weight perturbation,
    /// and training completion, all of which must refresh the displayed
    /// output regardless of whether `input_state` itself just changed.
    fn run_inference(&mut self) -> Result<(), EngineError> {
        let mut input = self.input_state.clone();
        input.push(F::one());
        let (output, _) = self.mlp.forward(&input, false, true)?;
        self.output_state = output;
        Ok(())
    }

    /// Programmatic path: adds an example directly, bypassing the
    /// interactive save protocol.
    pub fn add_example(&mut self, feature: Vec<F>, label: Vec<F>) -> Result<bool, EngineError> {
        self.dataset.add(feature, label)
    }

    /// The interactive two-step save protocol (see [`SaveState`]).
    pub fn save_example(&mut self) -> Result<(), EngineError> {
        match self.save_state {
            SaveState::AwaitingInput => {
                self.perform_inference = false;
                self.emit("Move to desired output position...");
                self.save_state = SaveState::AwaitingOutput;
            }
            SaveState::AwaitingOutput => {
                self.dataset
                    .add(self.input_state.clone(), self.output_state.clone())?;
                self.perform_inference = true;
                self.run_inference()?;
                self.input_dirty = false;
                self.emit("Example saved.");
                self.save_state = SaveState::AwaitingInput;
            }
        }
        Ok(())
    }

    /// Allowed only in [`Mode::Training`].
    pub fn clear_dataset(&mut self) -> Result<(), EngineError> {
        self.require_training_mode("clear_dataset")?;
        self.dataset.clear();
        self.emit("Dataset cleared.");
        Ok(())
    }

    /// Allowed only in [`Mode::Training`]. Snapshots the current weights
    /// so that a subsequent `set_mode(Inference)` can restore them.
    pub fn randomise_weights(&mut self) -> Result<(), EngineError> {
        self.require_training_mode("randomise_weights")?;
        self.stored_weights = Some(self.mlp.get_weights());
        self.mlp.randomise_all(F::one());
        self.weights_were_perturbed = true;
        self.run_inference()?;
        self.emit("Weights randomised.");
        Ok(())
    }

    /// Allowed only in [`Mode::Training`]. Unlike [`Iml::randomise_weights`],
    /// this does *not* snapshot — the asymmetry is intentional (see
    /// DESIGN.md): a perturbation is meant to be either kept by the user
    /// or discarded by a fresh randomisation, never silently rolled back.
    pub fn perturb_weights(&mut self, speed: F) -> Result<(), EngineError> {
        self.require_training_mode("perturb_weights")?;
        self.mlp.perturb_all(speed);
        self.run_inference()?;
        Ok(())
    }

    /// Replaces any non-finite weight/optimiser state with zero. Returns
    /// whether any substitution occurred.
    pub fn sanitise_weights(&mut self) -> bool {
        let corrupted = self.mlp.sanitise_all().is_err();
        if corrupted {
            self.emit(&EngineError::NumericCorruption.to_string());
        }
        corrupted
    }

    fn require_training_mode(&self, op: &str) -> Result<(), EngineError> {
        if self.mode != Mode::Training {
            return Err(EngineError::InvalidConfig(format!(
                "{op} is only allowed in Training mode"
            )));
        }
        Ok(())
    }

    /// Transitions to `mode`. `Training -> Inference` first restores any
    /// perturbation snapshot, then trains on the full dataset (a no-op
    /// plus log if the dataset is empty), then runs one inference pass.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), EngineError> {
        if self.mode == Mode::Training && mode == Mode::Inference {
            if self.weights_were_perturbed {
                if let Some(weights) = self.stored_weights.take() {
                    self.mlp.set_weights(&weights);
                }
                self.weights_were_perturbed = false;
            }

            let features = self.dataset.features(true);
            let labels = self.dataset.labels();
            if features.is_empty() {
                self.emit("Empty dataset, skipping training.");
            } else {
                self.mlp.train(
                    &features,
                    &labels,
                    self.learning_rate,
                    self.max_iter,
                    self.convergence_threshold,
                    None,
                )?;
                self.emit("Training complete.");
            }

            self.perform_inference = true;
            self.run_inference()?;
            self.input_dirty = false;
        }

        self.mode = mode;
        Ok(())
    }
}

fn clamp01<F: Float>(v: F) -> F {
    let zero = F::zero();
    let one = F::one();
    if v < zero {
        zero
    } else if v > one {
        one
    } else {
        v
    }
}
