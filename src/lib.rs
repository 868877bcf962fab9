//! Interactive parameter-mapping engine.
//!
//! A small feed-forward neural network (an MLP) trained online from
//! examples supplied by demonstration: position the inputs, position the
//! desired outputs, commit the pair. The network then maps a normalised
//! input vector to a normalised output vector at interactive rates.
//!
//! This crate is the training-and-inference core only: it is
//! single-threaded, does no I/O, and has no opinion about who drives it
//! (a joystick, an audio feature extractor, a MIDI controller, ...). See
//! [`Iml`] for the facade most callers want; [`Mlp`], [`Dataset`],
//! [`Layer`], and [`Node`] are exposed for callers who need the lower
//! layers directly.

mod activation;
mod dataset;
mod error;
mod iml;
mod layer;
mod loss;
mod mlp;
mod node;

pub use activation::Activation;
pub use dataset::{Dataset, ForgetMode};
pub use error::{EngineError, EngineResult};
pub use iml::{Iml, ImlConfig, Mode, SaveState};
pub use layer::Layer;
pub use loss::Loss;
pub use mlp::{Mlp, NodeWeights, ProgressCallback, WeightInit, WeightSnapshot};
pub use node::Node;
