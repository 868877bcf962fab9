//! Named activation functions and their derivatives.
//!
//! The original system keys activations by an enumerated identifier into a
//! process-wide registry of function pairs. Here the same contract is
//! expressed as a closed tagged variant resolved once, at layer
//! construction, to a pair of pure `Float -> Float` functions — no global
//! mutable state, no lookup on the hot path.

use num_traits::Float;

use crate::error::EngineError;

/// A named activation function, resolved at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Sigmoid,
    Tanh,
    Linear,
    /// Leaky ReLU with a fixed 0.01 leak slope on the negative side.
    ReLU,
    HardSigmoid,
    HardTanh,
    HardSwish,
}

impl Activation {
    /// Parses a case-insensitive name into an [`Activation`].
    pub fn from_name(name: &str) -> Result<Self, EngineError> {
        match name.to_ascii_lowercase().as_str() {
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "linear" => Ok(Activation::Linear),
            "relu" => Ok(Activation::ReLU),
            "hardsigmoid" | "hard_sigmoid" => Ok(Activation::HardSigmoid),
            "hardtanh" | "hard_tanh" => Ok(Activation::HardTanh),
            "hardswish" | "hard_swish" => Ok(Activation::HardSwish),
            other => Err(EngineError::InvalidConfig(format!(
                "unknown activation '{other}'"
            ))),
        }
    }

    /// Evaluates the activation at `x`.
    pub fn forward<F: Float>(self, x: F) -> F {
        let zero = F::zero();
        let one = F::one();
        match self {
            Activation::Sigmoid => one / (one + (-x).exp()),
            Activation::Tanh => x.tanh(),
            Activation::Linear => x,
            Activation::ReLU => {
                if x >= zero {
                    x
                } else {
                    leak::<F>() * x
                }
            }
            Activation::HardSigmoid => hard_sigmoid(x),
            Activation::HardTanh => clip(x, -one, one),
            Activation::HardSwish => {
                let three = F::from(3.0).unwrap();
                if x < -three {
                    zero
                } else if x > three {
                    x
                } else {
                    x * hard_sigmoid(x)
                }
            }
        }
    }

    /// Evaluates the activation's derivative at `x` (the pre-activation
    /// value, i.e. `x` is the argument to `forward`, not its output).
    /// Kinks use the right-hand derivative, consistent with `forward`'s own
    /// choice of which side owns the boundary point.
    pub fn derivative<F: Float>(self, x: F) -> F {
        let zero = F::zero();
        let one = F::one();
        match self {
            Activation::Sigmoid => {
                let s = self.forward(x);
                s * (one - s)
            }
            Activation::Tanh => {
                let t = x.tanh();
                one - t * t
            }
            Activation::Linear => one,
            Activation::ReLU => {
                if x >= zero {
                    one
                } else {
                    leak::<F>()
                }
            }
            Activation::HardSigmoid => hard_sigmoid_derivative(x),
            Activation::HardTanh => {
                if x >= -one && x < one {
                    one
                } else {
                    zero
                }
            }
            Activation::HardSwish => {
                let three = F::from(3.0).unwrap();
                if x < -three {
                    zero
                } else if x >= three {
                    one
                } else {
                    hard_sigmoid(x) + x * hard_sigmoid_derivative(x)
                }
            }
        }
    }
}

fn leak<F: Float>() -> F {
    F::from(0.01).unwrap()
}

fn clip<F: Float>(x: F, lo: F, hi: F) -> F {
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

fn hard_sigmoid<F: Float>(x: F) -> F {
    let zero = F::zero();
    let one = F::one();
    let three = F::from(3.0).unwrap();
    let six = F::from(6.0).unwrap();
    clip((x + three) / six, zero, one)
}

fn hard_sigmoid_derivative<F: Float>(x: F) -> F {
    let zero = F::zero();
    let one = F::one();
    let three = F::from(3.0).unwrap();
    let six = F::from(6.0).unwrap();
    if x >= -three && x < three {
        one / six
    } else {
        zero
    }
}
