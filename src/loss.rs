//! Named loss functions: scalar loss plus per-output gradient.

use num_traits::Float;

use crate::error::EngineError;

/// A named loss function, resolved at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    /// Mean squared error.
    Mse,
    /// Categorical cross-entropy with an implicit softmax over `actual`.
    CrossEntropy,
}

impl Loss {
    pub fn from_name(name: &str) -> Result<Self, EngineError> {
        match name.to_ascii_lowercase().as_str() {
            "mse" => Ok(Loss::Mse),
            "cross_entropy" | "crossentropy" | "cce" => Ok(Loss::CrossEntropy),
            other => Err(EngineError::InvalidConfig(format!("unknown loss '{other}'"))),
        }
    }

    /// Computes the scalar loss and writes the per-output gradient into
    /// `out_grad`. `out_grad.len()` must equal `expected.len() ==
    /// actual.len()`.
    pub fn compute<F: Float>(
        self,
        expected: &[F],
        actual: &[F],
        out_grad: &mut [F],
        sample_scale: F,
    ) -> Result<F, EngineError> {
        if expected.len() != actual.len() || expected.len() != out_grad.len() {
            return Err(EngineError::ShapeMismatch {
                expected: expected.len(),
                actual: actual.len(),
            });
        }
        match self {
            Loss::Mse => Ok(mse(expected, actual, out_grad, sample_scale)),
            Loss::CrossEntropy => cross_entropy(expected, actual, out_grad, sample_scale),
        }
    }
}

fn mse<F: Float>(expected: &[F], actual: &[F], out_grad: &mut [F], sample_scale: F) -> F {
    let n = F::from(expected.len()).unwrap();
    let two = F::from(2.0).unwrap();
    let mut sum_sq = F::zero();
    for (j, (&e, &a)) in expected.iter().zip(actual.iter()).enumerate() {
        let diff = e - a;
        sum_sq = sum_sq + diff * diff;
        out_grad[j] = -two / n * diff * sample_scale;
    }
    sample_scale * (sum_sq / n)
}

fn cross_entropy<F: Float>(
    expected: &[F],
    actual: &[F],
    out_grad: &mut [F],
    sample_scale: F,
) -> Result<F, EngineError> {
    let half = F::from(0.5).unwrap();
    let target = expected
        .iter()
        .position(|&e| e > half)
        .ok_or_else(|| {
            EngineError::InvalidConfig(
                "cross-entropy loss requires a one-hot target (an expected value > 0.5)"
                    .to_string(),
            )
        })?;

    let max = actual.iter().cloned().fold(actual[0], F::max);
    let mut sum_exp = F::zero();
    for &a in actual {
        sum_exp = sum_exp + (a - max).exp();
    }
    let log_sum_exp = max + sum_exp.ln();

    for (i, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
        let softmax_i = (a - max).exp() / sum_exp;
        out_grad[i] = (softmax_i - e) * sample_scale;
    }

    let loss = sample_scale * (log_sum_exp - actual[target]);
    Ok(loss)
}
