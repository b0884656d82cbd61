//! Stochastic Gradient Descent (SGD) hyperparameters
//!
//! The engine applies `v = momentum * v + (1 - momentum) * grad; w -= lr * v`.
//! With `momentum = 0` this is the vanilla update `w -= lr * grad`.

use crate::optimizers::{export_state, Optimizer, OptimizerState};
use serde::Serialize;

/// Stochastic Gradient Descent optimizer.
///
/// # Fields
///
/// * `learning_rate` - The step size for parameter updates
/// * `momentum` - Weight of the previous update direction (0 disables momentum)
///
/// # Example
///
/// ```
/// use ravdl::optimizers::{Optimizer, SGD};
///
/// let optimizer = SGD::new(0.01, 0.9);
/// let state = optimizer.data_dict();
/// assert_eq!(state["name"], "SGD");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SGD {
    learning_rate: f64,
    momentum: f64,
}

impl SGD {
    /// Creates a new SGD optimizer.
    ///
    /// # Typical Values
    ///
    /// Common learning rates range from 0.001 to 0.1, depending on the problem:
    /// - 0.01: Good starting point for many problems
    /// - 0.001: More conservative, useful for fine-tuning
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
        }
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }
}

impl Default for SGD {
    fn default() -> Self {
        Self::new(0.01, 0.0)
    }
}

impl Optimizer for SGD {
    fn name(&self) -> &'static str {
        "SGD"
    }

    fn data_dict(&self) -> OptimizerState {
        export_state(self.name(), self)
    }

    fn boxed_clone(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}
