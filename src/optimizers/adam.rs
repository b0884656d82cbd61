//! Adam (Adaptive Moment Estimation) hyperparameters
//!
//! The engine keeps the moment estimates; this side only exports the
//! hyperparameters of the update rule:
//!
//! ```text
//! m_t = β1 * m_{t-1} + (1 - β1) * gradient
//! v_t = β2 * v_{t-1} + (1 - β2) * gradient²
//! m_hat = m_t / (1 - β1^t)
//! v_hat = v_t / (1 - β2^t)
//! parameter = parameter - α * m_hat / (√v_hat + ε)
//! ```
//!
//! # Reference
//!
//! Kingma, D. P., & Ba, J. (2014). Adam: A method for stochastic optimization.
//! arXiv preprint arXiv:1412.6980.

use crate::optimizers::{export_state, Optimizer, OptimizerState};
use serde::Serialize;

/// Adam optimizer.
///
/// # Fields
///
/// * `learning_rate` - The step size for parameter updates (α)
/// * `b1` - Exponential decay rate for first moment estimates (typically 0.9)
/// * `b2` - Exponential decay rate for second moment estimates (typically 0.999)
/// * `epsilon` - Small constant for numerical stability (typically 1e-8)
#[derive(Debug, Clone, Serialize)]
pub struct Adam {
    learning_rate: f64,
    b1: f64,
    b2: f64,
    epsilon: f64,
}

impl Adam {
    pub fn new(learning_rate: f64, b1: f64, b2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            b1,
            b2,
            epsilon,
        }
    }

    pub fn b1(&self) -> f64 {
        self.b1
    }

    pub fn b2(&self) -> f64 {
        self.b2
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.001, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn name(&self) -> &'static str {
        "Adam"
    }

    fn data_dict(&self) -> OptimizerState {
        export_state(self.name(), self)
    }

    fn boxed_clone(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_adam_defaults() {
        let adam = Adam::default();
        assert_eq!(adam.data_dict()["learning_rate"], 0.001);
        assert_eq!(adam.b1(), 0.9);
        assert_eq!(adam.b2(), 0.999);
        assert_eq!(adam.epsilon(), 1e-8);
    }

    #[test]
    fn test_adam_state() {
        let state = Adam::new(0.002, 0.8, 0.99, 1e-7).data_dict();

        assert_eq!(state["name"], "Adam");
        assert_relative_eq!(state["learning_rate"].as_f64().unwrap(), 0.002, epsilon = 1e-6);
        assert_relative_eq!(state["b1"].as_f64().unwrap(), 0.8, epsilon = 1e-6);
        assert_relative_eq!(state["b2"].as_f64().unwrap(), 0.99, epsilon = 1e-6);
        assert!(state.contains_key("epsilon"));
    }
}
