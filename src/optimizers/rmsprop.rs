//! RMSprop hyperparameters
//!
//! Engine-side rule: `s = rho * s + (1 - rho) * grad²; w -= lr * grad / (√s + ε)`.

use crate::optimizers::{export_state, Optimizer, OptimizerState};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RMSprop {
    learning_rate: f64,
    rho: f64,
    epsilon: f64,
}

impl RMSprop {
    pub fn new(learning_rate: f64, rho: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            rho,
            epsilon,
        }
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }
}

impl Default for RMSprop {
    fn default() -> Self {
        Self::new(0.01, 0.9, 1e-8)
    }
}

impl Optimizer for RMSprop {
    fn name(&self) -> &'static str {
        "RMSprop"
    }

    fn data_dict(&self) -> OptimizerState {
        export_state(self.name(), self)
    }

    fn boxed_clone(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}
