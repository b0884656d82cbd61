//! Local descriptors of engine-owned weights
//!
//! The authoritative weights live inside the execution engine. A layer keeps a
//! `WeightShadow` per weight tensor so it can report parameter counts and
//! describe the initial distribution, without allocating the tensor.

use crate::shape::Shape;
use crate::utils::SimpleRng;

/// Initial value distribution of a weight tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    /// Uniform on `[-limit, limit]`.
    Uniform { limit: f32 },
    Zeros,
    Ones,
}

/// Shape and initializer of one weight tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightShadow {
    shape: Shape,
    init: Init,
}

impl WeightShadow {
    pub fn new(shape: impl Into<Shape>, init: Init) -> Self {
        Self {
            shape: shape.into(),
            init,
        }
    }

    /// Uniform with `limit = 1 / sqrt(fan_in)`.
    pub fn uniform_fan_in(shape: impl Into<Shape>, fan_in: usize) -> Self {
        let limit = 1.0 / (fan_in as f32).sqrt();
        Self::new(shape, Init::Uniform { limit })
    }

    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::new(shape, Init::Zeros)
    }

    pub fn ones(shape: impl Into<Shape>) -> Self {
        Self::new(shape, Init::Ones)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn init(&self) -> Init {
        self.init
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Draws the initial values, row-major.
    pub fn materialize(&self, rng: &mut SimpleRng) -> Vec<f32> {
        let count = self.numel();
        match self.init {
            Init::Uniform { limit } => rng.uniform_vec(count, -limit, limit),
            Init::Zeros => vec![0.0; count],
            Init::Ones => vec![1.0; count],
        }
    }
}
