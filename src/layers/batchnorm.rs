//! Batch normalization layer implementation
//!
//! The engine-side op normalizes activations per channel and applies the
//! learnable scale (gamma) and shift (beta):
//!
//! 1. Compute batch statistics: mean μ and variance σ² across the batch
//! 2. Normalize: x_norm = (x - μ) / sqrt(σ² + ε)
//! 3. Scale and shift: y = γ * x_norm + β
//!
//! In training mode the engine uses batch statistics and updates its running
//! statistics with `momentum`; in inference mode it uses the running
//! statistics. Which mode applies is carried by the `training` flag of each
//! forward declaration.
//!
//! # References
//!
//! Ioffe, S., & Szegedy, C. (2015). Batch Normalization: Accelerating Deep Network Training
//! by Reducing Internal Covariate Shift. ICML.

use crate::error::{LayerError, Result};
use crate::graph::{NodeHandle, OpDeclaration, OpGraph, OpKind, OpParams};
use crate::layers::{Layer, LayerBase, PassContext, WeightShadow};
use crate::optimizers::Optimizer;
use crate::shape::Shape;

/// Batch normalization layer.
///
/// `gamma` (ones) and `beta` (zeros) are shaped `(1, C)` for a flat input of
/// `C` features and `(1, C, 1, 1)` for a `(C, H, W)` input.
///
/// # Example
///
/// ```
/// use ravdl::layers::{BatchNormalization, Layer};
/// use ravdl::optimizers::Adam;
/// use ravdl::Shape;
///
/// let mut layer = BatchNormalization::default();
/// layer.set_input_shape(Shape::from([16, 8, 8]));
/// layer.initialize(&Adam::default()).unwrap();
/// assert_eq!(layer.gamma().unwrap().shape(), &Shape::from([1, 16, 1, 1]));
/// assert_eq!(layer.parameters(), 32);
/// ```
#[derive(Debug)]
pub struct BatchNormalization {
    base: LayerBase,
    momentum: f64,
    epsilon: f64,
    optimizer: Option<Box<dyn Optimizer>>,
    gamma: Option<WeightShadow>,
    beta: Option<WeightShadow>,
}

impl BatchNormalization {
    pub fn new(momentum: f64, epsilon: f64) -> Self {
        Self {
            base: LayerBase::new("BatchNormalization"),
            momentum,
            epsilon,
            optimizer: None,
            gamma: None,
            beta: None,
        }
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn gamma(&self) -> Option<&WeightShadow> {
        self.gamma.as_ref()
    }

    pub fn beta(&self) -> Option<&WeightShadow> {
        self.beta.as_ref()
    }
}

impl Default for BatchNormalization {
    fn default() -> Self {
        Self::new(0.99, 1e-2)
    }
}

impl Layer for BatchNormalization {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayerBase {
        &mut self.base
    }

    fn parameters(&self) -> usize {
        self.gamma.as_ref().map_or(0, WeightShadow::numel)
            + self.beta.as_ref().map_or(0, WeightShadow::numel)
    }

    fn output_shape(&self) -> Result<Shape> {
        Ok(self.base.require_input_shape()?.clone())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.momentum) {
            return Err(LayerError::invalid(
                self.layer_name(),
                "momentum must be in range [0.0, 1.0]",
            ));
        }
        if self.epsilon <= 0.0 {
            return Err(LayerError::invalid(
                self.layer_name(),
                "epsilon must be positive",
            ));
        }
        Ok(())
    }

    fn initialize(&mut self, optimizer: &dyn Optimizer) -> Result<()> {
        self.validate()?;
        let input_shape = self.base.require_input_shape()?;
        let channels = input_shape.dim(0).ok_or_else(|| {
            LayerError::invalid(self.base.name(), "input shape must have at least one axis")
        })?;

        let shape = if input_shape.rank() == 1 {
            Shape::from([1, channels])
        } else {
            Shape::from([1, channels, 1, 1])
        };

        self.gamma = Some(WeightShadow::ones(shape.clone()));
        self.beta = Some(WeightShadow::zeros(shape));
        self.optimizer = Some(optimizer.boxed_clone());
        Ok(())
    }

    fn forward(
        &mut self,
        graph: &mut dyn OpGraph,
        input: &NodeHandle,
        ctx: PassContext,
    ) -> Result<NodeHandle> {
        let params = OpParams::BatchNorm {
            input_shape: self.base.require_input_shape()?.clone(),
            momentum: self.momentum,
            epsilon: self.epsilon,
            training: ctx.training,
            trainable: self.base.trainable(),
        };
        let declaration = OpDeclaration::forward(OpKind::BatchNorm, input.clone(), params)
            .with_data(self.base.backward_pass().cloned())
            .as_input_layer(ctx.input_layer);

        let node = graph.declare(declaration)?;
        Ok(self.base.replace_forward(node))
    }

    /// Always declared; a frozen layer still propagates the input gradient and
    /// the engine skips the gamma/beta update based on `trainable`.
    fn backward(
        &mut self,
        graph: &mut dyn OpGraph,
        grad: &NodeHandle,
        input_layer: bool,
    ) -> Result<Option<NodeHandle>> {
        let optimizer = self
            .optimizer
            .as_ref()
            .ok_or_else(|| LayerError::NotInitialized {
                layer: self.base.name().to_string(),
            })?;
        let params = OpParams::BatchNormGrad {
            input_shape: self.base.require_input_shape()?.clone(),
            trainable: self.base.trainable(),
        };
        let forward = self.base.require_forward()?.clone();

        let declaration = OpDeclaration::backward(OpKind::BatchNorm, grad.clone(), params)
            .with_optimizer(optimizer.data_dict())
            .with_data(Some(forward))
            .as_input_layer(input_layer);

        let node = graph.declare(declaration)?;
        Ok(Some(self.base.replace_backward(node)))
    }

    fn persist_weights(&self, graph: &mut dyn OpGraph) -> Result<()> {
        self.base.persist(graph)
    }
}
