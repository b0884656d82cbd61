//! Dense (fully connected) layer implementation
//!
//! This module provides a Dense layer (also known as Linear or Fully Connected
//! layer) whose engine-side op computes `output = input × W + w0`.

use crate::error::{LayerError, Result};
use crate::graph::{NodeHandle, OpDeclaration, OpGraph, OpKind, OpParams};
use crate::layers::{Layer, LayerBase, PassContext, WeightShadow};
use crate::optimizers::Optimizer;
use crate::shape::Shape;
use tracing::debug;

/// Dense (fully connected) layer.
///
/// The weights live in the engine; this side holds their shadows:
///
/// * `W` - `(input_dim, n_units)`, uniform on `[-limit, limit]` with `limit = 1/sqrt(input_dim)`
/// * `w0` - `(1, n_units)`, zeros
///
/// Each forward declaration carries the previous backward node as `data`, so
/// the engine sequences it after the last weight update.
///
/// # Example
///
/// ```
/// use ravdl::layers::{Dense, Layer};
/// use ravdl::optimizers::SGD;
/// use ravdl::Shape;
///
/// let mut layer = Dense::new(512).with_input_shape(Shape::from([784]));
/// layer.initialize(&SGD::default()).unwrap();
/// assert_eq!(layer.output_shape().unwrap(), Shape::from([512]));
/// assert_eq!(layer.parameters(), 784 * 512 + 512);
/// ```
#[derive(Debug)]
pub struct Dense {
    base: LayerBase,
    n_units: usize,
    optimizer: Option<Box<dyn Optimizer>>,
    layer_input: Option<NodeHandle>,
    weights: Option<WeightShadow>,
    bias: Option<WeightShadow>,
}

impl Dense {
    pub fn new(n_units: usize) -> Self {
        Self {
            base: LayerBase::new("Dense"),
            n_units,
            optimizer: None,
            layer_input: None,
            weights: None,
            bias: None,
        }
    }

    /// Fixes the input shape up front, for the first layer of a stack.
    pub fn with_input_shape(mut self, shape: Shape) -> Self {
        self.base.set_input_shape(shape);
        self
    }

    pub fn n_units(&self) -> usize {
        self.n_units
    }

    /// Shadow of `W`, available after `initialize`.
    pub fn weights(&self) -> Option<&WeightShadow> {
        self.weights.as_ref()
    }

    /// Shadow of `w0`, available after `initialize`.
    pub fn bias(&self) -> Option<&WeightShadow> {
        self.bias.as_ref()
    }
}

impl Layer for Dense {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayerBase {
        &mut self.base
    }

    /// `W` plus `w0` element counts; 0 before `initialize`.
    fn parameters(&self) -> usize {
        self.weights.as_ref().map_or(0, WeightShadow::numel)
            + self.bias.as_ref().map_or(0, WeightShadow::numel)
    }

    fn output_shape(&self) -> Result<Shape> {
        Ok(Shape::from([self.n_units]))
    }

    fn validate(&self) -> Result<()> {
        if self.n_units == 0 {
            return Err(LayerError::invalid(
                self.layer_name(),
                "n_units must be greater than 0",
            ));
        }
        Ok(())
    }

    fn initialize(&mut self, optimizer: &dyn Optimizer) -> Result<()> {
        self.validate()?;
        let input_dim = self.base.require_rank(1)?.dims()[0];
        if input_dim == 0 {
            return Err(LayerError::invalid(
                self.layer_name(),
                "input dimension must be greater than 0",
            ));
        }

        self.weights = Some(WeightShadow::uniform_fan_in(
            [input_dim, self.n_units],
            input_dim,
        ));
        self.bias = Some(WeightShadow::zeros([1, self.n_units]));
        self.optimizer = Some(optimizer.boxed_clone());
        Ok(())
    }

    fn forward(
        &mut self,
        graph: &mut dyn OpGraph,
        input: &NodeHandle,
        ctx: PassContext,
    ) -> Result<NodeHandle> {
        let params = OpParams::Dense {
            n_units: self.n_units,
            input_shape: self.base.require_input_shape()?.clone(),
        };
        let declaration = OpDeclaration::forward(OpKind::Dense, input.clone(), params)
            .with_data(self.base.backward_pass().cloned())
            .as_input_layer(ctx.input_layer);

        let node = graph.declare(declaration)?;
        self.layer_input = Some(input.clone());
        Ok(self.base.replace_forward(node))
    }

    /// Frozen layers declare nothing: no weight update is requested and the
    /// last backward node, if any, is returned unchanged.
    fn backward(
        &mut self,
        graph: &mut dyn OpGraph,
        grad: &NodeHandle,
        input_layer: bool,
    ) -> Result<Option<NodeHandle>> {
        if !self.base.trainable() {
            debug!(layer = self.layer_name(), "frozen dense layer, skipping backward declaration");
            return Ok(self.base.backward_pass().cloned());
        }

        let optimizer = self
            .optimizer
            .as_ref()
            .ok_or_else(|| LayerError::NotInitialized {
                layer: self.layer_name().to_string(),
            })?;
        let forward = self.base.require_forward()?.clone();

        let declaration = OpDeclaration::backward(OpKind::Dense, grad.clone(), OpParams::None)
            .with_layer_input(self.layer_input.clone())
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
