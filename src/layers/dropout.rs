//! Dropout layer implementation for regularization
//!
//! The engine-side op zeroes each unit with probability `p` during training
//! and passes the input through unchanged during inference. The layer itself
//! owns no weights.

use crate::error::{LayerError, Result};
use crate::graph::{NodeHandle, OpDeclaration, OpGraph, OpKind, OpParams};
use crate::layers::{Layer, LayerBase, PassContext};
use crate::shape::Shape;

/// Dropout layer.
///
/// # Fields
///
/// * `p` - Probability that a unit is set to zero, in `[0.0, 1.0)`
///
/// # Example
///
/// ```
/// use ravdl::layers::{Dropout, Layer};
///
/// let layer = Dropout::new(0.3);
/// assert_eq!(layer.parameters(), 0);  // Dropout has no trainable parameters
/// assert!(layer.validate().is_ok());
/// ```
#[derive(Debug)]
pub struct Dropout {
    base: LayerBase,
    p: f64,
}

impl Dropout {
    pub fn new(p: f64) -> Self {
        Self {
            base: LayerBase::new("Dropout"),
            p,
        }
    }

    pub fn p(&self) -> f64 {
        self.p
    }
}

impl Default for Dropout {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl Layer for Dropout {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayerBase {
        &mut self.base
    }

    fn output_shape(&self) -> Result<Shape> {
        Ok(self.base.require_input_shape()?.clone())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.p) {
            return Err(LayerError::invalid(
                self.layer_name(),
                "p must be in range [0.0, 1.0)",
            ));
        }
        Ok(())
    }

    fn forward(
        &mut self,
        graph: &mut dyn OpGraph,
        input: &NodeHandle,
        ctx: PassContext,
    ) -> Result<NodeHandle> {
        let params = OpParams::Dropout {
            p: self.p,
            training: ctx.training,
        };
        let declaration = OpDeclaration::forward(OpKind::Dropout, input.clone(), params)
            .as_input_layer(ctx.input_layer);

        let node = graph.declare(declaration)?;
        Ok(self.base.replace_forward(node))
    }

    /// The forward node carries the mask, so it is passed as `data`.
    fn backward(
        &mut self,
        graph: &mut dyn OpGraph,
        grad: &NodeHandle,
        input_layer: bool,
    ) -> Result<Option<NodeHandle>> {
        let forward = self.base.require_forward()?.clone();
        let declaration = OpDeclaration::backward(OpKind::Dropout, grad.clone(), OpParams::None)
            .with_data(Some(forward))
            .as_input_layer(input_layer);

        let node = graph.declare(declaration)?;
        Ok(Some(self.base.replace_backward(node)))
    }
}
