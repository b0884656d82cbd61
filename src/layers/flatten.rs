//! Flatten layer: collapses a `(C, H, W)` sample into a `(C*H*W,)` vector.

use crate::error::{LayerError, Result};
use crate::graph::{NodeHandle, OpDeclaration, OpGraph, OpKind, OpParams};
use crate::layers::{Layer, LayerBase, PassContext};
use crate::shape::Shape;

/// Flatten layer.
///
/// # Example
///
/// ```
/// use ravdl::layers::{Flatten, Layer};
/// use ravdl::Shape;
///
/// let layer = Flatten::new().with_input_shape(Shape::from([16, 7, 7]));
/// assert_eq!(layer.output_shape().unwrap(), Shape::from([784]));
/// ```
#[derive(Debug)]
pub struct Flatten {
    base: LayerBase,
    prev_input: Option<NodeHandle>,
}

impl Flatten {
    pub fn new() -> Self {
        Self {
            base: LayerBase::new("Flatten"),
            prev_input: None,
        }
    }

    pub fn with_input_shape(mut self, shape: Shape) -> Self {
        self.base.set_input_shape(shape);
        self
    }
}

impl Default for Flatten {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for Flatten {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayerBase {
        &mut self.base
    }

    fn output_shape(&self) -> Result<Shape> {
        Ok(Shape::from([self.base.require_input_shape()?.numel()]))
    }

    fn forward(
        &mut self,
        graph: &mut dyn OpGraph,
        input: &NodeHandle,
        ctx: PassContext,
    ) -> Result<NodeHandle> {
        let declaration = OpDeclaration::forward(OpKind::Flatten, input.clone(), OpParams::None)
            .as_input_layer(ctx.input_layer);

        let node = graph.declare(declaration)?;
        self.prev_input = Some(input.clone());
        Ok(self.base.replace_forward(node))
    }

    /// The engine restores the original shape from `prev_input`.
    fn backward(
        &mut self,
        graph: &mut dyn OpGraph,
        grad: &NodeHandle,
        input_layer: bool,
    ) -> Result<Option<NodeHandle>> {
        let prev_input = self
            .prev_input
            .clone()
            .ok_or_else(|| LayerError::MissingForward {
                layer: self.layer_name().to_string(),
            })?;
        let declaration = OpDeclaration::backward(OpKind::Flatten, grad.clone(), OpParams::None)
            .with_prev_input(Some(prev_input))
            .as_input_layer(input_layer);

        let node = graph.declare(declaration)?;
        Ok(Some(self.base.replace_backward(node)))
    }
}
