//! Activation layer.
//!
//! Applies a named nonlinearity. The catalog of names and their derivatives
//! belongs to the engine; the layer passes the identifier through untouched.

use crate::error::{LayerError, Result};
use crate::graph::{NodeHandle, OpDeclaration, OpGraph, OpKind, OpParams};
use crate::layers::{Layer, LayerBase, PassContext};
use crate::shape::Shape;

/// Named activation layer.
///
/// Both passes carry the identifier; the backward op also gets the node that
/// fed the forward op, since most derivatives are taken at the input.
///
/// # Example
///
/// ```
/// use ravdl::graph::RecordingGraph;
/// use ravdl::layers::{Activation, Layer, PassContext};
/// use ravdl::Shape;
///
/// let mut graph = RecordingGraph::new();
/// let x = graph.placeholder("x");
///
/// let mut layer = Activation::new("relu");
/// layer.set_input_shape(Shape::from([128]));
/// assert_eq!(layer.output_shape().unwrap(), Shape::from([128]));
///
/// let out = layer.forward(&mut graph, &x, PassContext::training()).unwrap();
/// assert_eq!(out.op(), "forward_pass_activation");
/// ```
#[derive(Debug)]
pub struct Activation {
    base: LayerBase,
    activation_name: String,
    layer_input: Option<NodeHandle>,
}

impl Activation {
    /// `name` is the engine's activation identifier, e.g. `"relu"` or `"softmax"`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: LayerBase::new("Activation"),
            activation_name: name.into(),
            layer_input: None,
        }
    }

    pub fn activation_name(&self) -> &str {
        &self.activation_name
    }

    fn params(&self) -> OpParams {
        OpParams::Activation {
            name: self.activation_name.clone(),
        }
    }
}

impl Layer for Activation {
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
        if self.activation_name.trim().is_empty() {
            return Err(LayerError::invalid(
                self.layer_name(),
                "activation name must not be empty",
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
        let declaration = OpDeclaration::forward(OpKind::Activation, input.clone(), self.params())
            .as_input_layer(ctx.input_layer);

        let node = graph.declare(declaration)?;
        self.layer_input = Some(input.clone());
        Ok(self.base.replace_forward(node))
    }

    fn backward(
        &mut self,
        graph: &mut dyn OpGraph,
        grad: &NodeHandle,
        input_layer: bool,
    ) -> Result<Option<NodeHandle>> {
        let layer_input = self
            .layer_input
            .clone()
            .ok_or_else(|| LayerError::MissingForward {
                layer: self.layer_name().to_string(),
            })?;
        let declaration = OpDeclaration::backward(OpKind::Activation, grad.clone(), self.params())
            .with_layer_input(Some(layer_input))
            .as_input_layer(input_layer);

        let node = graph.declare(declaration)?;
        Ok(Some(self.base.replace_backward(node)))
    }
}
