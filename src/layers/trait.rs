//! Layer trait definition for graph-declaring layers
//!
//! This module defines the core Layer trait that all layer types implement,
//! plus [`LayerBase`], the bookkeeping every layer embeds: its name, input
//! shape, trainable flag and the single-slot cache of its last forward and
//! backward nodes.

use crate::error::{LayerError, Result};
use crate::graph::{NodeHandle, OpGraph};
use crate::optimizers::Optimizer;
use crate::shape::Shape;
use tracing::debug;

/// Per-call flags for a forward declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassContext {
    /// Training mode (dropout masks, batch statistics) vs. inference.
    pub training: bool,
    /// Whether the layer is the first one of its stack.
    pub input_layer: bool,
}

impl PassContext {
    pub fn training() -> Self {
        Self {
            training: true,
            input_layer: false,
        }
    }

    pub fn inference() -> Self {
        Self {
            training: false,
            input_layer: false,
        }
    }

    pub fn with_input_layer(mut self, input_layer: bool) -> Self {
        self.input_layer = input_layer;
        self
    }
}

impl Default for PassContext {
    fn default() -> Self {
        Self::training()
    }
}

/// State shared by every layer type.
///
/// The forward and backward slots hold at most one node each. Every new
/// declaration replaces the previous handle; no history is kept.
#[derive(Debug, Clone)]
pub struct LayerBase {
    kind: &'static str,
    name: Option<String>,
    input_shape: Option<Shape>,
    trainable: bool,
    forward_pass: Option<NodeHandle>,
    backward_pass: Option<NodeHandle>,
}

impl LayerBase {
    /// `kind` is the type name used when no explicit name is set.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            name: None,
            input_shape: None,
            trainable: true,
            forward_pass: None,
            backward_pass: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind)
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(str::to_string);
    }

    pub fn input_shape(&self) -> Option<&Shape> {
        self.input_shape.as_ref()
    }

    pub fn set_input_shape(&mut self, shape: Shape) {
        self.input_shape = Some(shape);
    }

    pub fn require_input_shape(&self) -> Result<&Shape> {
        self.input_shape
            .as_ref()
            .ok_or_else(|| LayerError::MissingInputShape {
                layer: self.name().to_string(),
            })
    }

    /// Input shape, checked to have exactly `rank` axes.
    pub fn require_rank(&self, rank: usize) -> Result<&Shape> {
        let shape = self.require_input_shape()?;
        if shape.rank() != rank {
            return Err(LayerError::WrongRank {
                layer: self.name().to_string(),
                expected: rank,
                got: shape.clone(),
            });
        }
        Ok(shape)
    }

    pub fn trainable(&self) -> bool {
        self.trainable
    }

    pub fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }

    pub fn forward_pass(&self) -> Option<&NodeHandle> {
        self.forward_pass.as_ref()
    }

    pub fn backward_pass(&self) -> Option<&NodeHandle> {
        self.backward_pass.as_ref()
    }

    pub fn require_forward(&self) -> Result<&NodeHandle> {
        self.forward_pass
            .as_ref()
            .ok_or_else(|| LayerError::MissingForward {
                layer: self.name().to_string(),
            })
    }

    pub(crate) fn replace_forward(&mut self, node: NodeHandle) -> NodeHandle {
        self.forward_pass = Some(node.clone());
        node
    }

    pub(crate) fn replace_backward(&mut self, node: NodeHandle) -> NodeHandle {
        self.backward_pass = Some(node.clone());
        node
    }

    /// Persists the cached nodes as `<name>_forward_pass` / `<name>_backward_pass`.
    ///
    /// A layer that never declared a backward node (frozen) only persists its
    /// forward node.
    pub(crate) fn persist(&self, graph: &mut dyn OpGraph) -> Result<()> {
        let forward = self.require_forward()?;
        graph.persist_op(forward, &format!("{}_forward_pass", self.name()))?;

        match &self.backward_pass {
            Some(backward) => {
                graph.persist_op(backward, &format!("{}_backward_pass", self.name()))?
            }
            None => debug!(layer = self.name(), "no backward node to persist"),
        }
        Ok(())
    }
}

/// Core trait for graph-declaring layers.
///
/// Implementors embed a [`LayerBase`] and expose it through `base` /
/// `base_mut`; naming, shapes and node slots are provided from it.
///
/// # Example
///
/// ```
/// use ravdl::graph::RecordingGraph;
/// use ravdl::layers::{Dense, Layer, PassContext};
/// use ravdl::optimizers::SGD;
/// use ravdl::Shape;
///
/// let mut graph = RecordingGraph::new();
/// let x = graph.placeholder("x");
///
/// let mut layer = Dense::new(10);
/// layer.set_input_shape(Shape::from([784]));
/// layer.initialize(&SGD::default()).unwrap();
///
/// let out = layer.forward(&mut graph, &x, PassContext::training()).unwrap();
/// assert_eq!(out.op(), "forward_pass_dense");
/// assert_eq!(layer.parameters(), 784 * 10 + 10);
/// ```
pub trait Layer {
    fn base(&self) -> &LayerBase;

    fn base_mut(&mut self) -> &mut LayerBase;

    /// Stores the shape the layer expects from the previous layer. No
    /// validation happens here; see [`crate::wiring::connect_layers`].
    fn set_input_shape(&mut self, shape: Shape) {
        self.base_mut().set_input_shape(shape);
    }

    fn input_shape(&self) -> Option<&Shape> {
        self.base().input_shape()
    }

    /// The explicit name, or the type name when none was set.
    fn layer_name(&self) -> &str {
        self.base().name()
    }

    /// `None` restores the type name.
    fn set_layer_name(&mut self, name: Option<&str>) {
        self.base_mut().set_name(name);
    }

    fn trainable(&self) -> bool {
        self.base().trainable()
    }

    fn set_trainable(&mut self, trainable: bool) {
        self.base_mut().set_trainable(trainable);
    }

    /// Number of trainable parameters.
    fn parameters(&self) -> usize {
        0
    }

    /// Shape produced by the forward op. Pure shape arithmetic.
    fn output_shape(&self) -> Result<Shape>;

    /// Checks constructor arguments that cannot be expressed in the types.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Builds weight shadows and keeps a copy of the optimizer.
    fn initialize(&mut self, _optimizer: &dyn Optimizer) -> Result<()> {
        Ok(())
    }

    /// Declares the forward op for `input` and caches the resulting node.
    fn forward(
        &mut self,
        graph: &mut dyn OpGraph,
        input: &NodeHandle,
        ctx: PassContext,
    ) -> Result<NodeHandle>;

    /// Declares the backward op for `grad` and caches the resulting node.
    ///
    /// A layer that declares nothing (a frozen Dense) returns its cached node
    /// unchanged, or `None` if it never declared one. Either way no new node
    /// exists for this step; see [`crate::wiring::backward_layers`].
    fn backward(
        &mut self,
        graph: &mut dyn OpGraph,
        grad: &NodeHandle,
        input_layer: bool,
    ) -> Result<Option<NodeHandle>>;

    /// Persists trainable state held in the cached nodes. No-op by default.
    fn persist_weights(&self, _graph: &mut dyn OpGraph) -> Result<()> {
        Ok(())
    }

    fn forward_pass(&self) -> Option<&NodeHandle> {
        self.base().forward_pass()
    }

    fn backward_pass(&self) -> Option<&NodeHandle> {
        self.base().backward_pass()
    }
}
