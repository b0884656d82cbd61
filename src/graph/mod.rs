//! Operation-graph declaration interface
//!
//! Layers talk to the execution engine exclusively through [`OpGraph`]: they
//! build an [`OpDeclaration`] describing a forward or backward op, hand it to
//! the graph, and receive an opaque [`NodeHandle`] back. Nothing is computed
//! at declaration time; the engine resolves declared nodes later.
//!
//! # Overview
//!
//! ```text
//! input ──forward_pass_dense──► h1 ──forward_pass_activation──► h2
//!                                                    │
//! grad ◄──backward_pass_dense── g1 ◄──backward_pass_activation── loss grad
//! ```
//!
//! The engine's wire encoding (see [`OpDeclaration::to_wire`]) renders every
//! boolean flag as the literal string `"True"` or `"False"`. Inside this crate
//! the flags are plain `bool`.

pub mod recording;
mod wire;

pub use recording::{DeclaredNode, RecordingGraph};
pub use wire::flag_str;

use crate::optimizers::OptimizerState;
use crate::shape::Shape;
use crate::utils::padding::Padding;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Errors reported by a graph implementation.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0} is not part of this graph")]
    UnknownNode(u64),

    #[error("engine rejected {op}: {reason}")]
    Rejected { op: String, reason: String },
}

/// Opaque reference to a declared, not-yet-executed node.
///
/// Cheap to clone. Equality is by node id; the op name is carried along for
/// logging and debugging only.
#[derive(Debug, Clone, Eq)]
pub struct NodeHandle {
    id: u64,
    op: String,
}

impl NodeHandle {
    pub fn new(id: u64, op: impl Into<String>) -> Self {
        Self { id, op: op.into() }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the op that produced this node.
    pub fn op(&self) -> &str {
        &self.op
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::hash::Hash for NodeHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.id, self.op)
    }
}

/// Nodes go over the wire as their id.
impl Serialize for NodeHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.id)
    }
}

/// Which half of a layer an op belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    Forward,
    Backward,
}

impl Pass {
    pub fn prefix(&self) -> &'static str {
        match self {
            Pass::Forward => "forward_pass",
            Pass::Backward => "backward_pass",
        }
    }
}

/// Op families the engine knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Dense,
    BatchNorm,
    Dropout,
    Activation,
    Conv2D,
    Flatten,
    MaxPool2D,
    /// `forward_pass_avgpool2d` / `backward_pass_avgpool2d`. Unlike the other
    /// kinds these ops are not part of the engine's stock op set; an engine
    /// that runs average-pooling layers has to register them.
    AvgPool2D,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Dense => "dense",
            OpKind::BatchNorm => "batchnorm",
            OpKind::Dropout => "dropout",
            OpKind::Activation => "activation",
            OpKind::Conv2D => "conv2d",
            OpKind::Flatten => "flatten",
            OpKind::MaxPool2D => "maxpool2d",
            OpKind::AvgPool2D => "avgpool2d",
        }
    }
}

/// Typed configuration bundle carried by a declaration.
///
/// Backward variants (`*Grad`) carry only what the engine needs to compute
/// gradients; they get the forward node through `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OpParams {
    None,
    Dense {
        n_units: usize,
        input_shape: Shape,
    },
    BatchNorm {
        input_shape: Shape,
        momentum: f64,
        #[serde(rename = "eps")]
        epsilon: f64,
        #[serde(serialize_with = "wire::flag")]
        training: bool,
        #[serde(serialize_with = "wire::flag")]
        trainable: bool,
    },
    BatchNormGrad {
        input_shape: Shape,
        #[serde(serialize_with = "wire::flag")]
        trainable: bool,
    },
    Dropout {
        p: f64,
        #[serde(serialize_with = "wire::flag")]
        training: bool,
    },
    Activation {
        #[serde(rename = "act_data", serialize_with = "wire::act_data")]
        name: String,
    },
    Conv2D {
        input_shape: Shape,
        n_filters: usize,
        filter_shape: (usize, usize),
        stride: usize,
        #[serde(rename = "padding_data", serialize_with = "wire::padding_data")]
        padding: Padding,
    },
    Conv2DGrad {
        n_filters: usize,
        filter_shape: (usize, usize),
        stride: usize,
        #[serde(rename = "padding_data", serialize_with = "wire::padding_data")]
        padding: Padding,
        #[serde(serialize_with = "wire::flag")]
        trainable: bool,
    },
    Pool2D {
        input_shape: Shape,
        pool_shape: (usize, usize),
        stride: usize,
        #[serde(rename = "padding_data", serialize_with = "wire::padding_data")]
        padding: Padding,
    },
}

/// A single "declare forward/backward `<op>`" request.
#[derive(Debug, Clone, PartialEq)]
pub struct OpDeclaration {
    pub kind: OpKind,
    pub pass: Pass,
    /// Input node for forward ops, incoming gradient node for backward ops.
    pub input: NodeHandle,
    pub params: OpParams,
    /// Optimizer state, backward declarations of parameter layers only.
    pub optimizer: Option<OptimizerState>,
    /// Sequencing link: the paired forward node for backward ops, the
    /// previous backward node (weight state) for forward ops.
    pub data: Option<NodeHandle>,
    /// The node that fed the paired forward op.
    pub layer_input: Option<NodeHandle>,
    /// Flatten backward only: the node whose shape the gradient is restored to.
    pub prev_input: Option<NodeHandle>,
    /// Set for the first layer of a stack.
    pub input_layer: bool,
}

impl OpDeclaration {
    pub fn new(kind: OpKind, pass: Pass, input: NodeHandle, params: OpParams) -> Self {
        Self {
            kind,
            pass,
            input,
            params,
            optimizer: None,
            data: None,
            layer_input: None,
            prev_input: None,
            input_layer: false,
        }
    }

    pub fn forward(kind: OpKind, input: NodeHandle, params: OpParams) -> Self {
        Self::new(kind, Pass::Forward, input, params)
    }

    pub fn backward(kind: OpKind, grad: NodeHandle, params: OpParams) -> Self {
        Self::new(kind, Pass::Backward, grad, params)
    }

    pub fn with_data(mut self, data: Option<NodeHandle>) -> Self {
        self.data = data;
        self
    }

    pub fn with_layer_input(mut self, layer_input: Option<NodeHandle>) -> Self {
        self.layer_input = layer_input;
        self
    }

    pub fn with_prev_input(mut self, prev_input: Option<NodeHandle>) -> Self {
        self.prev_input = prev_input;
        self
    }

    pub fn with_optimizer(mut self, state: OptimizerState) -> Self {
        self.optimizer = Some(state);
        self
    }

    pub fn as_input_layer(mut self, input_layer: bool) -> Self {
        self.input_layer = input_layer;
        self
    }

    /// Engine-side op name, e.g. `forward_pass_dense`.
    pub fn op_name(&self) -> String {
        format!("{}_{}", self.pass.prefix(), self.kind.as_str())
    }

    /// Every node this declaration references.
    pub fn referenced_nodes(&self) -> impl Iterator<Item = &NodeHandle> {
        std::iter::once(&self.input)
            .chain(self.data.iter())
            .chain(self.layer_input.iter())
            .chain(self.prev_input.iter())
    }

    /// Renders the declaration in the engine's JSON encoding.
    ///
    /// Parameters are inlined next to `op`, `input` and the node links
    /// (`data`, `layer_input`, `prev_input`); boolean flags become
    /// `"True"`/`"False"`, padding and activation settings become
    /// `padding_data` / `act_data` dict strings.
    pub fn to_wire(&self) -> Result<Value, serde_json::Error> {
        let mut body = Map::new();
        body.insert("op".to_string(), Value::String(self.op_name()));
        body.insert("input".to_string(), serde_json::to_value(&self.input)?);

        if let Value::Object(params) = serde_json::to_value(&self.params)? {
            body.extend(params);
        }
        if let Some(state) = &self.optimizer {
            body.insert("optimizer".to_string(), Value::Object(state.clone()));
        }
        if let Some(data) = &self.data {
            body.insert("data".to_string(), serde_json::to_value(data)?);
        }
        if let Some(layer_input) = &self.layer_input {
            body.insert("layer_input".to_string(), serde_json::to_value(layer_input)?);
        }
        if let Some(prev_input) = &self.prev_input {
            body.insert("prev_input".to_string(), serde_json::to_value(prev_input)?);
        }
        body.insert(
            "input_layer".to_string(),
            Value::String(flag_str(self.input_layer).to_string()),
        );

        Ok(Value::Object(body))
    }
}

/// The execution engine's declaration surface.
///
/// Implementations must return immediately: declaring a node never blocks on
/// computation.
pub trait OpGraph {
    /// Declares a node and returns a handle to it.
    fn declare(&mut self, declaration: OpDeclaration) -> Result<NodeHandle, GraphError>;

    /// Asks the engine to keep the value of `node` under `name` after execution.
    fn persist_op(&mut self, node: &NodeHandle, name: &str) -> Result<(), GraphError>;
}
