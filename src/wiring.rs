//! Helpers for running a stack of layers against a graph
//!
//! The orchestrator that owns a model (batching, losses, epochs) lives outside
//! this crate. What it needs from here is provided as free functions over a
//! slice of boxed layers:
//!
//! - [`connect_layers`]: thread shapes through the stack, validating each link
//! - [`initialize_layers`]: hand every layer its own copy of the optimizer
//! - [`forward_layers`] / [`backward_layers`]: declare one full pass
//! - [`persist_layers`]: persist every layer's trainable state
//! - [`summarize`]: per-layer name, output shape and parameter count

use crate::error::{LayerError, Result};
use crate::graph::{NodeHandle, OpGraph};
use crate::layers::{Layer, PassContext};
use crate::optimizers::Optimizer;
use crate::shape::Shape;
use std::fmt;
use tracing::{debug, trace};

fn ensure_not_empty(layers: &[Box<dyn Layer>]) -> Result<()> {
    if layers.is_empty() {
        return Err(LayerError::invalid("layer stack", "must contain at least one layer"));
    }
    Ok(())
}

/// Sets every layer's input shape from the previous layer's output shape.
///
/// The stack's input shape is `input_shape` if given, otherwise the shape the
/// first layer was constructed with. A layer that already carries an input
/// shape must agree with what the previous layer produces.
///
/// # Returns
///
/// The output shape of the last layer.
///
/// # Errors
///
/// - `MissingInputShape` when neither `input_shape` nor the first layer provides one
/// - `ShapeMismatch` when a pre-set input shape disagrees with the incoming shape
/// - any error from a layer's `validate` or `output_shape`
///
/// All but the first are wrapped in `AtLayer` with the offending index.
pub fn connect_layers(layers: &mut [Box<dyn Layer>], input_shape: Option<Shape>) -> Result<Shape> {
    ensure_not_empty(layers)?;

    let mut current = match input_shape.or_else(|| layers[0].input_shape().cloned()) {
        Some(shape) => shape,
        None => {
            return Err(LayerError::MissingInputShape {
                layer: layers[0].layer_name().to_string(),
            })
        }
    };

    for (index, layer) in layers.iter_mut().enumerate() {
        connect_one(&mut **layer, &current).map_err(|e| LayerError::at_layer(index, e))?;
        current = layer
            .output_shape()
            .map_err(|e| LayerError::at_layer(index, e))?;
        trace!(index, layer = layer.layer_name(), output = %current, "connected layer");
    }

    debug!(layers = layers.len(), output = %current, "layer stack connected");
    Ok(current)
}

fn connect_one(layer: &mut dyn Layer, incoming: &Shape) -> Result<()> {
    layer.validate()?;
    if let Some(declared) = layer.input_shape() {
        if declared != incoming {
            return Err(LayerError::ShapeMismatch {
                layer: layer.layer_name().to_string(),
                declared: declared.clone(),
                produced: incoming.clone(),
            });
        }
    }
    layer.set_input_shape(incoming.clone());
    Ok(())
}

/// Initializes every layer with `optimizer`. Call after [`connect_layers`].
pub fn initialize_layers(layers: &mut [Box<dyn Layer>], optimizer: &dyn Optimizer) -> Result<()> {
    for (index, layer) in layers.iter_mut().enumerate() {
        layer
            .initialize(optimizer)
            .map_err(|e| LayerError::at_layer(index, e))?;
    }
    debug!(optimizer = optimizer.name(), "layers initialized");
    Ok(())
}

/// Declares the forward pass of the whole stack, left to right.
///
/// The first layer is flagged as the input layer.
pub fn forward_layers(
    layers: &mut [Box<dyn Layer>],
    graph: &mut dyn OpGraph,
    input: &NodeHandle,
    training: bool,
) -> Result<NodeHandle> {
    ensure_not_empty(layers)?;

    let mut node = input.clone();
    for (index, layer) in layers.iter_mut().enumerate() {
        let ctx = PassContext {
            training,
            input_layer: index == 0,
        };
        node = layer
            .forward(graph, &node, ctx)
            .map_err(|e| LayerError::at_layer(index, e))?;
    }
    Ok(node)
}

/// Declares the backward pass of the whole stack, right to left.
///
/// Returns the gradient node produced by the first layer, or `None` when a
/// frozen layer cut the chain; layers before it declare nothing in that case.
///
/// A layer cuts the chain when it declares no new node for this step: it
/// returns `None`, or hands back the node already cached from an earlier
/// step (a frozen Dense does this). That cached node is never passed on as
/// the current gradient.
pub fn backward_layers(
    layers: &mut [Box<dyn Layer>],
    graph: &mut dyn OpGraph,
    grad: &NodeHandle,
) -> Result<Option<NodeHandle>> {
    ensure_not_empty(layers)?;

    let mut node = grad.clone();
    for (index, layer) in layers.iter_mut().enumerate().rev() {
        let previous = layer.backward_pass().cloned();
        let declared = layer
            .backward(graph, &node, index == 0)
            .map_err(|e| LayerError::at_layer(index, e))?
            .filter(|next| previous.as_ref() != Some(next));

        match declared {
            Some(next) => node = next,
            None => {
                debug!(index, layer = layer.layer_name(), "backward chain stopped at frozen layer");
                return Ok(None);
            }
        }
    }
    Ok(Some(node))
}

/// Persists the trainable state of every layer.
pub fn persist_layers(layers: &[Box<dyn Layer>], graph: &mut dyn OpGraph) -> Result<()> {
    for (index, layer) in layers.iter().enumerate() {
        layer
            .persist_weights(graph)
            .map_err(|e| LayerError::at_layer(index, e))?;
    }
    Ok(())
}

/// One row of a model summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub name: String,
    pub output_shape: Shape,
    pub parameters: usize,
    pub trainable: bool,
}

/// Table of layers, their output shapes and parameter counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub input_shape: Option<Shape>,
    pub rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn total_parameters(&self) -> usize {
        self.rows.iter().map(|row| row.parameters).sum()
    }

    pub fn trainable_parameters(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.trainable)
            .map(|row| row.parameters)
            .sum()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(shape) = &self.input_shape {
            writeln!(f, "Input Shape: {}", shape)?;
        }
        let rule = "-".repeat(66);
        writeln!(f, "{}", rule)?;
        writeln!(f, "{:<30} {:>12} {:>22}", "Layer Type", "Parameters", "Output Shape")?;
        writeln!(f, "{}", rule)?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<30} {:>12} {:>22}",
                row.name,
                row.parameters,
                row.output_shape.to_string()
            )?;
        }
        writeln!(f, "{}", rule)?;
        writeln!(f, "Total Parameters: {}", self.total_parameters())?;
        write!(f, "Trainable Parameters: {}", self.trainable_parameters())
    }
}

/// Builds a summary of a connected (and usually initialized) stack.
pub fn summarize(layers: &[Box<dyn Layer>]) -> Result<Summary> {
    let rows = layers
        .iter()
        .enumerate()
        .map(|(index, layer)| -> Result<SummaryRow> {
            Ok(SummaryRow {
                name: layer.layer_name().to_string(),
                output_shape: layer
                    .output_shape()
                    .map_err(|e| LayerError::at_layer(index, e))?,
                parameters: layer.parameters(),
                trainable: layer.trainable(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Summary {
        input_shape: layers.first().and_then(|layer| layer.input_shape().cloned()),
        rows,
    })
}
