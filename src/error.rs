//! Error type shared by every layer, the architecture loader and the wiring helpers.

use crate::graph::GraphError;
use crate::shape::Shape;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("invalid configuration for {layer}: {reason}")]
    InvalidConfig { layer: String, reason: String },

    #[error("{layer} has no input shape")]
    MissingInputShape { layer: String },

    #[error("{layer} expects a rank-{expected} input, got {got}")]
    WrongRank {
        layer: String,
        expected: usize,
        got: Shape,
    },

    #[error("{layer} declares input shape {declared} but the previous layer produces {produced}")]
    ShapeMismatch {
        layer: String,
        declared: Shape,
        produced: Shape,
    },

    #[error("{layer}: pool {pool_shape:?} with stride {stride} does not tile input {input}")]
    NonIntegralOutput {
        layer: String,
        input: Shape,
        pool_shape: (usize, usize),
        stride: usize,
    },

    #[error("{layer} has not been initialized with an optimizer")]
    NotInitialized { layer: String },

    #[error("{layer}: backward pass declared before any forward pass")]
    MissingForward { layer: String },

    #[error("layer {index}: {source}")]
    AtLayer {
        index: usize,
        #[source]
        source: Box<LayerError>,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("failed to read architecture: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse architecture: {0}")]
    Json(#[from] serde_json::Error),
}

impl LayerError {
    pub(crate) fn invalid(layer: &str, reason: impl Into<String>) -> Self {
        LayerError::InvalidConfig {
            layer: layer.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn at_layer(index: usize, source: LayerError) -> Self {
        LayerError::AtLayer {
            index,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
