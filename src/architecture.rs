//! Architecture configuration structures
//!
//! This module provides configuration structures for defining a layer stack
//! via JSON configuration files, so architectures can be changed without code
//! changes.
//!
//! # Example
//!
//! ```json
//! {
//!   "input_shape": [1, 28, 28],
//!   "layers": [
//!     { "layer_type": "conv2d", "n_filters": 16, "filter_shape": [3, 3] },
//!     { "layer_type": "activation", "activation": "relu" },
//!     { "layer_type": "max_pooling2d", "pool_shape": [2, 2], "stride": 2 },
//!     { "layer_type": "batch_normalization", "momentum": 0.9 },
//!     { "layer_type": "flatten" },
//!     { "layer_type": "dense", "n_units": 10, "name": "logits" },
//!     { "layer_type": "activation", "activation": "softmax" }
//!   ]
//! }
//! ```

use crate::error::{LayerError, Result};
use crate::layers::{
    Activation, BatchNormalization, Conv2D, Dense, Dropout, Flatten, Layer, Pooling2D,
};
use crate::shape::Shape;
use crate::utils::padding::Padding;
use crate::wiring::connect_layers;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

fn default_true() -> bool {
    true
}

fn default_stride() -> usize {
    1
}

fn default_momentum() -> f64 {
    0.99
}

fn default_epsilon() -> f64 {
    1e-2
}

fn default_dropout() -> f64 {
    0.2
}

fn default_pool_shape() -> (usize, usize) {
    (2, 2)
}

/// Type-specific part of a layer entry, selected by `layer_type`.
///
/// Omitted optional fields take the same defaults as the constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer_type", rename_all = "snake_case")]
pub enum LayerKind {
    Dense {
        n_units: usize,
        #[serde(default)]
        input_shape: Option<Shape>,
    },
    Conv2d {
        n_filters: usize,
        filter_shape: (usize, usize),
        #[serde(default)]
        input_shape: Option<Shape>,
        #[serde(default)]
        padding: Padding,
        #[serde(default = "default_stride")]
        stride: usize,
    },
    BatchNormalization {
        #[serde(default = "default_momentum")]
        momentum: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    Dropout {
        #[serde(default = "default_dropout")]
        p: f64,
    },
    Activation {
        activation: String,
    },
    Flatten {
        #[serde(default)]
        input_shape: Option<Shape>,
    },
    MaxPooling2d {
        #[serde(default = "default_pool_shape")]
        pool_shape: (usize, usize),
        #[serde(default = "default_stride")]
        stride: usize,
        #[serde(default)]
        padding: Padding,
    },
    AveragePooling2d {
        #[serde(default = "default_pool_shape")]
        pool_shape: (usize, usize),
        #[serde(default = "default_stride")]
        stride: usize,
        #[serde(default)]
        padding: Padding,
    },
}

/// Configuration for a single layer in the stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Explicit layer name (defaults to the type name)
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the layer's weights receive updates (default: true)
    #[serde(default = "default_true")]
    pub trainable: bool,
    #[serde(flatten)]
    pub kind: LayerKind,
}

impl LayerConfig {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            name: None,
            trainable: true,
            kind,
        }
    }

    /// Constructs the layer described by this entry. Values are not checked;
    /// see [`Layer::validate`].
    pub fn build(&self) -> Box<dyn Layer> {
        let mut layer: Box<dyn Layer> = match &self.kind {
            LayerKind::Dense {
                n_units,
                input_shape,
            } => {
                let mut dense = Dense::new(*n_units);
                if let Some(shape) = input_shape {
                    dense = dense.with_input_shape(shape.clone());
                }
                Box::new(dense)
            }
            LayerKind::Conv2d {
                n_filters,
                filter_shape,
                input_shape,
                padding,
                stride,
            } => {
                let mut conv = Conv2D::new(*n_filters, *filter_shape)
                    .with_padding(*padding)
                    .with_stride(*stride);
                if let Some(shape) = input_shape {
                    conv = conv.with_input_shape(shape.clone());
                }
                Box::new(conv)
            }
            LayerKind::BatchNormalization { momentum, epsilon } => {
                Box::new(BatchNormalization::new(*momentum, *epsilon))
            }
            LayerKind::Dropout { p } => Box::new(Dropout::new(*p)),
            LayerKind::Activation { activation } => Box::new(Activation::new(activation.clone())),
            LayerKind::Flatten { input_shape } => {
                let mut flatten = Flatten::new();
                if let Some(shape) = input_shape {
                    flatten = flatten.with_input_shape(shape.clone());
                }
                Box::new(flatten)
            }
            LayerKind::MaxPooling2d {
                pool_shape,
                stride,
                padding,
            } => Box::new(Pooling2D::max(*pool_shape, *stride, *padding)),
            LayerKind::AveragePooling2d {
                pool_shape,
                stride,
                padding,
            } => Box::new(Pooling2D::average(*pool_shape, *stride, *padding)),
        };

        layer.set_layer_name(self.name.as_deref());
        layer.set_trainable(self.trainable);
        layer
    }
}

/// Configuration for the entire layer stack.
///
/// Layers are applied in the order they appear in the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    /// Per-sample input shape; may instead be given on the first layer
    #[serde(default)]
    pub input_shape: Option<Shape>,
    /// Sequence of layer configurations defining the network structure
    pub layers: Vec<LayerConfig>,
}

/// Loads an architecture configuration from a JSON file.
///
/// Reads the file at `path`, deserializes it and validates it with
/// [`validate_architecture`].
///
/// # Examples
///
/// ```no_run
/// use ravdl::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/cnn.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: impl AsRef<Path>) -> Result<ArchitectureConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    debug!(path = %path.display(), "loading architecture");
    parse_architecture(&contents)
}

/// Parses and validates an architecture from a JSON string.
pub fn parse_architecture(contents: &str) -> Result<ArchitectureConfig> {
    let config: ArchitectureConfig = serde_json::from_str(contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

/// Validates an architecture configuration.
///
/// Checks that:
/// - Architecture has at least one layer
/// - Each layer's parameter values are within valid ranges
/// - When an input shape is known (top level or first layer), every layer
///   connects to the next one
///
/// # Errors
///
/// Returns the first failure, wrapped in `AtLayer` with the layer index.
pub fn validate_architecture(config: &ArchitectureConfig) -> Result<()> {
    let mut layers = build_layers(config)?;

    let has_input_shape =
        config.input_shape.is_some() || layers.first().and_then(|l| l.input_shape()).is_some();
    if has_input_shape {
        connect_layers(&mut layers, config.input_shape.clone())?;
    }
    Ok(())
}

/// Builds the layers of an architecture, in order.
///
/// Each layer is validated but not connected; pass the result to
/// [`connect_layers`] with the architecture's input shape.
///
/// # Examples
///
/// ```
/// use ravdl::architecture::{build_layers, parse_architecture};
/// use ravdl::wiring::connect_layers;
///
/// let config = parse_architecture(r#"{
///     "input_shape": [784],
///     "layers": [
///         { "layer_type": "dense", "n_units": 64 },
///         { "layer_type": "activation", "activation": "relu" },
///         { "layer_type": "dense", "n_units": 10 }
///     ]
/// }"#).unwrap();
///
/// let mut layers = build_layers(&config).unwrap();
/// let output = connect_layers(&mut layers, config.input_shape.clone()).unwrap();
/// assert_eq!(output.dims(), &[10]);
/// ```
pub fn build_layers(config: &ArchitectureConfig) -> Result<Vec<Box<dyn Layer>>> {
    if config.layers.is_empty() {
        return Err(LayerError::invalid(
            "architecture",
            "must have at least one layer",
        ));
    }

    config
        .layers
        .iter()
        .enumerate()
        .map(|(index, layer_config)| -> Result<Box<dyn Layer>> {
            let layer = layer_config.build();
            layer
                .validate()
                .map_err(|e| LayerError::at_layer(index, e))?;
            Ok(layer)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config: LayerConfig =
            serde_json::from_str(r#"{ "layer_type": "max_pooling2d" }"#).unwrap();

        assert_eq!(config.name, None);
        assert!(config.trainable);
        assert_eq!(
            config.kind,
            LayerKind::MaxPooling2d {
                pool_shape: (2, 2),
                stride: 1,
                padding: Padding::Same,
            }
        );
    }

    #[test]
    fn test_batchnorm_defaults() {
        let config: LayerConfig =
            serde_json::from_str(r#"{ "layer_type": "batch_normalization" }"#).unwrap();
        assert_eq!(
            config.kind,
            LayerKind::BatchNormalization {
                momentum: 0.99,
                epsilon: 1e-2,
            }
        );
    }

    #[test]
    fn test_build_applies_name_and_trainable() {
        let config = LayerConfig {
            name: Some("frozen_head".to_string()),
            trainable: false,
            kind: LayerKind::Dense {
                n_units: 3,
                input_shape: None,
            },
        };
        let layer = config.build();

        assert_eq!(layer.layer_name(), "frozen_head");
        assert!(!layer.trainable());
    }

    #[test]
    fn test_unknown_layer_type_rejected() {
        let result: std::result::Result<LayerConfig, _> =
            serde_json::from_str(r#"{ "layer_type": "lstm", "n_units": 3 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_value_reports_index() {
        let err = parse_architecture(
            r#"{ "layers": [
                { "layer_type": "dense", "n_units": 4 },
                { "layer_type": "dropout", "p": 1.5 }
            ] }"#,
        )
        .unwrap_err();

        assert!(matches!(err, LayerError::AtLayer { index: 1, .. }));
    }

    #[test]
    fn test_empty_architecture_rejected() {
        assert!(parse_architecture(r#"{ "layers": [] }"#).is_err());
    }
}
