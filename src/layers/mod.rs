//! Layer abstractions for graph-declaring neural networks
//!
//! This module provides the Layer trait and implementations for the layer
//! types a model is assembled from. Parameter-bearing layers (Dense, Conv2D,
//! BatchNormalization) hold weight shadows and an optimizer; the rest only
//! declare ops.

mod r#trait;
pub mod activation;
pub mod batchnorm;
pub mod conv2d;
pub mod dense;
pub mod dropout;
pub mod flatten;
pub mod pooling;
pub mod shadow;

// Re-export the Layer trait for convenience
pub use r#trait::{Layer, LayerBase, PassContext};
pub use activation::Activation;
pub use batchnorm::BatchNormalization;
pub use conv2d::Conv2D;
pub use dense::Dense;
pub use dropout::Dropout;
pub use flatten::Flatten;
pub use pooling::{PoolKind, Pooling2D};
pub use shadow::{Init, WeightShadow};
