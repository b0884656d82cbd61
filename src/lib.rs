//! Graph-declaring neural network layers
//!
//! Layers in this crate do not compute anything. Calling a layer declares a
//! node in an external, lazily evaluated operation graph and hands back an
//! opaque [`graph::NodeHandle`]; a separate execution engine resolves the
//! graph later. What lives here is shape arithmetic, parameter bookkeeping and
//! the declaration calls themselves.
//!
//! # Modules
//!
//! - `layers`: Layer trait and implementations (Dense, Conv2D, BatchNormalization, ...)
//! - `graph`: Node handles, op declarations and the `OpGraph` engine interface
//! - `optimizers`: Optimizer hyperparameter bundles passed into backward declarations
//! - `utils`: Padding resolver and the seeded RNG used for weight shadows
//! - `architecture`: JSON architecture configuration and layer building
//! - `wiring`: Shape threading, forward/backward chaining and model summaries

pub mod architecture;
pub mod error;
pub mod graph;
pub mod layers;
pub mod optimizers;
pub mod shape;
pub mod utils;
pub mod wiring;

pub use error::{LayerError, Result};
pub use shape::Shape;
