//! Optimizer hyperparameter bundles
//!
//! The update rules themselves run inside the execution engine. What a layer
//! needs from an optimizer is its exported state: a JSON mapping of the
//! optimizer's name and hyperparameters, passed verbatim into every backward
//! declaration of a parameter-bearing layer.
//!
//! # Available Optimizers
//!
//! - SGD: Stochastic gradient descent with optional momentum
//! - Adam: Adaptive moment estimation
//! - RMSprop: Root mean square propagation
//!
//! # Example
//!
//! ```
//! use ravdl::optimizers::{Adam, Optimizer};
//!
//! let optimizer = Adam::default();
//! let state = optimizer.data_dict();
//! assert_eq!(state["name"], "Adam");
//! assert!(state.contains_key("learning_rate"));
//! ```

pub mod adam;
pub mod rmsprop;
pub mod sgd;

pub use adam::Adam;
pub use rmsprop::RMSprop;
pub use sgd::SGD;

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;

/// Serializable optimizer state, as exported by [`Optimizer::data_dict`].
pub type OptimizerState = Map<String, Value>;

/// Contract consumed by backward declarations.
///
/// Layers keep their own clone of the optimizer handed to them at
/// initialization (see [`Optimizer::boxed_clone`]).
pub trait Optimizer: Debug {
    /// Name the engine uses to pick the update rule.
    fn name(&self) -> &'static str;

    /// Exports name and hyperparameters as a JSON object.
    fn data_dict(&self) -> OptimizerState;

    fn boxed_clone(&self) -> Box<dyn Optimizer>;
}

/// Serializes `hyperparameters` and stamps the optimizer name on top.
///
/// `T` is one of the optimizer structs in this module: a derived `Serialize`
/// over named `f64` fields. Such a struct always serializes to a JSON object
/// (non-finite floats become `null`), so the empty-map arm is unreachable for
/// them.
pub(crate) fn export_state<T: Serialize>(name: &str, hyperparameters: &T) -> OptimizerState {
    let mut state = match serde_json::to_value(hyperparameters) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    state.insert("name".to_string(), Value::String(name.to_string()));
    state
}
