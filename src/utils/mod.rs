//! Shared utilities for the layer implementations
//!
//! This module provides the padding resolver used for convolution shape
//! arithmetic and the seeded RNG used to materialise weight shadows.

pub mod padding;
pub mod rng;

pub use padding::{determine_padding, PadPair, Padding};
pub use rng::SimpleRng;
