//! Padding policies and the padding resolver
//!
//! Convolution and pooling layers take a padding policy instead of explicit
//! pad amounts. The resolver turns a policy and a filter shape into the pad
//! applied before and after each spatial axis.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pad applied (before, after) one spatial axis.
pub type PadPair = (usize, usize);

/// Padding policy for spatial layers.
///
/// - **Same**: pad so that a stride-1 window keeps the spatial size
/// - **Valid**: no padding, the output shrinks by `filter - 1`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    #[default]
    Same,
    Valid,
}

impl Padding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Padding::Same => "same",
            Padding::Valid => "valid",
        }
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Padding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "same" => Ok(Padding::Same),
            "valid" => Ok(Padding::Valid),
            other => Err(format!(
                "Invalid padding '{}'. Must be one of: same, valid",
                other
            )),
        }
    }
}

/// Resolves a padding policy into per-axis pad pairs.
///
/// For `Same` the total pad on an axis is `filter - 1`, split so the smaller
/// half goes before and the larger half after: a 4-wide filter pads `(1, 2)`.
/// `Valid` pads nothing.
///
/// # Returns
///
/// `(pad_height, pad_width)`, each a `(before, after)` pair.
///
/// # Examples
///
/// ```
/// use ravdl::utils::padding::{determine_padding, Padding};
///
/// assert_eq!(determine_padding((3, 3), Padding::Same), ((1, 1), (1, 1)));
/// assert_eq!(determine_padding((3, 3), Padding::Valid), ((0, 0), (0, 0)));
/// ```
pub fn determine_padding(filter_shape: (usize, usize), padding: Padding) -> (PadPair, PadPair) {
    match padding {
        Padding::Valid => ((0, 0), (0, 0)),
        Padding::Same => {
            let (filter_height, filter_width) = filter_shape;
            (split_pad(filter_height), split_pad(filter_width))
        }
    }
}

fn split_pad(filter_dim: usize) -> PadPair {
    let total = filter_dim.saturating_sub(1);
    (total / 2, total - total / 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_padding_odd_filter() {
        assert_eq!(determine_padding((5, 3), Padding::Same), ((2, 2), (1, 1)));
    }

    #[test]
    fn test_same_padding_even_filter_puts_extra_after() {
        assert_eq!(determine_padding((2, 4), Padding::Same), ((0, 1), (1, 2)));
    }

    #[test]
    fn test_valid_padding_is_zero() {
        assert_eq!(determine_padding((7, 7), Padding::Valid), ((0, 0), (0, 0)));
    }

    #[test]
    fn test_unit_filter_needs_no_padding() {
        assert_eq!(determine_padding((1, 1), Padding::Same), ((0, 0), (0, 0)));
    }

    #[test]
    fn test_parse_padding() {
        assert_eq!("same".parse::<Padding>().unwrap(), Padding::Same);
        assert_eq!("VALID".parse::<Padding>().unwrap(), Padding::Valid);
        assert!("full".parse::<Padding>().is_err());
    }

    #[test]
    fn test_padding_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Padding::Valid).unwrap(), "\"valid\"");
        let parsed: Padding = serde_json::from_str("\"same\"").unwrap();
        assert_eq!(parsed, Padding::Same);
    }
}
