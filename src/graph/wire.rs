//! Value encodings used by the execution engine.
//!
//! Flags travel as `"True"`/`"False"`; padding and activation settings travel
//! as the string form of a one-entry dict, e.g. `{'padding': 'same'}`.

use crate::utils::padding::Padding;
use serde::Serializer;

/// `"True"` / `"False"`, the engine's spelling of a boolean flag.
pub fn flag_str(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

pub(crate) fn flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(flag_str(*value))
}

/// `{'<key>': '<value>'}`
pub fn dict_str(key: &str, value: &str) -> String {
    format!("{{'{}': '{}'}}", key, value)
}

pub(crate) fn padding_data<S: Serializer>(
    padding: &Padding,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&dict_str("padding", padding.as_str()))
}

pub(crate) fn act_data<S: Serializer>(name: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&dict_str("name", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_spelling() {
        assert_eq!(flag_str(true), "True");
        assert_eq!(flag_str(false), "False");
    }

    #[test]
    fn test_dict_spelling() {
        assert_eq!(dict_str("padding", "valid"), "{'padding': 'valid'}");
        assert_eq!(dict_str("name", "relu"), "{'name': 'relu'}");
    }
}
