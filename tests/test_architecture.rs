//! Tests for architecture parsing and building
//!
//! This file tests the architecture module including:
//! - Loading valid JSON architecture configs
//! - Parsing every layer type and its defaults
//! - Building and connecting layer stacks from configs
//! - Handling invalid JSON, missing files and invalid values
//! - Validating layer connections

use ravdl::architecture::{build_layers, load_architecture, parse_architecture, LayerKind};
use ravdl::error::LayerError;
use ravdl::utils::Padding;
use ravdl::wiring::connect_layers;
use ravdl::Shape;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp config");
    file
}

// ============================================================================
// Valid Architecture Loading Tests
// ============================================================================

mod valid_architecture_tests {
    use super::*;

    #[test]
    fn test_load_simple_mlp() {
        let config_json = r#"{
  "input_shape": [784],
  "layers": [
    { "layer_type": "dense", "n_units": 256 },
    { "layer_type": "activation", "activation": "relu" },
    { "layer_type": "dense", "n_units": 10 }
  ]
}"#;

        let temp_file = write_temp_config(config_json);
        let config = load_architecture(temp_file.path()).unwrap();

        assert_eq!(config.input_shape, Some(Shape::from([784])));
        assert_eq!(config.layers.len(), 3);
        assert_eq!(
            config.layers[0].kind,
            LayerKind::Dense {
                n_units: 256,
                input_shape: None
            }
        );
        assert_eq!(
            config.layers[1].kind,
            LayerKind::Activation {
                activation: "relu".to_string()
            }
        );
    }

    #[test]
    fn test_load_conv2d_architecture() {
        let config_json = r#"{
  "layers": [
    {
      "layer_type": "conv2d",
      "n_filters": 8,
      "filter_shape": [3, 3],
      "input_shape": [1, 28, 28],
      "padding": "valid",
      "stride": 1
    },
    { "layer_type": "max_pooling2d", "pool_shape": [2, 2], "stride": 2 },
    { "layer_type": "flatten" },
    { "layer_type": "dense", "n_units": 10 }
  ]
}"#;

        let temp_file = write_temp_config(config_json);
        let config = load_architecture(temp_file.path()).unwrap();

        assert_eq!(config.input_shape, None);
        assert_eq!(
            config.layers[0].kind,
            LayerKind::Conv2d {
                n_filters: 8,
                filter_shape: (3, 3),
                input_shape: Some(Shape::from([1, 28, 28])),
                padding: Padding::Valid,
                stride: 1,
            }
        );
    }

    #[test]
    fn test_load_names_and_trainable_flags() {
        let config_json = r#"{
  "input_shape": [16],
  "layers": [
    { "layer_type": "dense", "n_units": 8, "name": "encoder", "trainable": false },
    { "layer_type": "dense", "n_units": 2 }
  ]
}"#;

        let config = parse_architecture(config_json).unwrap();
        assert_eq!(config.layers[0].name.as_deref(), Some("encoder"));
        assert!(!config.layers[0].trainable);
        assert!(config.layers[1].trainable);
    }

    #[test]
    fn test_load_shipped_architectures() {
        let root = env!("CARGO_MANIFEST_DIR");
        for name in ["cnn.json", "mlp.json"] {
            let path = format!("{}/config/architectures/{}", root, name);
            let config = load_architecture(&path).unwrap();
            assert!(!config.layers.is_empty(), "{} has no layers", name);
        }
    }
}

// ============================================================================
// Layer Building Tests
// ============================================================================

mod layer_building_tests {
    use super::*;

    #[test]
    fn test_build_and_connect_cnn() {
        let config = parse_architecture(
            r#"{
  "input_shape": [3, 32, 32],
  "layers": [
    { "layer_type": "conv2d", "n_filters": 16, "filter_shape": [3, 3] },
    { "layer_type": "batch_normalization" },
    { "layer_type": "activation", "activation": "relu" },
    { "layer_type": "max_pooling2d", "pool_shape": [2, 2], "stride": 2 },
    { "layer_type": "average_pooling2d", "pool_shape": [2, 2], "stride": 2 },
    { "layer_type": "flatten" },
    { "layer_type": "dropout", "p": 0.5 },
    { "layer_type": "dense", "n_units": 10 }
  ]
}"#,
        )
        .unwrap();

        let mut layers = build_layers(&config).unwrap();
        let output = connect_layers(&mut layers, config.input_shape.clone()).unwrap();

        assert_eq!(output, Shape::from([10]));
        assert_eq!(layers[3].output_shape().unwrap(), Shape::from([16, 16, 16]));
        assert_eq!(layers[4].output_shape().unwrap(), Shape::from([16, 8, 8]));
        assert_eq!(layers[5].output_shape().unwrap(), Shape::from([1024]));

        let names: Vec<&str> = layers.iter().map(|l| l.layer_name()).collect();
        assert_eq!(
            names,
            vec![
                "Conv2D",
                "BatchNormalization",
                "Activation",
                "MaxPooling2D",
                "AveragePooling2D",
                "Flatten",
                "Dropout",
                "Dense"
            ]
        );
    }

    #[test]
    fn test_build_single_layer() {
        let config = parse_architecture(
            r#"{ "layers": [ { "layer_type": "dense", "n_units": 4, "input_shape": [2] } ] }"#,
        )
        .unwrap();

        let mut layers = build_layers(&config).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(connect_layers(&mut layers, None).unwrap(), Shape::from([4]));
    }

    #[test]
    fn test_build_without_input_shape_defers_connection() {
        let config = parse_architecture(
            r#"{ "layers": [ { "layer_type": "flatten" }, { "layer_type": "dense", "n_units": 3 } ] }"#,
        )
        .unwrap();

        let mut layers = build_layers(&config).unwrap();
        assert!(connect_layers(&mut layers, None).is_err());
        assert_eq!(
            connect_layers(&mut layers, Some(Shape::from([2, 5]))).unwrap(),
            Shape::from([3])
        );
    }
}

// ============================================================================
// Error Handling Tests
// ============================================================================

mod error_handling_tests {
    use super::*;

    #[test]
    fn test_invalid_json() {
        let invalid_json = r#"{
  "layers": [
    { "layer_type": "dense", "n_units": 256 },  // trailing comma
  ]
}"#;

        let temp_file = write_temp_config(invalid_json);
        let result = load_architecture(temp_file.path());

        assert!(matches!(result, Err(LayerError::Json(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_architecture("nonexistent_file.json");
        assert!(matches!(result, Err(LayerError::Io(_))));
    }

    #[test]
    fn test_empty_layers() {
        let result = parse_architecture(r#"{ "layers": [] }"#);

        let error_msg = result.unwrap_err().to_string();
        assert!(error_msg.contains("at least one layer"));
    }

    #[test]
    fn test_invalid_layer_type() {
        let result = parse_architecture(
            r#"{ "layers": [ { "layer_type": "invalid_layer", "n_units": 3 } ] }"#,
        );
        assert!(matches!(result, Err(LayerError::Json(_))));
    }

    #[test]
    fn test_missing_required_field_dense() {
        let result = parse_architecture(r#"{ "layers": [ { "layer_type": "dense" } ] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_required_field_conv2d() {
        let result = parse_architecture(
            r#"{ "layers": [ { "layer_type": "conv2d", "n_filters": 4 } ] }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_padding() {
        let result = parse_architecture(
            r#"{ "layers": [ { "layer_type": "conv2d", "n_filters": 4, "filter_shape": [3, 3], "padding": "full" } ] }"#,
        );
        assert!(matches!(result, Err(LayerError::Json(_))));
    }

    #[test]
    fn test_layer_connection_mismatch() {
        let result = parse_architecture(
            r#"{
  "input_shape": [784],
  "layers": [
    { "layer_type": "dense", "n_units": 256 },
    { "layer_type": "dense", "n_units": 10, "input_shape": [128] }
  ]
}"#,
        );

        let err = result.unwrap_err();
        assert!(err.to_string().contains("declares input shape (128,)"));
        match err {
            LayerError::AtLayer { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, LayerError::ShapeMismatch { .. }));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_zero_units() {
        let result = parse_architecture(r#"{ "layers": [ { "layer_type": "dense", "n_units": 0 } ] }"#);
        assert!(matches!(result, Err(LayerError::AtLayer { index: 0, .. })));
    }

    #[test]
    fn test_invalid_dropout_rate() {
        let result = parse_architecture(r#"{ "layers": [ { "layer_type": "dropout", "p": 1.0 } ] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_batchnorm_momentum() {
        let result = parse_architecture(
            r#"{ "layers": [ { "layer_type": "batch_normalization", "momentum": 1.5 } ] }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pooling_that_does_not_tile_is_rejected() {
        let result = parse_architecture(
            r#"{
  "input_shape": [3, 33, 33],
  "layers": [ { "layer_type": "max_pooling2d", "pool_shape": [2, 2], "stride": 2 } ]
}"#,
        );

        match result {
            Err(LayerError::AtLayer { source, .. }) => {
                assert!(matches!(*source, LayerError::NonIntegralOutput { .. }))
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
