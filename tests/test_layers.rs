//! Tests for layer shape arithmetic and initialization
//!
//! This file tests the layer types including:
//! - Output shape computation for every layer
//! - Parameter counts from weight shadows
//! - Validation of constructor arguments
//! - Weight shadow shapes and initialization ranges

use approx::assert_relative_eq;
use ravdl::error::LayerError;
use ravdl::layers::{
    Activation, BatchNormalization, Conv2D, Dense, Dropout, Flatten, Init, Layer, Pooling2D,
};
use ravdl::optimizers::{Adam, SGD};
use ravdl::utils::{Padding, SimpleRng};
use ravdl::Shape;

// ============================================================================
// Dense Layer Tests
// ============================================================================

mod dense_tests {
    use super::*;

    #[test]
    fn test_dense_output_shape_ignores_input() {
        let layer = Dense::new(10).with_input_shape(Shape::from([784]));
        assert_eq!(layer.output_shape().unwrap(), Shape::from([10]));
    }

    #[test]
    fn test_dense_parameters_after_initialize() {
        let mut layer = Dense::new(10).with_input_shape(Shape::from([784]));
        assert_eq!(layer.parameters(), 0);

        layer.initialize(&SGD::default()).unwrap();
        assert_eq!(layer.parameters(), 7850);
    }

    #[test]
    fn test_dense_shadow_shapes() {
        let mut layer = Dense::new(3).with_input_shape(Shape::from([4]));
        layer.initialize(&Adam::default()).unwrap();

        assert_eq!(layer.weights().unwrap().shape(), &Shape::from([4, 3]));
        assert_eq!(layer.bias().unwrap().shape(), &Shape::from([1, 3]));
        assert_eq!(layer.bias().unwrap().init(), Init::Zeros);
    }

    #[test]
    fn test_dense_weights_within_limit() {
        let mut layer = Dense::new(8).with_input_shape(Shape::from([16]));
        layer.initialize(&SGD::default()).unwrap();

        let mut rng = SimpleRng::new(42);
        let values = layer.weights().unwrap().materialize(&mut rng);
        assert_eq!(values.len(), 128);
        assert!(values.iter().all(|v| v.abs() <= 0.25));
    }

    #[test]
    fn test_dense_requires_flat_input() {
        let mut layer = Dense::new(10).with_input_shape(Shape::from([1, 28, 28]));
        assert!(matches!(
            layer.initialize(&SGD::default()),
            Err(LayerError::WrongRank { expected: 1, .. })
        ));
    }

    #[test]
    fn test_dense_zero_units_invalid() {
        assert!(Dense::new(0).validate().is_err());
    }
}

// ============================================================================
// Convolution and Pooling Tests
// ============================================================================

mod spatial_tests {
    use super::*;

    #[test]
    fn test_conv_same_and_valid() {
        let same = Conv2D::new(16, (3, 3)).with_input_shape(Shape::from([3, 32, 32]));
        assert_eq!(same.output_shape().unwrap(), Shape::from([16, 32, 32]));

        let valid = Conv2D::new(16, (3, 3))
            .with_padding(Padding::Valid)
            .with_input_shape(Shape::from([3, 32, 32]));
        assert_eq!(valid.output_shape().unwrap(), Shape::from([16, 30, 30]));
    }

    #[test]
    fn test_conv_rectangular_filter() {
        let layer = Conv2D::new(2, (1, 5))
            .with_padding(Padding::Valid)
            .with_input_shape(Shape::from([1, 10, 10]));
        assert_eq!(layer.output_shape().unwrap(), Shape::from([2, 10, 6]));
    }

    #[test]
    fn test_conv_parameters() {
        let mut layer = Conv2D::new(16, (3, 3)).with_input_shape(Shape::from([3, 32, 32]));
        layer.initialize(&SGD::default()).unwrap();
        assert_eq!(layer.parameters(), 16 * 3 * 3 * 3 + 16);
    }

    #[test]
    fn test_max_pool_halves() {
        let mut layer = Pooling2D::max((2, 2), 2, Padding::Same);
        layer.set_input_shape(Shape::from([3, 32, 32]));
        assert_eq!(layer.output_shape().unwrap(), Shape::from([3, 16, 16]));
        assert_eq!(layer.parameters(), 0);
    }

    #[test]
    fn test_pool_non_integral_rejected() {
        let mut layer = Pooling2D::average((2, 2), 2, Padding::Same);
        layer.set_input_shape(Shape::from([3, 33, 33]));

        let err = layer.output_shape().unwrap_err();
        assert!(matches!(err, LayerError::NonIntegralOutput { .. }));
        assert!(err.to_string().contains("does not tile"));
    }

    #[test]
    fn test_pool_requires_rank_three() {
        let mut layer = Pooling2D::max((2, 2), 2, Padding::Valid);
        layer.set_input_shape(Shape::from([32, 32]));
        assert!(matches!(
            layer.output_shape(),
            Err(LayerError::WrongRank { .. })
        ));
    }
}

// ============================================================================
// Shape-Preserving Layer Tests
// ============================================================================

mod passthrough_tests {
    use super::*;

    #[test]
    fn test_flatten() {
        let layer = Flatten::new().with_input_shape(Shape::from([3, 4, 4]));
        assert_eq!(layer.output_shape().unwrap(), Shape::from([48]));
        assert_eq!(layer.parameters(), 0);
    }

    #[test]
    fn test_activation_and_dropout_preserve_shape() {
        let shape = Shape::from([8, 5, 5]);

        let mut activation = Activation::new("relu");
        activation.set_input_shape(shape.clone());
        assert_eq!(activation.output_shape().unwrap(), shape);

        let mut dropout = Dropout::new(0.5);
        dropout.set_input_shape(shape.clone());
        assert_eq!(dropout.output_shape().unwrap(), shape);
    }

    #[test]
    fn test_dropout_rate_bounds() {
        assert!(Dropout::new(0.0).validate().is_ok());
        assert!(Dropout::new(1.0).validate().is_err());
        assert!(Dropout::new(-0.1).validate().is_err());
    }

    #[test]
    fn test_batchnorm_flat_input() {
        let mut layer = BatchNormalization::new(0.99, 1e-2);
        layer.set_input_shape(Shape::from([64]));
        layer.initialize(&SGD::default()).unwrap();

        assert_eq!(layer.output_shape().unwrap(), Shape::from([64]));
        assert_eq!(layer.gamma().unwrap().shape(), &Shape::from([1, 64]));
        assert_eq!(layer.gamma().unwrap().init(), Init::Ones);
        assert_eq!(layer.parameters(), 128);
    }

    #[test]
    fn test_batchnorm_spatial_input() {
        let mut layer = BatchNormalization::new(0.9, 1e-3);
        layer.set_input_shape(Shape::from([16, 8, 8]));
        layer.initialize(&SGD::default()).unwrap();

        assert_eq!(layer.beta().unwrap().shape(), &Shape::from([1, 16, 1, 1]));
        assert_eq!(layer.parameters(), 32);
        assert_relative_eq!(layer.momentum(), 0.9);
    }
}

// ============================================================================
// Edge Case Tests
// ============================================================================

mod edge_case_tests {
    use super::*;

    #[test]
    fn test_output_shape_is_pure() {
        let layers: Vec<Box<dyn Layer>> = vec![
            Box::new(Conv2D::new(4, (3, 3)).with_input_shape(Shape::from([1, 8, 8]))),
            Box::new(Flatten::new().with_input_shape(Shape::from([4, 8, 8]))),
        ];
        for layer in &layers {
            let first = layer.output_shape().unwrap();
            let second = layer.output_shape().unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_missing_input_shape() {
        assert!(matches!(
            Activation::new("tanh").output_shape(),
            Err(LayerError::MissingInputShape { .. })
        ));
    }

    #[test]
    fn test_layer_names() {
        let mut layer = Dense::new(4);
        assert_eq!(layer.layer_name(), "Dense");
        layer.set_layer_name(Some("classifier"));
        assert_eq!(layer.layer_name(), "classifier");
    }
}
