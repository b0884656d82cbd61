//! 2D Convolutional layer implementation
//!
//! This module provides a Conv2D layer whose engine-side op slides
//! `n_filters` learnable filters over a `(C, H, W)` input.

use crate::error::{LayerError, Result};
use crate::graph::{NodeHandle, OpDeclaration, OpGraph, OpKind, OpParams};
use crate::layers::{Layer, LayerBase, PassContext, WeightShadow};
use crate::optimizers::Optimizer;
use crate::shape::Shape;
use crate::utils::padding::{determine_padding, Padding};
use tracing::trace;

/// 2D Convolutional layer with learnable filters.
///
/// # Fields
///
/// * `n_filters` - Number of output feature maps
/// * `filter_shape` - `(filter_height, filter_width)`
/// * `padding` - Padding policy, resolved by [`determine_padding`]
/// * `stride` - Stride for the convolution operation
///
/// Weight shadows after `initialize`:
///
/// * `W` - `(n_filters, C, filter_height, filter_width)`, uniform on
///   `[-limit, limit]` with `limit = 1/sqrt(filter_height * filter_width)`
/// * `w0` - `(n_filters, 1)`, zeros
///
/// # Example
///
/// ```
/// use ravdl::layers::{Conv2D, Layer};
/// use ravdl::utils::Padding;
/// use ravdl::Shape;
///
/// let layer = Conv2D::new(16, (3, 3))
///     .with_padding(Padding::Valid)
///     .with_input_shape(Shape::from([3, 32, 32]));
/// assert_eq!(layer.output_shape().unwrap(), Shape::from([16, 30, 30]));
/// ```
#[derive(Debug)]
pub struct Conv2D {
    base: LayerBase,
    n_filters: usize,
    filter_shape: (usize, usize),
    padding: Padding,
    stride: usize,
    optimizer: Option<Box<dyn Optimizer>>,
    layer_input: Option<NodeHandle>,
    weights: Option<WeightShadow>,
    bias: Option<WeightShadow>,
}

impl Conv2D {
    /// Same padding, stride 1.
    pub fn new(n_filters: usize, filter_shape: (usize, usize)) -> Self {
        Self {
            base: LayerBase::new("Conv2D"),
            n_filters,
            filter_shape,
            padding: Padding::Same,
            stride: 1,
            optimizer: None,
            layer_input: None,
            weights: None,
            bias: None,
        }
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_input_shape(mut self, shape: Shape) -> Self {
        self.base.set_input_shape(shape);
        self
    }

    pub fn n_filters(&self) -> usize {
        self.n_filters
    }

    pub fn filter_shape(&self) -> (usize, usize) {
        self.filter_shape
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn weights(&self) -> Option<&WeightShadow> {
        self.weights.as_ref()
    }

    pub fn bias(&self) -> Option<&WeightShadow> {
        self.bias.as_ref()
    }

    /// `floor((dim + pad_before + pad_after - filter) / stride) + 1`
    fn output_dim(&self, axis: &str, dim: usize, pad: (usize, usize), filter: usize) -> Result<usize> {
        let padded = dim + pad.0 + pad.1;
        if filter > padded {
            return Err(LayerError::invalid(
                self.layer_name(),
                format!(
                    "filter {} ({}) is larger than the padded input {} ({})",
                    axis, filter, axis, padded
                ),
            ));
        }
        Ok((padded - filter) / self.stride + 1)
    }
}

impl Layer for Conv2D {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayerBase {
        &mut self.base
    }

    fn parameters(&self) -> usize {
        self.weights.as_ref().map_or(0, WeightShadow::numel)
            + self.bias.as_ref().map_or(0, WeightShadow::numel)
    }

    fn output_shape(&self) -> Result<Shape> {
        self.validate()?;
        let input = self.base.require_rank(3)?;
        let (height, width) = (input.dims()[1], input.dims()[2]);
        let (pad_h, pad_w) = determine_padding(self.filter_shape, self.padding);

        let out_height = self.output_dim("height", height, pad_h, self.filter_shape.0)?;
        let out_width = self.output_dim("width", width, pad_w, self.filter_shape.1)?;
        trace!(
            layer = self.layer_name(),
            out_height,
            out_width,
            "resolved conv output"
        );

        Ok(Shape::from([self.n_filters, out_height, out_width]))
    }

    fn validate(&self) -> Result<()> {
        if self.n_filters == 0 {
            return Err(LayerError::invalid(
                self.layer_name(),
                "n_filters must be greater than 0",
            ));
        }
        if self.filter_shape.0 == 0 || self.filter_shape.1 == 0 {
            return Err(LayerError::invalid(
                self.layer_name(),
                "filter dimensions must be greater than 0",
            ));
        }
        if self.stride == 0 {
            return Err(LayerError::invalid(
                self.layer_name(),
                "stride must be greater than 0",
            ));
        }
        Ok(())
    }

    fn initialize(&mut self, optimizer: &dyn Optimizer) -> Result<()> {
        self.validate()?;
        let channels = self.base.require_rank(3)?.dims()[0];
        let (filter_height, filter_width) = self.filter_shape;

        // Fan-in excludes the channel count.
        self.weights = Some(WeightShadow::uniform_fan_in(
            [self.n_filters, channels, filter_height, filter_width],
            filter_height * filter_width,
        ));
        self.bias = Some(WeightShadow::zeros([self.n_filters, 1]));
        self.optimizer = Some(optimizer.boxed_clone());
        Ok(())
    }

    fn forward(
        &mut self,
        graph: &mut dyn OpGraph,
        input: &NodeHandle,
        ctx: PassContext,
    ) -> Result<NodeHandle> {
        let params = OpParams::Conv2D {
            input_shape: self.base.require_input_shape()?.clone(),
            n_filters: self.n_filters,
            filter_shape: self.filter_shape,
            stride: self.stride,
            padding: self.padding,
        };
        let declaration = OpDeclaration::forward(OpKind::Conv2D, input.clone(), params)
            .with_data(self.base.backward_pass().cloned())
            .as_input_layer(ctx.input_layer);

        let node = graph.declare(declaration)?;
        self.layer_input = Some(input.clone());
        Ok(self.base.replace_forward(node))
    }

    fn backward(
        &mut self,
        graph: &mut dyn OpGraph,
        grad: &NodeHandle,
        input_layer: bool,
    ) -> Result<Option<NodeHandle>> {
        let optimizer = self
            .optimizer
            .as_ref()
            .ok_or_else(|| LayerError::NotInitialized {
                layer: self.base.name().to_string(),
            })?;
        let forward = self.base.require_forward()?.clone();
        let params = OpParams::Conv2DGrad {
            n_filters: self.n_filters,
            filter_shape: self.filter_shape,
            stride: self.stride,
            padding: self.padding,
            trainable: self.base.trainable(),
        };

        let declaration = OpDeclaration::backward(OpKind::Conv2D, grad.clone(), params)
            .with_layer_input(self.layer_input.clone())
            .with_optimizer(optimizer.data_dict())
            .with_data(Some(forward))
            .as_input_layer(input_layer);

        let node = graph.declare(declaration)?;
        Ok(Some(self.base.replace_backward(node)))
    }

    fn persist_weights(&self, graph: &mut dyn OpGraph) -> Result<()> {
        self.base.persist(graph)
    }
}
