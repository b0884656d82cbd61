//! 2D pooling layers (max and average)
//!
//! Both members of the pooling family share the same shape rule:
//! `out = (in - pool) / stride + 1` on height and width, which must divide
//! evenly. The engine's pooling ops do not truncate, so a window that does not
//! tile the input is rejected here instead of producing a shape the engine
//! would disagree with.

use crate::error::{LayerError, Result};
use crate::graph::{NodeHandle, OpDeclaration, OpGraph, OpKind, OpParams};
use crate::layers::{Layer, LayerBase, PassContext};
use crate::shape::Shape;
use crate::utils::padding::Padding;

/// Reduction applied over each pooling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Max,
    Average,
}

impl PoolKind {
    fn layer_name(&self) -> &'static str {
        match self {
            PoolKind::Max => "MaxPooling2D",
            PoolKind::Average => "AveragePooling2D",
        }
    }

    fn op_kind(&self) -> OpKind {
        match self {
            PoolKind::Max => OpKind::MaxPool2D,
            PoolKind::Average => OpKind::AvgPool2D,
        }
    }
}

/// 2D pooling layer over `(C, H, W)` inputs.
///
/// # Example
///
/// ```
/// use ravdl::layers::{Layer, Pooling2D};
/// use ravdl::utils::Padding;
/// use ravdl::Shape;
///
/// let mut pool = Pooling2D::max((2, 2), 2, Padding::Same);
/// pool.set_input_shape(Shape::from([3, 32, 32]));
/// assert_eq!(pool.output_shape().unwrap(), Shape::from([3, 16, 16]));
///
/// pool.set_input_shape(Shape::from([3, 33, 33]));
/// assert!(pool.output_shape().is_err());
/// ```
#[derive(Debug)]
pub struct Pooling2D {
    base: LayerBase,
    kind: PoolKind,
    pool_shape: (usize, usize),
    stride: usize,
    padding: Padding,
}

impl Pooling2D {
    pub fn new(kind: PoolKind, pool_shape: (usize, usize), stride: usize, padding: Padding) -> Self {
        Self {
            base: LayerBase::new(kind.layer_name()),
            kind,
            pool_shape,
            stride,
            padding,
        }
    }

    pub fn max(pool_shape: (usize, usize), stride: usize, padding: Padding) -> Self {
        Self::new(PoolKind::Max, pool_shape, stride, padding)
    }

    pub fn average(pool_shape: (usize, usize), stride: usize, padding: Padding) -> Self {
        Self::new(PoolKind::Average, pool_shape, stride, padding)
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn pool_shape(&self) -> (usize, usize) {
        self.pool_shape
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    fn params(&self) -> Result<OpParams> {
        Ok(OpParams::Pool2D {
            input_shape: self.base.require_input_shape()?.clone(),
            pool_shape: self.pool_shape,
            stride: self.stride,
            padding: self.padding,
        })
    }

    fn non_integral(&self, input: &Shape) -> LayerError {
        LayerError::NonIntegralOutput {
            layer: self.layer_name().to_string(),
            input: input.clone(),
            pool_shape: self.pool_shape,
            stride: self.stride,
        }
    }
}

impl Layer for Pooling2D {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayerBase {
        &mut self.base
    }

    fn output_shape(&self) -> Result<Shape> {
        self.validate()?;
        let input = self.base.require_rank(3)?;
        let (channels, height, width) = (input.dims()[0], input.dims()[1], input.dims()[2]);
        let (pool_height, pool_width) = self.pool_shape;

        if pool_height > height || pool_width > width {
            return Err(self.non_integral(input));
        }
        let (span_height, span_width) = (height - pool_height, width - pool_width);
        if span_height % self.stride != 0 || span_width % self.stride != 0 {
            return Err(self.non_integral(input));
        }

        Ok(Shape::from([
            channels,
            span_height / self.stride + 1,
            span_width / self.stride + 1,
        ]))
    }

    fn validate(&self) -> Result<()> {
        if self.pool_shape.0 == 0 || self.pool_shape.1 == 0 {
            return Err(LayerError::invalid(
                self.layer_name(),
                "pool dimensions must be greater than 0",
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

    fn forward(
        &mut self,
        graph: &mut dyn OpGraph,
        input: &NodeHandle,
        ctx: PassContext,
    ) -> Result<NodeHandle> {
        let declaration = OpDeclaration::forward(self.kind.op_kind(), input.clone(), self.params()?)
            .as_input_layer(ctx.input_layer);

        let node = graph.declare(declaration)?;
        Ok(self.base.replace_forward(node))
    }

    fn backward(
        &mut self,
        graph: &mut dyn OpGraph,
        grad: &NodeHandle,
        input_layer: bool,
    ) -> Result<Option<NodeHandle>> {
        let forward = self.base.require_forward()?.clone();
        let declaration = OpDeclaration::backward(self.kind.op_kind(), grad.clone(), self.params()?)
            .with_data(Some(forward))
            .as_input_layer(input_layer);

        let node = graph.declare(declaration)?;
        Ok(Some(self.base.replace_backward(node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RecordingGraph;

    fn pool(stride: usize, input: [usize; 3]) -> Pooling2D {
        let mut layer = Pooling2D::max((2, 2), stride, Padding::Same);
        layer.set_input_shape(Shape::from(input));
        layer
    }

    #[test]
    fn test_even_tiling() {
        assert_eq!(pool(2, [3, 32, 32]).output_shape().unwrap(), Shape::from([3, 16, 16]));
    }

    #[test]
    fn test_uneven_tiling_rejected() {
        assert!(matches!(
            pool(2, [3, 33, 33]).output_shape(),
            Err(LayerError::NonIntegralOutput { stride: 2, .. })
        ));
    }

    #[test]
    fn test_stride_one_always_tiles() {
        assert_eq!(pool(1, [3, 33, 33]).output_shape().unwrap(), Shape::from([3, 32, 32]));
    }

    #[test]
    fn test_pool_larger_than_input_rejected() {
        assert!(pool(1, [1, 1, 4]).output_shape().is_err());
    }

    #[test]
    fn test_default_names() {
        assert_eq!(Pooling2D::max((2, 2), 1, Padding::Same).layer_name(), "MaxPooling2D");
        assert_eq!(
            Pooling2D::average((2, 2), 1, Padding::Same).layer_name(),
            "AveragePooling2D"
        );
    }

    #[test]
    fn test_average_declares_avgpool_ops() {
        let mut graph = RecordingGraph::new();
        let x = graph.placeholder("x");
        let mut layer = Pooling2D::average((2, 2), 2, Padding::Valid);
        layer.set_input_shape(Shape::from([4, 8, 8]));

        let f = layer.forward(&mut graph, &x, PassContext::training()).unwrap();
        let g = graph.placeholder("grad");
        layer.backward(&mut graph, &g, false).unwrap();

        assert_eq!(f.op(), "forward_pass_avgpool2d");
        assert_eq!(
            graph.op_names(),
            vec!["forward_pass_avgpool2d", "backward_pass_avgpool2d"]
        );
    }
}
