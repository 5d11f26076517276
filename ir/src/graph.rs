//! Operator graphs for softmax-family operators.
//!
//! Nodes live in an arena and may only reference nodes added before them, so
//! arena order is always a valid topological order.
//!
//! # Layout
//!
//! ```text
//! softmax:      max = max(x, axis)
//!               exp = exp(x - max)
//!               sum = sum(exp, axis)
//!               out = exp / sum            inputs: [exp, sum]
//!
//! log_softmax:  max = max(x, axis)
//!               sum = sum(exp(x - max), axis)
//!               out = x - max - log(sum)   inputs: [x, max, sum]
//! ```

use smallvec::{SmallVec, smallvec};
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::{Node, NodeId, OpKind, OpTag, Reduction, Shape};

/// A complete operator graph with a tagged output node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    nodes: Vec<Node>,
    output: NodeId,
    tag: OpTag,
}

impl Graph {
    /// Build a numerically stable softmax over `axis` (negative values count from the end).
    pub fn softmax(shape: &[usize], axis: isize) -> Result<Self> {
        let mut builder = GraphBuilder::new();
        let data = builder.placeholder(shape)?;
        let max_elem = builder.max_reduce(data, axis)?;
        let exp = builder.exp(data, max_elem)?;
        let expsum = builder.sum_reduce(exp, axis)?;
        let out = builder.divide(shape, [exp, expsum])?;
        builder.finish(out, OpTag::SoftmaxOutput)
    }

    /// Build a log-softmax over `axis`. No separate exponential tensor is materialized.
    pub fn log_softmax(shape: &[usize], axis: isize) -> Result<Self> {
        let mut builder = GraphBuilder::new();
        let data = builder.placeholder(shape)?;
        let max_elem = builder.max_reduce(data, axis)?;
        let expsum = builder.sum_reduce_shifted(data, max_elem, axis)?;
        let out = builder.divide(shape, [data, max_elem, expsum])?;
        builder.finish(out, OpTag::LogSoftmaxOutput)
    }

    /// Replace the output tag, keeping the node layout.
    pub fn with_tag(mut self, tag: OpTag) -> Self {
        self.tag = tag;
        self
    }

    pub fn tag(&self) -> &OpTag {
        &self.tag
    }

    pub fn output(&self) -> &Node {
        &self.nodes[self.output.0]
    }

    /// Rank of the operator output.
    pub fn rank(&self) -> usize {
        self.output().rank()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).context(UnknownNodeSnafu { id })
    }

    /// All nodes in topological order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Nodes that receive a schedule stage, in topological order.
    pub fn compute_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.kind.is_compute())
    }

    /// Render the graph one node per line, for debug logs.
    pub fn tree(&self) -> String {
        let mut out = format!("{} ->", self.tag);
        for node in &self.nodes {
            out.push_str(&format!("\n  {} = {}{:?}", node.id, node.kind, node.shape.as_slice()));
            if let Some(reduction) = node.reduction {
                out.push_str(&format!(" reduce(axis={}, extent={})", reduction.axis, reduction.extent));
            }
            if !node.inputs.is_empty() {
                let inputs: Vec<String> = node.inputs.iter().map(ToString::to_string).collect();
                out.push_str(&format!(" <- [{}]", inputs.join(", ")));
            }
        }
        out
    }
}

/// Incremental graph construction.
///
/// Each method validates its inputs against nodes already added.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placeholder(&mut self, shape: &[usize]) -> Result<NodeId> {
        let shape = validate_shape(shape)?;
        Ok(self.push(OpKind::Placeholder, shape, None, smallvec![]))
    }

    pub fn max_reduce(&mut self, input: NodeId, axis: isize) -> Result<NodeId> {
        self.reduce(OpKind::MaxReduce, input, axis, smallvec![input])
    }

    /// `exp(data - max)`; `max` must reduce `data`.
    pub fn exp(&mut self, data: NodeId, max_elem: NodeId) -> Result<NodeId> {
        let shape = self.get(data)?.shape.clone();
        self.get(max_elem)?;
        Ok(self.push(OpKind::Exp, shape, None, smallvec![data, max_elem]))
    }

    pub fn sum_reduce(&mut self, input: NodeId, axis: isize) -> Result<NodeId> {
        self.reduce(OpKind::SumReduce, input, axis, smallvec![input])
    }

    /// `sum(exp(data - max))` with the exponential fused into the reduction.
    pub fn sum_reduce_shifted(&mut self, data: NodeId, max_elem: NodeId, axis: isize) -> Result<NodeId> {
        self.get(max_elem)?;
        self.reduce(OpKind::SumReduce, data, axis, smallvec![data, max_elem])
    }

    pub fn divide(&mut self, shape: &[usize], inputs: impl IntoIterator<Item = NodeId>) -> Result<NodeId> {
        let shape = validate_shape(shape)?;
        let inputs: SmallVec<[NodeId; 3]> = inputs.into_iter().collect();
        for &input in &inputs {
            self.get(input)?;
        }
        Ok(self.push(OpKind::Divide, shape, None, inputs))
    }

    pub fn finish(self, output: NodeId, tag: OpTag) -> Result<Graph> {
        ensure!(output.0 < self.nodes.len(), UnknownNodeSnafu { id: output });
        Ok(Graph { nodes: self.nodes, output, tag })
    }

    fn reduce(&mut self, kind: OpKind, input: NodeId, axis: isize, inputs: SmallVec<[NodeId; 3]>) -> Result<NodeId> {
        let input_shape = self.get(input)?.shape.clone();
        let axis = normalize_axis(axis, input_shape.len())?;
        let extent = input_shape[axis];
        let shape: Shape =
            input_shape.iter().enumerate().filter(|(i, _)| *i != axis).map(|(_, &dim)| dim).collect();
        Ok(self.push(kind, shape, Some(Reduction { axis, extent }), inputs))
    }

    fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).context(UnknownNodeSnafu { id })
    }

    fn push(
        &mut self,
        kind: OpKind,
        shape: Shape,
        reduction: Option<Reduction>,
        inputs: SmallVec<[NodeId; 3]>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { id, kind, shape, reduction, inputs });
        id
    }
}

fn validate_shape(shape: &[usize]) -> Result<Shape> {
    ensure!(!shape.is_empty(), EmptyShapeSnafu);
    if let Some(dim) = shape.iter().position(|&d| d == 0) {
        return ZeroDimensionSnafu { shape: Shape::from_slice(shape), dim }.fail();
    }
    Ok(Shape::from_slice(shape))
}

/// Resolve a possibly negative axis against `ndim`.
pub fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let resolved = if axis < 0 { axis + ndim as isize } else { axis };
    ensure!((0..ndim as isize).contains(&resolved), ReduceAxisOutOfRangeSnafu { axis, ndim });
    Ok(resolved as usize)
}
