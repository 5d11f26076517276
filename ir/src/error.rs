use smallvec::SmallVec;
use snafu::Snafu;

use crate::NodeId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Graphs are built over tensors with at least one dimension.
    #[snafu(display("shape must have at least one dimension"))]
    EmptyShape,

    /// Every dimension must be a positive extent.
    #[snafu(display("shape {shape:?} has a zero-sized dimension {dim}"))]
    ZeroDimension { shape: SmallVec<[usize; 4]>, dim: usize },

    /// Reduce axis invalid.
    #[snafu(display("reduce axis {axis} is invalid for shape with {ndim} dimensions"))]
    ReduceAxisOutOfRange { axis: isize, ndim: usize },

    /// Node id does not belong to this graph.
    #[snafu(display("node {id} is not part of the graph"))]
    UnknownNode { id: NodeId },
}
