use smallvec::SmallVec;

use crate::{NodeId, OpKind, Reduction};

/// Shape of a node's output. Inline capacity covers rank 1-4.
pub type Shape = SmallVec<[usize; 4]>;

/// A single operation in the operator graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) kind: OpKind,
    pub(crate) shape: Shape,
    pub(crate) reduction: Option<Reduction>,
    pub(crate) inputs: SmallVec<[NodeId; 3]>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    /// Output shape. Empty for a full reduction of a rank-1 tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Reduction metadata; `Some` exactly for reducing kinds.
    pub fn reduction(&self) -> Option<Reduction> {
        self.reduction
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }
}
