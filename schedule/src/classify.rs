//! Strategy selection for softmax-family operators.

use snafu::ResultExt;
use tessera_ir::{Graph, Node, OpKind, OpTag};

use crate::error::*;

/// Operators the softmax schedule handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::VariantArray)]
#[strum(serialize_all = "snake_case")]
pub enum ScheduleOp {
    Softmax,
    LogSoftmax,
}

impl TryFrom<&OpTag> for ScheduleOp {
    type Error = Error;

    fn try_from(tag: &OpTag) -> Result<Self> {
        match tag {
            OpTag::SoftmaxOutput => Ok(Self::Softmax),
            OpTag::LogSoftmaxOutput => Ok(Self::LogSoftmax),
            OpTag::Unsupported(tag) => UnsupportedOperatorSnafu { tag: tag.as_str() }.fail(),
        }
    }
}

/// How the operator is mapped onto blocks and threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Rank > 2: every node tiled independently.
    ElementwiseTiled,
    /// Rank <= 2: one block per row with a thread-factored sum.
    ReductionFactorized,
}

/// The nodes of a softmax graph the schedule touches.
#[derive(Debug, Clone, Copy)]
pub struct SoftmaxParts<'g> {
    pub op: ScheduleOp,
    pub output: &'g Node,
    pub max_elem: &'g Node,
    /// Absent for log-softmax, which folds the exponential into the sum.
    pub exp: Option<&'g Node>,
    pub expsum: &'g Node,
}

impl<'g> SoftmaxParts<'g> {
    /// Resolve the parts from the output node's inputs.
    pub fn resolve(graph: &'g Graph) -> Result<Self> {
        let op = ScheduleOp::try_from(graph.tag())?;
        let output = graph.output();
        let lookup = Lookup { graph, op };

        let parts = match op {
            ScheduleOp::Softmax => {
                let exp = lookup.input(output, 0, OpKind::Exp)?;
                let expsum = lookup.input(output, 1, OpKind::SumReduce)?;
                let max_elem = lookup.input(exp, 1, OpKind::MaxReduce)?;
                Self { op, output, max_elem, exp: Some(exp), expsum }
            }
            ScheduleOp::LogSoftmax => {
                let max_elem = lookup.input(output, 1, OpKind::MaxReduce)?;
                let expsum = lookup.input(output, 2, OpKind::SumReduce)?;
                Self { op, output, max_elem, exp: None, expsum }
            }
        };
        lookup.reduction_layout(output, parts.expsum)?;
        Ok(parts)
    }

    /// Scheduled nodes in the order the elementwise strategy tiles them.
    pub fn nodes(&self) -> impl Iterator<Item = &'g Node> {
        [Some(self.max_elem), Some(self.expsum), Some(self.output), self.exp].into_iter().flatten()
    }
}

/// Pick the strategy for `graph` and resolve its parts.
///
/// Unsupported tags fail before anything else is inspected.
pub fn classify(graph: &Graph) -> Result<(Strategy, SoftmaxParts<'_>)> {
    let parts = SoftmaxParts::resolve(graph)?;
    let strategy = if parts.output.rank() > 2 { Strategy::ElementwiseTiled } else { Strategy::ReductionFactorized };
    Ok((strategy, parts))
}

struct Lookup<'g> {
    graph: &'g Graph,
    op: ScheduleOp,
}

impl<'g> Lookup<'g> {
    fn input(&self, node: &Node, index: usize, expected: OpKind) -> Result<&'g Node> {
        let Some(&id) = node.inputs().get(index) else {
            return self.malformed(format!("{} {} has no input {index}", node.kind(), node.id()));
        };
        let input = self.graph.node(id).context(GraphSnafu)?;
        if input.kind() != expected {
            return self.malformed(format!(
                "input {index} of {} {} is {}, expected {expected}",
                node.kind(),
                node.id(),
                input.kind()
            ));
        }
        Ok(input)
    }

    /// The sum must reduce a tensor shaped like the output, along one of its axes.
    fn reduction_layout(&self, output: &Node, expsum: &Node) -> Result<()> {
        let Some(reduction) = expsum.reduction() else {
            return self.malformed(format!("{} {} carries no reduction", expsum.kind(), expsum.id()));
        };
        if reduction.axis >= output.rank() {
            return self.malformed(format!(
                "{} {} reduces axis {} of a rank-{} output",
                expsum.kind(),
                expsum.id(),
                reduction.axis,
                output.rank()
            ));
        }
        let Some(&reduced) = expsum.inputs().first() else {
            return self.malformed(format!("{} {} has no input 0", expsum.kind(), expsum.id()));
        };
        let reduced = self.graph.node(reduced).context(GraphSnafu)?;
        if reduced.shape() != output.shape() {
            return self.malformed(format!(
                "{} {} reduces a {:?} tensor but the output is {:?}",
                expsum.kind(),
                expsum.id(),
                reduced.shape(),
                output.shape()
            ));
        }
        Ok(())
    }

    fn malformed<T>(&self, reason: String) -> Result<T> {
        let tag = match self.op {
            ScheduleOp::Softmax => OpTag::SOFTMAX,
            ScheduleOp::LogSoftmax => OpTag::LOG_SOFTMAX,
        };
        MalformedGraphSnafu { tag, reason }.fail()
    }
}
