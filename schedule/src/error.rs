use snafu::Snafu;
use tessera_device::TargetKind;
use tessera_ir::NodeId;

use crate::classify::ScheduleOp;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Output tag is not a softmax-family tag.
    #[snafu(display("unsupported operator: tag is expected to be softmax_output or log_softmax_output, got {tag:?}"))]
    UnsupportedOperator { tag: String },

    /// Thread count outside the knob space.
    #[snafu(display(
        "invalid num_threads knob {value}: expected a halving of {maximum} that is at least {minimum}"
    ))]
    InvalidKnob { value: usize, minimum: usize, maximum: usize },

    #[snafu(display("hardware query failed"))]
    HardwareQuery { source: tessera_device::Error },

    #[snafu(display("operator graph error"))]
    Graph { source: tessera_ir::Error },

    /// Graph layout does not match what its tag promises.
    #[snafu(display("malformed {tag} graph: {reason}"))]
    MalformedGraph { tag: String, reason: String },

    /// Scheduling primitive applied to an axis or stage that cannot take it.
    #[snafu(display("invalid schedule operation on {node}: {reason}"))]
    InvalidScheduleOp { node: NodeId, reason: String },

    #[snafu(display("no schedule registered for {op} on target {target}"))]
    NoScheduleRegistered { op: ScheduleOp, target: TargetKind },
}
