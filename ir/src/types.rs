//! Fundamental type definitions for the operator graph.

use std::fmt;
use std::str::FromStr;

/// Index of a node inside its owning [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Operation kinds that make up a softmax graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::AsRefStr, strum::VariantArray)]
#[strum(serialize_all = "snake_case")]
pub enum OpKind {
    /// Graph input. Never scheduled.
    Placeholder,
    /// Running maximum along the reduce axis.
    MaxReduce,
    /// `exp(x - max)`.
    Exp,
    /// Sum of `exp(x - max)` along the reduce axis.
    SumReduce,
    /// Normalization producing the operator output.
    ///
    /// For softmax this is `exp / sum`; for log-softmax it is `x - max - log(sum)`.
    Divide,
}

impl OpKind {
    /// Whether a schedule stage is created for nodes of this kind.
    pub const fn is_compute(&self) -> bool {
        !matches!(self, Self::Placeholder)
    }
}

/// Tag attached to the output node of an operator.
///
/// Parsing never fails: unknown tags are kept as [`OpTag::Unsupported`] so the
/// schedule layer can report them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpTag {
    SoftmaxOutput,
    LogSoftmaxOutput,
    Unsupported(String),
}

impl OpTag {
    pub const SOFTMAX: &'static str = "softmax_output";
    pub const LOG_SOFTMAX: &'static str = "log_softmax_output";

    pub fn parse(tag: &str) -> Self {
        match tag {
            Self::SOFTMAX => Self::SoftmaxOutput,
            Self::LOG_SOFTMAX => Self::LogSoftmaxOutput,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::SoftmaxOutput => Self::SOFTMAX,
            Self::LogSoftmaxOutput => Self::LOG_SOFTMAX,
            Self::Unsupported(tag) => tag,
        }
    }
}

impl FromStr for OpTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for OpTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduction performed by a reducing node.
///
/// `axis` indexes the *input* shape; the node's own shape has that axis removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reduction {
    pub axis: usize,
    pub extent: usize,
}
