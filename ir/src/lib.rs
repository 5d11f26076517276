//! Operator graph representation for the Tessera compiler.
//!
//! # Module Organization
//!
//! - [`types`] - Operation kinds, output tags, node ids
//! - [`node`] - Graph node
//! - [`graph`] - Arena-backed graph and softmax/log-softmax constructors
//! - [`error`] - Error types and result handling

pub mod error;
pub mod graph;
pub mod node;
pub mod types;


pub use error::{Error, Result};
pub use graph::{Graph, GraphBuilder, normalize_axis};
pub use node::{Node, Shape};
pub use types::{NodeId, OpKind, OpTag, Reduction};
