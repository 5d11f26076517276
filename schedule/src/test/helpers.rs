//! Test utilities for schedule synthesis tests.

use std::cell::RefCell;

use tessera_device::{HardwareDescriptor, TargetKind};
use tessera_ir::{Graph, Node, NodeId, OpKind};

use crate::error::Result;
use crate::plan::{Schedule, Stage};
use crate::tiling::{FusedInjectiveTiler, InjectiveTiler};

/// CUDA target with the given per-block thread limit.
pub fn cuda(max_num_threads: usize) -> HardwareDescriptor {
    HardwareDescriptor::builder().target(TargetKind::Cuda).max_num_threads(max_num_threads).build().unwrap()
}

/// The single compute node of `kind` in `graph`.
pub fn node_of(graph: &Graph, kind: OpKind) -> &Node {
    let mut matches = graph.nodes().iter().filter(|node| node.kind() == kind);
    let node = matches.next().unwrap_or_else(|| panic!("graph has no {kind} node"));
    assert!(matches.next().is_none(), "graph has more than one {kind} node");
    node
}

/// Stage scheduled for the node of `kind`.
pub fn stage_of<'s>(schedule: &'s Schedule, graph: &Graph, kind: OpKind) -> &'s Stage {
    let node = node_of(graph, kind);
    schedule.stage(node.id()).unwrap_or_else(|| panic!("no stage for {kind}"))
}

/// Assert every compute node has exactly one stage and nothing else does.
pub fn assert_each_node_once(schedule: &Schedule, graph: &Graph) {
    let mut scheduled: Vec<NodeId> = schedule.stages().iter().map(|stage| stage.node()).collect();
    scheduled.sort();
    let expected: Vec<NodeId> = graph.compute_nodes().map(|node| node.id()).collect();
    assert_eq!(scheduled, expected, "schedule:\n{schedule}");
}

/// Injective tiler that records every call before delegating.
#[derive(Default)]
pub struct RecordingTiler {
    pub calls: RefCell<Vec<(NodeId, OpKind, usize)>>,
}

impl InjectiveTiler for RecordingTiler {
    fn schedule_injective(&self, schedule: Schedule, node: &Node, num_threads: usize) -> Result<Schedule> {
        self.calls.borrow_mut().push((node.id(), node.kind(), num_threads));
        FusedInjectiveTiler.schedule_injective(schedule, node, num_threads)
    }
}
