//! Finalized two-level parallel schedules.
//!
//! A [`Schedule`] holds one [`Stage`] per scheduled node. Each stage owns its
//! iteration axes and the records applied to them: splits, fusions, parallel
//! bindings, the partial-reduction attachment and the store predicate.
//! Schedules are produced by [`ScheduleBuilder`](crate::ScheduleBuilder) and
//! never change afterwards.

use std::fmt;

use smallvec::SmallVec;
use tessera_ir::{NodeId, OpKind};

use crate::builder::ScheduleBuilder;
use crate::config::KnobValue;

/// Stage-local axis identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AxisId(pub(crate) usize);

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ax{}", self.0)
    }
}

/// Parallel execution unit a loop can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::VariantArray)]
pub enum ParallelUnit {
    /// Coarse unit. Blocks never synchronize with each other.
    #[strum(to_string = "blockIdx.x")]
    Block,
    /// Fine unit inside a block. Threads of a block can meet at a barrier.
    #[strum(to_string = "threadIdx.x")]
    Thread,
}

/// Where an axis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisOrigin {
    /// Output dimension of the node.
    Spatial(usize),
    /// The node's reduction axis.
    Reduce,
    SplitOuter(AxisId),
    SplitInner(AxisId),
    Fused,
    /// Reduction over the slots of a partial-reduction tensor.
    Combine(AxisId),
}

/// One loop of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterAxis {
    pub id: AxisId,
    pub origin: AxisOrigin,
    pub extent: usize,
    pub is_reduce: bool,
    /// Whether the axis still exists as a loop (not split, fused or factored away).
    pub is_leaf: bool,
}

/// A loop dimension of a node executed under a parallel unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisBinding {
    pub node: NodeId,
    pub axis: AxisId,
    pub unit: ParallelUnit,
}

/// How to factor an axis in a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitFactor {
    /// Fixed inner extent; outer is the ceiling quotient.
    Inner(usize),
    /// Fixed number of outer partitions; inner is the ceiling quotient.
    Parts(usize),
}

/// Factorization of an axis into `outer * inner`.
///
/// `outer_extent * inner_extent` may exceed the original extent; the last
/// outer iteration is then partial and has to be masked by code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisSplit {
    pub node: NodeId,
    pub axis: AxisId,
    pub outer: AxisId,
    pub inner: AxisId,
    pub outer_extent: usize,
    pub inner_extent: usize,
}

impl AxisSplit {
    /// Whether the last outer iteration covers fewer than `inner_extent` elements.
    pub fn is_partial(&self, extent: usize) -> bool {
        self.outer_extent.checked_mul(self.inner_extent) != Some(extent)
    }
}

/// Several spatial axes collapsed into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AxisFuse {
    pub node: NodeId,
    pub axes: SmallVec<[AxisId; 4]>,
    pub fused: AxisId,
    pub extent: usize,
}

/// Per-thread partial results of a factored reduction.
///
/// The partial tensor has one slot per iteration of `factored` and is
/// computed inside the consumer's loop at `attached_at`, so it never exists
/// outside per-thread storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialReduction {
    pub node: NodeId,
    /// Axis whose iterations become the partial's slots.
    pub factored: AxisId,
    pub slots: usize,
    /// Reduction over the slots that produces the combined value.
    pub combine_axis: AxisId,
    /// Consumer loop the partial is computed at, once attached.
    pub attached_at: Option<AxisId>,
}

/// Guard on a stage's final write: only `unit` index `index` commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorePredicate {
    pub node: NodeId,
    pub unit: ParallelUnit,
    pub index: usize,
}

/// Point where all threads of a block must have written their partial
/// before any thread reads the combined value.
///
/// The runtime inserts the barrier; the schedule only marks the location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncBoundary {
    pub node: NodeId,
    pub axis: AxisId,
}

/// Schedule of a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub(crate) node: NodeId,
    pub(crate) kind: OpKind,
    pub(crate) axes: SmallVec<[IterAxis; 8]>,
    pub(crate) splits: SmallVec<[AxisSplit; 2]>,
    pub(crate) fusions: SmallVec<[AxisFuse; 1]>,
    pub(crate) bindings: SmallVec<[AxisBinding; 2]>,
    pub(crate) partial: Option<PartialReduction>,
    pub(crate) store_predicate: Option<StorePredicate>,
}

impl Stage {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn axes(&self) -> &[IterAxis] {
        &self.axes
    }

    pub fn axis(&self, id: AxisId) -> Option<&IterAxis> {
        self.axes.get(id.0)
    }

    /// Current loop nest, outermost first.
    pub fn leaf_axes(&self) -> impl Iterator<Item = &IterAxis> {
        self.axes.iter().filter(|axis| axis.is_leaf)
    }

    /// Root axis for output dimension `dim`.
    pub fn spatial_axis(&self, dim: usize) -> Option<AxisId> {
        self.axes.iter().find(|axis| axis.origin == AxisOrigin::Spatial(dim)).map(|axis| axis.id)
    }

    /// Root reduction axis, if the node reduces.
    pub fn reduce_axis(&self) -> Option<AxisId> {
        self.axes.iter().find(|axis| axis.origin == AxisOrigin::Reduce).map(|axis| axis.id)
    }

    pub fn splits(&self) -> &[AxisSplit] {
        &self.splits
    }

    pub fn fusions(&self) -> &[AxisFuse] {
        &self.fusions
    }

    pub fn bindings(&self) -> &[AxisBinding] {
        &self.bindings
    }

    pub fn binding(&self, axis: AxisId) -> Option<ParallelUnit> {
        self.bindings.iter().find(|binding| binding.axis == axis).map(|binding| binding.unit)
    }

    /// Axis bound to `unit`, if any.
    pub fn bound_axis(&self, unit: ParallelUnit) -> Option<AxisId> {
        self.bindings.iter().find(|binding| binding.unit == unit).map(|binding| binding.axis)
    }

    pub fn partial(&self) -> Option<&PartialReduction> {
        self.partial.as_ref()
    }

    pub fn store_predicate(&self) -> Option<&StorePredicate> {
        self.store_predicate.as_ref()
    }
}

/// Finalized schedule for one operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub(crate) stages: Vec<Stage>,
    pub(crate) knob: KnobValue,
}

impl Schedule {
    /// Schedule with no stages, used as the seed for incremental tiling.
    pub fn empty(knob: KnobValue) -> Self {
        Self { stages: Vec::new(), knob }
    }

    /// Reopen the schedule for further records.
    pub fn into_builder(self) -> ScheduleBuilder {
        ScheduleBuilder::from_schedule(self)
    }

    pub fn num_threads(&self) -> usize {
        self.knob.num_threads
    }

    pub fn used_fallback(&self) -> bool {
        self.knob.fallback
    }

    pub fn knob(&self) -> KnobValue {
        self.knob
    }

    /// Stages in the order they were first scheduled.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, node: NodeId) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.node == node)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &AxisBinding> {
        self.stages.iter().flat_map(|stage| stage.bindings.iter())
    }

    pub fn splits(&self) -> impl Iterator<Item = &AxisSplit> {
        self.stages.iter().flat_map(|stage| stage.splits.iter())
    }

    pub fn partials(&self) -> impl Iterator<Item = &PartialReduction> {
        self.stages.iter().filter_map(|stage| stage.partial.as_ref())
    }

    pub fn store_predicates(&self) -> impl Iterator<Item = &StorePredicate> {
        self.stages.iter().filter_map(|stage| stage.store_predicate.as_ref())
    }

    /// Combining axes that need a block-wide barrier at runtime.
    pub fn sync_boundaries(&self) -> impl Iterator<Item = SyncBoundary> + '_ {
        self.partials().map(|partial| SyncBoundary { node: partial.node, axis: partial.combine_axis })
    }

    /// Render the schedule as an indented tree, for debug logs.
    pub fn tree(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schedule num_threads={}", self.knob.num_threads)?;
        if self.knob.fallback {
            f.write_str(" (fallback)")?;
        }
        for stage in &self.stages {
            write!(f, "\n  {} {}", stage.node, stage.kind)?;
            for axis in stage.leaf_axes() {
                write!(f, "\n    {} [{}]", axis.id, axis.extent)?;
                if axis.is_reduce {
                    f.write_str(" reduce")?;
                }
                if let Some(unit) = stage.binding(axis.id) {
                    write!(f, " -> {unit}")?;
                }
                if stage.partial.is_some_and(|partial| partial.attached_at == Some(axis.id)) {
                    f.write_str(" @partial")?;
                }
            }
            if let Some(predicate) = &stage.store_predicate {
                write!(f, "\n    store if {} == {}", predicate.unit, predicate.index)?;
            }
        }
        Ok(())
    }
}
