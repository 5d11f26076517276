//! Incremental schedule construction.
//!
//! The builder owns all in-progress state. Primitives validate before they
//! record anything, and a [`Schedule`] only exists after [`ScheduleBuilder::finish`]
//! accepts the whole plan, so an error never leaves a half-scheduled value behind.

use smallvec::{SmallVec, smallvec};
use snafu::ensure;
use tessera_ir::{Node, NodeId};

use crate::config::KnobValue;
use crate::error::*;
use crate::plan::*;

#[derive(Debug, Clone)]
pub struct ScheduleBuilder {
    stages: Vec<Stage>,
    knob: KnobValue,
}

impl ScheduleBuilder {
    pub fn new(knob: KnobValue) -> Self {
        Self { stages: Vec::new(), knob }
    }

    pub(crate) fn from_schedule(schedule: Schedule) -> Self {
        Self { stages: schedule.stages, knob: schedule.knob }
    }

    pub fn knob(&self) -> KnobValue {
        self.knob
    }

    /// Number of parallel bindings recorded so far.
    pub fn binding_count(&self) -> usize {
        self.stages.iter().map(|stage| stage.bindings.len()).sum()
    }

    /// Ensure `node` has a stage, creating its root axes on first use.
    pub fn touch(&mut self, node: &Node) -> Result<&Stage> {
        let index = self.stage_index(node)?;
        Ok(&self.stages[index])
    }

    pub fn spatial_axis(&mut self, node: &Node, dim: usize) -> Result<AxisId> {
        let index = self.stage_index(node)?;
        match self.stages[index].spatial_axis(dim) {
            Some(axis) => Ok(axis),
            None => invalid(node.id(), format!("node has no output dimension {dim}")),
        }
    }

    pub fn reduce_axis(&mut self, node: &Node) -> Result<AxisId> {
        let index = self.stage_index(node)?;
        match self.stages[index].reduce_axis() {
            Some(axis) => Ok(axis),
            None => invalid(node.id(), "node has no reduction axis"),
        }
    }

    /// Leaf spatial axes of `node`, outermost first.
    pub fn spatial_leaves(&mut self, node: &Node) -> Result<SmallVec<[AxisId; 4]>> {
        let index = self.stage_index(node)?;
        Ok(self.stages[index].leaf_axes().filter(|axis| !axis.is_reduce).map(|axis| axis.id).collect())
    }

    /// Split `axis` into `(outer, inner)`.
    pub fn split(&mut self, node: &Node, axis: AxisId, factor: SplitFactor) -> Result<(AxisId, AxisId)> {
        let index = self.stage_index(node)?;
        let stage = &mut self.stages[index];
        let target = leaf_axis(stage, axis)?;
        ensure_unbound(stage, axis)?;

        let (outer_extent, inner_extent) = match factor {
            SplitFactor::Inner(0) | SplitFactor::Parts(0) => return invalid(stage.node, "split factor must be positive"),
            SplitFactor::Inner(inner) => (target.extent.div_ceil(inner), inner),
            SplitFactor::Parts(parts) => (parts, target.extent.div_ceil(parts)),
        };

        stage.axes[axis.0].is_leaf = false;
        let outer = push_axis(stage, AxisOrigin::SplitOuter(axis), outer_extent, target.is_reduce);
        let inner = push_axis(stage, AxisOrigin::SplitInner(axis), inner_extent, target.is_reduce);
        stage.splits.push(AxisSplit { node: stage.node, axis, outer, inner, outer_extent, inner_extent });

        tracing::trace!(node = %stage.node, %axis, outer_extent, inner_extent, "split");
        Ok((outer, inner))
    }

    /// Collapse spatial `axes` into a single loop.
    pub fn fuse(&mut self, node: &Node, axes: &[AxisId]) -> Result<AxisId> {
        let index = self.stage_index(node)?;
        let stage = &mut self.stages[index];
        ensure!(
            !axes.is_empty(),
            InvalidScheduleOpSnafu { node: stage.node, reason: "fuse needs at least one axis" }
        );

        let mut extent: usize = 1;
        for &axis in axes {
            let target = leaf_axis(stage, axis)?;
            ensure_unbound(stage, axis)?;
            if target.is_reduce {
                return invalid(stage.node, format!("cannot fuse reduction axis {axis}"));
            }
            extent = match extent.checked_mul(target.extent) {
                Some(extent) => extent,
                None => return invalid(stage.node, "fused extent overflows"),
            };
        }
        for &axis in axes {
            stage.axes[axis.0].is_leaf = false;
        }

        let fused = push_axis(stage, AxisOrigin::Fused, extent, false);
        stage.fusions.push(AxisFuse { node: stage.node, axes: SmallVec::from_slice(axes), fused, extent });

        tracing::trace!(node = %stage.node, %fused, extent, "fuse");
        Ok(fused)
    }

    /// Run `axis` of `node` under `unit`. Each unit binds at most one axis per stage.
    pub fn bind(&mut self, node: &Node, axis: AxisId, unit: ParallelUnit) -> Result<()> {
        let index = self.stage_index(node)?;
        let stage = &mut self.stages[index];
        leaf_axis(stage, axis)?;
        ensure_unbound(stage, axis)?;
        if let Some(other) = stage.bound_axis(unit) {
            return invalid(stage.node, format!("{unit} is already bound to {other}"));
        }

        stage.bindings.push(AxisBinding { node: stage.node, axis, unit });
        tracing::trace!(node = %stage.node, %axis, %unit, "bind");
        Ok(())
    }

    /// Factor the reduction of `node` over `axis` into per-slot partials.
    ///
    /// Every reduction leaf moves into the partial computation; the stage keeps a
    /// single combining axis over the partial's slots, which is returned.
    pub fn rfactor(&mut self, node: &Node, axis: AxisId) -> Result<AxisId> {
        let index = self.stage_index(node)?;
        let stage = &mut self.stages[index];
        let target = leaf_axis(stage, axis)?;
        ensure!(
            target.is_reduce,
            InvalidScheduleOpSnafu { node: stage.node, reason: format!("{axis} is not a reduction axis") }
        );
        ensure!(
            stage.partial.is_none(),
            InvalidScheduleOpSnafu { node: stage.node, reason: "reduction is already factored" }
        );

        let factored_away: SmallVec<[AxisId; 2]> =
            stage.leaf_axes().filter(|leaf| leaf.is_reduce).map(|leaf| leaf.id).collect();
        for leaf in &factored_away {
            ensure_unbound(stage, *leaf)?;
        }
        for leaf in factored_away {
            stage.axes[leaf.0].is_leaf = false;
        }

        let combine_axis = push_axis(stage, AxisOrigin::Combine(axis), target.extent, true);
        stage.partial = Some(PartialReduction {
            node: stage.node,
            factored: axis,
            slots: target.extent,
            combine_axis,
            attached_at: None,
        });

        tracing::trace!(node = %stage.node, %axis, slots = target.extent, "rfactor");
        Ok(combine_axis)
    }

    /// Compute the partial of `node` inside its loop at `axis`.
    ///
    /// Only the combining axis is accepted: that is where the thread that owns
    /// a slot is active.
    pub fn compute_partial_at(&mut self, node: &Node, axis: AxisId) -> Result<()> {
        let index = self.stage_index(node)?;
        let stage = &mut self.stages[index];
        let Some(partial) = stage.partial.as_mut() else {
            return invalid(stage.node, "no partial reduction to attach");
        };
        if partial.combine_axis != axis {
            return invalid(stage.node, format!("partial must be attached at {}, not {axis}", partial.combine_axis));
        }

        partial.attached_at = Some(axis);
        tracing::trace!(node = %stage.node, %axis, "compute partial at");
        Ok(())
    }

    /// Only `unit` index `index` commits the final write of `node`.
    pub fn set_store_predicate(&mut self, node: &Node, unit: ParallelUnit, index: usize) -> Result<()> {
        let stage_index = self.stage_index(node)?;
        let stage = &mut self.stages[stage_index];
        ensure!(
            stage.store_predicate.is_none(),
            InvalidScheduleOpSnafu { node: stage.node, reason: "store predicate is already set" }
        );
        ensure!(
            stage.bound_axis(unit).is_some(),
            InvalidScheduleOpSnafu { node: stage.node, reason: format!("{unit} is not bound") }
        );

        stage.store_predicate = Some(StorePredicate { node: stage.node, unit, index });
        tracing::trace!(node = %stage.node, %unit, index, "store predicate");
        Ok(())
    }

    /// Validate the plan and freeze it.
    ///
    /// A factored reduction must be attached at its combining axis, and when
    /// that axis is thread-bound a store predicate must pick a single writer.
    pub fn finish(self) -> Result<Schedule> {
        for stage in &self.stages {
            let Some(partial) = &stage.partial else { continue };
            ensure!(
                partial.attached_at.is_some(),
                InvalidScheduleOpSnafu { node: stage.node, reason: "partial reduction is never attached" }
            );
            if stage.binding(partial.combine_axis) == Some(ParallelUnit::Thread) {
                ensure!(
                    stage.store_predicate.is_some(),
                    InvalidScheduleOpSnafu {
                        node: stage.node,
                        reason: "thread-combined reduction has no store predicate",
                    }
                );
            }
        }

        Ok(Schedule { stages: self.stages, knob: self.knob })
    }

    fn stage_index(&mut self, node: &Node) -> Result<usize> {
        if let Some(index) = self.stages.iter().position(|stage| stage.node == node.id()) {
            return Ok(index);
        }
        ensure!(
            node.kind().is_compute(),
            InvalidScheduleOpSnafu { node: node.id(), reason: format!("{} nodes are not scheduled", node.kind()) }
        );

        let mut stage = Stage {
            node: node.id(),
            kind: node.kind(),
            axes: smallvec![],
            splits: smallvec![],
            fusions: smallvec![],
            bindings: smallvec![],
            partial: None,
            store_predicate: None,
        };
        for (dim, &extent) in node.shape().iter().enumerate() {
            push_axis(&mut stage, AxisOrigin::Spatial(dim), extent, false);
        }
        if let Some(reduction) = node.reduction() {
            push_axis(&mut stage, AxisOrigin::Reduce, reduction.extent, true);
        }

        self.stages.push(stage);
        Ok(self.stages.len() - 1)
    }
}

fn push_axis(stage: &mut Stage, origin: AxisOrigin, extent: usize, is_reduce: bool) -> AxisId {
    let id = AxisId(stage.axes.len());
    stage.axes.push(IterAxis { id, origin, extent, is_reduce, is_leaf: true });
    id
}

fn leaf_axis(stage: &Stage, axis: AxisId) -> Result<IterAxis> {
    match stage.axis(axis) {
        Some(target) if target.is_leaf => Ok(*target),
        Some(_) => invalid(stage.node, format!("{axis} was already split, fused or factored")),
        None => invalid(stage.node, format!("{axis} does not exist")),
    }
}

fn ensure_unbound(stage: &Stage, axis: AxisId) -> Result<()> {
    match stage.binding(axis) {
        Some(unit) => invalid(stage.node, format!("{axis} is already bound to {unit}")),
        None => Ok(()),
    }
}

fn invalid<T>(node: NodeId, reason: impl Into<String>) -> Result<T> {
    InvalidScheduleOpSnafu { node, reason: reason.into() }.fail()
}
