//! Reduction-factorized synthesis for rank <= 2.
//!
//! Layout for a `(batch, feature)` input with `T` threads per block:
//!
//! ```text
//! max[b]         b -> blockIdx.x
//! exp[b, f]      b -> blockIdx.x
//! sum[b]         b -> blockIdx.x
//!                k -> (ko, ki[T]); partial[ki] = sum over ko
//!                combine over ki -> threadIdx.x, partial computed there
//!                store only when threadIdx.x == 0
//! out[b, f]      b -> blockIdx.x
//!                f -> (tx[T], fi); tx -> threadIdx.x
//! ```
//!
//! Max-before-exp ordering is a data dependency of the graph and is not
//! sequenced here. Rank-1 inputs have no batch axis: block bindings are
//! skipped and everything runs in a single block.

use tessera_ir::Node;

use crate::builder::ScheduleBuilder;
use crate::classify::SoftmaxParts;
use crate::config::KnobValue;
use crate::error::*;
use crate::plan::{ParallelUnit, Schedule, SplitFactor};

pub fn synthesize(parts: &SoftmaxParts<'_>, knob: KnobValue) -> Result<Schedule> {
    let num_threads = knob.num_threads;
    let mut builder = ScheduleBuilder::new(knob);

    let feature = match parts.expsum.reduction() {
        Some(reduction) => reduction.axis,
        None => return invalid(parts.expsum, "sum node carries no reduction"),
    };
    // Output dimension that is not reduced, if any.
    let batch = match parts.output.rank() {
        2 => Some(1 - feature),
        _ => None,
    };

    // One block per row for the row-wise max and the exponential.
    if let Some(exp) = parts.exp {
        bind_batch(&mut builder, exp, batch, ParallelUnit::Block)?;
    }
    bind_batch(&mut builder, parts.max_elem, batch.map(|_| 0), ParallelUnit::Block)?;

    // Thread-factored sum: each thread reduces its slice, then one thread commits.
    let expsum = parts.expsum;
    let k = builder.reduce_axis(expsum)?;
    let (_ko, ki) = builder.split(expsum, k, SplitFactor::Inner(num_threads))?;
    let combine = builder.rfactor(expsum, ki)?;
    bind_batch(&mut builder, expsum, batch.map(|_| 0), ParallelUnit::Block)?;
    builder.bind(expsum, combine, ParallelUnit::Thread)?;
    builder.compute_partial_at(expsum, combine)?;
    builder.set_store_predicate(expsum, ParallelUnit::Thread, 0)?;

    // Normalization reuses the reduction's grid.
    let output = parts.output;
    let feature_axis = builder.spatial_axis(output, feature)?;
    let (tx, _fi) = builder.split(output, feature_axis, SplitFactor::Parts(num_threads))?;
    bind_batch(&mut builder, output, batch, ParallelUnit::Block)?;
    builder.bind(output, tx, ParallelUnit::Thread)?;

    tracing::trace!(bindings = builder.binding_count(), num_threads, "reduction schedule recorded");
    builder.finish()
}

/// Bind output dimension `dim` of `node` to `unit`, or just register the stage
/// when there is no such dimension.
fn bind_batch(builder: &mut ScheduleBuilder, node: &Node, dim: Option<usize>, unit: ParallelUnit) -> Result<()> {
    match dim {
        Some(dim) => {
            let axis = builder.spatial_axis(node, dim)?;
            builder.bind(node, axis, unit)
        }
        None => builder.touch(node).map(|_| ()),
    }
}

fn invalid<T>(node: &Node, reason: &str) -> Result<T> {
    InvalidScheduleOpSnafu { node: node.id(), reason }.fail()
}
