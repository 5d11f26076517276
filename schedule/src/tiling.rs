//! Injective (elementwise) tiling.
//!
//! Used for high-rank softmax, where every node is tiled on its own and no
//! cross-thread reduction is introduced.

use tessera_ir::Node;

use crate::error::Result;
use crate::plan::{ParallelUnit, Schedule, SplitFactor};

/// Tiles a single node's independent output elements across threads.
pub trait InjectiveTiler {
    /// Return `schedule` extended with a tiling of `node` using `num_threads` threads per block.
    fn schedule_injective(&self, schedule: Schedule, node: &Node, num_threads: usize) -> Result<Schedule>;
}

/// Fuses all output axes, splits the result by the thread count and binds
/// `(outer, inner)` to `(Block, Thread)`.
///
/// Reduction axes stay serial loops inside each thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct FusedInjectiveTiler;

impl InjectiveTiler for FusedInjectiveTiler {
    fn schedule_injective(&self, schedule: Schedule, node: &Node, num_threads: usize) -> Result<Schedule> {
        let mut builder = schedule.into_builder();

        let leaves = builder.spatial_leaves(node)?;
        let fused = match leaves.as_slice() {
            // Scalar output: a single serial element.
            [] => return builder.finish(),
            [single] => *single,
            many => builder.fuse(node, many)?,
        };

        let (block, thread) = builder.split(node, fused, SplitFactor::Inner(num_threads))?;
        builder.bind(node, block, ParallelUnit::Block)?;
        builder.bind(node, thread, ParallelUnit::Thread)?;
        builder.finish()
    }
}
