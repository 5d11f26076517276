//! Elementwise-tiled synthesis for rank > 2.
//!
//! Each node goes through the injective tiler on its own. Ordering between
//! nodes comes from graph data dependencies, so tiling order does not matter.

use crate::classify::SoftmaxParts;
use crate::config::KnobValue;
use crate::error::Result;
use crate::plan::Schedule;
use crate::tiling::InjectiveTiler;

pub fn synthesize(parts: &SoftmaxParts<'_>, knob: KnobValue, tiler: &dyn InjectiveTiler) -> Result<Schedule> {
    parts.nodes().try_fold(Schedule::empty(knob), |schedule, node| {
        tracing::trace!(node = %node.id(), kind = %node.kind(), num_threads = knob.num_threads, "injective tiling");
        tiler.schedule_injective(schedule, node, knob.num_threads)
    })
}
