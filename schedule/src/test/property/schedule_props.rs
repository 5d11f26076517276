//! Property tests for synthesized schedules.

use proptest::prelude::*;
use tessera_ir::{Graph, OpKind};

use crate::config::TuneContext;
use crate::plan::ParallelUnit;
use crate::synth::{SynthesisRequest, synthesize};
use crate::test::helpers::{assert_each_node_once, cuda, stage_of};

fn arb_num_threads() -> impl Strategy<Value = usize> {
    prop::sample::select(vec![32usize, 64, 128, 256, 512, 1024])
}

fn arb_shape() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..=64, 1..=4)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The factored sum splits its row into ceil(len / T) chunks of T.
    #[test]
    fn reduction_split_covers_row(batch in 1usize..=16, len in 1usize..=5000, num_threads in arb_num_threads()) {
        let graph = Graph::softmax(&[batch, len], -1).unwrap();
        let hardware = cuda(1024);
        let request = SynthesisRequest::new(&graph, &hardware).with_tune(TuneContext::Selected(num_threads));
        let schedule = synthesize(&request).unwrap();

        let sum = stage_of(&schedule, &graph, OpKind::SumReduce);
        let split = sum.splits()[0];
        prop_assert_eq!(split.inner_extent, num_threads);
        prop_assert_eq!(split.outer_extent, len.div_ceil(num_threads));
        prop_assert!(split.outer_extent * split.inner_extent >= len);
        prop_assert_eq!(sum.partial().map(|partial| partial.slots), Some(num_threads));
        prop_assert_eq!(schedule.sync_boundaries().count(), 1);
    }

    /// No stage binds a unit twice, and every node appears exactly once.
    #[test]
    fn bindings_are_exclusive(shape in arb_shape(), num_threads in arb_num_threads(), log in any::<bool>()) {
        let graph = if log { Graph::log_softmax(&shape, -1) } else { Graph::softmax(&shape, -1) }.unwrap();
        let hardware = cuda(1024);
        let request = SynthesisRequest::new(&graph, &hardware).with_tune(TuneContext::Selected(num_threads));
        let schedule = synthesize(&request).unwrap();

        assert_each_node_once(&schedule, &graph);
        for stage in schedule.stages() {
            for unit in [ParallelUnit::Block, ParallelUnit::Thread] {
                prop_assert!(stage.bindings().iter().filter(|binding| binding.unit == unit).count() <= 1);
            }
            let mut axes: Vec<_> = stage.bindings().iter().map(|binding| binding.axis).collect();
            axes.sort();
            axes.dedup();
            prop_assert_eq!(axes.len(), stage.bindings().len());
        }
    }

    /// High-rank inputs never introduce a cross-thread reduction.
    #[test]
    fn high_rank_has_no_partials(shape in prop::collection::vec(1usize..=16, 3..=5)) {
        let graph = Graph::softmax(&shape, -1).unwrap();
        let hardware = cuda(1024);
        let schedule = synthesize(&SynthesisRequest::new(&graph, &hardware)).unwrap();

        prop_assert_eq!(schedule.partials().count(), 0);
        prop_assert_eq!(schedule.store_predicates().count(), 0);
    }
}
