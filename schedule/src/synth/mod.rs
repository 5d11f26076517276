//! Softmax schedule synthesis.
//!
//! [`synthesize`] runs one compile-time pass:
//! 1. Classify the graph (tag check, rank) and resolve its nodes
//! 2. Query the target's per-block thread limit
//! 3. Derive the knob space and resolve the tuning context against it
//! 4. Run the strategy's synthesizer

pub mod elementwise;
pub mod reduction;

use snafu::ResultExt;
use tessera_device::HardwareQuery;
use tessera_ir::Graph;

use crate::classify::{Strategy, classify};
use crate::config::{SynthesisConfig, TuneContext};
use crate::error::*;
use crate::knob::KnobSpace;
use crate::plan::Schedule;
use crate::tiling::{FusedInjectiveTiler, InjectiveTiler};

/// Everything one synthesis call reads.
#[derive(Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub graph: &'a Graph,
    pub hardware: &'a dyn HardwareQuery,
    pub tune: TuneContext,
    pub config: SynthesisConfig,
    pub tiler: &'a dyn InjectiveTiler,
}

impl<'a> SynthesisRequest<'a> {
    /// Request in fallback mode with default limits and the fused injective tiler.
    pub fn new(graph: &'a Graph, hardware: &'a dyn HardwareQuery) -> Self {
        Self { graph, hardware, tune: TuneContext::Fallback, config: SynthesisConfig::default(), tiler: &FusedInjectiveTiler }
    }

    pub fn with_tune(mut self, tune: TuneContext) -> Self {
        self.tune = tune;
        self
    }

    pub fn with_config(mut self, config: SynthesisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tiler(mut self, tiler: &'a dyn InjectiveTiler) -> Self {
        self.tiler = tiler;
        self
    }
}

impl std::fmt::Debug for SynthesisRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisRequest")
            .field("tag", self.graph.tag())
            .field("shape", &self.graph.output().shape())
            .field("tune", &self.tune)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Knob space a tuner should search for `hardware`.
pub fn knob_space_for(hardware: &dyn HardwareQuery, config: &SynthesisConfig) -> Result<KnobSpace> {
    let max_threads = hardware.max_num_threads().context(HardwareQuerySnafu)?;
    Ok(KnobSpace::new(max_threads, config.min_threads))
}

/// Synthesize the block/thread schedule for a softmax or log-softmax graph.
#[tracing::instrument(skip_all, fields(op.tag = %request.graph.tag(), op.rank = request.graph.rank()))]
pub fn synthesize(request: &SynthesisRequest<'_>) -> Result<Schedule> {
    let (strategy, parts) = classify(request.graph)?;

    let space = knob_space_for(request.hardware, &request.config)?;
    let knob = request.tune.resolve(&space, &request.config)?;
    tracing::debug!(
        ?strategy,
        knob.candidates = ?space.candidates(),
        knob.num_threads = knob.num_threads,
        knob.fallback = knob.fallback,
        "resolved num_threads"
    );

    let schedule = match strategy {
        Strategy::ElementwiseTiled => elementwise::synthesize(&parts, knob, request.tiler)?,
        Strategy::ReductionFactorized => reduction::synthesize(&parts, knob)?,
    };

    tracing::debug!(schedule = %schedule.tree(), "synthesized schedule");
    Ok(schedule)
}
