//! Schedule synthesis for softmax-family operators.
//!
//! Turns a softmax or log-softmax operator graph into a two-level
//! (block, thread) parallel plan for a GPU-like target, and exposes the
//! `num_threads` knob space to external tuners.
//!
//! # Module Organization
//!
//! - [`knob`] - Thread-count knob space
//! - [`config`] - Tuning context and synthesis limits
//! - [`classify`] - Tag check, node resolution and strategy selection
//! - [`builder`] / [`plan`] - Schedule construction and the finalized plan
//! - [`tiling`] - Injective tiling collaborator
//! - [`synth`] - Elementwise-tiled and reduction-factorized synthesizers
//! - [`registry`] - Dispatch table keyed by operator and target

pub mod builder;
pub mod classify;
pub mod config;
pub mod error;
pub mod knob;
pub mod plan;
pub mod registry;
pub mod synth;
pub mod tiling;


pub use builder::ScheduleBuilder;
pub use classify::{ScheduleOp, SoftmaxParts, Strategy, classify};
pub use config::{KnobValue, SynthesisConfig, TuneContext};
pub use error::{Error, Result};
pub use knob::{DEFAULT_MIN_THREADS, FALLBACK_THREADS, KnobSpace, NUM_THREADS_KNOB};
pub use plan::{
    AxisBinding, AxisFuse, AxisId, AxisOrigin, AxisSplit, IterAxis, ParallelUnit, PartialReduction, Schedule,
    SplitFactor, Stage, StorePredicate, SyncBoundary,
};
pub use registry::{ScheduleFn, ScheduleRegistry, registry, schedule_softmax};
pub use synth::{SynthesisRequest, knob_space_for, synthesize};
pub use tiling::{FusedInjectiveTiler, InjectiveTiler};

// Re-export collaborator crates for convenience
pub use tessera_device as device;
pub use tessera_ir as ir;
