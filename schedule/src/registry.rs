//! Dispatch table from (operator, target) to schedule synthesis.
//!
//! The table is built once on first use with the softmax schedule registered
//! for CUDA and generic GPU targets. Other backends can register their own
//! entries at runtime.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use snafu::{OptionExt, ResultExt};
use tessera_device::{HardwareQuery, TargetKind};

use crate::classify::ScheduleOp;
use crate::error::*;
use crate::plan::Schedule;
use crate::synth::{SynthesisRequest, synthesize};

/// Synthesis entry point for one (operator, target) pair.
pub type ScheduleFn = fn(&SynthesisRequest<'_>) -> Result<Schedule>;

pub struct ScheduleRegistry {
    entries: RwLock<HashMap<(ScheduleOp, TargetKind), ScheduleFn>>,
}

impl ScheduleRegistry {
    /// Empty table.
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Table with the built-in softmax entries.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for op in [ScheduleOp::Softmax, ScheduleOp::LogSoftmax] {
            for target in [TargetKind::Cuda, TargetKind::Gpu] {
                registry.register(op, target, synthesize);
            }
        }
        registry
    }

    /// Register `schedule` for `(op, target)`, returning the entry it replaces.
    pub fn register(&self, op: ScheduleOp, target: TargetKind, schedule: ScheduleFn) -> Option<ScheduleFn> {
        tracing::debug!(%op, hw.target = %target, "registering schedule");
        self.entries.write().insert((op, target), schedule)
    }

    pub fn lookup(&self, op: ScheduleOp, target: TargetKind) -> Result<ScheduleFn> {
        self.entries.read().get(&(op, target)).copied().context(NoScheduleRegisteredSnafu { op, target })
    }

    pub fn contains(&self, op: ScheduleOp, target: TargetKind) -> bool {
        self.entries.read().contains_key(&(op, target))
    }

    /// Resolve the entry for the request's operator and bound target, then run it.
    ///
    /// Unsupported tags are reported before the target is queried.
    pub fn dispatch(&self, request: &SynthesisRequest<'_>) -> Result<Schedule> {
        let op = ScheduleOp::try_from(request.graph.tag())?;
        let target = request.hardware.descriptor().context(HardwareQuerySnafu)?.target();
        let schedule = self.lookup(op, target)?;
        schedule(request)
    }
}

impl Default for ScheduleRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Global schedule registry instance.
static REGISTRY: Lazy<ScheduleRegistry> = Lazy::new(ScheduleRegistry::with_defaults);

/// Get the global schedule registry.
pub fn registry() -> &'static ScheduleRegistry {
    &REGISTRY
}

/// Convenience function to dispatch through the global registry.
pub fn schedule_softmax(request: &SynthesisRequest<'_>) -> Result<Schedule> {
    registry().dispatch(request)
}
