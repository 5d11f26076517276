//! Synthesis configuration and tuning context.
//!
//! Supports both explicit configuration and environment variable fallbacks.

use bon::bon;

use crate::error::*;
use crate::knob::{DEFAULT_MIN_THREADS, FALLBACK_THREADS, KnobSpace};

// ============================================================================
// TUNING CONTEXT
// ============================================================================

/// Autotuning context for one synthesis call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TuneContext {
    /// No tuned record exists; use the fallback thread count.
    #[default]
    Fallback,

    /// Thread count selected by an external tuner from the knob space.
    Selected(usize),
}

impl TuneContext {
    /// Get the tuning context from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TESSERA_TUNE_FALLBACK` - Force fallback mode, overriding any selection
    /// * `TESSERA_NUM_THREADS=N` - Select thread count N
    pub fn from_env() -> Self {
        if std::env::var("TESSERA_TUNE_FALLBACK").is_ok() {
            return Self::Fallback;
        }

        if let Ok(raw) = std::env::var("TESSERA_NUM_THREADS")
            && let Ok(value) = raw.parse::<usize>()
        {
            return Self::Selected(value);
        }

        Self::Fallback
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }

    /// Pick the thread count for this call.
    ///
    /// Fallback ignores the knob space entirely. A selection must be one of
    /// the space's candidates.
    pub fn resolve(&self, space: &KnobSpace, config: &SynthesisConfig) -> Result<KnobValue> {
        match *self {
            Self::Fallback => {
                let num_threads = config.fallback_threads;
                if num_threads > space.maximum() {
                    tracing::warn!(
                        num_threads,
                        hw.max_threads = space.maximum(),
                        "fallback thread count exceeds the target's per-block limit"
                    );
                }
                Ok(KnobValue { num_threads, fallback: true })
            }
            Self::Selected(value) => {
                Ok(KnobValue::selected(space.validate(value)?))
            }
        }
    }
}

/// Resolved `num_threads` knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KnobValue {
    pub num_threads: usize,
    /// Whether the value came from the fallback rather than a tuner.
    pub fallback: bool,
}

impl KnobValue {
    pub const fn selected(num_threads: usize) -> Self {
        Self { num_threads, fallback: false }
    }
}

// ============================================================================
// SYNTHESIS CONFIGURATION
// ============================================================================

/// Limits applied when deriving and resolving the knob space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisConfig {
    /// Smallest thread count included in the knob space.
    pub min_threads: usize,
    /// Thread count forced in fallback mode.
    pub fallback_threads: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self { min_threads: DEFAULT_MIN_THREADS, fallback_threads: FALLBACK_THREADS }
    }
}

#[bon]
impl SynthesisConfig {
    /// Create a synthesis configuration with builder pattern.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_MIN_THREADS)] min_threads: usize,
        #[builder(default = FALLBACK_THREADS)] fallback_threads: usize,
    ) -> Self {
        Self { min_threads, fallback_threads }
    }
}

impl SynthesisConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TESSERA_MIN_THREADS` - Knob space floor (default: 32)
    /// * `TESSERA_FALLBACK_THREADS` - Fallback thread count (default: 64)
    pub fn from_env() -> Self {
        let min_threads =
            std::env::var("TESSERA_MIN_THREADS").ok().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_MIN_THREADS);
        let fallback_threads =
            std::env::var("TESSERA_FALLBACK_THREADS").ok().and_then(|s| s.parse().ok()).unwrap_or(FALLBACK_THREADS);

        Self { min_threads, fallback_threads }
    }
}
