//! Compilation targets and their thread limits.

use std::str::FromStr;

use bon::bon;
use snafu::{OptionExt, ensure};

use crate::error::*;

/// Kind of compilation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::EnumString, strum::AsRefStr, strum::VariantArray)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TargetKind {
    Cuda,
    Rocm,
    /// Generic GPU target.
    Gpu,
    Cpu,
}

impl TargetKind {
    /// Per-block thread limit assumed when a descriptor does not specify one.
    pub const fn default_max_threads(&self) -> usize {
        match self {
            Self::Cuda | Self::Gpu => 1024,
            Self::Rocm => 256,
            Self::Cpu => 1,
        }
    }
}

/// Hardware limits of a single compilation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HardwareDescriptor {
    target: TargetKind,
    max_num_threads: usize,
}

#[bon]
impl HardwareDescriptor {
    /// Create a descriptor; `max_num_threads` defaults to the target's usual limit.
    #[builder]
    pub fn new(target: TargetKind, max_num_threads: Option<usize>) -> Result<Self> {
        let max_num_threads = max_num_threads.unwrap_or_else(|| target.default_max_threads());
        ensure!(max_num_threads > 0, InvalidThreadLimitSnafu { target: target.to_string(), value: max_num_threads });
        Ok(Self { target, max_num_threads })
    }
}

impl HardwareDescriptor {
    pub fn cuda() -> Self {
        Self { target: TargetKind::Cuda, max_num_threads: TargetKind::Cuda.default_max_threads() }
    }

    pub fn target(&self) -> TargetKind {
        self.target
    }

    pub fn max_num_threads(&self) -> usize {
        self.max_num_threads
    }

    /// Parse a target string.
    ///
    /// Examples:
    /// - "cuda" -> CUDA with 1024 threads per block
    /// - "rocm:512" -> ROCm with 512 threads per block
    /// - "GPU" -> generic GPU (case-insensitive)
    pub fn parse(s: &str) -> Result<Self> {
        let (kind, limit) = match s.split_once(':') {
            Some((kind, limit)) => (kind, Some(limit)),
            None => (s, None),
        };

        let target = TargetKind::from_str(kind.trim()).ok().context(InvalidTargetSnafu { target: s })?;
        let max_num_threads = limit
            .map(|limit| limit.trim().parse::<usize>().ok().context(InvalidTargetSnafu { target: s }))
            .transpose()?;

        Self::builder().target(target).maybe_max_num_threads(max_num_threads).build()
    }

    /// Create a descriptor from environment variables.
    ///
    /// Returns `Ok(None)` when no target is configured.
    ///
    /// # Environment Variables
    ///
    /// * `TESSERA_TARGET` - Target string, e.g. `cuda` or `rocm:512`
    /// * `TESSERA_MAX_THREADS` - Overrides the per-block thread limit
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(spec) = std::env::var("TESSERA_TARGET") else {
            return Ok(None);
        };

        let mut descriptor = Self::parse(&spec)?;
        if let Ok(raw) = std::env::var("TESSERA_MAX_THREADS") {
            let value = raw.parse::<usize>().ok().context(InvalidTargetSnafu { target: format!("{spec} (max threads {raw})") })?;
            descriptor = Self::builder().target(descriptor.target).max_num_threads(value).build()?;
        }

        tracing::debug!(hw.target = %descriptor.target, hw.max_threads = descriptor.max_num_threads, "target from environment");
        Ok(Some(descriptor))
    }
}
