//! Thread-count knob space.
//!
//! The `num_threads` knob is tuned over successive halvings of the target's
//! per-block thread limit. An external tuner picks one candidate; without a
//! tuning record the fallback value is used instead.

use smallvec::SmallVec;
use snafu::ensure;

use crate::error::*;

/// Name under which the thread-count knob is exposed to tuners.
pub const NUM_THREADS_KNOB: &str = "num_threads";

/// Smallest thread count worth tuning over.
pub const DEFAULT_MIN_THREADS: usize = 32;

/// Thread count used when no tuned configuration exists.
pub const FALLBACK_THREADS: usize = 64;

/// Candidate thread counts, strictly decreasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnobSpace {
    candidates: SmallVec<[usize; 8]>,
    minimum: usize,
    maximum: usize,
}

impl KnobSpace {
    /// Enumerate `maximum, maximum / 2, ...` while the value stays `>= minimum`.
    ///
    /// Empty when `maximum < minimum`.
    pub fn new(maximum: usize, minimum: usize) -> Self {
        let mut candidates = SmallVec::new();
        let mut current = maximum;
        while current >= minimum && current > 0 {
            candidates.push(current);
            current /= 2;
        }
        Self { candidates, minimum, maximum }
    }

    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn minimum(&self) -> usize {
        self.minimum
    }

    /// Hardware maximum the space was derived from.
    pub fn maximum(&self) -> usize {
        self.maximum
    }

    pub fn contains(&self, value: usize) -> bool {
        self.candidates.contains(&value)
    }

    /// Check an externally supplied thread count against the space.
    pub fn validate(&self, value: usize) -> Result<usize> {
        ensure!(self.contains(value), InvalidKnobSnafu { value, minimum: self.minimum, maximum: self.maximum });
        Ok(value)
    }
}

impl<'a> IntoIterator for &'a KnobSpace {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}
