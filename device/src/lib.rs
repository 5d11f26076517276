//! Compilation target descriptions and hardware capability queries.
//!
//! Schedule passes never read an ambient "current target". Callers pass a
//! [`HardwareQuery`] explicitly; an [`Unbound`] query reports
//! [`Error::NoTargetBound`] when limits are requested.

pub mod error;
pub mod query;
pub mod target;


pub use error::{Error, Result};
pub use query::{HardwareQuery, Unbound};
pub use target::{HardwareDescriptor, TargetKind};
