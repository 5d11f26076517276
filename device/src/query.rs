use crate::HardwareDescriptor;
use crate::error::{NoTargetBoundSnafu, Result};

/// Source of hardware limits for the active compilation target.
pub trait HardwareQuery {
    /// Descriptor of the bound target.
    ///
    /// Fails with [`Error::NoTargetBound`](crate::Error::NoTargetBound) when none is bound.
    fn descriptor(&self) -> Result<&HardwareDescriptor>;

    /// Maximum number of threads usable by a single block.
    fn max_num_threads(&self) -> Result<usize> {
        Ok(self.descriptor()?.max_num_threads())
    }
}

impl HardwareQuery for HardwareDescriptor {
    fn descriptor(&self) -> Result<&HardwareDescriptor> {
        Ok(self)
    }
}

impl HardwareQuery for Option<HardwareDescriptor> {
    fn descriptor(&self) -> Result<&HardwareDescriptor> {
        match self {
            Some(descriptor) => Ok(descriptor),
            None => NoTargetBoundSnafu.fail(),
        }
    }
}

impl<Q: HardwareQuery + ?Sized> HardwareQuery for &Q {
    fn descriptor(&self) -> Result<&HardwareDescriptor> {
        (**self).descriptor()
    }
}

/// Query with no target in scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

impl HardwareQuery for Unbound {
    fn descriptor(&self) -> Result<&HardwareDescriptor> {
        NoTargetBoundSnafu.fail()
    }
}
