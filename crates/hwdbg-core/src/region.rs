use crate::Va;

/// A memory region tracked with guard pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedRegion {
    /// Base address of the region.
    pub base: Va,

    /// Size of the region in bytes.
    pub size: u64,

    /// The page protection of the region, without the guard modifier.
    pub protection: u32,
}

impl TrackedRegion {
    /// Checks if the address lies within the region.
    pub fn contains(&self, address: Va) -> bool {
        address.is_within(self.base, self.size)
    }
}

/// A registry of memory regions tracked with guard pages.
///
/// Owned by the unpacking logic; the exception dispatcher only queries it
/// when a guard page violation is raised.
pub trait TrackedRegions: Send + Sync {
    /// Looks up the tracked region containing `address`.
    fn lookup(&self, address: Va) -> Option<TrackedRegion>;
}
