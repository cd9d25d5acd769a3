
use serde::{Deserialize, Serialize};

/// A virtual address in the monitored process.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Va(pub u64);

impl Va {
    /// Checks if the virtual address is NULL.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Checks if the address lies within `[base, base + size)`.
    ///
    /// A range that would wrap around the address space is clamped to its
    /// upper end.
    pub fn is_within(self, base: Va, size: u64) -> bool {
        let end = base.0.saturating_add(size);
        self.0 >= base.0 && self.0 < end
    }
}

impl From<u64> for Va {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Va> for u64 {
    fn from(value: Va) -> Self {
        value.0
    }
}

impl std::ops::Sub<Va> for Va {
    type Output = u64;

    fn sub(self, rhs: Va) -> Self::Output {
        self.0.wrapping_sub(rhs.0)
    }
}

impl std::fmt::Debug for Va {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl std::fmt::Display for Va {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// A contiguous memory region of the monitored process.
///
/// Used to describe module images (such as the image of the monitor
/// itself) when classifying fault addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRange {
    /// Base address of the region.
    pub base: Va,

    /// Size of the region in bytes.
    pub size: u64,
}

impl ImageRange {
    /// Creates a new image range.
    pub const fn new(base: Va, size: u64) -> Self {
        Self { base, size }
    }

    /// Checks if the given address lies within the region.
    pub fn contains(&self, address: Va) -> bool {
        address.is_within(self.base, self.size)
    }

    /// Returns the offset of `address` relative to the region base.
    pub fn rva(&self, address: Va) -> Option<u64> {
        self.contains(address).then(|| address - self.base)
    }
}
