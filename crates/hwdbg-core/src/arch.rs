//! Architecture abstraction.

use std::fmt::Debug;

/// Defines an interface for CPU architecture-specific constants and types.
///
/// The breakpoint engine is written against a concrete architecture, but the
/// driver boundary only needs to know how the register image of a thread
/// looks like.
pub trait Architecture {
    /// The number of hardware breakpoint address registers.
    ///
    /// - **AMD64**: 4 (`DR0` through `DR3`)
    const BREAKPOINT_REGISTERS: usize;

    /// The register image of a thread, as delivered with an exception or
    /// read with a get-context call.
    type Registers: Registers;
}

/// A trait for accessing the register image of a thread.
pub trait Registers
where
    Self: Debug + Default + Clone + Copy,
{
    /// Returns the instruction pointer.
    fn instruction_pointer(&self) -> u64;

    /// Sets the instruction pointer.
    fn set_instruction_pointer(&mut self, ip: u64);
}
