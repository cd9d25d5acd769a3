//! Translation between logical breakpoint descriptors and debug registers.
//!
//! The functions in this module are pure: they operate on a register image
//! and never touch the live thread state. Every function validates all of
//! its inputs before modifying the image, so a failed call leaves the image
//! unchanged.

use hwdbg_core::{DebuggerError, Va};

use crate::{BreakpointCondition, BreakpointLength, Registers};

/// The access type that triggers a hardware breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakpointKind {
    /// Break on instruction execution.
    Execute,

    /// Break on data writes.
    Write,

    /// Break on data reads or writes.
    ReadWrite,
}

impl BreakpointKind {
    /// Converts the raw hardware encoding into a breakpoint kind.
    ///
    /// The reserved encoding `2` (I/O breakpoints) is rejected.
    pub fn from_raw(value: u8) -> Result<Self, DebuggerError> {
        match value {
            0 => Ok(Self::Execute),
            1 => Ok(Self::Write),
            2 => Err(DebuggerError::ReservedCondition),
            3 => Ok(Self::ReadWrite),
            _ => Err(DebuggerError::InvalidCondition(value)),
        }
    }

    /// Returns the raw hardware encoding.
    pub fn as_raw(self) -> u8 {
        match self {
            Self::Execute => 0,
            Self::Write => 1,
            Self::ReadWrite => 3,
        }
    }

    /// Returns the `DR7` condition for the breakpoint kind.
    pub fn condition(self) -> BreakpointCondition {
        match self {
            Self::Execute => BreakpointCondition::Execution,
            Self::Write => BreakpointCondition::Write,
            Self::ReadWrite => BreakpointCondition::ReadWrite,
        }
    }

    /// Checks if the breakpoint watches data accesses.
    pub fn is_data(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

impl std::fmt::Display for BreakpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Execute => write!(f, "execute"),
            Self::Write => write!(f, "write"),
            Self::ReadWrite => write!(f, "read/write"),
        }
    }
}

/// A breakpoint as encoded in the debug registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedBreakpoint {
    /// Content of the breakpoint address register.
    pub address: Va,

    /// The `LENn` field.
    pub length: BreakpointLength,

    /// The `R/Wn` field.
    pub condition: BreakpointCondition,

    /// The `Ln` flag.
    pub enabled: bool,
}

/// Checks that `index` addresses one of `DR0` through `DR3`.
pub fn validate_index(index: u8) -> Result<(), DebuggerError> {
    if index >= 4 {
        return Err(DebuggerError::InvalidRegister(index));
    }

    Ok(())
}

/// Computes the `LENn` encoding of a breakpoint.
///
/// Execution breakpoints always use the 1-byte encoding, regardless of
/// `size`.
pub fn encode_length(size: u8, kind: BreakpointKind) -> Result<BreakpointLength, DebuggerError> {
    if kind == BreakpointKind::Execute {
        return Ok(BreakpointLength::Byte);
    }

    BreakpointLength::from_size(size).ok_or(DebuggerError::InvalidSize(size))
}

/// Writes a breakpoint into the register image.
///
/// Sets the address register, and the `LENn`, `R/Wn` and `Ln` fields of
/// `DR7`. Fields of the other breakpoints are left untouched.
pub fn encode_breakpoint(
    registers: &mut Registers,
    index: u8,
    size: u8,
    address: Va,
    kind: BreakpointKind,
) -> Result<(), DebuggerError> {
    validate_index(index)?;
    let length = encode_length(size, kind)?;

    registers.set_breakpoint_address(index, address.0);
    registers.dr7.set_length(index, length);
    registers.dr7.set_condition(index, kind.condition());
    registers.dr7.set_local_breakpoint(index, true);

    Ok(())
}

/// Removes a breakpoint from the register image.
///
/// Zeroes the address register, and the `LENn`, `R/Wn` and enable fields
/// of `DR7`. Fields of the other breakpoints are left untouched.
pub fn clear_breakpoint(registers: &mut Registers, index: u8) -> Result<(), DebuggerError> {
    validate_index(index)?;

    registers.set_breakpoint_address(index, 0);
    registers.dr7.clear_breakpoint(index);

    Ok(())
}

/// Reads a breakpoint back from the register image.
pub fn decode_breakpoint(registers: &Registers, index: u8) -> Option<EncodedBreakpoint> {
    let address = registers.breakpoint_address(index)?;

    Some(EncodedBreakpoint {
        address: Va(address),
        length: registers.dr7.length(index),
        condition: registers.dr7.condition(index),
        enabled: registers.dr7.local_breakpoint(index),
    })
}
