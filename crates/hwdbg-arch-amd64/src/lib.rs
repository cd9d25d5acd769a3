//! AMD64 debug register definitions.
//!
//! Besides the register models, this crate contains the codec translating
//! logical breakpoints into the bit layout of the debug registers (see
//! [`encode_breakpoint`] and [`clear_breakpoint`]).

mod codec;
mod dr;
mod registers;
mod rflags;

use hwdbg_core::Architecture;

pub use self::{
    codec::{
        BreakpointKind, EncodedBreakpoint, clear_breakpoint, decode_breakpoint, encode_breakpoint,
        encode_length, validate_index,
    },
    dr::{BreakpointCondition, BreakpointLength, Dr0, Dr1, Dr2, Dr3, Dr6, Dr7},
    registers::Registers,
    rflags::Rflags,
};

/// AMD64 architecture.
#[derive(Debug)]
pub struct Amd64;

impl Amd64 {
    /// Encoding of the `rdtscp` instruction.
    pub const RDTSCP: &'static [u8] = &[0x0f, 0x01, 0xf9];

    /// Encoding of the one-byte `nop` instruction.
    pub const NOP: u8 = 0x90;
}

impl Architecture for Amd64 {
    const BREAKPOINT_REGISTERS: usize = 4;

    type Registers = Registers;
}
