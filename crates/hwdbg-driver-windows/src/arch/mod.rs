//! Conversion between the Win32 `CONTEXT` and the register image.

#[cfg(target_arch = "x86")]
mod x86;
#[cfg(target_arch = "x86_64")]
mod x86_64;

#[cfg(target_arch = "x86")]
pub(crate) use self::x86::{
    CONTEXT_READ, CONTEXT_WRITE, apply_registers, read_timestamp_counter, registers_from_context,
};
#[cfg(target_arch = "x86_64")]
pub(crate) use self::x86_64::{
    CONTEXT_READ, CONTEXT_WRITE, apply_registers, read_timestamp_counter, registers_from_context,
};
