/// The RFLAGS register.
///
/// Only the flags the debugger reads or rewrites are exposed: the status
/// flags consulted by breakpoint callbacks (CF, ZF, SF) and the control
/// flags used for single-stepping (TF, RF).
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct Rflags(pub u64);

impl Rflags {
    /// Carry Flag (CF, bit 0).
    pub const CARRY: u64 = 1 << 0;

    /// Zero Flag (ZF, bit 6).
    pub const ZERO: u64 = 1 << 6;

    /// Sign Flag (SF, bit 7).
    pub const SIGN: u64 = 1 << 7;

    /// Trap Flag (TF, bit 8).
    pub const TRAP: u64 = 1 << 8;

    /// Resume Flag (RF, bit 16).
    pub const RESUME: u64 = 1 << 16;

    /// Checks if the Carry Flag (CF) is set.
    pub fn carry(self) -> bool {
        self.0 & Self::CARRY != 0
    }

    /// Checks if the Zero Flag (ZF) is set.
    pub fn zero(self) -> bool {
        self.0 & Self::ZERO != 0
    }

    /// Checks if the Sign Flag (SF) is set.
    pub fn sign(self) -> bool {
        self.0 & Self::SIGN != 0
    }

    /// Checks if the Trap Flag (TF) is set.
    ///
    /// Set to enable single-step mode for debugging; clear to disable
    /// single-step mode.
    pub fn trap(self) -> bool {
        self.0 & Self::TRAP != 0
    }

    /// Checks if the Resume Flag (RF) is set.
    ///
    /// Controls the response of the processor to debug exceptions. When
    /// set, instruction breakpoints are suppressed for the next instruction.
    pub fn resume(self) -> bool {
        self.0 & Self::RESUME != 0
    }

    /// Sets or clears the flags in `mask`.
    pub fn set(&mut self, mask: u64, value: bool) {
        if value {
            self.0 |= mask;
        }
        else {
            self.0 &= !mask;
        }
    }

    /// Inverts the flags in `mask`.
    pub fn flip(&mut self, mask: u64) {
        self.0 ^= mask;
    }
}

impl std::fmt::Debug for Rflags {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Rflags")
            .field("carry", &self.carry())
            .field("zero", &self.zero())
            .field("sign", &self.sign())
            .field("trap", &self.trap())
            .field("resume", &self.resume())
            .finish()
    }
}

impl From<u64> for Rflags {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Rflags> for u64 {
    fn from(value: Rflags) -> Self {
        value.0
    }
}
