use super::{Dr0, Dr1, Dr2, Dr3, Dr6, Dr7, Rflags};

/// The register image of a thread.
///
/// Mirrors the parts of the OS thread context the debugger reads and
/// writes. For 32-bit processes the upper halves are zero.
#[expect(missing_docs)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rbp: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub rsp: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub rip: u64,
    pub rflags: Rflags,

    pub dr0: Dr0,
    pub dr1: Dr1,
    pub dr2: Dr2,
    pub dr3: Dr3,
    pub dr6: Dr6,
    pub dr7: Dr7,
}

impl Registers {
    /// Returns the content of the breakpoint address register `index`.
    pub fn breakpoint_address(&self, index: u8) -> Option<u64> {
        match index {
            0 => Some(self.dr0.0),
            1 => Some(self.dr1.0),
            2 => Some(self.dr2.0),
            3 => Some(self.dr3.0),
            _ => None,
        }
    }

    /// Writes the breakpoint address register `index`.
    ///
    /// Returns `false` if the index is out of range.
    pub fn set_breakpoint_address(&mut self, index: u8, address: u64) -> bool {
        match index {
            0 => self.dr0 = Dr0(address),
            1 => self.dr1 = Dr1(address),
            2 => self.dr2 = Dr2(address),
            3 => self.dr3 = Dr3(address),
            _ => return false,
        }

        true
    }

    /// Checks if all of `DR0` through `DR3` are zero.
    pub fn breakpoint_addresses_clear(&self) -> bool {
        self.dr0.0 == 0 && self.dr1.0 == 0 && self.dr2.0 == 0 && self.dr3.0 == 0
    }

    /// Zeroes `DR0` through `DR3`, `DR6` and `DR7`.
    pub fn clear_debug_registers(&mut self) {
        self.dr0 = Dr0::default();
        self.dr1 = Dr1::default();
        self.dr2 = Dr2::default();
        self.dr3 = Dr3::default();
        self.dr6 = Dr6::default();
        self.dr7 = Dr7::default();
    }
}

impl hwdbg_core::Registers for Registers {
    fn instruction_pointer(&self) -> u64 {
        self.rip
    }

    fn set_instruction_pointer(&mut self, ip: u64) {
        self.rip = ip;
    }
}
