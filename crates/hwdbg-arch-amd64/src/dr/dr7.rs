/// `DR7` debug control register.
///
/// Enables or disables breakpoints and sets breakpoint conditions.
///
/// Per-breakpoint fields are addressed by index (0 through 3). Accessors
/// with an out-of-range index return the disabled state, setters ignore it.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct Dr7(pub u64);

/// Breakpoint condition (R/Wn field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointCondition {
    /// Break on instruction execution only.
    Execution,
    /// Break on data writes only.
    Write,
    /// Break on I/O reads or writes.
    ///
    /// Only valid with `CR4.DE` set; never used for memory breakpoints.
    Io,
    /// Break on data reads or writes but not instruction fetches.
    ReadWrite,
}

impl BreakpointCondition {
    /// Decodes the 2-bit hardware encoding.
    pub fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0b00 => Self::Execution,
            0b01 => Self::Write,
            0b10 => Self::Io,
            _ => Self::ReadWrite,
        }
    }

    /// Returns the 2-bit hardware encoding.
    pub fn bits(self) -> u64 {
        match self {
            Self::Execution => 0b00,
            Self::Write => 0b01,
            Self::Io => 0b10,
            Self::ReadWrite => 0b11,
        }
    }
}

/// Breakpoint length (LENn field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointLength {
    /// 1-byte length.
    Byte,
    /// 2-byte length.
    Word,
    /// 8-byte length.
    Quadword,
    /// 4-byte length.
    Dword,
}

impl BreakpointLength {
    /// Decodes the 2-bit hardware encoding.
    pub fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0b00 => Self::Byte,
            0b01 => Self::Word,
            0b10 => Self::Quadword,
            _ => Self::Dword,
        }
    }

    /// Returns the 2-bit hardware encoding.
    pub fn bits(self) -> u64 {
        match self {
            Self::Byte => 0b00,
            Self::Word => 0b01,
            Self::Quadword => 0b10,
            Self::Dword => 0b11,
        }
    }

    /// Returns the length for a breakpoint size in bytes.
    pub fn from_size(size: u8) -> Option<Self> {
        match size {
            1 => Some(Self::Byte),
            2 => Some(Self::Word),
            4 => Some(Self::Dword),
            8 => Some(Self::Quadword),
            _ => None,
        }
    }

    /// Returns the number of bytes covered by the breakpoint.
    pub fn size(self) -> u8 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Dword => 4,
            Self::Quadword => 8,
        }
    }
}

impl Dr7 {
    const LOCAL_EXACT: u64 = 1 << 8;
    const GLOBAL_EXACT: u64 = 1 << 9;

    fn condition_shift(index: u8) -> u64 {
        16 + 4 * index as u64
    }

    fn length_shift(index: u8) -> u64 {
        18 + 4 * index as u64
    }

    /// L0 through L3 (local breakpoint enable) flags (bits 0, 2, 4, and 6).
    ///
    /// Enables (when set) the breakpoint condition for the associated
    /// breakpoint for the current task. The processor clears these flags on
    /// every task switch.
    pub fn local_breakpoint(self, index: u8) -> bool {
        index < 4 && (self.0 >> (2 * index)) & 1 != 0
    }

    /// G0 through G3 (global breakpoint enable) flags (bits 1, 3, 5, and 7).
    pub fn global_breakpoint(self, index: u8) -> bool {
        index < 4 && (self.0 >> (2 * index + 1)) & 1 != 0
    }

    /// LE (local exact breakpoint enable) flag (bit 8).
    ///
    /// Together with GE, also used as the branch trace switch when the
    /// processor is single-stepping.
    pub fn local_exact_breakpoint(self) -> bool {
        self.0 & Self::LOCAL_EXACT != 0
    }

    /// GE (global exact breakpoint enable) flag (bit 9).
    pub fn global_exact_breakpoint(self) -> bool {
        self.0 & Self::GLOBAL_EXACT != 0
    }

    /// GD (general detect enable) flag (bit 13).
    pub fn general_detect(self) -> bool {
        (self.0 >> 13) & 1 != 0
    }

    /// Condition for a breakpoint (R/W0 through R/W3).
    pub fn condition(self, index: u8) -> BreakpointCondition {
        if index >= 4 {
            return BreakpointCondition::Execution;
        }

        BreakpointCondition::from_bits(self.0 >> Self::condition_shift(index))
    }

    /// Length for a breakpoint (LEN0 through LEN3).
    pub fn length(self, index: u8) -> BreakpointLength {
        if index >= 4 {
            return BreakpointLength::Byte;
        }

        BreakpointLength::from_bits(self.0 >> Self::length_shift(index))
    }

    /// Sets or clears the local enable flag of a breakpoint.
    pub fn set_local_breakpoint(&mut self, index: u8, enabled: bool) {
        if index < 4 {
            self.set_bit(2 * index as u64, enabled);
        }
    }

    /// Sets or clears both LE and GE.
    pub fn set_exact_breakpoints(&mut self, enabled: bool) {
        self.set_bit(8, enabled);
        self.set_bit(9, enabled);
    }

    /// Sets the condition of a breakpoint.
    pub fn set_condition(&mut self, index: u8, condition: BreakpointCondition) {
        if index < 4 {
            self.set_field(Self::condition_shift(index), condition.bits());
        }
    }

    /// Sets the length of a breakpoint.
    pub fn set_length(&mut self, index: u8, length: BreakpointLength) {
        if index < 4 {
            self.set_field(Self::length_shift(index), length.bits());
        }
    }

    /// Clears the enable flags, condition and length of a breakpoint.
    ///
    /// Bits of the other breakpoints are left untouched.
    pub fn clear_breakpoint(&mut self, index: u8) {
        if index < 4 {
            self.set_bit(2 * index as u64, false);
            self.set_bit(2 * index as u64 + 1, false);
            self.set_field(Self::condition_shift(index), 0);
            self.set_field(Self::length_shift(index), 0);
        }
    }

    fn set_bit(&mut self, bit: u64, value: bool) {
        if value {
            self.0 |= 1 << bit;
        }
        else {
            self.0 &= !(1 << bit);
        }
    }

    fn set_field(&mut self, shift: u64, value: u64) {
        self.0 = (self.0 & !(0b11 << shift)) | ((value & 0b11) << shift);
    }
}

impl std::fmt::Debug for Dr7 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Dr7")
            .field("local_breakpoint_0", &self.local_breakpoint(0))
            .field("local_breakpoint_1", &self.local_breakpoint(1))
            .field("local_breakpoint_2", &self.local_breakpoint(2))
            .field("local_breakpoint_3", &self.local_breakpoint(3))
            .field("local_exact_breakpoint", &self.local_exact_breakpoint())
            .field("global_exact_breakpoint", &self.global_exact_breakpoint())
            .field("general_detect", &self.general_detect())
            .field("condition_0", &self.condition(0))
            .field("length_0", &self.length(0))
            .field("condition_1", &self.condition(1))
            .field("length_1", &self.length(1))
            .field("condition_2", &self.condition(2))
            .field("length_2", &self.length(2))
            .field("condition_3", &self.condition(3))
            .field("length_3", &self.length(3))
            .finish()
    }
}

impl From<u64> for Dr7 {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Dr7> for u64 {
    fn from(value: Dr7) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_layout() {
        let mut dr7 = Dr7::default();
        dr7.set_local_breakpoint(1, true);
        dr7.set_condition(1, BreakpointCondition::ReadWrite);
        dr7.set_length(1, BreakpointLength::Dword);

        assert_eq!(dr7.0, (1 << 2) | (0b11 << 20) | (0b11 << 22));
        assert!(dr7.local_breakpoint(1));
        assert!(!dr7.global_breakpoint(1));
        assert_eq!(dr7.condition(1), BreakpointCondition::ReadWrite);
        assert_eq!(dr7.length(1), BreakpointLength::Dword);
    }

    #[test]
    fn clear_keeps_other_breakpoints() {
        let mut dr7 = Dr7::default();
        for index in 0..4 {
            dr7.set_local_breakpoint(index, true);
            dr7.set_condition(index, BreakpointCondition::Write);
            dr7.set_length(index, BreakpointLength::Quadword);
        }

        let before = dr7;
        dr7.clear_breakpoint(2);

        assert!(!dr7.local_breakpoint(2));
        assert_eq!(dr7.condition(2), BreakpointCondition::Execution);
        assert_eq!(dr7.length(2), BreakpointLength::Byte);

        for index in [0, 1, 3] {
            assert_eq!(dr7.local_breakpoint(index), before.local_breakpoint(index));
            assert_eq!(dr7.condition(index), before.condition(index));
            assert_eq!(dr7.length(index), before.length(index));
        }
    }

    #[test]
    fn out_of_range_index() {
        let mut dr7 = Dr7(u64::MAX);
        assert!(!dr7.local_breakpoint(4));

        let before = dr7;
        dr7.clear_breakpoint(4);
        dr7.set_condition(7, BreakpointCondition::Write);
        assert_eq!(dr7, before);
    }

    #[test]
    fn length_sizes() {
        for size in [1, 2, 4, 8] {
            let length = BreakpointLength::from_size(size);
            assert_eq!(length.map(BreakpointLength::size), Some(size));
        }

        assert_eq!(BreakpointLength::from_size(4).map(BreakpointLength::bits), Some(0b11));
        assert_eq!(BreakpointLength::from_size(8).map(BreakpointLength::bits), Some(0b10));
        assert_eq!(BreakpointLength::from_size(3), None);
    }
}
