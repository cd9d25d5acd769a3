/// `DR6` debug status register.
///
/// Reports debug conditions that were sampled at the time the last debug
/// exception was generated.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct Dr6(pub u64);

impl Dr6 {
    /// B0 through B3 (breakpoint condition detected) flags (bits 0 through 3).
    ///
    /// Indicates (when set) that the associated breakpoint condition was
    /// met when a debug exception was generated. The flags may be set even
    /// if the breakpoint is not enabled in `DR7`, so a handler should only
    /// check the bits of enabled breakpoints.
    pub fn breakpoint_condition(self) -> u8 {
        (self.0 & 0b1111) as _
    }

    /// Returns the index of the breakpoint that fired.
    ///
    /// If several conditions are reported at once, the lowest index wins.
    pub fn hit_index(self) -> Option<u8> {
        match self.breakpoint_condition() {
            0 => None,
            condition => Some(condition.trailing_zeros() as u8),
        }
    }

    /// BD (debug register access detected) flag (bit 13).
    pub fn debug_register_access_detected(self) -> bool {
        (self.0 >> 13) & 1 != 0
    }

    /// BS (single step) flag (bit 14).
    ///
    /// Indicates (when set) that the debug exception was triggered by the
    /// single-step execution mode (enabled with the TF flag in RFLAGS).
    pub fn single_step(self) -> bool {
        (self.0 >> 14) & 1 != 0
    }

    /// BT (task switch) flag (bit 15).
    pub fn task_switch(self) -> bool {
        (self.0 >> 15) & 1 != 0
    }
}

impl std::fmt::Debug for Dr6 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Dr6")
            .field("breakpoint_condition", &self.breakpoint_condition())
            .field(
                "debug_register_access_detected",
                &self.debug_register_access_detected(),
            )
            .field("single_step", &self.single_step())
            .field("task_switch", &self.task_switch())
            .finish()
    }
}

impl From<u64> for Dr6 {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Dr6> for u64 {
    fn from(value: Dr6) -> Self {
        value.0
    }
}
