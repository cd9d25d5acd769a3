//! Workaround for data breakpoints on stack addresses of 32-bit processes
//! running under WoW64.
//!
//! The 64-bit layer does not reliably preserve read/write breakpoints on
//! stack memory. The OS-specific part (the patch itself) lives in the
//! driver, this module decides when to apply it.

use hwdbg_arch_amd64::{Amd64, BreakpointCondition, BreakpointKind};
use hwdbg_core::{DebuggerDriver, Va};

/// Decides when the WoW64 stack breakpoint patch is applied.
#[derive(Debug, Clone, Copy)]
pub struct Wow64Workaround {
    enabled: bool,
}

impl Wow64Workaround {
    /// Creates the workaround; a disabled workaround never calls the driver.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Checks if the workaround is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Installs the process-wide part of the workaround.
    pub fn install<Driver>(&self, driver: &Driver)
    where
        Driver: DebuggerDriver<Architecture = Amd64>,
    {
        if !self.enabled {
            return;
        }

        match driver.wow64_fix() {
            Ok(()) => tracing::debug!("wow64 workaround installed"),
            Err(err) => tracing::warn!(%err, "failed to install wow64 workaround"),
        }
    }

    /// Checks if a breakpoint is affected by the stack quirk.
    pub fn affects<Driver>(&self, driver: &Driver, kind: BreakpointKind, address: Va) -> bool
    where
        Driver: DebuggerDriver<Architecture = Amd64>,
    {
        self.enabled && kind.is_data() && driver.is_stack_address(address)
    }

    /// Applies the patch for a breakpoint that is about to be armed.
    pub fn patch<Driver>(&self, driver: &Driver, index: u8, kind: BreakpointKind, address: Va)
    where
        Driver: DebuggerDriver<Architecture = Amd64>,
    {
        if !self.affects(driver, kind, address) {
            return;
        }

        if let Err(err) = driver.wow64_patch_breakpoint(index) {
            tracing::warn!(%err, index, %address, "failed to patch stack breakpoint");
        }
    }

    /// Removes the patch of a breakpoint that was just cleared.
    pub fn unpatch<Driver>(&self, driver: &Driver, index: u8, kind: BreakpointKind, address: Va)
    where
        Driver: DebuggerDriver<Architecture = Amd64>,
    {
        if !self.affects(driver, kind, address) {
            return;
        }

        if let Err(err) = driver.wow64_unpatch_breakpoint(index) {
            tracing::warn!(%err, index, %address, "failed to unpatch stack breakpoint");
        }
    }

    /// Checks if the live register state shows the known downgrade of a
    /// read/write stack breakpoint to write-only.
    pub fn is_downgraded<Driver>(
        &self,
        driver: &Driver,
        kind: BreakpointKind,
        address: Va,
        live: BreakpointCondition,
    ) -> bool
    where
        Driver: DebuggerDriver<Architecture = Amd64>,
    {
        self.enabled
            && kind == BreakpointKind::ReadWrite
            && live == BreakpointCondition::Write
            && driver.is_stack_address(address)
    }
}
