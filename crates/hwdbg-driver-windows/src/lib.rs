//! Win32 driver for the in-process hardware breakpoint debugger.
//!
//! Implements [`DebuggerDriver`] on top of the Win32 thread context and
//! memory APIs, and bridges the process's vectored exception handling to
//! [`Debugger::filter`].
//!
//! The crate is empty on non-Windows targets.

#![cfg(windows)]

mod arch;
mod driver;
mod error;
mod handler;

use hwdbg_arch_amd64::{Amd64, Registers};
use hwdbg_core::{DebuggerDriver, DebuggerError, ImageRange, ThreadId, Va};
#[cfg(doc)]
use hwdbg_debugger::Debugger;

pub use self::{
    driver::ThreadHandle,
    error::Error,
    handler::{install, installed, uninstall},
};
use self::driver::Win32Driver;

/// Win32 driver for the in-process debugger.
pub struct WindowsDriver {
    inner: Win32Driver,
}

impl WindowsDriver {
    /// Creates a new driver for the current process.
    pub fn new() -> Result<Self, DebuggerError> {
        Ok(Self {
            inner: Win32Driver::new()?,
        })
    }
}

impl DebuggerDriver for WindowsDriver {
    type Architecture = Amd64;
    type ThreadHandle = ThreadHandle;

    fn current_thread_id(&self) -> ThreadId {
        self.inner.current_thread_id()
    }

    fn duplicate_current_thread(&self) -> Result<ThreadHandle, DebuggerError> {
        Ok(self.inner.duplicate_current_thread()?)
    }

    fn open_thread(&self, thread_id: ThreadId) -> Result<ThreadHandle, DebuggerError> {
        Ok(self.inner.open_thread(thread_id)?)
    }

    fn thread_context(&self, thread: &ThreadHandle) -> Result<Registers, DebuggerError> {
        Ok(self.inner.thread_context(thread)?)
    }

    fn set_thread_context(
        &self,
        thread: &ThreadHandle,
        registers: &Registers,
    ) -> Result<(), DebuggerError> {
        Ok(self.inner.set_thread_context(thread, registers)?)
    }

    fn read_memory(&self, address: Va, buffer: &mut [u8]) -> Result<(), DebuggerError> {
        Ok(self.inner.read_memory(address, buffer)?)
    }

    fn write_code(&self, address: Va, content: &[u8]) -> Result<(), DebuggerError> {
        Ok(self.inner.write_code(address, content)?)
    }

    fn protect_guard_page(&self, address: Va, protection: u32) -> Result<(), DebuggerError> {
        Ok(self.inner.protect_guard_page(address, protection)?)
    }

    fn read_timestamp_counter(&self) -> u64 {
        self.inner.read_timestamp_counter()
    }

    fn is_system_address(&self, address: Va) -> bool {
        self.inner.is_system_address(address)
    }

    fn image_range(&self) -> Option<ImageRange> {
        self.inner.image_range()
    }

    fn is_stack_address(&self, address: Va) -> bool {
        self.inner.is_stack_address(address)
    }
}
