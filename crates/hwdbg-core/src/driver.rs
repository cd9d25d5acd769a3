use crate::{Architecture, DebuggerError, ImageRange, ThreadId, Va};

/// A trait for implementing the OS boundary of the debugger.
///
/// The driver owns every interaction with the operating system: obtaining
/// thread handles, reading and writing thread contexts, and the few memory
/// operations the exception dispatcher needs. All methods are called from
/// arbitrary threads of the monitored process, including from within
/// exception handlers.
pub trait DebuggerDriver: Send + Sync {
    /// The architecture supported by the driver.
    type Architecture: Architecture + ?Sized;

    /// An owned thread handle.
    ///
    /// Dropping the handle releases it.
    type ThreadHandle: Send + Sync;

    /// Returns the identifier of the calling thread.
    fn current_thread_id(&self) -> ThreadId;

    /// Duplicates a handle for the calling thread.
    fn duplicate_current_thread(&self) -> Result<Self::ThreadHandle, DebuggerError>;

    /// Opens a handle with full access for another thread.
    fn open_thread(&self, thread_id: ThreadId) -> Result<Self::ThreadHandle, DebuggerError>;

    /// Retrieves the register state of a thread.
    fn thread_context(
        &self,
        thread: &Self::ThreadHandle,
    ) -> Result<<Self::Architecture as Architecture>::Registers, DebuggerError>;

    /// Sets the debug register state of a thread.
    fn set_thread_context(
        &self,
        thread: &Self::ThreadHandle,
        registers: &<Self::Architecture as Architecture>::Registers,
    ) -> Result<(), DebuggerError>;

    /// Reads memory of the monitored process.
    fn read_memory(&self, address: Va, buffer: &mut [u8]) -> Result<(), DebuggerError>;

    /// Overwrites code of the monitored process.
    ///
    /// The driver is responsible for temporarily lifting the page protection.
    fn write_code(&self, address: Va, content: &[u8]) -> Result<(), DebuggerError>;

    /// Re-applies the guard modifier on top of `protection` for the page
    /// containing `address`.
    fn protect_guard_page(&self, address: Va, protection: u32) -> Result<(), DebuggerError>;

    /// Reads the processor timestamp counter.
    fn read_timestamp_counter(&self) -> u64;

    /// Checks if the address belongs to a trusted system component
    /// (e.g., `ntdll`).
    fn is_system_address(&self, address: Va) -> bool;

    /// Returns the memory range of the monitor's own image, if known.
    fn image_range(&self) -> Option<ImageRange>;

    /// Checks if the address lies within the stack of the calling thread.
    fn is_stack_address(&self, address: Va) -> bool;

    /// Installs the process-wide WoW64 workaround.
    fn wow64_fix(&self) -> Result<(), DebuggerError> {
        Ok(())
    }

    /// Applies the WoW64 stack breakpoint patch for a register index.
    fn wow64_patch_breakpoint(&self, index: u8) -> Result<(), DebuggerError> {
        let _ = index;
        Ok(())
    }

    /// Removes the WoW64 stack breakpoint patch for a register index.
    fn wow64_unpatch_breakpoint(&self, index: u8) -> Result<(), DebuggerError> {
        let _ = index;
        Ok(())
    }
}
