use std::sync::Arc;

use hwdbg_arch_amd64::{Amd64, Registers};
use hwdbg_core::{
    DebuggerConfig, DebuggerDriver, DebuggerError, ExceptionContext, ExceptionDisposition,
    ExceptionRecord, ThreadId, TrackedRegions, Va,
};

use crate::{BreakpointManager, ExceptionDispatcher, GuardPageHandler};

/// The in-process debugger.
///
/// Ties the breakpoint manager and the exception dispatcher together and
/// exposes the hooks the host calls into: thread creation, memory release,
/// context continuation and the exception filter itself.
///
/// # Examples
///
/// ```no_run
/// # use hwdbg_core::{DebuggerConfig, DebuggerDriver, DebuggerError, ThreadId, Va};
/// # use hwdbg_arch_amd64::{Amd64, BreakpointKind};
/// # use hwdbg_debugger::Debugger;
/// # fn example<Driver>(driver: Driver) -> Result<(), DebuggerError>
/// # where
/// #     Driver: DebuggerDriver<Architecture = Amd64>,
/// # {
/// let debugger = Debugger::initialize(driver, DebuggerConfig::default())?;
/// let thread_id = debugger.manager().driver().current_thread_id();
///
/// debugger.manager().set_next_available(
///     thread_id,
///     4,
///     Va(0x0040_1000),
///     BreakpointKind::Write,
///     1,
///     None,
/// )?;
///
/// // Threads created from now on inherit the breakpoint.
/// debugger.on_new_thread(ThreadId(1234))?;
/// debugger.shutdown()?;
/// # Ok(())
/// # }
/// ```
pub struct Debugger<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    dispatcher: ExceptionDispatcher<Driver>,
}

impl<Driver> Debugger<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    /// Initializes the debugger on the calling thread.
    ///
    /// The calling thread becomes the main thread: its breakpoint table is
    /// the template for threads created later.
    pub fn initialize(driver: Driver, config: DebuggerConfig) -> Result<Self, DebuggerError> {
        let manager = BreakpointManager::new(driver, config);
        let thread_id = manager.driver().current_thread_id();

        manager
            .registry()
            .find_or_create(manager.driver(), thread_id)?;

        manager.wow64().install(manager.driver());
        manager.registry().set_active(true);

        tracing::debug!(%thread_id, ?config, "debugger initialized");

        Ok(Self {
            dispatcher: ExceptionDispatcher::new(manager),
        })
    }

    /// Sets the registry of regions tracked with guard pages.
    pub fn with_tracked_regions(self, regions: Arc<dyn TrackedRegions>) -> Self {
        Self {
            dispatcher: self.dispatcher.with_tracked_regions(regions),
        }
    }

    /// Sets the handler for guard page violations inside tracked regions.
    pub fn with_guard_page_handler(self, handler: GuardPageHandler<Driver>) -> Self {
        Self {
            dispatcher: self.dispatcher.with_guard_page_handler(handler),
        }
    }

    /// Returns the breakpoint manager.
    pub fn manager(&self) -> &BreakpointManager<Driver> {
        self.dispatcher.manager()
    }

    /// Returns the exception dispatcher.
    pub fn dispatcher(&self) -> &ExceptionDispatcher<Driver> {
        &self.dispatcher
    }

    /// Returns the identifier of the main thread.
    pub fn main_thread_id(&self) -> Option<ThreadId> {
        self.manager().registry().main_thread_id()
    }

    /// Called when a thread was created in the monitored process.
    pub fn on_new_thread(&self, thread_id: ThreadId) -> Result<(), DebuggerError> {
        self.manager().propagate_to_new_thread(thread_id)
    }

    /// Called when memory of the monitored process was released.
    pub fn on_region_freed(&self, base: Va, size: u64) -> Result<(), DebuggerError> {
        self.manager().clear_in_range(base, size)
    }

    /// Called before the calling thread continues with `registers`.
    ///
    /// Returns `true` if the breakpoints of the thread had to be restored.
    pub fn on_continue(&self, registers: &mut Registers) -> bool {
        if !self.manager().registry().is_active() {
            return false;
        }

        match self.manager().restore_in_context(registers) {
            Ok(restored) => restored,
            Err(err) => {
                tracing::error!(%err, "failed to restore breakpoints");
                false
            }
        }
    }

    /// Stops tracing and removes every breakpoint from every thread.
    pub fn shutdown(&self) -> Result<(), DebuggerError> {
        let manager = self.manager();

        manager.single_step().stop_trace();
        let result = manager.clear_all();
        manager.registry().set_active(false);

        tracing::debug!("debugger shut down");
        result
    }

    /// The exception filter.
    pub fn filter(
        &self,
        record: &ExceptionRecord,
        registers: &mut Registers,
    ) -> ExceptionDisposition {
        let mut context = ExceptionContext::new(record, registers);
        self.dispatcher.dispatch(&mut context)
    }

    /// Dispatches an exception; returns `true` if execution should resume.
    pub fn dispatch(&self, record: &ExceptionRecord, registers: &mut Registers) -> bool {
        self.filter(record, registers).is_handled()
    }
}
