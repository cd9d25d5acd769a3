//! Hardware breakpoint management.
//!
//! The [`BreakpointManager`] keeps the logical breakpoint state of every
//! known thread (see [`BreakpointRegistry`]) in sync with the debug
//! registers of those threads.
//!
//! Two families of operations are provided:
//!
//! - Operations taking a [`ThreadId`] read the thread context, modify it,
//!   and write it back through the driver.
//! - Operations with the `_in_context` suffix work on the calling thread
//!   and only modify the register image they are given. They are meant to
//!   be used from within the exception dispatcher, where the delivered
//!   context becomes the thread state once execution resumes and writing
//!   the context explicitly would be overwritten anyway.
//!
//! All operations validate their arguments before touching any state.
//! Callbacks are never invoked while a table is locked.

mod registry;
mod slot;
mod table;

use hwdbg_arch_amd64::{
    Amd64, BreakpointKind, Registers, clear_breakpoint, decode_breakpoint, encode_breakpoint,
    encode_length, validate_index,
};
use hwdbg_core::{
    Architecture as _, DebuggerConfig, DebuggerDriver, DebuggerError, Hex, ThreadId, Va,
};
use smallvec::SmallVec;

pub(crate) use self::registry::lock;
pub use self::{
    registry::{BreakpointRegistry, SharedTable},
    slot::{BreakpointCallback, BreakpointSlot},
    table::ThreadBreakpointTable,
};
use crate::{SingleStepController, Wow64Workaround};

/// Breakpoint manager.
pub struct BreakpointManager<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    driver: Driver,
    config: DebuggerConfig,
    registry: BreakpointRegistry<Driver>,
    single_step: SingleStepController<Driver>,
    wow64: Wow64Workaround,
}

impl<Driver> BreakpointManager<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    /// Creates a new breakpoint manager with an empty registry.
    pub fn new(driver: Driver, config: DebuggerConfig) -> Self {
        Self {
            driver,
            config,
            registry: BreakpointRegistry::new(),
            single_step: SingleStepController::new(config.branch_trace),
            wow64: Wow64Workaround::new(config.wow64),
        }
    }

    /// Returns the driver.
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    /// Returns the registry of thread breakpoint tables.
    pub fn registry(&self) -> &BreakpointRegistry<Driver> {
        &self.registry
    }

    /// Returns the single-step controller.
    pub fn single_step(&self) -> &SingleStepController<Driver> {
        &self.single_step
    }

    /// Returns the WoW64 workaround.
    pub fn wow64(&self) -> &Wow64Workaround {
        &self.wow64
    }

    /// Arms a breakpoint on a thread.
    ///
    /// The thread table is created if the thread is not known yet. The
    /// breakpoint is written to the live debug registers first; the slot is
    /// only updated once the thread context was written successfully.
    ///
    /// Called from a breakpoint callback for the faulting thread, the change
    /// is carried into the delivered context by the dispatcher once the
    /// callback returns.
    #[expect(clippy::too_many_arguments)]
    pub fn set(
        &self,
        thread_id: ThreadId,
        index: u8,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
        callback: Option<BreakpointCallback<Driver>>,
    ) -> Result<(), DebuggerError> {
        validate(index, size, address, kind)?;

        let table = self.registry.find_or_create(&self.driver, thread_id)?;
        let mut table = lock(&table);
        self.commit_set(&mut table, index, size, address, kind, hit_count, callback)
    }

    /// Arms a breakpoint on the calling thread by modifying `registers`.
    ///
    /// The thread context is not written.
    #[expect(clippy::too_many_arguments)]
    pub fn set_in_context(
        &self,
        registers: &mut Registers,
        index: u8,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
        callback: Option<BreakpointCallback<Driver>>,
    ) -> Result<(), DebuggerError> {
        validate(index, size, address, kind)?;

        let thread_id = self.driver.current_thread_id();
        let table = self.registry.find_or_create(&self.driver, thread_id)?;
        let mut table = lock(&table);
        self.arm_in_context(
            &mut table, registers, index, size, address, kind, hit_count, callback,
        )
    }

    /// Arms a breakpoint in the first free slot of a thread.
    ///
    /// If the thread already has a breakpoint with the same size, address,
    /// kind and hit count, nothing is modified and the index of the existing
    /// breakpoint is returned.
    pub fn set_next_available(
        &self,
        thread_id: ThreadId,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
        callback: Option<BreakpointCallback<Driver>>,
    ) -> Result<u8, DebuggerError> {
        validate_breakpoint(size, address, kind)?;

        let table = self.registry.find_or_create(&self.driver, thread_id)?;
        let mut table = lock(&table);
        let index = match Self::select_slot(&table, size, address, kind, hit_count)? {
            Selection::Existing(index) => return Ok(index),
            Selection::Free(index) => index,
        };

        self.commit_set(&mut table, index, size, address, kind, hit_count, callback)?;
        Ok(index)
    }

    /// Arms a breakpoint in the first free slot of the calling thread by
    /// modifying `registers`.
    pub fn set_next_available_in_context(
        &self,
        registers: &mut Registers,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
        callback: Option<BreakpointCallback<Driver>>,
    ) -> Result<u8, DebuggerError> {
        validate_breakpoint(size, address, kind)?;

        let thread_id = self.driver.current_thread_id();
        let table = self.registry.find_or_create(&self.driver, thread_id)?;
        let mut table = lock(&table);
        let index = match Self::select_slot(&table, size, address, kind, hit_count)? {
            Selection::Existing(index) => return Ok(index),
            Selection::Free(index) => index,
        };

        self.arm_in_context(
            &mut table, registers, index, size, address, kind, hit_count, callback,
        )?;
        Ok(index)
    }

    /// Arms a breakpoint on every known thread.
    ///
    /// A failure on one thread does not stop the others; the last error is
    /// returned. The faulting thread of a dispatched exception picks up the
    /// breakpoint as described for [`set`](Self::set).
    pub fn set_on_all_threads(
        &self,
        index: u8,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
        callback: Option<BreakpointCallback<Driver>>,
    ) -> Result<(), DebuggerError> {
        validate(index, size, address, kind)?;

        if self.registry.is_empty() {
            return Err(DebuggerError::NotInitialized);
        }

        let mut result = Ok(());
        for table in self.registry.tables() {
            let mut table = lock(&table);
            let thread_id = table.thread_id();

            if let Err(err) = self.commit_set(
                &mut table,
                index,
                size,
                address,
                kind,
                hit_count,
                callback.clone(),
            ) {
                tracing::error!(%err, %thread_id, index, %address, "failed to set breakpoint");
                result = Err(err);
            }
        }

        result
    }

    /// Arms a breakpoint on every known thread; the calling thread is
    /// handled through `registers`.
    #[expect(clippy::too_many_arguments)]
    pub fn set_on_all_threads_in_context(
        &self,
        registers: &mut Registers,
        index: u8,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
        callback: Option<BreakpointCallback<Driver>>,
    ) -> Result<(), DebuggerError> {
        self.set_in_context(
            registers,
            index,
            size,
            address,
            kind,
            hit_count,
            callback.clone(),
        )?;

        let current = self.driver.current_thread_id();

        let mut result = Ok(());
        for table in self.registry.tables() {
            let mut table = lock(&table);
            let thread_id = table.thread_id();

            if thread_id == current {
                continue;
            }

            if let Err(err) = self.commit_set(
                &mut table,
                index,
                size,
                address,
                kind,
                hit_count,
                callback.clone(),
            ) {
                tracing::error!(%err, %thread_id, index, %address, "failed to set breakpoint");
                result = Err(err);
            }
        }

        result
    }

    /// Returns the index of the first free slot of a thread.
    pub fn next_available(&self, thread_id: ThreadId) -> Result<Option<u8>, DebuggerError> {
        let table = self.registry.find_or_create(&self.driver, thread_id)?;
        let table = lock(&table);
        Ok(table.next_available())
    }

    /// Clears a breakpoint of a thread.
    ///
    /// The callback of the slot stays attached. The faulting thread of a
    /// dispatched exception picks up the change as described for
    /// [`set`](Self::set).
    pub fn clear(&self, thread_id: ThreadId, index: u8) -> Result<(), DebuggerError> {
        validate_index(index)?;

        let table = self.find(thread_id)?;
        let mut table = lock(&table);
        self.commit_clear(&mut table, &[index])
    }

    /// Clears a breakpoint of the calling thread by modifying `registers`.
    ///
    /// The callback of the slot stays attached.
    pub fn clear_in_context(
        &self,
        registers: &mut Registers,
        index: u8,
    ) -> Result<(), DebuggerError> {
        validate_index(index)?;

        let table = self.find(self.driver.current_thread_id())?;
        let mut table = lock(&table);

        clear_breakpoint(registers, index)?;
        self.disarm_slot(&mut table, index);
        Ok(())
    }

    /// Clears the breakpoint that caused the current debug exception.
    ///
    /// Returns the index of the cleared breakpoint.
    pub fn clear_current_breakpoint(&self, registers: &mut Registers) -> Result<u8, DebuggerError> {
        let index = registers
            .dr6
            .hit_index()
            .ok_or(DebuggerError::Other("no breakpoint condition reported"))?;

        self.clear_in_context(registers, index)?;
        Ok(index)
    }

    /// Clears one debug register on every known thread.
    pub fn clear_on_all_threads(&self, index: u8) -> Result<(), DebuggerError> {
        validate_index(index)?;

        let mut result = Ok(());
        self.registry.for_each(|table| {
            if let Err(err) = self.commit_clear(table, &[index]) {
                tracing::error!(
                    %err,
                    thread_id = %table.thread_id(),
                    index,
                    "failed to clear breakpoint"
                );
                result = Err(err);
            }
        });

        result
    }

    /// Clears every breakpoint of every known thread.
    ///
    /// Zeroes `DR0` through `DR3`, `DR6` and `DR7` of each thread and drops
    /// all callbacks. Meant for shutdown; no other thread should arm
    /// breakpoints concurrently.
    pub fn clear_all(&self) -> Result<(), DebuggerError> {
        let mut result = Ok(());

        for table in self.registry.tables() {
            let mut table = lock(&table);
            let thread_id = table.thread_id();

            let outcome = self.thread_context(&table).and_then(|mut registers| {
                registers.clear_debug_registers();
                self.set_thread_context(&table, &registers)
            });

            match outcome {
                Ok(()) => {
                    self.reset_slots(&mut table);
                    tracing::debug!(%thread_id, "all breakpoints cleared");
                }
                Err(err) => {
                    tracing::error!(%err, %thread_id, "failed to clear breakpoints");
                    result = Err(err);
                }
            }
        }

        result
    }

    /// Clears every breakpoint of the calling thread by zeroing the debug
    /// registers in `registers`.
    pub fn clear_all_in_context(&self, registers: &mut Registers) -> Result<(), DebuggerError> {
        let table = self.find(self.driver.current_thread_id())?;
        let mut table = lock(&table);

        registers.clear_debug_registers();
        self.reset_slots(&mut table);
        Ok(())
    }

    /// Clears every breakpoint, on every known thread, whose address lies
    /// within `[base, base + size)`.
    ///
    /// Used when memory is released, so that stale breakpoints cannot fire
    /// once the memory is reused. The callbacks of the cleared slots are
    /// dropped.
    pub fn clear_in_range(&self, base: Va, size: u64) -> Result<(), DebuggerError> {
        validate_range(base, size)?;

        tracing::debug!(%base, size, "clearing breakpoints in range");

        let mut result = Ok(());
        self.registry.for_each(|table| {
            let indices = Self::indices_in_range(table, base, size);
            if indices.is_empty() {
                return;
            }

            if let Err(err) = self.commit_clear(table, &indices) {
                tracing::error!(
                    %err,
                    thread_id = %table.thread_id(),
                    ?indices,
                    "failed to clear breakpoints in range"
                );
                result = Err(err);
                return;
            }

            Self::drop_callbacks(table, &indices);
        });

        result
    }

    /// Clears every breakpoint of the calling thread whose address lies
    /// within `[base, base + size)` by modifying `registers`.
    ///
    /// The callbacks of the cleared slots are dropped. Other threads are
    /// not touched.
    pub fn clear_in_range_in_context(
        &self,
        registers: &mut Registers,
        base: Va,
        size: u64,
    ) -> Result<(), DebuggerError> {
        validate_range(base, size)?;

        let table = self.find(self.driver.current_thread_id())?;
        let mut table = lock(&table);

        let indices = Self::indices_in_range(&table, base, size);
        for &index in &indices {
            clear_breakpoint(registers, index)?;
            self.disarm_slot(&mut table, index);
        }

        Self::drop_callbacks(&mut table, &indices);
        Ok(())
    }

    /// Copies every breakpoint of the main thread onto a new thread.
    ///
    /// A breakpoint that fails to commit is logged and skipped, the rest is
    /// still propagated; the last error is returned.
    pub fn propagate_to_new_thread(&self, thread_id: ThreadId) -> Result<(), DebuggerError> {
        let main = self
            .registry
            .main_table()
            .ok_or(DebuggerError::NotInitialized)?;

        let inherited = {
            let main = lock(&main);

            if main.thread_id() == thread_id {
                return Ok(());
            }

            main.slots()
                .iter()
                .filter(|slot| slot.is_armed())
                .cloned()
                .collect::<SmallVec<[BreakpointSlot<Driver>; 4]>>()
        };

        let table = self.registry.find_or_create(&self.driver, thread_id)?;
        let mut table = lock(&table);

        let mut result = Ok(());
        for slot in inherited {
            let index = slot.index();
            let address = slot.address();

            if let Err(err) = self.commit_set(
                &mut table,
                index,
                slot.size(),
                address,
                slot.kind(),
                slot.hit_count(),
                slot.callback().cloned(),
            ) {
                tracing::error!(
                    %err, %thread_id, index, %address,
                    "failed to propagate breakpoint to new thread"
                );
                result = Err(err);
            }
        }

        tracing::debug!(%thread_id, armed = table.armed(), "breakpoints propagated");
        result
    }

    /// Re-arms the breakpoint of the calling thread whose slot matches the
    /// live debug registers in `registers`.
    ///
    /// A slot matches if its address equals the content of its address
    /// register and its kind equals the condition in `DR7`. The first
    /// matching slot is overwritten with the new parameters. Returns the
    /// index of the updated slot.
    pub fn update_current_breakpoint(
        &self,
        registers: &mut Registers,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
        callback: Option<BreakpointCallback<Driver>>,
    ) -> Result<u8, DebuggerError> {
        validate_breakpoint(size, address, kind)?;

        let table = self.find(self.driver.current_thread_id())?;
        let mut table = lock(&table);

        let index = table
            .slots()
            .iter()
            .find(|slot| {
                decode_breakpoint(registers, slot.index()).is_some_and(|live| {
                    live.address == slot.address() && live.condition == slot.kind().condition()
                })
            })
            .map(BreakpointSlot::index)
            .ok_or(DebuggerError::Other("no breakpoint matches the debug registers"))?;

        self.arm_in_context(
            &mut table, registers, index, size, address, kind, hit_count, callback,
        )?;
        Ok(index)
    }

    /// Re-applies the armed breakpoints of the calling thread to a register
    /// image whose breakpoint address registers were wiped.
    ///
    /// Returns `true` if breakpoints were restored. Nothing is done if any
    /// of `DR0` through `DR3` is set, or if the thread has no breakpoints.
    pub fn restore_in_context(&self, registers: &mut Registers) -> Result<bool, DebuggerError> {
        if !registers.breakpoint_addresses_clear() {
            return Ok(false);
        }

        let thread_id = self.driver.current_thread_id();
        let Some(table) = self.registry.find(thread_id)
        else {
            return Ok(false);
        };

        let table = lock(&table);
        if table.armed() == 0 {
            return Ok(false);
        }

        for slot in table.slots().iter().filter(|slot| slot.is_armed()) {
            encode_breakpoint(registers, slot.index(), slot.size(), slot.address(), slot.kind())?;
        }

        tracing::debug!(%thread_id, armed = table.armed(), "breakpoints restored");
        Ok(true)
    }

    /// Writes the slots of the calling thread that no longer match `before`
    /// into `registers`.
    ///
    /// Live operations on the calling thread made while one of its
    /// exceptions is dispatched only reach the thread context, which the
    /// delivered image replaces once execution resumes.
    pub(crate) fn sync_in_context(
        &self,
        registers: &mut Registers,
        before: &[BreakpointSlot<Driver>; 4],
    ) -> Result<(), DebuggerError> {
        let Some(table) = self.registry.find(self.driver.current_thread_id())
        else {
            return Ok(());
        };

        let table = lock(&table);
        for (slot, old) in table.slots().iter().zip(before) {
            if slot.same_placement(old) {
                continue;
            }

            if slot.is_armed() {
                let (index, size, address) = (slot.index(), slot.size(), slot.address());
                encode_breakpoint(registers, index, size, address, slot.kind())?;
            }
            else {
                clear_breakpoint(registers, slot.index())?;
            }
        }

        Ok(())
    }

    /// Checks if a breakpoint is enabled in the live `DR7` of a thread.
    pub fn is_armed_live(&self, thread_id: ThreadId, index: u8) -> Result<bool, DebuggerError> {
        validate_index(index)?;

        let table = self.find(thread_id)?;
        let table = lock(&table);
        let registers = self.thread_context(&table)?;
        Ok(registers.dr7.local_breakpoint(index))
    }

    /// Logs the live debug registers of a thread.
    pub fn dump_registers(&self, thread_id: ThreadId) -> Result<(), DebuggerError> {
        let table = self.find(thread_id)?;
        let table = lock(&table);
        let registers = self.thread_context(&table)?;
        drop(table);

        tracing::error!(%thread_id, "debug registers");
        Self::dump_context(&registers);
        Ok(())
    }

    /// Logs the debug registers of a register image.
    pub fn dump_context(registers: &Registers) {
        for index in 0..Amd64::BREAKPOINT_REGISTERS as u8 {
            if let Some(breakpoint) = decode_breakpoint(registers, index) {
                tracing::error!(
                    index,
                    address = %breakpoint.address,
                    length = ?breakpoint.length,
                    condition = ?breakpoint.condition,
                    enabled = breakpoint.enabled,
                    "breakpoint register"
                );
            }
        }

        tracing::error!(
            dr6 = %Hex(registers.dr6.0),
            dr7 = %Hex(registers.dr7.0),
            "status and control"
        );
    }

    /// Returns a snapshot of the slots of a thread.
    pub fn thread_breakpoints(&self, thread_id: ThreadId) -> Option<[BreakpointSlot<Driver>; 4]> {
        let table = self.registry.find(thread_id)?;
        let table = lock(&table);
        Some(table.slots().clone())
    }

    /// Detaches the callback from a slot.
    ///
    /// Clearing a breakpoint keeps its callback; this is the only way to
    /// drop it without re-arming the slot.
    pub fn remove_callback(
        &self,
        thread_id: ThreadId,
        index: u8,
    ) -> Result<Option<BreakpointCallback<Driver>>, DebuggerError> {
        validate_index(index)?;

        let table = self.find(thread_id)?;
        let mut table = lock(&table);
        Ok(table.slot_mut(index).and_then(BreakpointSlot::take_callback))
    }

    /// Consumes one hit of a breakpoint of the calling thread.
    ///
    /// Returns `true` if the hit count dropped to zero.
    pub(crate) fn consume_hit(&self, thread_id: ThreadId, index: u8) -> bool {
        let Some(table) = self.registry.find(thread_id)
        else {
            return false;
        };

        let mut table = lock(&table);
        table
            .slot_mut(index)
            .is_some_and(|slot| slot.is_armed() && slot.consume_hit())
    }

    fn find(&self, thread_id: ThreadId) -> Result<SharedTable<Driver>, DebuggerError> {
        match self.registry.find(thread_id) {
            Some(table) => Ok(table),
            None => {
                tracing::warn!(%thread_id, "no breakpoints found for thread");
                Err(DebuggerError::UnknownThread(thread_id))
            }
        }
    }

    fn select_slot(
        table: &ThreadBreakpointTable<Driver>,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
    ) -> Result<Selection, DebuggerError> {
        let thread_id = table.thread_id();

        if let Some(index) = table.find_identical(size, address, kind, hit_count) {
            tracing::debug!(%thread_id, index, %address, "identical breakpoint already set");
            return Ok(Selection::Existing(index));
        }

        match table.next_available() {
            Some(index) => Ok(Selection::Free(index)),
            None => {
                let addresses = table.slots().each_ref().map(BreakpointSlot::address);
                tracing::warn!(%thread_id, ?addresses, "no available breakpoint");
                Err(DebuggerError::NoAvailableBreakpoint(thread_id))
            }
        }
    }

    fn thread_context(
        &self,
        table: &ThreadBreakpointTable<Driver>,
    ) -> Result<Registers, DebuggerError> {
        let thread_id = table.thread_id();

        self.driver.thread_context(table.handle()).map_err(|err| {
            tracing::error!(%err, %thread_id, "failed to get thread context");
            DebuggerError::get_context(thread_id)
        })
    }

    fn set_thread_context(
        &self,
        table: &ThreadBreakpointTable<Driver>,
        registers: &Registers,
    ) -> Result<(), DebuggerError> {
        let thread_id = table.thread_id();

        self.driver
            .set_thread_context(table.handle(), registers)
            .map_err(|err| {
                tracing::error!(%err, %thread_id, "failed to set thread context");
                DebuggerError::set_context(thread_id)
            })
    }

    #[expect(clippy::too_many_arguments)]
    fn commit_set(
        &self,
        table: &mut ThreadBreakpointTable<Driver>,
        index: u8,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
        callback: Option<BreakpointCallback<Driver>>,
    ) -> Result<(), DebuggerError> {
        let mut registers = self.thread_context(table)?;
        encode_breakpoint(&mut registers, index, size, address, kind)?;

        self.wow64.patch(&self.driver, index, kind, address);
        self.set_thread_context(table, &registers)?;

        if let Some(slot) = table.slot_mut(index) {
            slot.arm(size, address, kind, hit_count, callback);
        }
        self.registry.set_active(true);

        tracing::debug!(
            thread_id = %table.thread_id(), index, %address, size, %kind, hit_count,
            "breakpoint set"
        );

        Ok(())
    }

    #[expect(clippy::too_many_arguments)]
    fn arm_in_context(
        &self,
        table: &mut ThreadBreakpointTable<Driver>,
        registers: &mut Registers,
        index: u8,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
        callback: Option<BreakpointCallback<Driver>>,
    ) -> Result<(), DebuggerError> {
        encode_breakpoint(registers, index, size, address, kind)?;
        self.wow64.patch(&self.driver, index, kind, address);

        if let Some(slot) = table.slot_mut(index) {
            slot.arm(size, address, kind, hit_count, callback);
        }
        self.registry.set_active(true);

        tracing::debug!(
            thread_id = %table.thread_id(), index, %address, size, %kind, hit_count,
            "breakpoint set in context"
        );

        Ok(())
    }

    fn commit_clear(
        &self,
        table: &mut ThreadBreakpointTable<Driver>,
        indices: &[u8],
    ) -> Result<(), DebuggerError> {
        let mut registers = self.thread_context(table)?;
        for &index in indices {
            clear_breakpoint(&mut registers, index)?;
        }

        self.set_thread_context(table, &registers)?;

        for &index in indices {
            self.disarm_slot(table, index);
        }

        Ok(())
    }

    fn indices_in_range(
        table: &ThreadBreakpointTable<Driver>,
        base: Va,
        size: u64,
    ) -> SmallVec<[u8; 4]> {
        table
            .slots()
            .iter()
            .filter(|slot| slot.is_armed() && slot.address().is_within(base, size))
            .map(BreakpointSlot::index)
            .collect()
    }

    fn drop_callbacks(table: &mut ThreadBreakpointTable<Driver>, indices: &[u8]) {
        for &index in indices {
            if let Some(slot) = table.slot_mut(index) {
                slot.take_callback();
            }
        }
    }

    fn disarm_slot(&self, table: &mut ThreadBreakpointTable<Driver>, index: u8) {
        let thread_id = table.thread_id();

        let Some(slot) = table.slot_mut(index)
        else {
            return;
        };

        if slot.is_armed() {
            self.wow64
                .unpatch(&self.driver, index, slot.kind(), slot.address());
        }

        let address = slot.address();
        slot.disarm();

        tracing::debug!(%thread_id, index, %address, "breakpoint cleared");
    }

    fn reset_slots(&self, table: &mut ThreadBreakpointTable<Driver>) {
        for slot in table.slots_mut() {
            if slot.is_armed() {
                self.wow64
                    .unpatch(&self.driver, slot.index(), slot.kind(), slot.address());
            }

            slot.reset();
        }
    }
}

/// Outcome of looking for a slot for a new breakpoint.
enum Selection {
    /// An identical breakpoint is already armed.
    Existing(u8),

    /// The first free slot.
    Free(u8),
}

fn validate(index: u8, size: u8, address: Va, kind: BreakpointKind) -> Result<(), DebuggerError> {
    validate_index(index)?;
    validate_breakpoint(size, address, kind)
}

fn validate_range(base: Va, size: u64) -> Result<(), DebuggerError> {
    if base.is_null() {
        return Err(DebuggerError::NullAddress);
    }

    if size == 0 {
        return Err(DebuggerError::EmptyRange);
    }

    Ok(())
}

fn validate_breakpoint(size: u8, address: Va, kind: BreakpointKind) -> Result<(), DebuggerError> {
    encode_length(size, kind)?;

    if address.is_null() {
        return Err(DebuggerError::NullAddress);
    }

    Ok(())
}
