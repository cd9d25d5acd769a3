//! Structured exception dispatch.
//!
//! The [`ExceptionDispatcher`] classifies every exception raised in the
//! monitored process and decides whether execution resumes with the
//! (possibly modified) context or whether the exception is passed to the
//! next handler in the chain.

mod guard;
mod instruction;

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use hwdbg_arch_amd64::{Amd64, BreakpointKind, decode_breakpoint, encode_breakpoint};
use hwdbg_core::{
    DebuggerDriver, ExceptionCode, ExceptionContext, ExceptionDisposition, Hex, TrackedRegions,
};

pub use self::guard::GuardPageHandler;
use crate::{BreakpointManager, BreakpointSlot, bpm::lock};

/// Exception dispatcher.
pub struct ExceptionDispatcher<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    manager: BreakpointManager<Driver>,
    regions: Option<Arc<dyn TrackedRegions>>,
    guard_page_handler: Option<GuardPageHandler<Driver>>,
}

impl<Driver> ExceptionDispatcher<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    /// Creates a new dispatcher on top of a breakpoint manager.
    pub fn new(manager: BreakpointManager<Driver>) -> Self {
        Self {
            manager,
            regions: None,
            guard_page_handler: None,
        }
    }

    /// Sets the registry of regions tracked with guard pages.
    pub fn with_tracked_regions(self, regions: Arc<dyn TrackedRegions>) -> Self {
        Self {
            regions: Some(regions),
            ..self
        }
    }

    /// Sets the handler for guard page violations inside tracked regions.
    pub fn with_guard_page_handler(self, handler: GuardPageHandler<Driver>) -> Self {
        Self {
            guard_page_handler: Some(handler),
            ..self
        }
    }

    /// Returns the breakpoint manager.
    pub fn manager(&self) -> &BreakpointManager<Driver> {
        &self.manager
    }

    /// Dispatches an exception.
    ///
    /// Never fails: every error is logged and turned into a disposition.
    pub fn dispatch(&self, context: &mut ExceptionContext<'_, Amd64>) -> ExceptionDisposition {
        match context.record.code {
            ExceptionCode::SingleStep => self.dispatch_single_step(context),
            ExceptionCode::GuardPageViolation => self.dispatch_guard_page(context),
            ExceptionCode::PrivilegedInstruction | ExceptionCode::IllegalInstruction => {
                match self.dispatch_instruction(context) {
                    Some(disposition) => disposition,
                    None => self.dispatch_unclassified(context),
                }
            }
            _ => self.dispatch_unclassified(context),
        }
    }

    /// Handles a single-step exception, caused either by a hardware
    /// breakpoint or by the trap flag.
    fn dispatch_single_step(
        &self,
        context: &mut ExceptionContext<'_, Amd64>,
    ) -> ExceptionDisposition {
        let manager = &self.manager;

        if !manager.registry().is_active() {
            return ExceptionDisposition::ContinueSearch;
        }

        let thread_id = manager.driver().current_thread_id();
        let Some(table) = manager.registry().find(thread_id)
        else {
            tracing::debug!(%thread_id, "single-step on thread without breakpoints");
            return ExceptionDisposition::ContinueSearch;
        };

        let Some(index) = context.registers.dr6.hit_index()
        else {
            let Some(handler) = manager.single_step().handler()
            else {
                return ExceptionDisposition::ContinueSearch;
            };

            if panic::catch_unwind(AssertUnwindSafe(|| handler(manager, &mut *context))).is_err() {
                tracing::error!(%thread_id, "single-step handler panicked");
                return ExceptionDisposition::ContinueSearch;
            }

            return ExceptionDisposition::ContinueExecution;
        };

        // The table lock is released before the callback runs, the
        // callback may re-arm or clear breakpoints of this thread.
        let slot = lock(&table).slot(index).cloned();

        let Some(slot) = slot.filter(BreakpointSlot::is_armed)
        else {
            tracing::debug!(%thread_id, index, "hit on unarmed breakpoint, passing");
            return ExceptionDisposition::ContinueSearch;
        };

        if !manager.single_step().is_tracing() && !manager.config().quiet {
            tracing::info!(
                %thread_id,
                index,
                address = %slot.address(),
                instruction = %context.record.address,
                kind = %slot.kind(),
                "breakpoint hit"
            );
        }

        self.verify_slot(context, &slot);

        let Some(callback) = slot.callback()
        else {
            tracing::debug!(%thread_id, index, "breakpoint without callback, passing");
            return ExceptionDisposition::ContinueSearch;
        };

        let before = lock(&table).slots().clone();
        let completed = panic::catch_unwind(AssertUnwindSafe(|| {
            callback(manager, &slot, &mut *context);
        }))
        .is_ok();

        if let Err(err) = manager.sync_in_context(context.registers, &before) {
            tracing::error!(%err, %thread_id, "failed to apply breakpoint changes to the context");
        }

        if !completed {
            tracing::error!(
                %thread_id,
                index,
                address = %slot.address(),
                "breakpoint callback panicked"
            );
        }

        if manager.consume_hit(thread_id, index) {
            tracing::debug!(%thread_id, index, "hit count exhausted");

            if let Err(err) = manager.clear_in_context(context.registers, index) {
                tracing::error!(%err, %thread_id, index, "failed to clear exhausted breakpoint");
            }
        }

        if completed {
            ExceptionDisposition::ContinueExecution
        }
        else {
            ExceptionDisposition::ContinueSearch
        }
    }

    /// Compares the live debug registers with the slot that fired.
    ///
    /// Mismatches are reported but never abort the dispatch. With the WoW64
    /// workaround enabled, a read/write stack breakpoint that the OS
    /// downgraded to write-only is re-armed in the context.
    fn verify_slot(
        &self,
        context: &mut ExceptionContext<'_, Amd64>,
        slot: &BreakpointSlot<Driver>,
    ) {
        let manager = &self.manager;
        let index = slot.index();

        let Some(live) = decode_breakpoint(context.registers, index)
        else {
            return;
        };

        if live.address != slot.address() {
            tracing::error!(
                index,
                live = %live.address,
                expected = %slot.address(),
                "breakpoint address differs from the debug register"
            );
            BreakpointManager::<Driver>::dump_context(context.registers);
        }

        if !manager.wow64().is_enabled() || live.condition == slot.kind().condition() {
            return;
        }

        if manager
            .wow64()
            .is_downgraded(manager.driver(), slot.kind(), slot.address(), live.condition)
        {
            match encode_breakpoint(
                context.registers,
                index,
                slot.size(),
                slot.address(),
                BreakpointKind::ReadWrite,
            ) {
                Ok(()) => tracing::debug!(index, "read/write stack breakpoint reinstated"),
                Err(err) => tracing::error!(%err, index, "failed to reinstate breakpoint"),
            }

            return;
        }

        tracing::error!(
            index,
            live = ?live.condition,
            expected = %slot.kind(),
            "breakpoint type differs from the debug register"
        );
        BreakpointManager::<Driver>::dump_context(context.registers);
    }

    /// Reports exceptions no other class claimed and passes them on.
    fn dispatch_unclassified(&self, context: &ExceptionContext<'_, Amd64>) -> ExceptionDisposition {
        let record = context.record;
        let driver = self.manager.driver();

        let rva = driver
            .image_range()
            .and_then(|image| image.rva(record.address));

        if let Some(rva) = rva {
            match record.accessed_address() {
                Some(accessed) => tracing::error!(
                    code = %record.code,
                    rva = %Hex(rva),
                    %accessed,
                    "exception inside the debugger image"
                ),
                None => tracing::error!(
                    code = %record.code,
                    rva = %Hex(rva),
                    "exception inside the debugger image"
                ),
            }
        }

        if self.manager.single_step().is_tracing() {
            match record.information.as_slice() {
                [] => tracing::trace!(code = %record.code, address = %record.address, "exception"),
                [first] => tracing::trace!(
                    code = %record.code,
                    address = %record.address,
                    first = %Hex(*first),
                    "exception"
                ),
                [first, second, ..] => tracing::trace!(
                    code = %record.code,
                    address = %record.address,
                    first = %Hex(*first),
                    second = %Hex(*second),
                    "exception"
                ),
            }
        }

        ExceptionDisposition::ContinueSearch
    }
}
