//! Trap flag management.

use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use hwdbg_arch_amd64::{Amd64, Registers, Rflags};
use hwdbg_core::{DebuggerDriver, ExceptionContext};

use crate::BreakpointManager;

/// A handler invoked for single-step traps that are not caused by a
/// hardware breakpoint.
pub type SingleStepHandler<Driver> =
    Arc<dyn Fn(&BreakpointManager<Driver>, &mut ExceptionContext<'_, Amd64>) + Send + Sync>;

/// Controls single-step execution and instruction tracing.
///
/// All register manipulation happens on a register image (usually the one
/// delivered with an exception); the changes take effect when the thread
/// resumes with that image.
pub struct SingleStepController<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    branch_trace: bool,
    tracing: AtomicBool,
    handler: RwLock<Option<SingleStepHandler<Driver>>>,
}

impl<Driver> SingleStepController<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    /// Creates a new controller.
    ///
    /// With `branch_trace` set, entering single-step mode also enables the
    /// `LE`/`GE` bits of `DR7`.
    pub fn new(branch_trace: bool) -> Self {
        Self {
            branch_trace,
            tracing: AtomicBool::new(false),
            handler: RwLock::new(None),
        }
    }

    /// Enters single-step mode and installs the handler for the resulting
    /// traps.
    pub fn set_single_step_mode(
        &self,
        registers: &mut Registers,
        handler: SingleStepHandler<Driver>,
    ) {
        registers.rflags.set(Rflags::TRAP, true);

        if self.branch_trace {
            registers.dr7.set_exact_breakpoints(true);
        }

        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Leaves single-step mode.
    ///
    /// The handler stays installed, a trap that is already pending is
    /// still delivered to it.
    pub fn clear_single_step_mode(&self, registers: &mut Registers) {
        registers.rflags.set(Rflags::TRAP, false);
    }

    /// Returns the installed single-step handler.
    pub fn handler(&self) -> Option<SingleStepHandler<Driver>> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes the single-step handler.
    pub fn remove_handler(&self) -> Option<SingleStepHandler<Driver>> {
        self.handler
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Marks an instruction trace as running.
    ///
    /// While a trace is running, per-hit log lines are suppressed and every
    /// unclassified exception is logged.
    pub fn start_trace(&self) {
        self.tracing.store(true, Ordering::SeqCst);
    }

    /// Marks the instruction trace as stopped.
    pub fn stop_trace(&self) {
        self.tracing.store(false, Ordering::SeqCst);
    }

    /// Checks if an instruction trace is running.
    pub fn is_tracing(&self) -> bool {
        self.tracing.load(Ordering::SeqCst)
    }

    /// Sets the resume flag, suppressing instruction breakpoints for the
    /// next instruction.
    pub fn set_resume_flag(registers: &mut Registers) {
        registers.rflags.set(Rflags::RESUME, true);
    }

    /// Resumes execution past an execution breakpoint without clearing it.
    pub fn resume_from_breakpoint(registers: &mut Registers) {
        Self::set_resume_flag(registers);
    }

    /// Sets the zero flag.
    pub fn set_zero_flag(registers: &mut Registers) {
        registers.rflags.set(Rflags::ZERO, true);
    }

    /// Clears the zero flag.
    pub fn clear_zero_flag(registers: &mut Registers) {
        registers.rflags.set(Rflags::ZERO, false);
    }

    /// Inverts the zero flag.
    pub fn flip_zero_flag(registers: &mut Registers) {
        registers.rflags.flip(Rflags::ZERO);
    }

    /// Sets the sign flag.
    pub fn set_sign_flag(registers: &mut Registers) {
        registers.rflags.set(Rflags::SIGN, true);
    }

    /// Clears the sign flag.
    pub fn clear_sign_flag(registers: &mut Registers) {
        registers.rflags.set(Rflags::SIGN, false);
    }

    /// Inverts the sign flag.
    pub fn flip_sign_flag(registers: &mut Registers) {
        registers.rflags.flip(Rflags::SIGN);
    }

    /// Sets the carry flag.
    pub fn set_carry_flag(registers: &mut Registers) {
        registers.rflags.set(Rflags::CARRY, true);
    }

    /// Clears the carry flag.
    pub fn clear_carry_flag(registers: &mut Registers) {
        registers.rflags.set(Rflags::CARRY, false);
    }

    /// Inverts the carry flag.
    pub fn flip_carry_flag(registers: &mut Registers) {
        registers.rflags.flip(Rflags::CARRY);
    }
}
