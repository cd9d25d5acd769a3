//! Hardware breakpoint manager and exception dispatcher.
//!
//! This crate keeps the per-thread debug register state of the monitored
//! process, arms and clears hardware breakpoints across threads, and routes
//! the exceptions they raise to analysis handlers.
//!
//! The entry point is [`Debugger`]. Breakpoints are managed through its
//! [`BreakpointManager`]; every exception of the process is handed to
//! [`Debugger::filter`].

mod bpm;
mod debugger;
mod dispatcher;
mod singlestep;
mod wow64;

#[cfg(test)]
mod tests;

pub use self::{
    bpm::{
        BreakpointCallback, BreakpointManager, BreakpointRegistry, BreakpointSlot, SharedTable,
        ThreadBreakpointTable,
    },
    debugger::Debugger,
    dispatcher::{ExceptionDispatcher, GuardPageHandler},
    singlestep::{SingleStepController, SingleStepHandler},
    wow64::Wow64Workaround,
};
