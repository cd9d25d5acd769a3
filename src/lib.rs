//! In-process hardware breakpoint debugger.
//!
//! This crate re-exports the workspace crates under a single namespace:
//!
//! - the core vocabulary ([`Va`], [`ThreadId`], [`DebuggerError`],
//!   [`DebuggerDriver`], exception records) at the crate root,
//! - the breakpoint manager and exception dispatcher at the crate root,
//! - architecture definitions under [`arch`],
//! - OS drivers under [`driver`].
//!
//! # Examples
//!
//! ```no_run
//! use hwdbg::{
//!     arch::amd64::{Amd64, BreakpointKind},
//!     Debugger, DebuggerConfig, DebuggerDriver, DebuggerError, Va,
//! };
//!
//! fn watch<Driver>(driver: Driver, address: Va) -> Result<(), DebuggerError>
//! where
//!     Driver: DebuggerDriver<Architecture = Amd64>,
//! {
//!     let debugger = Debugger::initialize(driver, DebuggerConfig::default())?;
//!     let thread_id = debugger.manager().driver().current_thread_id();
//!
//!     debugger.manager().set_next_available(
//!         thread_id,
//!         4,
//!         address,
//!         BreakpointKind::ReadWrite,
//!         0,
//!         None,
//!     )?;
//!
//!     Ok(())
//! }
//! ```

pub use hwdbg_core::*;
pub use hwdbg_debugger::*;

/// Architecture definitions.
pub mod arch {
    pub use hwdbg_core::arch::*;

    /// AMD64 debug registers and the breakpoint codec.
    pub mod amd64 {
        pub use hwdbg_arch_amd64::*;
    }
}

/// OS drivers.
pub mod driver {
    /// Win32 driver.
    #[cfg(feature = "driver-windows")]
    pub mod windows {
        pub use hwdbg_driver_windows::*;
    }
}
