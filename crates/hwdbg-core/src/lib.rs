//! Core types of the hardware breakpoint engine.
//!
//! This crate defines the vocabulary shared by the architecture definitions,
//! the breakpoint engine and the OS drivers: addresses and thread
//! identifiers, exception records, the error type, the configuration, and
//! the [`DebuggerDriver`] trait that abstracts the operating system.

pub mod arch;
mod config;
mod core;
mod driver;
mod error;
mod event;
mod region;

pub use self::{
    arch::{Architecture, Registers},
    config::DebuggerConfig,
    core::{Hex, ImageRange, ThreadId, Va},
    driver::DebuggerDriver,
    error::{ContextOperation, DebuggerError},
    event::{
        ExceptionCode, ExceptionContext, ExceptionDisposition, ExceptionFlags,
        ExceptionInformation, ExceptionRecord,
    },
    region::{TrackedRegion, TrackedRegions},
};
