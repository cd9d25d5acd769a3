use serde::{Deserialize, Serialize};

/// Debugger configuration.
///
/// The configuration is parsed by the host and handed over when the
/// debugger is initialized. Every option defaults to the conservative
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    /// Also enable branch tracing (Dr7 LE/GE) when single-step mode is set.
    pub branch_trace: bool,

    /// Overwrite trapped `rdtscp` instructions with `nop`s instead of
    /// emulating them.
    pub nop_rdtscp: bool,

    /// The monitored process is a 32-bit process running under WoW64.
    ///
    /// Enables the stack breakpoint workaround and the live debug register
    /// type checks in the exception dispatcher.
    pub wow64: bool,

    /// Guard-page based region tracking is active.
    pub unpacker: bool,

    /// Suppress the per-hit breakpoint log lines.
    pub quiet: bool,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            branch_trace: false,
            nop_rdtscp: false,
            wow64: cfg!(target_pointer_width = "32"),
            unpacker: false,
            quiet: false,
        }
    }
}
