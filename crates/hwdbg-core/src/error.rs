use crate::ThreadId;

/// The thread context operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextOperation {
    /// Reading the register state of a thread.
    Get,

    /// Writing the register state of a thread.
    Set,
}

impl std::fmt::Display for ContextOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Set => write!(f, "set"),
        }
    }
}

/// An error that can occur when managing hardware breakpoints.
#[derive(thiserror::Error, Debug)]
pub enum DebuggerError {
    /// An error occurred in the OS driver.
    #[error(transparent)]
    Driver(Box<dyn std::error::Error + Send + Sync>),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The register index is outside of the hardware range (0-3).
    #[error("{0} is an invalid register, must be 0-3")]
    InvalidRegister(u8),

    /// The breakpoint size is not one of 1, 2, 4 or 8 bytes.
    #[error("{0} is an invalid size, must be 1, 2, 4 or 8")]
    InvalidSize(u8),

    /// The breakpoint condition uses the reserved hardware encoding.
    #[error("the value 2 is a reserved breakpoint type")]
    ReservedCondition,

    /// The breakpoint condition is outside of the hardware encoding.
    #[error("{0} is an invalid breakpoint type, must be 0-3")]
    InvalidCondition(u8),

    /// A breakpoint cannot be armed on a NULL address.
    #[error("breakpoint address is zero")]
    NullAddress,

    /// An address range with zero size was supplied.
    #[error("address range is empty")]
    EmptyRange,

    /// A handle for the thread could not be obtained.
    #[error("failed to obtain a handle for thread {0}")]
    ThreadHandle(ThreadId),

    /// Reading or writing the thread context failed.
    #[error("failed to {operation} the context of thread {thread_id}")]
    ThreadContext {
        /// The thread whose context was accessed.
        thread_id: ThreadId,

        /// The operation that failed.
        operation: ContextOperation,
    },

    /// All hardware breakpoint registers of the thread are in use.
    #[error("no available breakpoint for thread {0}")]
    NoAvailableBreakpoint(ThreadId),

    /// The thread has no breakpoint table.
    #[error("no breakpoints found for thread {0}")]
    UnknownThread(ThreadId),

    /// The debugger has not been initialized.
    #[error("the debugger has not been initialized")]
    NotInitialized,

    /// Other error.
    #[error("{0}")]
    Other(&'static str),
}

impl DebuggerError {
    /// Creates an error for a failed get-context call.
    pub fn get_context(thread_id: ThreadId) -> Self {
        Self::ThreadContext {
            thread_id,
            operation: ContextOperation::Get,
        }
    }

    /// Creates an error for a failed set-context call.
    pub fn set_context(thread_id: ThreadId) -> Self {
        Self::ThreadContext {
            thread_id,
            operation: ContextOperation::Set,
        }
    }

    /// Checks if the error was caused by an invalid argument.
    ///
    /// Such errors are raised before any state is mutated.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidRegister(_)
                | Self::InvalidSize(_)
                | Self::ReservedCondition
                | Self::InvalidCondition(_)
                | Self::NullAddress
                | Self::EmptyRange
        )
    }
}
