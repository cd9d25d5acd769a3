use hwdbg_core::DebuggerError;

/// Error type for the Windows driver.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A Win32 call failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A module required by the driver is not loaded.
    #[error("module {0} not found")]
    ModuleNotFound(&'static str),

    /// The exception handler is already installed.
    #[error("exception handler already installed")]
    AlreadyInstalled,
}

impl Error {
    /// Captures the calling thread's last Win32 error.
    pub(crate) fn last_os_error() -> Self {
        Self::Io(std::io::Error::last_os_error())
    }
}

impl From<Error> for DebuggerError {
    fn from(value: Error) -> Self {
        match value {
            Error::Io(value) => Self::Io(value),
            value => Self::Driver(Box::new(value)),
        }
    }
}
