use smallvec::SmallVec;

use crate::{Architecture, Va};

/// A structured exception code (`NTSTATUS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExceptionCode(pub u32);

#[expect(non_upper_case_globals)]
impl ExceptionCode {
    /// `STATUS_GUARD_PAGE_VIOLATION`.
    ///
    /// # Source
    ///
    /// Access to a page protected with the guard modifier.
    pub const GuardPageViolation: Self = Self(0x8000_0001);

    /// `STATUS_BREAKPOINT`.
    ///
    /// # Source
    ///
    /// INT3 instruction.
    pub const Breakpoint: Self = Self(0x8000_0003);

    /// `STATUS_SINGLE_STEP`.
    ///
    /// # Source
    ///
    /// Trap flag single-step or a hardware breakpoint condition.
    pub const SingleStep: Self = Self(0x8000_0004);

    /// `STATUS_ACCESS_VIOLATION`.
    ///
    /// # Source
    ///
    /// Any data reference to an inaccessible address.
    pub const AccessViolation: Self = Self(0xC000_0005);

    /// `STATUS_ILLEGAL_INSTRUCTION`.
    ///
    /// # Source
    ///
    /// UD instruction or an opcode unsupported by the processor.
    pub const IllegalInstruction: Self = Self(0xC000_001D);

    /// `STATUS_PRIVILEGED_INSTRUCTION`.
    ///
    /// # Source
    ///
    /// An instruction not permitted at the current privilege level.
    pub const PrivilegedInstruction: Self = Self(0xC000_0096);
}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

bitflags::bitflags! {
    /// Flags of an exception record.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionFlags: u32 {
        /// The exception is not continuable.
        const NONCONTINUABLE = 1 << 0;

        /// The exception is being unwound.
        const UNWINDING = 1 << 1;

        /// The exit unwind is in progress.
        const EXIT_UNWIND = 1 << 2;

        /// The exception was raised while dispatching another one.
        const NESTED_CALL = 1 << 4;
    }
}

/// Additional parameters attached to an exception by the OS.
pub type ExceptionInformation = SmallVec<[u64; 2]>;

/// A description of an exception raised in the monitored process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRecord {
    /// The exception code.
    pub code: ExceptionCode,

    /// Flags associated with the exception.
    pub flags: ExceptionFlags,

    /// The address where the exception occurred.
    pub address: Va,

    /// Exception-specific parameters.
    ///
    /// For access violations and guard page violations, the first element
    /// describes the access type and the second the accessed address.
    pub information: ExceptionInformation,
}

impl ExceptionRecord {
    /// Creates a new exception record without parameters.
    pub fn new(code: ExceptionCode, address: Va) -> Self {
        Self {
            code,
            flags: ExceptionFlags::empty(),
            address,
            information: ExceptionInformation::new(),
        }
    }

    /// Adds an exception parameter to the record.
    pub fn with_information(mut self, value: u64) -> Self {
        self.information.push(value);
        self
    }

    /// Returns the accessed address of a memory access exception.
    pub fn accessed_address(&self) -> Option<Va> {
        self.information.get(1).copied().map(Va)
    }
}

/// An exception together with the register image of the faulting thread.
///
/// Modifications of the registers take effect once the dispatcher returns
/// [`ExceptionDisposition::ContinueExecution`] and the OS resumes the
/// thread with the (possibly modified) context.
pub struct ExceptionContext<'a, Arch>
where
    Arch: Architecture + ?Sized,
{
    /// The exception record.
    pub record: &'a ExceptionRecord,

    /// The register image of the faulting thread.
    pub registers: &'a mut Arch::Registers,
}

impl<'a, Arch> ExceptionContext<'a, Arch>
where
    Arch: Architecture + ?Sized,
{
    /// Creates a new exception context.
    pub fn new(record: &'a ExceptionRecord, registers: &'a mut Arch::Registers) -> Self {
        Self { record, registers }
    }
}

/// The verdict of an exception filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionDisposition {
    /// The exception was handled; resume the thread with the
    /// (possibly modified) context.
    ContinueExecution,

    /// The exception was not handled; pass it to the next handler.
    ContinueSearch,
}

impl ExceptionDisposition {
    /// Returns the raw value expected by the OS exception dispatcher.
    pub fn as_raw(self) -> i32 {
        match self {
            Self::ContinueExecution => -1,
            Self::ContinueSearch => 0,
        }
    }

    /// Checks if the exception was handled.
    pub fn is_handled(self) -> bool {
        self == Self::ContinueExecution
    }
}
