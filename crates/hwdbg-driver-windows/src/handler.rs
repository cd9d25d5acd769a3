use std::{
    ffi::c_void,
    panic::{self, AssertUnwindSafe},
    ptr,
    sync::{
        OnceLock,
        atomic::{AtomicPtr, Ordering},
    },
};

use hwdbg_core::{ExceptionCode, ExceptionDisposition, ExceptionFlags, ExceptionRecord, Va};
use hwdbg_debugger::Debugger;
use windows_sys::Win32::System::Diagnostics::Debug::{
    AddVectoredExceptionHandler, EXCEPTION_POINTERS, EXCEPTION_RECORD,
    RemoveVectoredExceptionHandler,
};

use crate::{Error, WindowsDriver, arch};

static DEBUGGER: OnceLock<Debugger<WindowsDriver>> = OnceLock::new();
static HANDLER: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

/// Installs the debugger as the first vectored exception handler of the
/// process.
///
/// The debugger lives for the rest of the process; it can be installed
/// only once. If the handler cannot be registered, nothing is installed
/// and the call may be retried.
pub fn install(
    debugger: Debugger<WindowsDriver>,
) -> Result<&'static Debugger<WindowsDriver>, Error> {
    if DEBUGGER.get().is_some() {
        return Err(Error::AlreadyInstalled);
    }

    // The handler passes every exception on until `DEBUGGER` is set.
    //
    // SAFETY: `vectored_handler` matches the expected signature.
    let handle = unsafe { AddVectoredExceptionHandler(1, Some(vectored_handler)) };
    if handle.is_null() {
        return Err(Error::last_os_error());
    }

    let mut fresh = false;
    let debugger = DEBUGGER.get_or_init(|| {
        fresh = true;
        debugger
    });

    if !fresh {
        // SAFETY: `handle` was returned by `AddVectoredExceptionHandler`.
        unsafe { RemoveVectoredExceptionHandler(handle) };
        return Err(Error::AlreadyInstalled);
    }

    HANDLER.store(handle, Ordering::SeqCst);
    tracing::debug!("exception handler installed");

    Ok(debugger)
}

/// Returns the installed debugger.
pub fn installed() -> Option<&'static Debugger<WindowsDriver>> {
    DEBUGGER.get()
}

/// Removes the vectored exception handler.
///
/// The debugger itself stays installed, so that it can still be shut down.
pub fn uninstall() {
    let handle = HANDLER.swap(ptr::null_mut(), Ordering::SeqCst);
    if handle.is_null() {
        return;
    }

    // SAFETY: `handle` was returned by `AddVectoredExceptionHandler`.
    unsafe { RemoveVectoredExceptionHandler(handle) };
    tracing::debug!("exception handler removed");
}

unsafe extern "system" fn vectored_handler(pointers: *mut EXCEPTION_POINTERS) -> i32 {
    let Some(debugger) = DEBUGGER.get()
    else {
        return ExceptionDisposition::ContinueSearch.as_raw();
    };

    // SAFETY: the OS passes valid exception pointers to vectored handlers.
    let Some(pointers) = (unsafe { pointers.as_ref() })
    else {
        return ExceptionDisposition::ContinueSearch.as_raw();
    };

    // SAFETY: see above; the context is exclusively ours while the handler
    // runs.
    let (Some(record), Some(context)) = (unsafe {
        (
            pointers.ExceptionRecord.as_ref(),
            pointers.ContextRecord.as_mut(),
        )
    })
    else {
        return ExceptionDisposition::ContinueSearch.as_raw();
    };

    let record = exception_record(record);
    let mut registers = arch::registers_from_context(context);

    // Unwinding out of this function aborts the process.
    let filtered = panic::catch_unwind(AssertUnwindSafe(|| {
        debugger.filter(&record, &mut registers)
    }));

    match filtered {
        Ok(disposition) => {
            // Exhausted breakpoints are cleared in the image even when the
            // exception is passed on.
            arch::apply_registers(context, &registers);
            disposition.as_raw()
        }
        Err(_) => {
            tracing::error!(
                code = %record.code,
                address = %record.address,
                "exception filter panicked"
            );
            ExceptionDisposition::ContinueSearch.as_raw()
        }
    }
}

fn exception_record(record: &EXCEPTION_RECORD) -> ExceptionRecord {
    let count = (record.NumberParameters as usize).min(record.ExceptionInformation.len());

    ExceptionRecord {
        code: ExceptionCode(record.ExceptionCode as u32),
        flags: ExceptionFlags::from_bits_retain(record.ExceptionFlags),
        address: Va(record.ExceptionAddress as usize as u64),
        information: record.ExceptionInformation[..count]
            .iter()
            .map(|&value| value as u64)
            .collect(),
    }
}
