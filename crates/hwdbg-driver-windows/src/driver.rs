use std::{ffi::c_void, ptr};

use hwdbg_arch_amd64::Registers;
use hwdbg_core::{ImageRange, ThreadId, Va};
use windows_sys::Win32::{
    Foundation::{CloseHandle, DUPLICATE_SAME_ACCESS, DuplicateHandle, HANDLE, HMODULE},
    System::{
        Diagnostics::Debug::{
            CONTEXT, FlushInstructionCache, GetThreadContext, ReadProcessMemory, SetThreadContext,
        },
        LibraryLoader::{
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS, GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            GetModuleHandleExW, GetModuleHandleW,
        },
        Memory::{PAGE_EXECUTE_READWRITE, PAGE_GUARD, VirtualProtect},
        ProcessStatus::{GetModuleInformation, MODULEINFO},
        Threading::{
            GetCurrentProcess, GetCurrentThread, GetCurrentThreadId, GetCurrentThreadStackLimits,
            OpenThread, THREAD_ALL_ACCESS,
        },
    },
};

use crate::{Error, arch};

/// An owned Win32 thread handle, closed on drop.
#[derive(Debug)]
pub struct ThreadHandle(HANDLE);

// SAFETY: a thread handle is a process-wide kernel object reference and can
// be used from any thread.
unsafe impl Send for ThreadHandle {}
unsafe impl Sync for ThreadHandle {}

impl Drop for ThreadHandle {
    fn drop(&mut self) {
        // SAFETY: the handle was obtained by `DuplicateHandle` or
        // `OpenThread` and is owned by this value.
        unsafe { CloseHandle(self.0) };
    }
}

/// Win32 implementation of the driver operations.
pub struct Win32Driver {
    system: ImageRange,
    image: Option<ImageRange>,
}

impl Win32Driver {
    pub fn new() -> Result<Self, Error> {
        let system = module_range(system_module()?)?;

        let image = own_module().and_then(module_range);
        if let Err(err) = &image {
            tracing::warn!(%err, "failed to locate own image");
        }

        Ok(Self {
            system,
            image: image.ok(),
        })
    }

    pub fn current_thread_id(&self) -> ThreadId {
        // SAFETY: no preconditions.
        ThreadId(unsafe { GetCurrentThreadId() })
    }

    pub fn duplicate_current_thread(&self) -> Result<ThreadHandle, Error> {
        let mut handle = ptr::null_mut();

        // SAFETY: the pseudo handles are always valid, `handle` is a valid
        // out pointer.
        let success = unsafe {
            let process = GetCurrentProcess();
            DuplicateHandle(
                process,
                GetCurrentThread(),
                process,
                &mut handle,
                0,
                0,
                DUPLICATE_SAME_ACCESS,
            )
        };

        if success == 0 {
            return Err(Error::last_os_error());
        }

        Ok(ThreadHandle(handle))
    }

    pub fn open_thread(&self, thread_id: ThreadId) -> Result<ThreadHandle, Error> {
        // SAFETY: no preconditions.
        let handle = unsafe { OpenThread(THREAD_ALL_ACCESS, 0, thread_id.0) };

        if handle.is_null() {
            return Err(Error::last_os_error());
        }

        Ok(ThreadHandle(handle))
    }

    pub fn thread_context(&self, thread: &ThreadHandle) -> Result<Registers, Error> {
        // SAFETY: `CONTEXT` is plain data.
        let mut context: CONTEXT = unsafe { std::mem::zeroed() };
        context.ContextFlags = arch::CONTEXT_READ;

        // SAFETY: `context` is a valid, aligned `CONTEXT`.
        if unsafe { GetThreadContext(thread.0, &mut context) } == 0 {
            return Err(Error::last_os_error());
        }

        Ok(arch::registers_from_context(&context))
    }

    pub fn set_thread_context(
        &self,
        thread: &ThreadHandle,
        registers: &Registers,
    ) -> Result<(), Error> {
        // SAFETY: `CONTEXT` is plain data.
        let mut context: CONTEXT = unsafe { std::mem::zeroed() };
        arch::apply_registers(&mut context, registers);
        context.ContextFlags = arch::CONTEXT_WRITE;

        // SAFETY: `context` is a valid, aligned `CONTEXT`.
        if unsafe { SetThreadContext(thread.0, &context) } == 0 {
            return Err(Error::last_os_error());
        }

        Ok(())
    }

    pub fn read_memory(&self, address: Va, buffer: &mut [u8]) -> Result<(), Error> {
        let mut read = 0;

        // SAFETY: `ReadProcessMemory` validates the source range, `buffer`
        // is a valid destination of `buffer.len()` bytes.
        let success = unsafe {
            ReadProcessMemory(
                GetCurrentProcess(),
                address.0 as usize as *const c_void,
                buffer.as_mut_ptr().cast(),
                buffer.len(),
                &mut read,
            )
        };

        if success == 0 {
            return Err(Error::last_os_error());
        }

        if read != buffer.len() {
            return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }

        Ok(())
    }

    pub fn write_code(&self, address: Va, content: &[u8]) -> Result<(), Error> {
        let target = address.0 as usize as *mut u8;
        let mut protection = 0;

        // SAFETY: `VirtualProtect` validates the range.
        if unsafe {
            VirtualProtect(
                target.cast(),
                content.len(),
                PAGE_EXECUTE_READWRITE,
                &mut protection,
            )
        } == 0
        {
            return Err(Error::last_os_error());
        }

        // SAFETY: the range was just made writable.
        unsafe {
            ptr::copy_nonoverlapping(content.as_ptr(), target, content.len());
            VirtualProtect(target.cast(), content.len(), protection, &mut protection);
            FlushInstructionCache(GetCurrentProcess(), target.cast(), content.len());
        }

        Ok(())
    }

    pub fn protect_guard_page(&self, address: Va, protection: u32) -> Result<(), Error> {
        let mut old = 0;

        // SAFETY: `VirtualProtect` validates the range.
        if unsafe {
            VirtualProtect(
                address.0 as usize as *const c_void,
                1,
                protection | PAGE_GUARD,
                &mut old,
            )
        } == 0
        {
            return Err(Error::last_os_error());
        }

        Ok(())
    }

    pub fn read_timestamp_counter(&self) -> u64 {
        arch::read_timestamp_counter()
    }

    pub fn is_system_address(&self, address: Va) -> bool {
        self.system.contains(address)
    }

    pub fn image_range(&self) -> Option<ImageRange> {
        self.image
    }

    pub fn is_stack_address(&self, address: Va) -> bool {
        let mut low = 0;
        let mut high = 0;

        // SAFETY: both out pointers are valid.
        unsafe { GetCurrentThreadStackLimits(&mut low, &mut high) };

        (low as u64..high as u64).contains(&address.0)
    }
}

fn system_module() -> Result<HMODULE, Error> {
    let name = "ntdll.dll\0".encode_utf16().collect::<Vec<_>>();

    // SAFETY: `name` is NUL-terminated.
    let module = unsafe { GetModuleHandleW(name.as_ptr()) };
    if module.is_null() {
        return Err(Error::ModuleNotFound("ntdll.dll"));
    }

    Ok(module)
}

fn own_module() -> Result<HMODULE, Error> {
    let mut module = ptr::null_mut();

    // SAFETY: with `FROM_ADDRESS`, the name argument is an address inside
    // the module; `module` is a valid out pointer.
    let success = unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            own_module as *const () as *const u16,
            &mut module,
        )
    };

    if success == 0 {
        return Err(Error::last_os_error());
    }

    Ok(module)
}

fn module_range(module: HMODULE) -> Result<ImageRange, Error> {
    // SAFETY: `MODULEINFO` is plain data.
    let mut info: MODULEINFO = unsafe { std::mem::zeroed() };

    // SAFETY: `info` is a valid out pointer of the given size.
    let success = unsafe {
        GetModuleInformation(
            GetCurrentProcess(),
            module,
            &mut info,
            size_of::<MODULEINFO>() as u32,
        )
    };

    if success == 0 {
        return Err(Error::last_os_error());
    }

    Ok(ImageRange::new(
        Va(info.lpBaseOfDll as usize as u64),
        u64::from(info.SizeOfImage),
    ))
}
