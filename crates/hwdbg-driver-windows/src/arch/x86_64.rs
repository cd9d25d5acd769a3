use hwdbg_arch_amd64::{Dr0, Dr1, Dr2, Dr3, Dr6, Dr7, Registers, Rflags};
use windows_sys::Win32::System::Diagnostics::Debug::{
    CONTEXT, CONTEXT_DEBUG_REGISTERS_AMD64, CONTEXT_FLAGS, CONTEXT_FULL_AMD64,
};

/// Flags used when reading a thread context.
pub(crate) const CONTEXT_READ: CONTEXT_FLAGS = CONTEXT_FULL_AMD64 | CONTEXT_DEBUG_REGISTERS_AMD64;

/// Flags used when writing a thread context; only the debug registers are
/// written.
pub(crate) const CONTEXT_WRITE: CONTEXT_FLAGS = CONTEXT_DEBUG_REGISTERS_AMD64;

pub(crate) fn registers_from_context(context: &CONTEXT) -> Registers {
    Registers {
        rax: context.Rax,
        rbx: context.Rbx,
        rcx: context.Rcx,
        rdx: context.Rdx,
        rbp: context.Rbp,
        rsi: context.Rsi,
        rdi: context.Rdi,
        rsp: context.Rsp,
        r8: context.R8,
        r9: context.R9,
        r10: context.R10,
        r11: context.R11,
        r12: context.R12,
        r13: context.R13,
        r14: context.R14,
        r15: context.R15,
        rip: context.Rip,
        rflags: Rflags(u64::from(context.EFlags)),
        dr0: Dr0(context.Dr0),
        dr1: Dr1(context.Dr1),
        dr2: Dr2(context.Dr2),
        dr3: Dr3(context.Dr3),
        dr6: Dr6(context.Dr6),
        dr7: Dr7(context.Dr7),
    }
}

pub(crate) fn apply_registers(context: &mut CONTEXT, registers: &Registers) {
    context.Rax = registers.rax;
    context.Rbx = registers.rbx;
    context.Rcx = registers.rcx;
    context.Rdx = registers.rdx;
    context.Rbp = registers.rbp;
    context.Rsi = registers.rsi;
    context.Rdi = registers.rdi;
    context.Rsp = registers.rsp;
    context.R8 = registers.r8;
    context.R9 = registers.r9;
    context.R10 = registers.r10;
    context.R11 = registers.r11;
    context.R12 = registers.r12;
    context.R13 = registers.r13;
    context.R14 = registers.r14;
    context.R15 = registers.r15;
    context.Rip = registers.rip;
    context.EFlags = registers.rflags.0 as u32;
    context.Dr0 = registers.dr0.0;
    context.Dr1 = registers.dr1.0;
    context.Dr2 = registers.dr2.0;
    context.Dr3 = registers.dr3.0;
    context.Dr6 = registers.dr6.0;
    context.Dr7 = registers.dr7.0;
}

pub(crate) fn read_timestamp_counter() -> u64 {
    #[allow(unused_unsafe)]
    unsafe {
        std::arch::x86_64::_rdtsc()
    }
}
