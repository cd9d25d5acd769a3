use hwdbg_arch_amd64::{Dr0, Dr1, Dr2, Dr3, Dr6, Dr7, Registers, Rflags};
use windows_sys::Win32::System::Diagnostics::Debug::{
    CONTEXT, CONTEXT_DEBUG_REGISTERS_X86, CONTEXT_FLAGS, CONTEXT_FULL_X86,
};

/// Flags used when reading a thread context.
pub(crate) const CONTEXT_READ: CONTEXT_FLAGS = CONTEXT_FULL_X86 | CONTEXT_DEBUG_REGISTERS_X86;

/// Flags used when writing a thread context; only the debug registers are
/// written.
pub(crate) const CONTEXT_WRITE: CONTEXT_FLAGS = CONTEXT_DEBUG_REGISTERS_X86;

pub(crate) fn registers_from_context(context: &CONTEXT) -> Registers {
    Registers {
        rax: u64::from(context.Eax),
        rbx: u64::from(context.Ebx),
        rcx: u64::from(context.Ecx),
        rdx: u64::from(context.Edx),
        rbp: u64::from(context.Ebp),
        rsi: u64::from(context.Esi),
        rdi: u64::from(context.Edi),
        rsp: u64::from(context.Esp),
        rip: u64::from(context.Eip),
        rflags: Rflags(u64::from(context.EFlags)),
        dr0: Dr0(u64::from(context.Dr0)),
        dr1: Dr1(u64::from(context.Dr1)),
        dr2: Dr2(u64::from(context.Dr2)),
        dr3: Dr3(u64::from(context.Dr3)),
        dr6: Dr6(u64::from(context.Dr6)),
        dr7: Dr7(u64::from(context.Dr7)),
        ..Default::default()
    }
}

pub(crate) fn apply_registers(context: &mut CONTEXT, registers: &Registers) {
    context.Eax = registers.rax as u32;
    context.Ebx = registers.rbx as u32;
    context.Ecx = registers.rcx as u32;
    context.Edx = registers.rdx as u32;
    context.Ebp = registers.rbp as u32;
    context.Esi = registers.rsi as u32;
    context.Edi = registers.rdi as u32;
    context.Esp = registers.rsp as u32;
    context.Eip = registers.rip as u32;
    context.EFlags = registers.rflags.0 as u32;
    context.Dr0 = registers.dr0.0 as u32;
    context.Dr1 = registers.dr1.0 as u32;
    context.Dr2 = registers.dr2.0 as u32;
    context.Dr3 = registers.dr3.0 as u32;
    context.Dr6 = registers.dr6.0 as u32;
    context.Dr7 = registers.dr7.0 as u32;
}

pub(crate) fn read_timestamp_counter() -> u64 {
    #[allow(unused_unsafe)]
    unsafe {
        std::arch::x86::_rdtsc()
    }
}
