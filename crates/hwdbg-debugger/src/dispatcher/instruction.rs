use hwdbg_arch_amd64::Amd64;
use hwdbg_core::{
    DebuggerDriver, ExceptionContext, ExceptionDisposition, Hex, Registers as _, Va,
};

use super::ExceptionDispatcher;

impl<Driver> ExceptionDispatcher<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    /// Handles privileged and illegal instruction exceptions.
    ///
    /// `rdtscp` is either replaced with `nop`s or emulated, depending on
    /// the configuration. Returns `None` for any other instruction.
    pub(super) fn dispatch_instruction(
        &self,
        context: &mut ExceptionContext<'_, Amd64>,
    ) -> Option<ExceptionDisposition> {
        let driver = self.manager.driver();
        let rip = Va(context.registers.instruction_pointer());

        let mut code = [0u8; Amd64::RDTSCP.len()];
        if let Err(err) = driver.read_memory(rip, &mut code) {
            tracing::debug!(%err, %rip, "failed to read faulting instruction");
            return None;
        }

        if code.as_slice() != Amd64::RDTSCP {
            tracing::debug!(
                code = %context.record.code,
                %rip,
                bytes = %Hex(&code[..]),
                "unhandled instruction exception"
            );
            return None;
        }

        if self.manager.config().nop_rdtscp {
            match driver.write_code(rip, &[Amd64::NOP; Amd64::RDTSCP.len()]) {
                Ok(()) => {
                    tracing::debug!(%rip, "rdtscp replaced");
                    return Some(ExceptionDisposition::ContinueExecution);
                }
                Err(err) => tracing::warn!(%err, %rip, "failed to replace rdtscp, emulating"),
            }
        }

        let timestamp = driver.read_timestamp_counter();
        let registers = &mut *context.registers;
        registers.rax = timestamp & 0xffff_ffff;
        registers.rdx = timestamp >> 32;
        registers.set_instruction_pointer(rip.0 + Amd64::RDTSCP.len() as u64);

        tracing::trace!(%rip, "rdtscp emulated");
        Some(ExceptionDisposition::ContinueExecution)
    }
}
