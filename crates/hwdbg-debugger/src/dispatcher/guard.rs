use std::sync::Arc;

use hwdbg_arch_amd64::Amd64;
use hwdbg_core::{DebuggerDriver, ExceptionContext, ExceptionDisposition};

use super::ExceptionDispatcher;
use crate::BreakpointManager;

/// A handler invoked for guard page violations inside tracked regions.
///
/// Returns `true` if execution should resume, `false` to pass the
/// exception on.
pub type GuardPageHandler<Driver> =
    Arc<dyn Fn(&BreakpointManager<Driver>, &mut ExceptionContext<'_, Amd64>) -> bool + Send + Sync>;

impl<Driver> ExceptionDispatcher<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    /// Handles a guard page violation.
    ///
    /// Only handled while region tracking is enabled. Accesses from system
    /// code re-arm the guard silently; other accesses to tracked regions go
    /// to the guard page handler.
    pub(super) fn dispatch_guard_page(
        &self,
        context: &mut ExceptionContext<'_, Amd64>,
    ) -> ExceptionDisposition {
        let manager = &self.manager;

        if !manager.registry().is_active() || !manager.config().unpacker {
            tracing::debug!("guard page violation, passing");
            return ExceptionDisposition::ContinueSearch;
        }

        let Some(accessed) = context.record.accessed_address()
        else {
            tracing::debug!("guard page violation without parameters, passing");
            return ExceptionDisposition::ContinueSearch;
        };

        let region = self
            .regions
            .as_ref()
            .and_then(|regions| regions.lookup(accessed));

        let Some(region) = region
        else {
            tracing::debug!(%accessed, "guard page violation outside tracked regions");
            return ExceptionDisposition::ContinueExecution;
        };

        let instruction = context.record.address;
        if manager.driver().is_system_address(instruction) {
            if let Err(err) = manager
                .driver()
                .protect_guard_page(accessed, region.protection)
            {
                tracing::error!(%err, %accessed, %instruction, "failed to re-arm guard page");
            }

            return ExceptionDisposition::ContinueExecution;
        }

        let Some(handler) = &self.guard_page_handler
        else {
            tracing::error!(%accessed, base = %region.base, "no guard page handler installed");
            return ExceptionDisposition::ContinueExecution;
        };

        if handler(manager, context) {
            ExceptionDisposition::ContinueExecution
        }
        else {
            ExceptionDisposition::ContinueSearch
        }
    }
}
