use hwdbg_arch_amd64::{BreakpointKind, Registers};
use hwdbg_core::{DebuggerConfig, DebuggerError, ThreadId, Va};

use super::{config, mock::MockDriver, new_debugger};

const MAIN: ThreadId = MockDriver::MAIN;

#[test]
fn initialize_registers_main_thread() {
    let debugger = new_debugger(config());

    assert_eq!(debugger.main_thread_id(), Some(MAIN));
    assert!(debugger.manager().registry().is_active());
    assert_eq!(debugger.manager().registry().len(), 1);
    assert_eq!(debugger.manager().driver().state().wow64_fixes, 0);
}

#[test]
fn initialize_installs_wow64_fix() {
    let debugger = new_debugger(DebuggerConfig {
        wow64: true,
        ..config()
    });

    assert_eq!(debugger.manager().driver().state().wow64_fixes, 1);
}

#[test]
fn new_threads_inherit_breakpoints() -> Result<(), DebuggerError> {
    let debugger = new_debugger(config());
    let manager = debugger.manager();

    manager.set_next_available(MAIN, 8, Va(0x60_0000), BreakpointKind::ReadWrite, 0, None)?;

    for thread_id in [ThreadId(200), ThreadId(300)] {
        manager.driver().spawn(thread_id);
        debugger.on_new_thread(thread_id)?;

        let live = manager.driver().registers(thread_id);
        assert_eq!(live.dr0.0, 0x60_0000);
        assert!(live.dr7.local_breakpoint(0));
    }

    // Breakpoints set on a secondary thread are not inherited.
    manager.set(ThreadId(300), 1, 1, Va(0x40_1000), BreakpointKind::Execute, 0, None)?;
    manager.driver().spawn(ThreadId(400));
    debugger.on_new_thread(ThreadId(400))?;
    assert!(!manager.is_armed_live(ThreadId(400), 1)?);

    assert_eq!(manager.registry().thread_ids()[0], MAIN);
    Ok(())
}

#[test]
fn freed_region_loses_its_breakpoints() -> Result<(), DebuggerError> {
    let debugger = new_debugger(config());
    let manager = debugger.manager();

    manager.set(MAIN, 0, 4, Va(0x50_0010), BreakpointKind::Write, 0, None)?;
    manager.set(MAIN, 1, 4, Va(0x50_1000), BreakpointKind::Write, 0, None)?;

    debugger.on_region_freed(Va(0x50_0000), 0x1000)?;

    assert!(!manager.is_armed_live(MAIN, 0)?);
    assert!(manager.is_armed_live(MAIN, 1)?);
    Ok(())
}

#[test]
fn continue_restores_wiped_context() -> Result<(), DebuggerError> {
    let debugger = new_debugger(config());

    let mut wiped = Registers::default();
    assert!(!debugger.on_continue(&mut wiped));

    debugger
        .manager()
        .set(MAIN, 2, 2, Va(0x7000), BreakpointKind::Write, 0, None)?;

    assert!(debugger.on_continue(&mut wiped));
    assert_eq!(wiped.dr2.0, 0x7000);
    assert_eq!(wiped.dr7.0, debugger.manager().driver().registers(MAIN).dr7.0);
    Ok(())
}

#[test]
fn shutdown_clears_every_thread() -> Result<(), DebuggerError> {
    let debugger = new_debugger(config());
    let manager = debugger.manager();
    let other = ThreadId(200);

    manager.set(MAIN, 0, 1, Va(0x40_1000), BreakpointKind::Execute, 0, None)?;
    manager.driver().spawn(other);
    debugger.on_new_thread(other)?;
    manager.single_step().start_trace();

    debugger.shutdown()?;

    assert_eq!(manager.driver().registers(MAIN), Registers::default());
    assert_eq!(manager.driver().registers(other), Registers::default());
    assert!(!manager.registry().is_active());
    assert!(!manager.single_step().is_tracing());

    let mut wiped = Registers::default();
    assert!(!debugger.on_continue(&mut wiped));
    Ok(())
}
