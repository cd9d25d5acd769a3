use std::sync::{Arc, atomic::AtomicUsize};

use hwdbg_arch_amd64::{BreakpointCondition, BreakpointKind, BreakpointLength, Dr0, Dr6, Registers};
use hwdbg_core::{ContextOperation, DebuggerConfig, DebuggerError, ThreadId, Va};

use super::{config, count, counting_callback, mock::MockDriver, new_manager};

const MAIN: ThreadId = MockDriver::MAIN;

///////////////////////////////////////////////////////////////////////////////
// Set
///////////////////////////////////////////////////////////////////////////////

#[test]
fn set_commits_to_live_registers() -> Result<(), DebuggerError> {
    let manager = new_manager(config());

    manager.set(MAIN, 1, 4, Va(0x1000), BreakpointKind::Write, 0, None)?;

    let live = manager.driver().registers(MAIN);
    assert_eq!(live.dr1.0, 0x1000);
    assert_eq!(live.dr7.0, (1 << 2) | (0b01 << 20) | (0b11 << 22));

    let slots = manager
        .thread_breakpoints(MAIN)
        .ok_or(DebuggerError::UnknownThread(MAIN))?;
    assert!(slots[1].is_armed());
    assert_eq!(slots[1].address(), Va(0x1000));
    assert_eq!(slots[1].size(), 4);
    assert_eq!(slots[1].kind(), BreakpointKind::Write);
    assert!(!slots[0].is_armed());

    assert_eq!(manager.driver().state().set_context_calls, 1);
    assert!(manager.registry().is_active());
    Ok(())
}

#[test]
fn invalid_arguments_change_nothing() {
    let manager = new_manager(config());

    assert!(matches!(
        manager.set(MAIN, 4, 4, Va(0x1000), BreakpointKind::Write, 0, None),
        Err(DebuggerError::InvalidRegister(4))
    ));
    assert!(matches!(
        manager.set(MAIN, 0, 3, Va(0x1000), BreakpointKind::Write, 0, None),
        Err(DebuggerError::InvalidSize(3))
    ));
    assert!(matches!(
        manager.set(MAIN, 0, 4, Va(0), BreakpointKind::ReadWrite, 0, None),
        Err(DebuggerError::NullAddress)
    ));
    assert!(matches!(
        manager.set_next_available(MAIN, 16, Va(0x1000), BreakpointKind::ReadWrite, 0, None),
        Err(DebuggerError::InvalidSize(16))
    ));
    assert!(matches!(
        manager.set_next_available(MAIN, 1, Va(0), BreakpointKind::Execute, 0, None),
        Err(DebuggerError::NullAddress)
    ));

    let errors = [
        manager.set(MAIN, 7, 4, Va(0x1000), BreakpointKind::Write, 0, None),
        manager.set(MAIN, 0, 0, Va(0x1000), BreakpointKind::Write, 0, None),
        manager.clear_in_range(Va(0x1000), 0),
    ];
    for result in errors {
        assert!(result.is_err_and(|err| err.is_invalid_argument()));
    }
    assert!(!DebuggerError::NoAvailableBreakpoint(MAIN).is_invalid_argument());

    assert!(manager.registry().is_empty());
    assert_eq!(manager.driver().state().get_context_calls, 0);
    assert_eq!(manager.driver().registers(MAIN), Registers::default());
}

#[test]
fn execute_breakpoint_ignores_size() -> Result<(), DebuggerError> {
    let manager = new_manager(config());

    manager.set(MAIN, 0, 3, Va(0x40_1000), BreakpointKind::Execute, 0, None)?;

    let live = manager.driver().registers(MAIN);
    assert_eq!(live.dr7.length(0), BreakpointLength::Byte);
    assert_eq!(live.dr7.condition(0), BreakpointCondition::Execution);
    assert!(live.dr7.local_breakpoint(0));
    Ok(())
}

#[test]
fn set_next_available_is_idempotent() -> Result<(), DebuggerError> {
    let manager = new_manager(config());

    let first = manager.set_next_available(MAIN, 4, Va(0x2000), BreakpointKind::Write, 0, None)?;
    let second = manager.set_next_available(MAIN, 4, Va(0x2000), BreakpointKind::Write, 0, None)?;

    assert_eq!(first, 0);
    assert_eq!(second, 0);
    assert_eq!(manager.driver().state().set_context_calls, 1);

    // A different hit count makes it a different breakpoint.
    let third = manager.set_next_available(MAIN, 4, Va(0x2000), BreakpointKind::Write, 5, None)?;
    assert_eq!(third, 1);
    Ok(())
}

#[test]
fn capacity_is_four_per_thread() -> Result<(), DebuggerError> {
    let manager = new_manager(config());

    for (index, address) in [0x1000, 0x2000, 0x3000, 0x4000].into_iter().enumerate() {
        let slot =
            manager.set_next_available(MAIN, 1, Va(address), BreakpointKind::ReadWrite, 0, None)?;
        assert_eq!(slot, index as u8);
    }

    let before = manager.driver().registers(MAIN);

    assert!(matches!(
        manager.set_next_available(MAIN, 1, Va(0x5000), BreakpointKind::ReadWrite, 0, None),
        Err(DebuggerError::NoAvailableBreakpoint(MAIN))
    ));
    assert_eq!(manager.driver().registers(MAIN), before);
    assert_eq!(manager.next_available(MAIN)?, None);
    Ok(())
}

#[test]
fn failed_commit_leaves_slot_unarmed() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    manager.driver().state().fail_set_context.insert(MAIN);

    let result = manager.set(MAIN, 0, 1, Va(0x1000), BreakpointKind::Execute, 0, None);
    assert!(matches!(
        result,
        Err(DebuggerError::ThreadContext {
            thread_id: MAIN,
            operation: ContextOperation::Set
        })
    ));

    assert_eq!(manager.next_available(MAIN)?, Some(0));
    Ok(())
}

#[test]
fn missing_thread_handle_creates_no_table() {
    let manager = new_manager(config());
    let ghost = ThreadId(7);

    assert!(matches!(
        manager.set(ghost, 0, 1, Va(0x1000), BreakpointKind::Execute, 0, None),
        Err(DebuggerError::ThreadHandle(thread_id)) if thread_id == ghost
    ));
    assert!(manager.registry().find(ghost).is_none());
}

#[test]
fn set_on_all_threads_reaches_every_table() -> Result<(), DebuggerError> {
    let manager = new_manager(config());

    assert!(matches!(
        manager.set_on_all_threads(1, 4, Va(0x7000), BreakpointKind::Write, 0, None),
        Err(DebuggerError::NotInitialized)
    ));

    let threads = [MAIN, ThreadId(200), ThreadId(300)];
    for thread_id in threads {
        manager.driver().spawn(thread_id);
        manager.next_available(thread_id)?;
    }

    manager.set_on_all_threads(1, 4, Va(0x7000), BreakpointKind::Write, 0, None)?;
    for thread_id in threads {
        assert_eq!(manager.driver().registers(thread_id).dr1.0, 0x7000);
    }

    manager.clear_on_all_threads(1)?;
    for thread_id in threads {
        let live = manager.driver().registers(thread_id);
        assert_eq!(live.dr1.0, 0);
        assert_eq!(live.dr7.0, 0);
    }

    Ok(())
}

///////////////////////////////////////////////////////////////////////////////
// Clear
///////////////////////////////////////////////////////////////////////////////

#[test]
fn clear_keeps_callback() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    let counter = Arc::new(AtomicUsize::new(0));

    manager.set(
        MAIN,
        2,
        8,
        Va(0x3000),
        BreakpointKind::ReadWrite,
        0,
        Some(counting_callback(&counter)),
    )?;
    manager.clear(MAIN, 2)?;

    let live = manager.driver().registers(MAIN);
    assert_eq!(live.dr2.0, 0);
    assert_eq!(live.dr7.0, 0);

    let slots = manager
        .thread_breakpoints(MAIN)
        .ok_or(DebuggerError::UnknownThread(MAIN))?;
    assert!(!slots[2].is_armed());
    assert!(slots[2].callback().is_some());

    assert!(manager.remove_callback(MAIN, 2)?.is_some());
    assert!(manager.remove_callback(MAIN, 2)?.is_none());
    assert_eq!(count(&counter), 0);
    Ok(())
}

#[test]
fn clear_twice_is_harmless() -> Result<(), DebuggerError> {
    let manager = new_manager(config());

    manager.set(MAIN, 0, 1, Va(0x1000), BreakpointKind::Execute, 0, None)?;
    manager.set(MAIN, 3, 2, Va(0x2000), BreakpointKind::Write, 0, None)?;

    manager.clear(MAIN, 0)?;
    let once = manager.driver().registers(MAIN);
    manager.clear(MAIN, 0)?;

    assert_eq!(manager.driver().registers(MAIN), once);
    assert!(once.dr7.local_breakpoint(3));
    Ok(())
}

#[test]
fn clear_unknown_thread() {
    let manager = new_manager(config());

    assert!(matches!(
        manager.clear(ThreadId(9), 0),
        Err(DebuggerError::UnknownThread(ThreadId(9)))
    ));
    assert!(matches!(
        manager.is_armed_live(ThreadId(9), 0),
        Err(DebuggerError::UnknownThread(ThreadId(9)))
    ));
}

#[test]
fn clear_in_range_only_touches_overlapping_breakpoints() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    let other = ThreadId(200);
    manager.driver().spawn(other);

    manager.set(MAIN, 0, 4, Va(0x10_0000), BreakpointKind::Write, 0, None)?;
    manager.set(MAIN, 1, 4, Va(0x20_0000), BreakpointKind::Write, 0, None)?;
    manager.set(other, 3, 1, Va(0x10_0800), BreakpointKind::ReadWrite, 0, None)?;

    manager.clear_in_range(Va(0x10_0000), 0x1000)?;

    let main = manager
        .thread_breakpoints(MAIN)
        .ok_or(DebuggerError::UnknownThread(MAIN))?;
    assert!(!main[0].is_armed());
    assert!(main[1].is_armed());

    let live = manager.driver().registers(MAIN);
    assert_eq!(live.dr0.0, 0);
    assert_eq!(live.dr1.0, 0x20_0000);

    assert!(!manager.is_armed_live(other, 3)?);
    assert_eq!(manager.driver().registers(other).dr3.0, 0);

    assert!(matches!(
        manager.clear_in_range(Va(0x1000), 0),
        Err(DebuggerError::EmptyRange)
    ));
    assert!(matches!(
        manager.clear_in_range(Va(0), 0x1000),
        Err(DebuggerError::NullAddress)
    ));
    Ok(())
}

#[test]
fn clear_in_range_drops_callbacks() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    let counter = Arc::new(AtomicUsize::new(0));

    manager.set(
        MAIN,
        0,
        4,
        Va(0x10_0000),
        BreakpointKind::Write,
        0,
        Some(counting_callback(&counter)),
    )?;
    manager.set(
        MAIN,
        1,
        4,
        Va(0x20_0000),
        BreakpointKind::Write,
        0,
        Some(counting_callback(&counter)),
    )?;

    manager.clear_in_range(Va(0x10_0000), 0x1000)?;

    let slots = manager
        .thread_breakpoints(MAIN)
        .ok_or(DebuggerError::UnknownThread(MAIN))?;
    assert!(!slots[0].is_armed());
    assert!(slots[0].callback().is_none());
    assert!(slots[1].is_armed());
    assert!(slots[1].callback().is_some());
    Ok(())
}

#[test]
fn clear_in_range_in_context_touches_only_the_image() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    let counter = Arc::new(AtomicUsize::new(0));

    manager.set(
        MAIN,
        2,
        8,
        Va(0x10_0010),
        BreakpointKind::ReadWrite,
        0,
        Some(counting_callback(&counter)),
    )?;
    manager.set(MAIN, 3, 1, Va(0x30_0000), BreakpointKind::Execute, 0, None)?;

    let live = manager.driver().registers(MAIN);
    let calls = manager.driver().state().set_context_calls;

    let mut registers = live;
    manager.clear_in_range_in_context(&mut registers, Va(0x10_0000), 0x1000)?;

    assert_eq!(registers.dr2.0, 0);
    assert!(!registers.dr7.local_breakpoint(2));
    assert_eq!(registers.dr3.0, 0x30_0000);
    assert!(registers.dr7.local_breakpoint(3));

    assert_eq!(manager.driver().registers(MAIN), live);
    assert_eq!(manager.driver().state().set_context_calls, calls);

    let slots = manager
        .thread_breakpoints(MAIN)
        .ok_or(DebuggerError::UnknownThread(MAIN))?;
    assert!(!slots[2].is_armed());
    assert!(slots[2].callback().is_none());
    assert!(slots[3].is_armed());

    assert!(matches!(
        manager.clear_in_range_in_context(&mut registers, Va(0x1000), 0),
        Err(DebuggerError::EmptyRange)
    ));
    Ok(())
}

#[test]
fn clear_all_drops_everything() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    let other = ThreadId(200);
    let counter = Arc::new(AtomicUsize::new(0));
    manager.driver().spawn(other);

    manager.set(MAIN, 0, 1, Va(0x1000), BreakpointKind::Execute, 0, None)?;
    manager.set(
        other,
        1,
        4,
        Va(0x2000),
        BreakpointKind::Write,
        2,
        Some(counting_callback(&counter)),
    )?;

    manager.clear_all()?;

    for thread_id in [MAIN, other] {
        assert_eq!(manager.driver().registers(thread_id), Registers::default());

        let slots = manager
            .thread_breakpoints(thread_id)
            .ok_or(DebuggerError::UnknownThread(thread_id))?;
        assert!(slots.iter().all(|slot| !slot.is_armed()));
        assert!(slots.iter().all(|slot| slot.callback().is_none()));
    }

    Ok(())
}

///////////////////////////////////////////////////////////////////////////////
// Propagation
///////////////////////////////////////////////////////////////////////////////

#[test]
fn new_thread_inherits_main_breakpoints() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    let new = ThreadId(200);
    let counter = Arc::new(AtomicUsize::new(0));
    manager.driver().spawn(new);

    manager.set(
        MAIN,
        0,
        1,
        Va(0x40_1000),
        BreakpointKind::Execute,
        0,
        Some(counting_callback(&counter)),
    )?;
    manager.set(MAIN, 2, 2, Va(0x60_0000), BreakpointKind::Write, 3, None)?;

    manager.propagate_to_new_thread(new)?;

    let main = manager.driver().registers(MAIN);
    let live = manager.driver().registers(new);
    assert_eq!(live.dr0.0, main.dr0.0);
    assert_eq!(live.dr2.0, main.dr2.0);
    assert_eq!(live.dr7.0, main.dr7.0);

    let slots = manager
        .thread_breakpoints(new)
        .ok_or(DebuggerError::UnknownThread(new))?;
    assert!(slots[0].callback().is_some());
    assert_eq!(slots[2].hit_count(), 3);
    assert!(!slots[1].is_armed());
    assert!(!slots[3].is_armed());

    // Propagating onto the main thread itself does nothing.
    let calls = manager.driver().state().set_context_calls;
    manager.propagate_to_new_thread(MAIN)?;
    assert_eq!(manager.driver().state().set_context_calls, calls);
    Ok(())
}

#[test]
fn propagation_requires_main_thread() {
    let manager = new_manager(config());

    assert!(matches!(
        manager.propagate_to_new_thread(ThreadId(200)),
        Err(DebuggerError::NotInitialized)
    ));
}

#[test]
fn propagation_failure_is_reported() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    let new = ThreadId(200);
    manager.driver().spawn(new);

    manager.set(MAIN, 0, 1, Va(0x1000), BreakpointKind::Execute, 0, None)?;
    manager.set(MAIN, 1, 1, Va(0x2000), BreakpointKind::Execute, 0, None)?;
    manager.driver().state().fail_set_context.insert(new);

    let calls = manager.driver().state().set_context_calls;
    assert!(matches!(
        manager.propagate_to_new_thread(new),
        Err(DebuggerError::ThreadContext { .. })
    ));

    // Both breakpoints were attempted.
    assert_eq!(manager.driver().state().set_context_calls, calls + 2);
    assert_eq!(manager.next_available(new)?, Some(0));
    Ok(())
}

#[test]
fn concurrent_threads_get_their_own_tables() {
    let manager = new_manager(config());
    for thread_id in 1..=8 {
        manager.driver().spawn(ThreadId(thread_id));
    }

    let manager = &manager;
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=8u32)
            .map(|thread_id| {
                scope.spawn(move || {
                    manager.set_next_available(
                        ThreadId(thread_id),
                        4,
                        Va(0x1000 * u64::from(thread_id)),
                        BreakpointKind::Write,
                        0,
                        None,
                    )
                })
            })
            .collect();

        handles.into_iter().map(|handle| handle.join()).collect()
    });

    assert!(results.iter().all(|result| matches!(result, Ok(Ok(0)))));
    assert_eq!(manager.registry().len(), 8);
}

///////////////////////////////////////////////////////////////////////////////
// Context
///////////////////////////////////////////////////////////////////////////////

#[test]
fn in_context_operations_do_not_write_the_thread_context() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    let mut registers = manager.driver().registers(MAIN);

    let index = manager.set_next_available_in_context(
        &mut registers,
        4,
        Va(0x8000),
        BreakpointKind::ReadWrite,
        0,
        None,
    )?;

    assert_eq!(index, 0);
    assert_eq!(registers.dr0.0, 0x8000);
    assert_eq!(registers.dr7.condition(0), BreakpointCondition::ReadWrite);
    assert_eq!(manager.driver().registers(MAIN).dr0.0, 0);
    assert_eq!(manager.driver().state().set_context_calls, 0);

    registers.dr6 = Dr6(0b0001);
    assert_eq!(manager.clear_current_breakpoint(&mut registers)?, 0);
    assert_eq!(registers.dr0.0, 0);
    assert_eq!(registers.dr7.0, 0);

    manager.set_in_context(&mut registers, 3, 1, Va(0x9000), BreakpointKind::Execute, 0, None)?;
    manager.clear_all_in_context(&mut registers)?;
    assert_eq!(registers.dr3.0, 0);
    assert_eq!(manager.next_available(MAIN)?, Some(0));
    assert_eq!(manager.driver().state().set_context_calls, 0);
    Ok(())
}

#[test]
fn set_on_all_threads_in_context_writes_other_threads() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    let other = ThreadId(200);
    manager.driver().spawn(other);

    manager.set(other, 0, 1, Va(0x1000), BreakpointKind::Execute, 0, None)?;
    let calls = manager.driver().state().set_context_calls;

    let mut registers = manager.driver().registers(MAIN);
    manager.set_on_all_threads_in_context(
        &mut registers,
        2,
        2,
        Va(0x2000),
        BreakpointKind::Write,
        0,
        None,
    )?;

    assert_eq!(registers.dr2.0, 0x2000);
    assert_eq!(manager.driver().registers(MAIN).dr2.0, 0);
    assert_eq!(manager.driver().registers(other).dr2.0, 0x2000);
    assert_eq!(manager.driver().state().set_context_calls, calls + 1);

    assert!(manager.dump_registers(other).is_ok());
    assert!(matches!(
        manager.dump_registers(ThreadId(300)),
        Err(DebuggerError::UnknownThread(ThreadId(300)))
    ));
    Ok(())
}

#[test]
fn update_current_breakpoint_rearms_matching_slot() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    let mut registers = Registers::default();

    manager.set_in_context(&mut registers, 0, 1, Va(0x40_1000), BreakpointKind::Execute, 0, None)?;

    let index = manager.update_current_breakpoint(
        &mut registers,
        1,
        Va(0x40_2000),
        BreakpointKind::Execute,
        1,
        None,
    )?;
    assert_eq!(index, 0);
    assert_eq!(registers.dr0.0, 0x40_2000);

    let slots = manager
        .thread_breakpoints(MAIN)
        .ok_or(DebuggerError::UnknownThread(MAIN))?;
    assert_eq!(slots[0].address(), Va(0x40_2000));
    assert_eq!(slots[0].hit_count(), 1);

    // Nothing matches once every register diverged from its slot.
    let mut diverged = registers;
    diverged.dr0 = Dr0(0x50_0000);
    diverged.dr1.0 = 0x1;
    diverged.dr2.0 = 0x2;
    diverged.dr3.0 = 0x3;
    assert!(matches!(
        manager.update_current_breakpoint(
            &mut diverged,
            1,
            Va(0x40_3000),
            BreakpointKind::Execute,
            0,
            None
        ),
        Err(DebuggerError::Other(_))
    ));
    Ok(())
}

#[test]
fn restore_reapplies_wiped_registers() -> Result<(), DebuggerError> {
    let manager = new_manager(config());

    manager.set(MAIN, 0, 1, Va(0x40_1000), BreakpointKind::Execute, 0, None)?;
    manager.set(MAIN, 3, 4, Va(0x7000), BreakpointKind::Write, 0, None)?;
    let expected = manager.driver().registers(MAIN);

    let mut wiped = Registers::default();
    assert!(manager.restore_in_context(&mut wiped)?);
    assert_eq!(wiped.dr0.0, expected.dr0.0);
    assert_eq!(wiped.dr3.0, expected.dr3.0);
    assert_eq!(wiped.dr7.0, expected.dr7.0);

    let mut intact = expected;
    assert!(!manager.restore_in_context(&mut intact)?);
    assert_eq!(intact, expected);
    Ok(())
}

#[test]
fn is_armed_live_reads_dr7() -> Result<(), DebuggerError> {
    let manager = new_manager(config());

    manager.set(MAIN, 2, 4, Va(0x1000), BreakpointKind::Write, 0, None)?;
    assert!(manager.is_armed_live(MAIN, 2)?);
    assert!(!manager.is_armed_live(MAIN, 1)?);

    manager.clear(MAIN, 2)?;
    assert!(!manager.is_armed_live(MAIN, 2)?);
    Ok(())
}

///////////////////////////////////////////////////////////////////////////////
// WoW64
///////////////////////////////////////////////////////////////////////////////

#[test]
fn wow64_patches_stack_data_breakpoints() -> Result<(), DebuggerError> {
    let manager = new_manager(DebuggerConfig {
        wow64: true,
        ..config()
    });
    manager.driver().state().stack = 0x7ff0_0000..0x8000_0000;

    manager.set(MAIN, 2, 4, Va(0x7ff0_1000), BreakpointKind::ReadWrite, 0, None)?;
    manager.set(MAIN, 0, 1, Va(0x7ff0_2000), BreakpointKind::Execute, 0, None)?;
    manager.set(MAIN, 1, 4, Va(0x1000), BreakpointKind::Write, 0, None)?;
    assert_eq!(manager.driver().state().patched, vec![2]);

    manager.clear(MAIN, 2)?;
    manager.clear(MAIN, 1)?;
    assert_eq!(manager.driver().state().unpatched, vec![2]);
    Ok(())
}

#[test]
fn wow64_disabled_never_patches() -> Result<(), DebuggerError> {
    let manager = new_manager(config());
    manager.driver().state().stack = 0x7ff0_0000..0x8000_0000;

    manager.set(MAIN, 2, 4, Va(0x7ff0_1000), BreakpointKind::ReadWrite, 0, None)?;
    manager.clear(MAIN, 2)?;

    let state = manager.driver().state();
    assert!(state.patched.is_empty());
    assert!(state.unpatched.is_empty());
    Ok(())
}
