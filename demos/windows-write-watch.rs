//! Watches writes to a variable with a hardware breakpoint.

#[cfg(windows)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, AtomicU64, Ordering},
    };

    use hwdbg::{
        BreakpointCallback, BreakpointManager, BreakpointSlot, Debugger, DebuggerConfig,
        DebuggerDriver as _, ExceptionContext, Hex, Va,
        arch::amd64::{Amd64, BreakpointKind},
        driver::windows::{WindowsDriver, install, uninstall},
    };

    static WATCHED: AtomicU64 = AtomicU64::new(0);

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Setup the debugger and hook it into the exception dispatching.
    let driver = WindowsDriver::new()?;
    let debugger = install(Debugger::initialize(driver, DebuggerConfig::default())?)?;

    let hits = Arc::new(AtomicU32::new(0));
    let callback: BreakpointCallback<WindowsDriver> = {
        let hits = hits.clone();
        Arc::new(
            move |_: &BreakpointManager<WindowsDriver>,
                  slot: &BreakpointSlot<WindowsDriver>,
                  context: &mut ExceptionContext<'_, Amd64>| {
                hits.fetch_add(1, Ordering::SeqCst);
                println!(
                    "write to {} from {}",
                    slot.address(),
                    Hex(context.registers.rip)
                );
            },
        )
    };

    let address = Va(WATCHED.as_ptr() as u64);
    let thread_id = debugger.manager().driver().current_thread_id();
    let index = debugger.manager().set_next_available(
        thread_id,
        8,
        address,
        BreakpointKind::Write,
        0,
        Some(callback),
    )?;

    tracing::info!(%thread_id, %address, index, "watching");

    for value in 1..=3 {
        WATCHED.store(value, Ordering::SeqCst);
    }

    println!("hits: {}", hits.load(Ordering::SeqCst));

    debugger.shutdown()?;
    uninstall();

    Ok(())
}

#[cfg(not(windows))]
fn main() {
    eprintln!("this demo requires Windows");
}
