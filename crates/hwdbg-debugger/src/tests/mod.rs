mod debugger;
mod manager;
mod singlestep;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use hwdbg_arch_amd64::Amd64;
use hwdbg_core::{DebuggerConfig, ExceptionContext};

use self::mock::MockDriver;
use crate::{BreakpointCallback, BreakpointManager, BreakpointSlot, Debugger};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn new_manager(config: DebuggerConfig) -> BreakpointManager<MockDriver> {
    init_tracing();
    BreakpointManager::new(MockDriver::new(), config)
}

fn new_debugger(config: DebuggerConfig) -> Debugger<MockDriver> {
    init_tracing();

    match Debugger::initialize(MockDriver::new(), config) {
        Ok(debugger) => debugger,
        Err(err) => panic!("failed to initialize debugger: {err}"),
    }
}

fn config() -> DebuggerConfig {
    DebuggerConfig {
        wow64: false,
        ..Default::default()
    }
}

fn counting_callback(counter: &Arc<AtomicUsize>) -> BreakpointCallback<MockDriver> {
    let counter = counter.clone();

    Arc::new(
        move |_: &BreakpointManager<MockDriver>,
              _: &BreakpointSlot<MockDriver>,
              _: &mut ExceptionContext<'_, Amd64>| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    )
}

fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
