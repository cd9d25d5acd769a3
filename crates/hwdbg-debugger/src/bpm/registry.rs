use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use hwdbg_arch_amd64::Amd64;
use hwdbg_core::{DebuggerDriver, DebuggerError, ThreadId};
use indexmap::IndexMap;

use super::ThreadBreakpointTable;

/// A thread breakpoint table shared between the registry and its users.
pub type SharedTable<Driver> = Arc<Mutex<ThreadBreakpointTable<Driver>>>;

/// Process-wide collection of thread breakpoint tables.
///
/// Tables are kept in creation order. The first table belongs to the thread
/// that initialized the debugger and serves as the template for threads
/// created later.
///
/// Tables are never removed, not even when their thread exits. The registry
/// therefore grows by one table for every thread ever seen.
pub struct BreakpointRegistry<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    tables: RwLock<IndexMap<ThreadId, SharedTable<Driver>>>,
    active: AtomicBool,
}

impl<Driver> BreakpointRegistry<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(IndexMap::new()),
            active: AtomicBool::new(false),
        }
    }

    /// Returns the table of a thread, if it exists.
    pub fn find(&self, thread_id: ThreadId) -> Option<SharedTable<Driver>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.get(&thread_id).cloned()
    }

    /// Returns the table of a thread, creating it if it does not exist.
    ///
    /// Creating a table acquires a handle for the thread: the calling thread
    /// duplicates its own handle, other threads are opened by identifier.
    /// If no handle can be obtained, no table is created.
    pub fn find_or_create(
        &self,
        driver: &Driver,
        thread_id: ThreadId,
    ) -> Result<SharedTable<Driver>, DebuggerError> {
        if let Some(table) = self.find(thread_id) {
            return Ok(table);
        }

        let handle = if thread_id == driver.current_thread_id() {
            driver.duplicate_current_thread()
        }
        else {
            driver.open_thread(thread_id)
        };

        let handle = match handle {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(%err, %thread_id, "failed to obtain thread handle");
                return Err(DebuggerError::ThreadHandle(thread_id));
            }
        };

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);

        // Another thread might have created the table in the meantime,
        // in which case the new handle is dropped.
        let table = tables
            .entry(thread_id)
            .or_insert_with(|| {
                tracing::debug!(%thread_id, "thread breakpoints created");
                Arc::new(Mutex::new(ThreadBreakpointTable::new(thread_id, handle)))
            })
            .clone();

        if tables.len() == 1 {
            self.active.store(true, Ordering::SeqCst);
        }

        Ok(table)
    }

    /// Returns the table of the thread that initialized the debugger.
    pub fn main_table(&self) -> Option<SharedTable<Driver>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.first().map(|(_, table)| table.clone())
    }

    /// Returns the identifier of the thread that initialized the debugger.
    pub fn main_thread_id(&self) -> Option<ThreadId> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.first().map(|(thread_id, _)| *thread_id)
    }

    /// Returns a snapshot of all tables, in creation order.
    pub fn tables(&self) -> Vec<SharedTable<Driver>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.values().cloned().collect()
    }

    /// Returns the identifiers of all known threads, in creation order.
    pub fn thread_ids(&self) -> Vec<ThreadId> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.keys().copied().collect()
    }

    /// Calls `f` for every table, in creation order.
    ///
    /// Each table is locked only for the duration of its own call. The
    /// registry itself is not locked while `f` runs, so `f` may create new
    /// tables.
    pub fn for_each(&self, mut f: impl FnMut(&mut ThreadBreakpointTable<Driver>)) {
        for table in self.tables() {
            f(&mut lock(&table));
        }
    }

    /// Returns the number of tables.
    pub fn len(&self) -> usize {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.len()
    }

    /// Checks if the registry holds no tables.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if hardware breakpoints are in use.
    ///
    /// Set when the first table is created and whenever a breakpoint is
    /// armed. While unset, the exception dispatcher does not inspect
    /// single-step exceptions at all.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Sets or resets the hardware breakpoints flag.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

impl<Driver> Default for BreakpointRegistry<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Locks a table, ignoring poisoning.
pub(crate) fn lock<Driver>(
    table: &Mutex<ThreadBreakpointTable<Driver>>,
) -> MutexGuard<'_, ThreadBreakpointTable<Driver>>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    table.lock().unwrap_or_else(PoisonError::into_inner)
}
