use hwdbg_arch_amd64::{Amd64, BreakpointKind};
use hwdbg_core::{DebuggerDriver, ThreadId, Va};

use super::BreakpointSlot;

/// Breakpoint state of a single thread.
///
/// Holds one slot per hardware breakpoint register and the handle used to
/// access the thread context. The handle is released when the table is
/// dropped; tables are kept for the lifetime of the registry.
pub struct ThreadBreakpointTable<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    thread_id: ThreadId,
    handle: Driver::ThreadHandle,
    slots: [BreakpointSlot<Driver>; 4],
}

impl<Driver> ThreadBreakpointTable<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    pub(crate) fn new(thread_id: ThreadId, handle: Driver::ThreadHandle) -> Self {
        Self {
            thread_id,
            handle,
            slots: std::array::from_fn(|index| BreakpointSlot::new(thread_id, index as u8)),
        }
    }

    /// Returns the thread identifier.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Returns the handle of the thread.
    pub fn handle(&self) -> &Driver::ThreadHandle {
        &self.handle
    }

    /// Returns all slots.
    pub fn slots(&self) -> &[BreakpointSlot<Driver>; 4] {
        &self.slots
    }

    /// Returns the slot for a debug register index.
    pub fn slot(&self, index: u8) -> Option<&BreakpointSlot<Driver>> {
        self.slots.get(index as usize)
    }

    pub(crate) fn slot_mut(&mut self, index: u8) -> Option<&mut BreakpointSlot<Driver>> {
        self.slots.get_mut(index as usize)
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [BreakpointSlot<Driver>; 4] {
        &mut self.slots
    }

    /// Returns the index of the first slot without a breakpoint.
    pub fn next_available(&self) -> Option<u8> {
        self.slots
            .iter()
            .find(|slot| !slot.is_armed())
            .map(BreakpointSlot::index)
    }

    /// Returns the index of a slot armed with exactly these parameters.
    pub fn find_identical(
        &self,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
    ) -> Option<u8> {
        self.slots
            .iter()
            .find(|slot| slot.matches(size, address, kind, hit_count))
            .map(BreakpointSlot::index)
    }

    /// Returns the number of armed slots.
    pub fn armed(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_armed()).count()
    }
}

impl<Driver> std::fmt::Debug for ThreadBreakpointTable<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ThreadBreakpointTable")
            .field("thread_id", &self.thread_id)
            .field("slots", &self.slots)
            .finish()
    }
}
