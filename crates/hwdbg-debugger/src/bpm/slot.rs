use std::sync::Arc;

use hwdbg_arch_amd64::{Amd64, BreakpointKind};
use hwdbg_core::{DebuggerDriver, ExceptionContext, ThreadId, Va};

use super::BreakpointManager;

/// A handler invoked when a hardware breakpoint fires.
///
/// The handler runs synchronously on the faulting thread, inside the
/// exception dispatcher. It receives the manager (so it can re-arm or clear
/// breakpoints), a snapshot of the slot that fired, and the exception
/// context whose registers become the thread state once execution resumes.
pub type BreakpointCallback<Driver> = Arc<
    dyn Fn(&BreakpointManager<Driver>, &BreakpointSlot<Driver>, &mut ExceptionContext<'_, Amd64>)
        + Send
        + Sync,
>;

/// Logical state of one hardware breakpoint register of a thread.
pub struct BreakpointSlot<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    thread_id: ThreadId,
    index: u8,
    address: Va,
    size: u8,
    kind: BreakpointKind,
    hit_count: u32,
    callback: Option<BreakpointCallback<Driver>>,
}

impl<Driver> BreakpointSlot<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    pub(crate) fn new(thread_id: ThreadId, index: u8) -> Self {
        Self {
            thread_id,
            index,
            address: Va::default(),
            size: 0,
            kind: BreakpointKind::Execute,
            hit_count: 0,
            callback: None,
        }
    }

    /// Returns the thread owning the slot.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Returns the debug register index (0-3).
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Returns the breakpoint address, NULL if the slot is not armed.
    pub fn address(&self) -> Va {
        self.address
    }

    /// Returns the breakpoint size in bytes.
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Returns the breakpoint kind.
    pub fn kind(&self) -> BreakpointKind {
        self.kind
    }

    /// Returns the number of remaining hits before the breakpoint is
    /// cleared automatically.
    ///
    /// Zero means the breakpoint persists until it is cleared explicitly.
    pub fn hit_count(&self) -> u32 {
        self.hit_count
    }

    /// Returns the handler of the breakpoint.
    pub fn callback(&self) -> Option<&BreakpointCallback<Driver>> {
        self.callback.as_ref()
    }

    /// Checks if the slot holds a breakpoint.
    pub fn is_armed(&self) -> bool {
        !self.address.is_null()
    }

    /// Checks if the slot holds a breakpoint with exactly these parameters.
    pub fn matches(&self, size: u8, address: Va, kind: BreakpointKind, hit_count: u32) -> bool {
        self.is_armed()
            && self.size == size
            && self.address == address
            && self.kind == kind
            && self.hit_count == hit_count
    }

    /// Checks if both slots program the debug registers identically.
    pub(crate) fn same_placement(&self, other: &Self) -> bool {
        self.address == other.address && self.size == other.size && self.kind == other.kind
    }

    pub(crate) fn arm(
        &mut self,
        size: u8,
        address: Va,
        kind: BreakpointKind,
        hit_count: u32,
        callback: Option<BreakpointCallback<Driver>>,
    ) {
        self.size = size;
        self.address = address;
        self.kind = kind;
        self.hit_count = hit_count;
        self.callback = callback;
    }

    /// Disarms the slot. The callback stays attached until the slot is
    /// re-armed or reset.
    pub(crate) fn disarm(&mut self) {
        self.size = 0;
        self.address = Va::default();
        self.kind = BreakpointKind::Execute;
        self.hit_count = 0;
    }

    pub(crate) fn reset(&mut self) {
        self.disarm();
        self.callback = None;
    }

    pub(crate) fn take_callback(&mut self) -> Option<BreakpointCallback<Driver>> {
        self.callback.take()
    }

    /// Consumes one hit. Returns `true` when the hit count dropped to zero.
    pub(crate) fn consume_hit(&mut self) -> bool {
        if self.hit_count == 0 {
            return false;
        }

        self.hit_count -= 1;
        self.hit_count == 0
    }
}

impl<Driver> Clone for BreakpointSlot<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    fn clone(&self) -> Self {
        Self {
            thread_id: self.thread_id,
            index: self.index,
            address: self.address,
            size: self.size,
            kind: self.kind,
            hit_count: self.hit_count,
            callback: self.callback.clone(),
        }
    }
}

impl<Driver> std::fmt::Debug for BreakpointSlot<Driver>
where
    Driver: DebuggerDriver<Architecture = Amd64>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("BreakpointSlot")
            .field("thread_id", &self.thread_id)
            .field("index", &self.index)
            .field("address", &self.address)
            .field("size", &self.size)
            .field("kind", &self.kind)
            .field("hit_count", &self.hit_count)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
