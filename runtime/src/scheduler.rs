//! Scheduler - The Tick Primitive
//!
//! Loops never drive themselves. Each cycle asks a [`Scheduler`] to run the
//! next one later, and keeps the returned [`TickHandle`] so a `break` can
//! cancel it. The embedding environment decides what "later" means.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deferred unit of work, run at most once.
pub type Tick = Box<dyn FnOnce() + Send + 'static>;

/// Opaque identifier of a scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Source of ticks for looping flows.
///
/// Implementations must never invoke `tick` before `start` has returned.
pub trait Scheduler: Send + Sync {
    /// Schedule `tick` to run once, later, without blocking the caller.
    fn start(&self, tick: Tick) -> TickHandle;

    /// Best-effort cancellation of a tick that has not fired yet.
    ///
    /// Cancelling a fired or unknown handle is a no-op.
    fn cancel(&self, handle: TickHandle);
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn start(&self, tick: Tick) -> TickHandle {
        (**self).start(tick)
    }

    fn cancel(&self, handle: TickHandle) {
        (**self).cancel(handle)
    }
}

/// Monotonic handle allocator shared by the bundled schedulers.
#[derive(Debug, Default)]
pub(crate) struct HandleSeq(AtomicU64);

impl HandleSeq {
    pub(crate) fn next(&self) -> TickHandle {
        TickHandle(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Deterministic FIFO scheduler driven by the caller.
///
/// Nothing runs until [`ManualScheduler::run_next`] or
/// [`ManualScheduler::run_until_idle`] is called, which makes it the
/// scheduler of choice for tests and for hosts with their own frame loop.
#[derive(Default)]
pub struct ManualScheduler {
    handles: HandleSeq,
    queue: Mutex<VecDeque<(TickHandle, Tick)>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the oldest pending tick. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        // The lock is released before the tick runs so it can schedule again.
        let next = self.queue.lock().pop_front();
        match next {
            Some((_, tick)) => {
                tick();
                true
            }
            None => false,
        }
    }

    /// Run ticks until the queue drains or `max_ticks` have run.
    pub fn run_until_idle(&self, max_ticks: usize) -> usize {
        let mut ran = 0;
        while ran < max_ticks && self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn start(&self, tick: Tick) -> TickHandle {
        let handle = self.handles.next();
        self.queue.lock().push_back((handle, tick));
        handle
    }

    fn cancel(&self, handle: TickHandle) {
        self.queue.lock().retain(|(queued, _)| *queued != handle);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
