//! TokioScheduler - Ticks as Tokio Tasks
//!
//! Each tick is spawned as its own task on a captured runtime handle and
//! deferred according to the configured [`TickStrategy`]. Cancelling a
//! tick aborts its task.

use crate::config::{SchedulerConfig, TickStrategy};
use crate::error::SchedulerError;
use crate::scheduler::{HandleSeq, Scheduler, Tick, TickHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type TaskMap = Arc<Mutex<HashMap<TickHandle, JoinHandle<()>>>>;

pub struct TokioScheduler {
    runtime: Handle,
    strategy: TickStrategy,
    interval: Duration,
    handles: HandleSeq,
    tasks: TaskMap,
}

impl TokioScheduler {
    /// Build on the runtime the caller is running in.
    pub fn new(strategy: TickStrategy, interval: Duration) -> Result<Self, SchedulerError> {
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        Ok(Self::with_handle(runtime, strategy, interval))
    }

    pub fn with_handle(runtime: Handle, strategy: TickStrategy, interval: Duration) -> Self {
        Self {
            runtime,
            strategy,
            interval,
            handles: HandleSeq::default(),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::new(config.strategy, config.interval())
    }

    /// Ticks spawned but not yet fired or cancelled.
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Scheduler for TokioScheduler {
    fn start(&self, tick: Tick) -> TickHandle {
        let handle = self.handles.next();
        let tasks = Arc::clone(&self.tasks);
        let strategy = self.strategy;
        let interval = self.interval;

        // Hold the map while spawning so the task cannot deregister itself
        // before it has been registered.
        let mut registry = self.tasks.lock();
        let task = self.runtime.spawn(async move {
            match strategy {
                TickStrategy::Yield => tokio::task::yield_now().await,
                TickStrategy::Interval => tokio::time::sleep(interval).await,
            }
            tasks.lock().remove(&handle);
            tick();
        });
        registry.insert(handle, task);
        handle
    }

    fn cancel(&self, handle: TickHandle) {
        let task = self.tasks.lock().remove(&handle);
        if let Some(task) = task {
            tracing::trace!(tick = handle.id(), "tick aborted");
            task.abort();
        }
    }
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("strategy", &self.strategy)
            .field("interval", &self.interval)
            .field("pending", &self.pending())
            .finish()
    }
}
