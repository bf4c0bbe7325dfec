//! Sluice Runtime - Scheduled Loops
//!
//! The looping half of Sluice. A [`WhileFlow`] never blocks: each cycle is a
//! tick handed to a [`Scheduler`], which the embedding program supplies.
//! Two schedulers ship with the crate: [`ManualScheduler`] for hosts that
//! drive ticks themselves, and [`TokioScheduler`] for async programs.

pub mod config;
pub mod error;
pub mod scheduler;
pub mod step;
pub mod tokio_scheduler;
pub mod while_flow;

pub use config::{HaltPolicy, SchedulerConfig, TICK_ENV, TickStrategy};
pub use error::{ConfigError, SchedulerError};
pub use scheduler::{ManualScheduler, Scheduler, Tick, TickHandle};
pub use step::StepOutcome;
pub use tokio_scheduler::TokioScheduler;
pub use while_flow::{WeakWhileFlow, WhileFlow};

pub mod prelude {
    pub use crate::{
        HaltPolicy, ManualScheduler, Scheduler, SchedulerConfig, StepOutcome, TickStrategy,
        TokioScheduler, WeakWhileFlow, WhileFlow,
    };
}
