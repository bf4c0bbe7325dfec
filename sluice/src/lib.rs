//! Sluice facade crate.
//!
//! Re-exports the flow and runtime crates behind one entry point and offers
//! the three factories:
//!
//! ```rust
//! use sluice::prelude::*;
//!
//! # fn main() -> Result<(), FlowError> {
//! let mut route = switch_flow::<(), &str, i32>(2);
//! route
//!     .case(1)?
//!     .then(|_| "one")?
//!     .case(2)?
//!     .then(|_| "two")?
//!     .default(|_| "?")?;
//!
//! assert_eq!(route.run(()).value(), Some(&"two"));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

pub use sluice_flow as flow;
pub use sluice_runtime as runtime;

pub use sluice_flow::{FlowError, FlowKind, FlowShape, IfFlow, Maybe, SwitchFlow, Truthy, maybe};
pub use sluice_runtime::{
    HaltPolicy, ManualScheduler, Scheduler, SchedulerConfig, TickStrategy, TokioScheduler,
    WeakWhileFlow, WhileFlow,
};

/// Start an `if` chain with its first condition.
pub fn if_flow<A, R, C>(condition: impl Into<Maybe<A, C>>) -> IfFlow<A, R, C> {
    IfFlow::new(condition)
}

/// Start an `if` chain with no condition; open it with `else_if`.
pub fn if_flow_empty<A, R, C>() -> IfFlow<A, R, C> {
    IfFlow::empty()
}

/// Start a `switch` over `subject`.
pub fn switch_flow<A, R, V>(subject: impl Into<Maybe<A, V>>) -> SwitchFlow<A, R, V> {
    SwitchFlow::new(subject)
}

/// Build a `while` loop ticking on `scheduler`.
pub fn while_flow<A, C>(
    predicate: impl Into<Maybe<A, C>>,
    scheduler: Arc<dyn Scheduler>,
) -> WhileFlow<A, C>
where
    A: Send + Sync + 'static,
    C: Truthy + Clone + Send + Sync + 'static,
{
    WhileFlow::new(predicate, scheduler)
}

pub mod prelude {
    pub use crate::{if_flow, if_flow_empty, switch_flow, while_flow};
    pub use sluice_flow::prelude::*;
    pub use sluice_runtime::prelude::*;
}
