//! Sluice Flow - Control Flow as Data (Branching Layer)
//!
//! This crate defines the synchronous half of Sluice:
//! - `Maybe`: a static value or a function of the call arguments
//! - `IfFlow`: `if / else if / else` assembled at runtime
//! - `SwitchFlow`: `switch / case / default` assembled at runtime
//! - `FlowShape`: a serializable structural view of any flow
//!
//! **IMPORTANT**: This layer is Pure Rust - no IO, no Async. Looping lives in
//! `sluice-runtime`, which needs a scheduler.

pub mod conditional;
pub mod error;
pub mod maybe;
pub mod shape;
pub mod switch;

pub use conditional::{Handler, IfFlow};
pub use error::{FlowError, FlowResult};
pub use maybe::{Callable, Maybe, Truthy, maybe};
pub use shape::{FlowKind, FlowShape};
pub use switch::SwitchFlow;

pub mod prelude {
    pub use crate::{FlowError, FlowKind, FlowShape, IfFlow, Maybe, SwitchFlow, Truthy, maybe};
}
