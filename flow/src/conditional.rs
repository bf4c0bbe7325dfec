//! IfFlow - `if / else if / else` as Data
//!
//! An `IfFlow` owns an ordered stack of conditions, an index-aligned stack
//! of handlers and an optional fallback. `run` resolves exactly one of them.
//!
//! # Example
//! ```rust
//! use sluice_flow::IfFlow;
//!
//! # fn main() -> Result<(), sluice_flow::FlowError> {
//! let mut flow = IfFlow::<(), &str>::new(false);
//! flow.then(|_| "A")?.otherwise(|_| "B")?;
//!
//! assert_eq!(flow.run(()).value(), Some(&"B"));
//! # Ok(())
//! # }
//! ```

use crate::error::{FlowError, FlowResult};
use crate::maybe::{Maybe, Truthy};
use crate::shape::{FlowKind, FlowShape};
use uuid::Uuid;

/// A branch body, invoked with the `run` arguments.
pub type Handler<A, R> = Box<dyn FnMut(&A) -> R + Send>;

/// Runtime-assembled `if / else if / else` chain.
///
/// `A` is the argument type handed to every condition and handler, `R` is
/// the handler result and `C` the resolved condition type (anything
/// [`Truthy`]).
pub struct IfFlow<A, R, C = bool> {
    id: Uuid,
    label: Option<String>,
    conditions: Vec<Maybe<A, C>>,
    handlers: Vec<Handler<A, R>>,
    fallback: Option<Handler<A, R>>,
    value: Option<R>,
}

impl<A, R, C> IfFlow<A, R, C> {
    /// Start a chain with its first condition.
    pub fn new(condition: impl Into<Maybe<A, C>>) -> Self {
        let mut flow = Self::empty();
        flow.conditions.push(condition.into());
        flow
    }

    /// Start a chain with no condition; the first call must be `else_if`.
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            label: None,
            conditions: Vec::new(),
            handlers: Vec::new(),
            fallback: None,
            value: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Pair a handler with the oldest condition that has none yet.
    pub fn then<F>(&mut self, handler: F) -> FlowResult<&mut Self>
    where
        F: FnMut(&A) -> R + Send + 'static,
    {
        if self.handlers.len() >= self.conditions.len() {
            tracing::warn!(sluice.flow = %self.id, "then() without a pending condition");
            return Err(FlowError::ChainOverflow);
        }
        self.handlers.push(Box::new(handler));
        Ok(self)
    }

    /// Append a condition. The previous condition must already have its handler.
    pub fn else_if(&mut self, condition: impl Into<Maybe<A, C>>) -> FlowResult<&mut Self> {
        if self.conditions.len() > self.handlers.len() {
            tracing::warn!(sluice.flow = %self.id, "else_if() while a condition lacks its handler");
            return Err(FlowError::ChainImbalance);
        }
        self.conditions.push(condition.into());
        Ok(self)
    }

    /// Set the fallback run when no condition matches (`else`).
    pub fn otherwise<F>(&mut self, handler: F) -> FlowResult<&mut Self>
    where
        F: FnMut(&A) -> R + Send + 'static,
    {
        if self.fallback.is_some() {
            tracing::warn!(sluice.flow = %self.id, "fallback registered twice");
            return Err(FlowError::DuplicateFallback);
        }
        self.fallback = Some(Box::new(handler));
        Ok(self)
    }

    /// Result of the last handler that ran, if any.
    pub fn value(&self) -> Option<&R> {
        self.value.as_ref()
    }

    pub fn take_value(&mut self) -> Option<R> {
        self.value.take()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn shape(&self) -> FlowShape {
        self.shape_as(FlowKind::If)
    }

    pub(crate) fn shape_as(&self, kind: FlowKind) -> FlowShape {
        FlowShape {
            id: self.id,
            label: self.label.clone(),
            kind,
            conditions: self.conditions.len(),
            handlers: self.handlers.len(),
            has_fallback: self.fallback.is_some(),
            steps: 0,
        }
    }

    /// Index of the first condition accepted by `accept`.
    ///
    /// Conditions after the first accepted one are never looked at.
    pub(crate) fn select<P>(&self, mut accept: P) -> Option<usize>
    where
        P: FnMut(&Maybe<A, C>) -> bool,
    {
        self.conditions.iter().position(|condition| accept(condition))
    }

    /// Run the handler paired with `matched`, or the fallback when there is
    /// no match or the matched condition never got its handler.
    pub(crate) fn dispatch(&mut self, matched: Option<usize>, args: &A) {
        let handler = match matched {
            Some(index) if index < self.handlers.len() => {
                tracing::trace!(sluice.flow = %self.id, branch = index, "branch taken");
                Some(&mut self.handlers[index])
            }
            _ => {
                tracing::trace!(sluice.flow = %self.id, "no branch matched");
                self.fallback.as_mut()
            }
        };

        if let Some(handler) = handler {
            self.value = Some(handler(args));
        }
    }
}

impl<A, R, C> IfFlow<A, R, C>
where
    C: Truthy + Clone,
{
    /// Evaluate the chain against `args`.
    ///
    /// The lowest-index truthy condition wins; its handler result becomes
    /// the flow value. Without a match the fallback runs, if set.
    pub fn run(&mut self, args: A) -> &mut Self {
        let _span = tracing::trace_span!(
            "IfFlow",
            sluice.flow = %self.id,
            sluice.label = self.label.as_deref().unwrap_or_default()
        )
        .entered();

        let matched = self.select(|condition| condition.resolve(&args).is_truthy());
        self.dispatch(matched, &args);
        self
    }
}

impl<A, R, C> std::fmt::Debug for IfFlow<A, R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IfFlow")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("conditions", &self.conditions.len())
            .field("handlers", &self.handlers.len())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}
