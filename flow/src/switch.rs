//! SwitchFlow - `switch / case / default` as Data
//!
//! A thin adapter over a private [`IfFlow`]: cases are stored as its
//! conditions, but matching compares each resolved case against the
//! resolved subject instead of truth-testing it.

use crate::conditional::IfFlow;
use crate::error::FlowResult;
use crate::maybe::Maybe;
use crate::shape::{FlowKind, FlowShape};
use uuid::Uuid;

/// Runtime-assembled `switch` statement.
///
/// `V` is the compared value type; the subject is resolved exactly once per
/// `run`, cases are resolved in order until one equals it.
pub struct SwitchFlow<A, R, V> {
    subject: Maybe<A, V>,
    chain: IfFlow<A, R, V>,
}

impl<A, R, V> SwitchFlow<A, R, V> {
    pub fn new(subject: impl Into<Maybe<A, V>>) -> Self {
        Self {
            subject: subject.into(),
            chain: IfFlow::empty(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.chain = self.chain.with_label(label);
        self
    }

    pub fn id(&self) -> Uuid {
        self.chain.id()
    }

    /// Append a case value. The previous case must already have its handler.
    pub fn case(&mut self, value: impl Into<Maybe<A, V>>) -> FlowResult<&mut Self> {
        self.chain.else_if(value)?;
        Ok(self)
    }

    /// Pair a handler with the oldest case that has none yet.
    pub fn then<F>(&mut self, handler: F) -> FlowResult<&mut Self>
    where
        F: FnMut(&A) -> R + Send + 'static,
    {
        self.chain.then(handler)?;
        Ok(self)
    }

    /// Set the handler run when no case matches.
    pub fn default<F>(&mut self, handler: F) -> FlowResult<&mut Self>
    where
        F: FnMut(&A) -> R + Send + 'static,
    {
        self.chain.otherwise(handler)?;
        Ok(self)
    }

    pub fn value(&self) -> Option<&R> {
        self.chain.value()
    }

    pub fn take_value(&mut self) -> Option<R> {
        self.chain.take_value()
    }

    pub fn shape(&self) -> FlowShape {
        self.chain.shape_as(FlowKind::Switch)
    }
}

impl<A, R, V> SwitchFlow<A, R, V>
where
    V: PartialEq + Clone,
{
    /// Evaluate the switch against `args`.
    pub fn run(&mut self, args: A) -> &mut Self {
        let _span = tracing::trace_span!("SwitchFlow", sluice.flow = %self.chain.id()).entered();

        let subject = self.subject.resolve(&args);
        let matched = self
            .chain
            .select(|case| case.resolve(&args) == subject);
        self.chain.dispatch(matched, &args);
        self
    }
}

impl<A, R, V: std::fmt::Debug> std::fmt::Debug for SwitchFlow<A, R, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchFlow")
            .field("subject", &self.subject)
            .field("chain", &self.chain)
            .finish()
    }
}
