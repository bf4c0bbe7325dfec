use thiserror::Error;

/// Usage-contract violations raised by the flow builders.
///
/// Every variant is returned synchronously from the call that broke the
/// contract. The builder itself is left untouched and can still be used.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowError {
    /// A handler was registered with no unmatched condition to pair with.
    #[error("There are not enough conditions to handle a new \"then\" call")]
    ChainOverflow,
    /// A condition was registered while the previous one still lacks a handler.
    #[error("Make sure that all the conditions have a \"then\" callback")]
    ChainImbalance,
    /// A second fallback (`else` / `default`) was registered.
    #[error("You can use this method only once")]
    DuplicateFallback,
    /// `run` was called on a loop that is still looping.
    #[error("This while loop is still running, you can not run it twice")]
    AlreadyRunning,
    /// `break` was called on a loop that is not looping.
    #[error("You can not break a while loop that was never started")]
    NotRunning,
}

pub type FlowResult<T> = Result<T, FlowError>;
