//! Maybe - Static-or-Callable Values
//!
//! Conditions, switch subjects and loop predicates can be given either as a
//! plain value or as a function of the call arguments. `Maybe` is the tagged
//! form of that choice and `resolve` is the single evaluation point.
//!
//! # Example
//! ```rust
//! use sluice_flow::{maybe, Maybe};
//!
//! let fixed: Maybe<i32, bool> = Maybe::from(true);
//! let computed = maybe(|n: &i32| *n > 3);
//!
//! assert!(fixed.resolve(&0));
//! assert!(computed.resolve(&4));
//! assert!(!computed.resolve(&2));
//! ```

use std::fmt;
use std::sync::Arc;

/// A function of the call arguments, shareable across threads.
pub type Callable<A, T> = Arc<dyn Fn(&A) -> T + Send + Sync>;

/// A value that is either used as-is or computed from the call arguments.
pub enum Maybe<A, T> {
    /// Returned unchanged on every resolution.
    Static(T),
    /// Invoked with the call arguments on every resolution.
    Callable(Callable<A, T>),
}

impl<A, T> Maybe<A, T> {
    /// Wrap a function of the call arguments.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&A) -> T + Send + Sync + 'static,
    {
        Maybe::Callable(Arc::new(f))
    }

    /// Resolve against `args`.
    ///
    /// Panics raised by a callable propagate unchanged.
    pub fn resolve(&self, args: &A) -> T
    where
        T: Clone,
    {
        match self {
            Maybe::Static(value) => value.clone(),
            Maybe::Callable(f) => f(args),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Maybe::Callable(_))
    }
}

/// Shorthand for [`Maybe::from_fn`].
pub fn maybe<A, T, F>(f: F) -> Maybe<A, T>
where
    F: Fn(&A) -> T + Send + Sync + 'static,
{
    Maybe::from_fn(f)
}

impl<A, T> From<T> for Maybe<A, T> {
    fn from(value: T) -> Self {
        Maybe::Static(value)
    }
}

impl<A, T: Clone> Clone for Maybe<A, T> {
    fn clone(&self) -> Self {
        match self {
            Maybe::Static(value) => Maybe::Static(value.clone()),
            Maybe::Callable(f) => Maybe::Callable(Arc::clone(f)),
        }
    }
}

impl<A, T: fmt::Debug> fmt::Debug for Maybe<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Maybe::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Maybe::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

/// Truth-testing for resolved conditions.
///
/// Mirrors the usual scripting notion of truthiness: zero, empty text and
/// "nothing" are falsy, everything else is truthy.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Truthy for () {
    fn is_truthy(&self) -> bool {
        false
    }
}

impl Truthy for char {
    fn is_truthy(&self) -> bool {
        true
    }
}

macro_rules! truthy_int {
    ($($t:ty),*) => {
        $(impl Truthy for $t {
            fn is_truthy(&self) -> bool {
                *self != 0
            }
        })*
    };
}

truthy_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Truthy for f32 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for &str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

// Collections are objects, and objects are always truthy.
impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        true
    }
}
