use std::ops::ControlFlow;

/// Return values a loop body step may produce.
///
/// Only an explicit stop ends the loop: `false` or `ControlFlow::Break`.
/// Merely falsy values such as `0`, `""` or `()` keep it going.
pub trait StepOutcome {
    fn is_stop(&self) -> bool {
        false
    }
}

impl StepOutcome for bool {
    fn is_stop(&self) -> bool {
        !*self
    }
}

impl<B, C> StepOutcome for ControlFlow<B, C> {
    fn is_stop(&self) -> bool {
        self.is_break()
    }
}

impl<T> StepOutcome for Option<T> {}

impl StepOutcome for () {}
impl StepOutcome for String {}
impl StepOutcome for &str {}

macro_rules! never_stops {
    ($($t:ty),*) => {
        $(impl StepOutcome for $t {})*
    };
}

never_stops!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
