//! WhileFlow - `while / do / break` as Data
//!
//! A `WhileFlow` owns a control predicate and an ordered list of body steps.
//! `run` does not loop in place: it arms a single tick on the injected
//! [`Scheduler`], and every tick runs one cycle and arms the next.
//!
//! ```text
//!  Idle --run--> Running --break / self-halt--> Idle
//! ```
//!
//! A cycle resolves the predicate, stores it as the flow value, then runs
//! the steps in registration order. A falsy predicate or a step returning
//! `false` halts the loop; otherwise the next tick is armed. Ticks carry the
//! generation of the `run` that armed them, so a tick left over from a
//! broken or restarted loop does nothing.
//!
//! No lock is held while user code runs: predicates and steps may call
//! `break_loop`, `do_step` or `run` on the flow that is executing them.

use crate::config::HaltPolicy;
use crate::scheduler::{Scheduler, TickHandle};
use crate::step::StepOutcome;
use parking_lot::Mutex;
use sluice_flow::{FlowError, FlowKind, FlowResult, FlowShape, Maybe, Truthy};
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// A body step, reduced to "should the loop stop?".
type Step<A> = Arc<dyn Fn(&A) -> bool + Send + Sync>;

struct LoopState<A, C> {
    looping: bool,
    generation: u64,
    pending: Option<TickHandle>,
    /// A cycle is executing user code outside the lock.
    in_cycle: bool,
    /// Arguments of a `run` issued while a cycle was in flight. The cycle
    /// arms them when it finishes so two cycles never overlap.
    restart: Option<Arc<A>>,
    value: Option<C>,
    cycles: u64,
    steps: Vec<Step<A>>,
    policy: HaltPolicy,
    label: Option<String>,
}

struct Shared<A, C> {
    id: Uuid,
    predicate: Maybe<A, C>,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<LoopState<A, C>>,
}

#[derive(Debug, Clone, Copy)]
enum Halt {
    Predicate,
    Step(usize),
}

/// Stops the loop if a predicate or step panics mid-cycle, so a later
/// `run` is not left waiting on a cycle that will never finish.
struct CycleGuard<'a, A, C>(&'a Mutex<LoopState<A, C>>);

impl<A, C> Drop for CycleGuard<'_, A, C> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut state = self.0.lock();
            state.in_cycle = false;
            state.looping = false;
            state.restart = None;
            state.pending = None;
        }
    }
}

impl<A, C> Shared<A, C>
where
    A: Send + Sync + 'static,
    C: Truthy + Clone + Send + Sync + 'static,
{
    /// Schedule the next cycle of the current generation.
    ///
    /// Called with the state locked; schedulers never fire a tick from
    /// inside `start`, so the tick cannot observe a half-armed state.
    fn arm(self: &Arc<Self>, state: &mut LoopState<A, C>, args: Arc<A>) {
        let next = Arc::clone(self);
        let generation = state.generation;
        let handle = self
            .scheduler
            .start(Box::new(move || next.tick(generation, args)));
        state.pending = Some(handle);
    }

    fn tick(self: &Arc<Self>, generation: u64, args: Arc<A>) {
        let steps = {
            let mut state = self.state.lock();
            if !state.looping || state.generation != generation {
                tracing::trace!(sluice.flow = %self.id, generation, "stale tick ignored");
                return;
            }
            state.pending = None;
            state.in_cycle = true;
            state.steps.clone()
        };
        let _guard = CycleGuard(&self.state);

        let value = self.predicate.resolve(&args);
        let proceed = value.is_truthy();
        if !proceed {
            let mut state = self.state.lock();
            if state.generation == generation {
                state.value = Some(value);
                self.halt(&mut state, Halt::Predicate);
            }
            self.end_cycle(&mut state);
            return;
        }
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                tracing::trace!(sluice.flow = %self.id, generation, "loop restarted before steps");
                self.end_cycle(&mut state);
                return;
            }
            state.value = Some(value);
        }

        // `position` stops at the first step asking to stop; later steps of
        // this cycle are skipped.
        let stopped_at = steps.iter().position(|step| step(&args));

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::trace!(sluice.flow = %self.id, generation, "loop restarted during cycle");
            self.end_cycle(&mut state);
            return;
        }
        state.cycles += 1;
        tracing::trace!(sluice.flow = %self.id, cycle = state.cycles, "cycle finished");

        match stopped_at {
            Some(index) => self.halt(&mut state, Halt::Step(index)),
            None if state.looping => self.arm(&mut state, args),
            None => tracing::trace!(sluice.flow = %self.id, "loop broken during cycle"),
        }
        state.in_cycle = false;
    }

    /// Leave the in-flight cycle and arm a `run` that was waiting for it.
    fn end_cycle(self: &Arc<Self>, state: &mut LoopState<A, C>) {
        state.in_cycle = false;
        if let Some(args) = state.restart.take() {
            if state.looping {
                self.arm(state, args);
            }
        }
    }

    fn halt(&self, state: &mut LoopState<A, C>, reason: Halt) {
        state.pending = None;
        if !state.looping {
            return;
        }
        if state.policy == HaltPolicy::Reset {
            state.looping = false;
        }
        tracing::debug!(
            sluice.flow = %self.id,
            ?reason,
            policy = ?state.policy,
            cycles = state.cycles,
            "loop halted"
        );
    }
}

/// Runtime-assembled `while` loop driven by a [`Scheduler`].
///
/// The flow is a cheap handle: clones share the same loop. A step that
/// needs the flow it belongs to should capture [`WhileFlow::downgrade`];
/// a strong clone inside a step keeps the loop alive forever.
///
/// # Example
/// ```rust
/// use sluice_runtime::{ManualScheduler, WhileFlow};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// # fn main() -> Result<(), sluice_flow::FlowError> {
/// let scheduler = Arc::new(ManualScheduler::new());
/// let counter = Arc::new(AtomicUsize::new(0));
/// let seen = Arc::clone(&counter);
///
/// let flow = WhileFlow::<()>::new(true, scheduler.clone());
/// flow.do_step(move |_| seen.fetch_add(1, Ordering::SeqCst) + 1 < 3)
///     .run(())?;
///
/// scheduler.run_until_idle(100);
/// assert_eq!(counter.load(Ordering::SeqCst), 3);
/// assert!(!flow.is_looping());
/// # Ok(())
/// # }
/// ```
pub struct WhileFlow<A, C = bool> {
    shared: Arc<Shared<A, C>>,
}

impl<A, C> Clone for WhileFlow<A, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A, C> WhileFlow<A, C>
where
    A: Send + Sync + 'static,
    C: Truthy + Clone + Send + Sync + 'static,
{
    pub fn new(predicate: impl Into<Maybe<A, C>>, scheduler: Arc<dyn Scheduler>) -> Self {
        let state = LoopState {
            looping: false,
            generation: 0,
            pending: None,
            in_cycle: false,
            restart: None,
            value: None,
            cycles: 0,
            steps: Vec::new(),
            policy: HaltPolicy::default(),
            label: None,
        };
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                predicate: predicate.into(),
                scheduler,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.shared.state.lock().label = Some(label.into());
        self
    }

    pub fn with_policy(self, policy: HaltPolicy) -> Self {
        self.shared.state.lock().policy = policy;
        self
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn downgrade(&self) -> WeakWhileFlow<A, C> {
        WeakWhileFlow {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Append a body step (`do`).
    ///
    /// Allowed in any state. A step added while looping runs from the next
    /// cycle on.
    pub fn do_step<F, O>(&self, step: F) -> &Self
    where
        F: Fn(&A) -> O + Send + Sync + 'static,
        O: StepOutcome,
    {
        let step: Step<A> = Arc::new(move |args: &A| step(args).is_stop());
        self.shared.state.lock().steps.push(step);
        self
    }

    /// Start looping with `args`. Returns as soon as the first tick is armed.
    ///
    /// Called while a cycle of a broken run is still executing, the first
    /// tick is armed only once that cycle returns.
    pub fn run(&self, args: A) -> FlowResult<&Self> {
        let mut state = self.shared.state.lock();
        if state.looping {
            tracing::warn!(sluice.flow = %self.shared.id, "run() on a loop that is still running");
            return Err(FlowError::AlreadyRunning);
        }
        state.looping = true;
        state.generation += 1;
        state.cycles = 0;
        let args = Arc::new(args);
        if state.in_cycle {
            state.restart = Some(args);
        } else {
            self.shared.arm(&mut state, args);
        }

        tracing::debug!(
            sluice.flow = %self.shared.id,
            sluice.label = state.label.as_deref().unwrap_or_default(),
            generation = state.generation,
            "loop started"
        );
        drop(state);
        Ok(self)
    }

    /// Stop looping and cancel the pending tick.
    pub fn break_loop(&self) -> FlowResult<&Self> {
        self.break_with(|| {})
    }

    /// Stop looping, cancel the pending tick, then call `on_stopped`.
    pub fn break_with<F>(&self, on_stopped: F) -> FlowResult<&Self>
    where
        F: FnOnce(),
    {
        let pending = {
            let mut state = self.shared.state.lock();
            if !state.looping {
                tracing::warn!(sluice.flow = %self.shared.id, "break on a loop that is not running");
                return Err(FlowError::NotRunning);
            }
            state.looping = false;
            state.restart = None;
            state.pending.take()
        };

        if let Some(handle) = pending {
            self.shared.scheduler.cancel(handle);
        }
        tracing::debug!(sluice.flow = %self.shared.id, "loop broken");

        on_stopped();
        Ok(self)
    }

    pub fn is_looping(&self) -> bool {
        self.shared.state.lock().looping
    }

    /// The most recent predicate result.
    pub fn value(&self) -> Option<C> {
        self.shared.state.lock().value.clone()
    }

    /// Cycles completed since the last `run`.
    pub fn cycles(&self) -> u64 {
        self.shared.state.lock().cycles
    }

    pub fn shape(&self) -> FlowShape {
        let state = self.shared.state.lock();
        FlowShape {
            id: self.shared.id,
            label: state.label.clone(),
            kind: FlowKind::While,
            conditions: 1,
            handlers: 0,
            has_fallback: false,
            steps: state.steps.len(),
        }
    }
}

/// Non-owning handle to a [`WhileFlow`], for steps that act on their own loop.
pub struct WeakWhileFlow<A, C = bool> {
    shared: Weak<Shared<A, C>>,
}

impl<A, C> Clone for WeakWhileFlow<A, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<A, C> WeakWhileFlow<A, C> {
    /// The flow, unless every strong handle has been dropped.
    pub fn upgrade(&self) -> Option<WhileFlow<A, C>> {
        self.shared.upgrade().map(|shared| WhileFlow { shared })
    }
}

impl<A, C> std::fmt::Debug for WhileFlow<A, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("WhileFlow")
            .field("id", &self.shared.id)
            .field("label", &state.label)
            .field("looping", &state.looping)
            .field("generation", &state.generation)
            .field("steps", &state.steps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use sluice_flow::maybe;
    use std::sync::OnceLock;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn manual() -> Arc<ManualScheduler> {
        Arc::new(ManualScheduler::new())
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[test]
    fn stops_after_the_step_returning_false() -> anyhow::Result<()> {
        let scheduler = manual();
        let count = counter();
        let seen = Arc::clone(&count);

        let flow = WhileFlow::<()>::new(maybe(|_: &()| true), scheduler.clone());
        flow.do_step(move |_| seen.fetch_add(1, Ordering::SeqCst) + 1 != 3)
            .run(())?;

        assert_eq!(scheduler.run_until_idle(100), 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(flow.cycles(), 3);
        assert_eq!(scheduler.pending(), 0);
        Ok(())
    }

    #[test]
    fn falsy_step_results_do_not_stop() -> anyhow::Result<()> {
        let scheduler = manual();
        let flow = WhileFlow::<()>::new(true, scheduler.clone());
        flow.do_step(|_| 0i32).do_step(|_| "").do_step(|_| ()).run(())?;

        assert_eq!(scheduler.run_until_idle(10), 10);
        assert!(flow.is_looping());
        assert_eq!(scheduler.pending(), 1);
        Ok(())
    }

    #[test]
    fn steps_run_in_registration_order() -> anyhow::Result<()> {
        let scheduler = manual();
        let log = Arc::new(Mutex::new(Vec::new()));
        let flow = WhileFlow::<()>::new(true, scheduler.clone());
        for name in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            flow.do_step(move |_| log.lock().push(name));
        }
        flow.run(())?;

        scheduler.run_until_idle(2);
        assert_eq!(*log.lock(), vec!["a", "b", "c", "a", "b", "c"]);
        Ok(())
    }

    #[test]
    fn steps_after_a_stop_are_skipped() -> anyhow::Result<()> {
        let scheduler = manual();
        let reached = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reached);

        let flow = WhileFlow::<()>::new(true, scheduler.clone());
        flow.do_step(|_| false)
            .do_step(move |_| flag.store(true, Ordering::SeqCst))
            .run(())?;

        scheduler.run_until_idle(10);
        assert!(!reached.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn break_before_run_fails() {
        let flow = WhileFlow::<()>::new(true, manual());
        assert_eq!(flow.break_loop().err(), Some(FlowError::NotRunning));
    }

    #[test]
    fn run_twice_fails_and_break_twice_fails() -> anyhow::Result<()> {
        let flow = WhileFlow::<()>::new(true, manual());
        flow.run(())?;

        assert_eq!(flow.run(()).err(), Some(FlowError::AlreadyRunning));
        assert!(flow.break_loop().is_ok());
        assert_eq!(flow.break_loop().err(), Some(FlowError::NotRunning));
        Ok(())
    }

    #[test]
    fn break_cancels_the_pending_tick_and_notifies() -> anyhow::Result<()> {
        let scheduler = manual();
        let count = counter();
        let seen = Arc::clone(&count);
        let mut notified = false;

        let flow = WhileFlow::<()>::new(true, scheduler.clone());
        flow.do_step(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .run(())?
        .break_with(|| notified = true)?;

        assert!(notified);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!flow.is_looping());
        Ok(())
    }

    #[test]
    fn falsy_predicate_resets_by_default() -> anyhow::Result<()> {
        let scheduler = manual();
        let flow = WhileFlow::<u32, u32>::new(maybe(|n: &u32| *n), scheduler.clone());
        flow.do_step(|_| true).run(0)?;

        assert_eq!(scheduler.run_until_idle(10), 1);
        assert_eq!(flow.value(), Some(0));
        assert!(!flow.is_looping());
        assert_eq!(flow.break_loop().err(), Some(FlowError::NotRunning));

        flow.run(2)?;
        assert_eq!(scheduler.run_until_idle(3), 3);
        assert_eq!(flow.value(), Some(2));
        Ok(())
    }

    #[test]
    fn latch_policy_keeps_looping_until_break() -> anyhow::Result<()> {
        let scheduler = manual();
        let flow = WhileFlow::<()>::new(false, scheduler.clone()).with_policy(HaltPolicy::Latch);
        flow.run(())?;

        scheduler.run_until_idle(10);
        assert_eq!(scheduler.pending(), 0);
        assert!(flow.is_looping());
        assert_eq!(flow.run(()).err(), Some(FlowError::AlreadyRunning));
        assert!(flow.break_loop().is_ok());
        Ok(())
    }

    #[test]
    fn value_is_visible_to_steps() -> anyhow::Result<()> {
        let scheduler = manual();
        let observed = Arc::new(Mutex::new(None));
        let flow = WhileFlow::<()>::new(true, scheduler.clone());

        let handle = flow.downgrade();
        let sink = Arc::clone(&observed);
        flow.do_step(move |_| {
            *sink.lock() = handle.upgrade().and_then(|flow| flow.value());
            false
        })
        .run(())?;

        scheduler.run_until_idle(10);
        assert_eq!(*observed.lock(), Some(true));
        Ok(())
    }

    #[test]
    fn break_inside_a_step_prevents_the_next_tick() -> anyhow::Result<()> {
        let scheduler = manual();
        let count = counter();
        let flow = WhileFlow::<()>::new(true, scheduler.clone());

        let handle = flow.downgrade();
        let seen = Arc::clone(&count);
        flow.do_step(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                if let Some(flow) = handle.upgrade() {
                    let _ = flow.break_loop();
                }
            }
        })
        .run(())?;

        assert_eq!(scheduler.run_until_idle(10), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!flow.is_looping());
        Ok(())
    }

    #[test]
    fn restart_inside_a_step_leaves_a_single_loop() -> anyhow::Result<()> {
        let scheduler = manual();
        let flow = WhileFlow::<u8>::new(true, scheduler.clone());

        let handle = flow.downgrade();
        flow.do_step(move |round: &u8| {
            if let (1, Some(flow)) = (*round, handle.upgrade()) {
                let _ = flow.break_loop();
                let _ = flow.run(2);
            }
        })
        .run(1)?;

        scheduler.run_until_idle(5);
        assert!(flow.is_looping());
        assert_eq!(scheduler.pending(), 1);
        Ok(())
    }

    #[test]
    fn weak_handle_in_a_step_lets_the_loop_drop() -> anyhow::Result<()> {
        let scheduler = manual();
        let flow = WhileFlow::<()>::new(true, scheduler.clone());
        let handle = flow.downgrade();
        let inner = handle.clone();
        flow.do_step(move |_| inner.upgrade().is_some_and(|flow| flow.cycles() < 2))
            .run(())?;

        scheduler.run_next();
        assert!(handle.upgrade().is_some());
        flow.break_loop()?;
        drop(flow);

        assert_eq!(scheduler.pending(), 0);
        assert!(handle.upgrade().is_none());
        Ok(())
    }

    #[test]
    fn run_during_a_cycle_waits_for_it() -> anyhow::Result<()> {
        let scheduler = manual();
        let starts = Arc::new(Mutex::new(Vec::new()));
        let flow = WhileFlow::<u8>::new(true, scheduler.clone());

        let armed_inside = Arc::new(AtomicUsize::new(usize::MAX));

        let handle = flow.downgrade();
        let log = Arc::clone(&starts);
        let armed = Arc::clone(&armed_inside);
        let queue = scheduler.clone();
        flow.do_step(move |round: &u8| {
            log.lock().push(*round);
            if *round == 1 {
                if let Some(flow) = handle.upgrade() {
                    let _ = flow.break_loop();
                    let _ = flow.run(2);
                    armed.store(queue.pending(), Ordering::SeqCst);
                }
            }
        })
        .run(1)?;

        assert!(scheduler.run_next());
        // The restarted run is armed only once the first cycle has returned.
        assert_eq!(armed_inside.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 1);
        scheduler.run_next();
        assert_eq!(*starts.lock(), vec![1, 2]);
        assert_eq!(flow.cycles(), 1);
        Ok(())
    }

    #[test]
    fn stale_cycle_does_not_overwrite_the_value() -> anyhow::Result<()> {
        let scheduler = manual();
        let slot: Arc<OnceLock<WeakWhileFlow<u32, u32>>> = Arc::new(OnceLock::new());
        let owner = Arc::clone(&slot);

        let flow = WhileFlow::<u32, u32>::new(
            maybe(move |n: &u32| {
                if *n == 1 {
                    if let Some(flow) = owner.get().and_then(WeakWhileFlow::upgrade) {
                        let _ = flow.break_loop();
                        let _ = flow.run(5);
                    }
                }
                *n
            }),
            scheduler.clone(),
        );
        let _ = slot.set(flow.downgrade());
        flow.run(1)?;

        scheduler.run_next();
        assert_eq!(flow.value(), None);
        scheduler.run_next();
        assert_eq!(flow.value(), Some(5));
        Ok(())
    }

    #[test]
    fn panicking_step_stops_the_loop() -> anyhow::Result<()> {
        let scheduler = manual();
        let flow = WhileFlow::<()>::new(true, scheduler.clone());
        flow.do_step(|_: &()| -> bool { panic!("step failed") }).run(())?;

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scheduler.run_next();
        }));
        assert!(outcome.is_err());
        assert!(!flow.is_looping());

        flow.run(())?;
        assert_eq!(scheduler.pending(), 1);
        Ok(())
    }

    #[test]
    fn step_added_while_running_joins_the_next_cycle() -> anyhow::Result<()> {
        let scheduler = manual();
        let late = counter();
        let flow = WhileFlow::<()>::new(true, scheduler.clone());
        flow.run(())?;

        scheduler.run_next();
        let seen = Arc::clone(&late);
        flow.do_step(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.run_until_idle(2);

        assert_eq!(late.load(Ordering::SeqCst), 2);
        assert_eq!(flow.shape().steps, 1);
        Ok(())
    }

    #[test]
    fn arguments_reach_predicate_and_steps() -> anyhow::Result<()> {
        let scheduler = manual();
        let total = counter();
        let sink = Arc::clone(&total);

        let flow = WhileFlow::<usize>::new(maybe(|limit: &usize| *limit > 0), scheduler.clone());
        flow.do_step(move |step: &usize| sink.fetch_add(*step, Ordering::SeqCst) + step < 20)
            .run(5)?;

        scheduler.run_until_idle(100);
        assert_eq!(total.load(Ordering::SeqCst), 20);
        assert_eq!(flow.cycles(), 4);
        Ok(())
    }

    #[test]
    fn shape_describes_the_loop() {
        let flow = WhileFlow::<()>::new(true, manual()).with_label("poller");
        flow.do_step(|_| ()).do_step(|_| ());

        let shape = flow.shape();
        assert_eq!(shape.kind, FlowKind::While);
        assert_eq!(shape.steps, 2);
        assert_eq!(shape.label.as_deref(), Some("poller"));
    }
}
