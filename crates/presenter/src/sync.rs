//! Producer/consumer handshake between the emulation thread and the display
//! thread.
//!
//! `FrameGate` owns the frame content behind a buffer-content lock plus a
//! small state block guarded by a second mutex and a condition variable.
//! "Front buffer ready" is a comparison of two monotonically increasing
//! generation counters (`produced > consumed`) instead of a boolean, so a
//! consumer that wakes after several producer signals still sees exactly
//! one pending frame and can report how many it skipped.
//!
//! Lock order is always content → state. Waits on the condition variable
//! hold only the state lock.

use std::convert::Infallible;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mode flags a producer declares when it is attached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProducerFlags {
    pub double_buffered: bool,
    pub renders_via_legacy: bool,
    /// Initial value; toggled at runtime through [`FrameGate::set_speed_modified`].
    pub speed_modified: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Render whatever is current without waiting.
    SpeedModified,
    /// Wait for a new generation, render it, acknowledge it.
    DoubleBuffered,
    /// Render under the content lock only.
    SingleLocked,
}

impl SyncPolicy {
    /// Legacy-API producers always hand frames over through the ready
    /// handshake because the unified input texture is what they publish.
    pub fn select(renders_via_legacy: bool, speed_modified: bool, double_buffered: bool) -> Self {
        if speed_modified {
            Self::SpeedModified
        } else if double_buffered || renders_via_legacy {
            Self::DoubleBuffered
        } else {
            Self::SingleLocked
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Producer is paused and no completed frame is pending.
    Paused,
    /// The gate was shut down.
    ShutDown,
    /// No frame arrived within the configured wait timeout.
    TimedOut,
    /// Producer object missing or asked not to be presented.
    NoProducer,
}

#[derive(Debug)]
pub struct RenderedFrame<R> {
    pub value: R,
    pub policy: SyncPolicy,
    /// Producer generation visible while rendering.
    pub generation: u64,
    /// Generations published since the last acknowledged frame that were
    /// never rendered. Only tracked under [`SyncPolicy::DoubleBuffered`].
    pub superseded: u64,
}

#[derive(Debug)]
pub enum Presented<R> {
    Rendered(RenderedFrame<R>),
    Skipped(SkipReason),
}

impl<R> Presented<R> {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Rendered(_) => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }
}

#[derive(Debug)]
pub struct Publication<R> {
    pub value: R,
    pub generation: u64,
    /// True when the producer blocked on back-pressure before writing.
    pub waited: bool,
}

#[derive(Debug, Default)]
struct SyncState {
    produced: u64,
    consumed: u64,
    paused: bool,
    speed_modified: bool,
    shutdown: bool,
}

impl SyncState {
    fn front_buffer_ready(&self) -> bool {
        self.produced > self.consumed
    }
}

#[derive(Debug)]
pub struct FrameGate<T> {
    double_buffered: bool,
    renders_via_legacy: bool,
    wait_timeout: Option<Duration>,
    state: Mutex<SyncState>,
    signal: Condvar,
    content: Mutex<T>,
}

impl<T> FrameGate<T> {
    pub fn new(content: T, flags: ProducerFlags) -> Self {
        Self {
            double_buffered: flags.double_buffered,
            renders_via_legacy: flags.renders_via_legacy,
            wait_timeout: None,
            state: Mutex::new(SyncState {
                speed_modified: flags.speed_modified,
                ..SyncState::default()
            }),
            signal: Condvar::new(),
            content: Mutex::new(content),
        }
    }

    /// Bounds every blocking wait. On expiry the consumer skips the tick and
    /// the producer writes anyway.
    pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout.filter(|timeout| !timeout.is_zero());
        self
    }

    pub fn flags(&self) -> ProducerFlags {
        ProducerFlags {
            double_buffered: self.double_buffered,
            renders_via_legacy: self.renders_via_legacy,
            speed_modified: self.lock_state().speed_modified,
        }
    }

    pub fn policy(&self) -> SyncPolicy {
        let speed_modified = self.lock_state().speed_modified;
        SyncPolicy::select(self.renders_via_legacy, speed_modified, self.double_buffered)
    }

    pub fn generation(&self) -> u64 {
        self.lock_state().produced
    }

    pub fn front_buffer_ready(&self) -> bool {
        self.lock_state().front_buffer_ready()
    }

    pub fn is_paused(&self) -> bool {
        self.lock_state().paused
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock_state().shutdown
    }

    /// Wakes every waiter so blocked consumers re-check their predicate.
    pub fn set_paused(&self, paused: bool) {
        let mut state = self.lock_state();
        if state.paused != paused {
            tracing::debug!(paused, "producer pause state changed");
        }
        state.paused = paused;
        self.signal.notify_all();
    }

    pub fn set_speed_modified(&self, speed_modified: bool) {
        let mut state = self.lock_state();
        if state.speed_modified != speed_modified {
            tracing::debug!(speed_modified, "producer speed mode changed");
        }
        state.speed_modified = speed_modified;
        self.signal.notify_all();
    }

    /// Releases every current and future wait. Irreversible.
    pub fn shutdown(&self) {
        self.lock_state().shutdown = true;
        self.signal.notify_all();
    }

    /// Runs `inspect` under the content lock without touching sync state.
    pub fn with_content<R>(&self, inspect: impl FnOnce(&mut T) -> R) -> R {
        inspect(&mut self.lock_content())
    }

    /// Consumer side: renders one display tick under the current policy.
    pub fn present<R>(&self, render: impl FnOnce(&mut T) -> R) -> Presented<R> {
        let (policy, shutdown) = {
            let state = self.lock_state();
            (
                SyncPolicy::select(
                    self.renders_via_legacy,
                    state.speed_modified,
                    self.double_buffered,
                ),
                state.shutdown,
            )
        };
        if shutdown {
            return Presented::Skipped(SkipReason::ShutDown);
        }

        match policy {
            SyncPolicy::DoubleBuffered => self.present_double_buffered(render),
            SyncPolicy::SpeedModified | SyncPolicy::SingleLocked => {
                self.present_unsynchronised(policy, render)
            }
        }
    }

    fn present_unsynchronised<R>(
        &self,
        policy: SyncPolicy,
        render: impl FnOnce(&mut T) -> R,
    ) -> Presented<R> {
        let mut content = self.lock_content();
        let generation = self.lock_state().produced;
        let value = render(&mut content);
        Presented::Rendered(RenderedFrame {
            value,
            policy,
            generation,
            superseded: 0,
        })
    }

    fn present_double_buffered<R>(&self, render: impl FnOnce(&mut T) -> R) -> Presented<R> {
        let state = self.lock_state();
        let (state, timed_out) = self.wait(state, |state| {
            !state.front_buffer_ready()
                && !state.paused
                && !state.shutdown
                && !state.speed_modified
        });

        if state.shutdown {
            return Presented::Skipped(SkipReason::ShutDown);
        }
        if !state.front_buffer_ready() {
            if state.speed_modified {
                drop(state);
                return self.present_unsynchronised(SyncPolicy::SpeedModified, render);
            }
            let reason = if state.paused {
                SkipReason::Paused
            } else {
                debug_assert!(timed_out);
                SkipReason::TimedOut
            };
            return Presented::Skipped(reason);
        }
        drop(state);

        let mut content = self.lock_content();
        let generation = self.lock_state().produced;
        let value = render(&mut content);

        let mut state = self.lock_state();
        let superseded = generation.saturating_sub(state.consumed + 1);
        state.consumed = state.consumed.max(generation);
        self.signal.notify_all();
        drop(state);
        drop(content);

        if superseded > 0 {
            tracing::debug!(generation, superseded, "frames superseded before display");
        }
        Presented::Rendered(RenderedFrame {
            value,
            policy: SyncPolicy::DoubleBuffered,
            generation,
            superseded,
        })
    }

    /// Producer side: writes a finished frame and signals it as ready.
    ///
    /// Double-buffered producers first wait until the previous frame was
    /// acknowledged. Returns `None` once the gate is shut down.
    pub fn publish<R>(&self, write: impl FnOnce(&mut T) -> R) -> Option<Publication<R>> {
        self.try_publish(|content| Ok::<_, Infallible>(write(content)))
            .map(|result| match result {
                Ok(publication) => publication,
                Err(never) => match never {},
            })
    }

    /// Like [`Self::publish`], but a failed write leaves the generation
    /// untouched so the consumer never treats it as a new frame.
    pub fn try_publish<R, E>(
        &self,
        write: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<Publication<R>, E>> {
        let mut waited = false;
        {
            let state = self.lock_state();
            if state.shutdown {
                return None;
            }
            if self.double_buffered && state.front_buffer_ready() && !state.speed_modified {
                waited = true;
                let (state, timed_out) = self.wait(state, |state| {
                    state.front_buffer_ready() && !state.shutdown && !state.speed_modified
                });
                if state.shutdown {
                    return None;
                }
                if timed_out {
                    tracing::debug!(
                        produced = state.produced,
                        consumed = state.consumed,
                        "consumer did not acknowledge in time; overwriting pending frame"
                    );
                }
            }
        }

        let mut content = self.lock_content();
        let value = match write(&mut content) {
            Ok(value) => value,
            Err(err) => return Some(Err(err)),
        };
        let mut state = self.lock_state();
        state.produced += 1;
        let generation = state.produced;
        self.signal.notify_all();
        drop(state);
        drop(content);

        Some(Ok(Publication {
            value,
            generation,
            waited,
        }))
    }

    fn wait<'a>(
        &self,
        guard: MutexGuard<'a, SyncState>,
        condition: impl FnMut(&mut SyncState) -> bool,
    ) -> (MutexGuard<'a, SyncState>, bool) {
        match self.wait_timeout {
            Some(timeout) => {
                let (guard, result) = self
                    .signal
                    .wait_timeout_while(guard, timeout, condition)
                    .unwrap_or_else(PoisonError::into_inner);
                (guard, result.timed_out())
            }
            None => (
                self.signal
                    .wait_while(guard, condition)
                    .unwrap_or_else(PoisonError::into_inner),
                false,
            ),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_content(&self) -> MutexGuard<'_, T> {
        self.content.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use super::*;

    fn double_buffered() -> ProducerFlags {
        ProducerFlags {
            double_buffered: true,
            ..ProducerFlags::default()
        }
    }

    #[test]
    fn policy_selection_covers_every_flag_combination() {
        use SyncPolicy::*;
        for legacy in [false, true] {
            for double in [false, true] {
                assert_eq!(SyncPolicy::select(legacy, true, double), SpeedModified);
            }
        }
        assert_eq!(SyncPolicy::select(false, false, true), DoubleBuffered);
        assert_eq!(SyncPolicy::select(true, false, false), DoubleBuffered);
        assert_eq!(SyncPolicy::select(false, false, false), SingleLocked);
    }

    #[test]
    fn double_buffered_renders_each_generation_once() {
        let gate = FrameGate::new(0u32, double_buffered())
            .with_wait_timeout(Some(Duration::from_millis(20)));

        gate.publish(|frame| *frame = 1).unwrap();
        let first = gate.present(|frame| *frame);
        match first {
            Presented::Rendered(frame) => {
                assert_eq!(frame.value, 1);
                assert_eq!(frame.generation, 1);
                assert_eq!(frame.superseded, 0);
            }
            Presented::Skipped(reason) => panic!("unexpected skip: {reason:?}"),
        }
        assert!(!gate.front_buffer_ready());

        let second = gate.present(|frame| *frame);
        assert_eq!(second.skip_reason(), Some(SkipReason::TimedOut));
    }

    #[test]
    fn superseded_generations_are_reported() {
        let flags = ProducerFlags {
            renders_via_legacy: true,
            ..ProducerFlags::default()
        };
        let gate = FrameGate::new(0u32, flags);
        for value in 1..=3 {
            gate.publish(|frame| *frame = value).unwrap();
        }

        match gate.present(|frame| *frame) {
            Presented::Rendered(frame) => {
                assert_eq!(frame.value, 3);
                assert_eq!(frame.generation, 3);
                assert_eq!(frame.superseded, 2);
            }
            Presented::Skipped(reason) => panic!("unexpected skip: {reason:?}"),
        }
    }

    #[test]
    fn pause_skips_without_waiting() {
        let gate = FrameGate::new((), double_buffered());
        gate.set_paused(true);
        assert_eq!(
            gate.present(|_| ()).skip_reason(),
            Some(SkipReason::Paused)
        );

        // A frame completed before pausing is still shown.
        gate.set_paused(false);
        gate.publish(|_| ()).unwrap();
        gate.set_paused(true);
        assert!(gate.present(|_| ()).is_rendered());
    }

    #[test]
    fn pause_wakes_blocked_consumer() {
        let gate = Arc::new(FrameGate::new((), double_buffered()));
        let consumer = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.present(|_| ()).skip_reason())
        };

        thread::sleep(Duration::from_millis(30));
        let started = Instant::now();
        gate.set_paused(true);
        let reason = consumer.join().unwrap();
        assert_eq!(reason, Some(SkipReason::Paused));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn shutdown_releases_producer_back_pressure() {
        let gate = Arc::new(FrameGate::new((), double_buffered()));
        gate.publish(|_| ()).unwrap();

        let producer = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.publish(|_| ()).is_none())
        };
        thread::sleep(Duration::from_millis(30));
        gate.shutdown();

        assert!(producer.join().unwrap());
        assert_eq!(
            gate.present(|_| ()).skip_reason(),
            Some(SkipReason::ShutDown)
        );
    }

    #[test]
    fn failed_write_does_not_signal() {
        let gate = FrameGate::new(0u32, ProducerFlags::default());
        let result = gate.try_publish(|_| Err::<(), _>("copy failed")).unwrap();
        assert!(result.is_err());
        assert_eq!(gate.generation(), 0);
        assert!(!gate.front_buffer_ready());
    }

    #[test]
    fn single_locked_renders_without_bookkeeping() {
        let gate = FrameGate::new(5u8, ProducerFlags::default());
        assert_eq!(gate.policy(), SyncPolicy::SingleLocked);
        for _ in 0..3 {
            match gate.present(|frame| *frame) {
                Presented::Rendered(frame) => {
                    assert_eq!(frame.value, 5);
                    assert_eq!(frame.policy, SyncPolicy::SingleLocked);
                }
                Presented::Skipped(reason) => panic!("unexpected skip: {reason:?}"),
            }
        }
        assert_eq!(gate.generation(), 0);
    }

    #[test]
    fn speed_modified_toggle_releases_waiting_consumer() {
        let gate = Arc::new(FrameGate::new(9u8, double_buffered()));
        let consumer = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || match gate.present(|frame| *frame) {
                Presented::Rendered(frame) => Some(frame.policy),
                Presented::Skipped(_) => None,
            })
        };

        thread::sleep(Duration::from_millis(30));
        gate.set_speed_modified(true);
        assert_eq!(consumer.join().unwrap(), Some(SyncPolicy::SpeedModified));
    }
}
