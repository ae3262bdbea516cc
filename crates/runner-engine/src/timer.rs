//! Cooperative timers.
//!
//! A [`TimerQueue`] never calls back into its owner. [`TimerQueue::advance`]
//! moves every unpaused timer forward and queues a [`TimerFired`] for each
//! expiry; the owner drains them at its next tick boundary. An event is
//! delivered exactly once, and cancelling a timer also discards any of its
//! events that were queued but not yet drained.
//!
//! ```
//! use std::time::Duration;
//! use runner_engine::timer::TimerQueue;
//!
//! let mut timers = TimerQueue::new();
//! let spawn = timers.add_looping(Duration::from_millis(500), "spawn");
//! timers.advance(Duration::from_millis(1200));
//!
//! let fired: Vec<_> = timers.drain().into_iter().map(|f| f.event).collect();
//! assert_eq!(fired, ["spawn", "spawn"]);
//! assert_eq!(timers.remaining(spawn), Some(Duration::from_millis(300)));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Shortest delay a timer can have. Zero would make a looping timer fire
/// without bound.
pub const MIN_DELAY: Duration = Duration::from_millis(1);

/// Handle to a timer in a [`TimerQueue`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({})", self.0)
    }
}

/// A timer expiry waiting to be handled.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerFired<E> {
    pub id: TimerId,
    pub event: E,
}

#[derive(Debug)]
struct Timer<E> {
    event: E,
    delay: Duration,
    remaining: Duration,
    looping: bool,
    paused: bool,
}

/// An ordered set of one-shot and looping timers.
#[derive(Debug)]
pub struct TimerQueue<E> {
    timers: BTreeMap<TimerId, Timer<E>>,
    fired: Vec<TimerFired<E>>,
    next_id: u64,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            timers: BTreeMap::new(),
            fired: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E: Clone> TimerQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `event` once after `delay`.
    pub fn add_once(&mut self, delay: Duration, event: E) -> TimerId {
        self.insert(delay, event, false)
    }

    /// Fire `event` every `delay` until cancelled.
    pub fn add_looping(&mut self, delay: Duration, event: E) -> TimerId {
        self.insert(delay, event, true)
    }

    fn insert(&mut self, delay: Duration, event: E, looping: bool) -> TimerId {
        let delay = delay.max(MIN_DELAY);
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(
            id,
            Timer {
                event,
                delay,
                remaining: delay,
                looping,
                paused: false,
            },
        );
        id
    }

    /// Move every unpaused timer forward by `dt`.
    ///
    /// Expiries are queued in chronological order; expiries at the same
    /// instant are ordered by timer creation.
    pub fn advance(&mut self, dt: Duration) {
        let mut expiries: Vec<(Duration, TimerId)> = Vec::new();
        let mut finished = Vec::new();

        for (&id, timer) in self.timers.iter_mut() {
            if timer.paused {
                continue;
            }
            if timer.remaining > dt {
                timer.remaining -= dt;
                continue;
            }

            let mut at = timer.remaining;
            expiries.push((at, id));
            if !timer.looping {
                finished.push(id);
                continue;
            }
            while at + timer.delay <= dt {
                at += timer.delay;
                expiries.push((at, id));
            }
            timer.remaining = at + timer.delay - dt;
        }

        expiries.sort();
        for (_, id) in expiries {
            if let Some(timer) = self.timers.get(&id) {
                trace!(timer = ?id, "timer fired");
                self.fired.push(TimerFired {
                    id,
                    event: timer.event.clone(),
                });
            }
        }
        for id in finished {
            self.timers.remove(&id);
        }
    }

    /// Take every queued expiry, oldest first.
    pub fn drain(&mut self) -> Vec<TimerFired<E>> {
        std::mem::take(&mut self.fired)
    }

    /// Expiries queued but not yet drained.
    pub fn pending_events(&self) -> usize {
        self.fired.len()
    }

    /// Stop a timer from advancing. Returns `false` for unknown timers.
    pub fn pause(&mut self, id: TimerId) -> bool {
        self.set_paused(id, true)
    }

    pub fn resume(&mut self, id: TimerId) -> bool {
        self.set_paused(id, false)
    }

    fn set_paused(&mut self, id: TimerId, paused: bool) -> bool {
        match self.timers.get_mut(&id) {
            Some(timer) => {
                timer.paused = paused;
                true
            }
            None => false,
        }
    }

    pub fn pause_all(&mut self) {
        for timer in self.timers.values_mut() {
            timer.paused = true;
        }
    }

    pub fn resume_all(&mut self) {
        for timer in self.timers.values_mut() {
            timer.paused = false;
        }
    }

    /// Remove a timer and discard its undelivered events.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.fired.retain(|f| f.id != id);
        self.timers.remove(&id).is_some()
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        self.timers.clear();
        self.fired.clear();
    }

    /// Time until the timer next fires.
    pub fn remaining(&self, id: TimerId) -> Option<Duration> {
        self.timers.get(&id).map(|t| t.remaining)
    }

    /// Remaining time of every live timer, in creation order.
    pub fn remaining_all(&self) -> Vec<(TimerId, Duration)> {
        self.timers
            .iter()
            .map(|(&id, t)| (id, t.remaining))
            .collect()
    }

    pub fn is_paused(&self, id: TimerId) -> Option<bool> {
        self.timers.get(&id).map(|t| t.paused)
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
