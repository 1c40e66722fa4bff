//! Reusable barrier for N-way rendezvous with bounded waiting.
//!
//! The barrier trips when `parties` callers have arrived. Exactly one
//! caller observes `is_leader = true` per generation. The generation
//! counter — not a boolean — is what makes immediate reuse safe: a
//! waiter woken spuriously, or woken late while the next wave is
//! already gathering, compares its remembered generation and goes back
//! to sleep unless its own wave has actually tripped.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::BarrierWaitError;

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    generation: u64,
}

/// Reusable rendezvous point for a fixed party of threads.
#[derive(Debug)]
pub struct CyclicBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl CyclicBarrier {
    /// Creates a new barrier that trips when `parties` have arrived.
    ///
    /// # Panics
    /// Panics if `parties == 0`.
    #[must_use]
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "barrier requires at least 1 party");
        Self {
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Returns the number of parties required to trip the barrier.
    #[must_use]
    pub const fn parties(&self) -> usize {
        self.parties
    }

    /// Current generation; increments each time the barrier trips.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.lock().expect("barrier lock poisoned").generation
    }

    /// Blocks until `parties` threads have called `wait` for the
    /// current generation, then releases all of them together.
    ///
    /// The caller that completes the party advances the generation
    /// before any waiter can observe it, and is the one that sees
    /// `is_leader() == true`.
    pub fn wait(&self) -> BarrierWaitResult {
        let mut state = self.state.lock().expect("barrier lock poisoned");
        let local_gen = state.generation;
        state.arrived += 1;

        if state.arrived == self.parties {
            // Trip the barrier and advance the generation.
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            drop(state);
            self.cvar.notify_all();
            return BarrierWaitResult { is_leader: true };
        }

        loop {
            if state.generation != local_gen {
                return BarrierWaitResult { is_leader: false };
            }
            state = self.cvar.wait(state).expect("barrier lock poisoned");
        }
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`.
    ///
    /// A timed-out caller withdraws its arrival under the lock, so the
    /// current generation still needs the full party and every later
    /// generation remains reachable. If the barrier trips while the
    /// caller is timing out, the trip wins and the caller returns
    /// released rather than timed out.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<BarrierWaitResult, BarrierWaitError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().expect("barrier lock poisoned");
        let local_gen = state.generation;
        state.arrived += 1;

        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            drop(state);
            self.cvar.notify_all();
            return Ok(BarrierWaitResult { is_leader: true });
        }

        loop {
            if state.generation != local_gen {
                return Ok(BarrierWaitResult { is_leader: false });
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                state.arrived -= 1;
                return Err(BarrierWaitError::Timeout);
            }
            let (guard, _) = self
                .cvar
                .wait_timeout(state, remaining)
                .expect("barrier lock poisoned");
            state = guard;
        }
    }
}

/// Result of a barrier wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    is_leader: bool,
}

impl BarrierWaitResult {
    /// Returns true for exactly one party (the leader) each generation.
    #[must_use]
    pub const fn is_leader(&self) -> bool {
        self.is_leader
    }
}
