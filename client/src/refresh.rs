//! Single-flight token refresh.
//!
//! The first request to see an expired token becomes the *leader* and performs the
//! refresh call. Every request that hits an expired token while that call is in
//! flight becomes a *follower*: it parks a oneshot sender in a FIFO and waits. When
//! the leader settles, followers are released in arrival order with the same
//! outcome, either the new access token or the refresh error.
//!
//! The queue lives behind a `std::sync::Mutex` owned by each client instance. The
//! lock is only ever held for bookkeeping, never across an `.await`.

use crate::error::RefreshError;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot;

pub(crate) type Outcome = Result<String, RefreshError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

/// What a request that saw an expired token should do next.
pub(crate) enum Join {
    /// Nobody is refreshing: this caller must perform the refresh.
    Leader,
    /// A refresh is in flight: wait for its outcome.
    Follower(oneshot::Receiver<Outcome>),
}

#[derive(Debug)]
pub(crate) struct RefreshQueue {
    phase: RefreshPhase,
    waiting: VecDeque<oneshot::Sender<Outcome>>,
}

impl Default for RefreshQueue {
    fn default() -> Self {
        Self {
            phase: RefreshPhase::Idle,
            waiting: VecDeque::new(),
        }
    }
}

impl RefreshQueue {
    pub(crate) fn phase(&self) -> RefreshPhase {
        self.phase
    }

    #[cfg(test)]
    pub(crate) fn waiting(&self) -> usize {
        self.waiting.len()
    }

    /// Called when a request sees an expired token.
    pub(crate) fn join(&mut self) -> Join {
        match self.phase {
            RefreshPhase::Idle => {
                self.phase = RefreshPhase::Refreshing;
                Join::Leader
            }
            RefreshPhase::Refreshing => {
                let (tx, rx) = oneshot::channel();
                self.waiting.push_back(tx);
                Join::Follower(rx)
            }
        }
    }

    /// Releases every follower, oldest first, and returns to `Idle`.
    ///
    /// Returns how many followers were released.
    pub(crate) fn settle(&mut self, outcome: &Outcome) -> usize {
        let mut released = 0;
        while let Some(waiter) = self.waiting.pop_front() {
            // A follower that was dropped (caller cancelled) just misses the message.
            let _ = waiter.send(outcome.clone());
            released += 1;
        }
        self.phase = RefreshPhase::Idle;
        released
    }
}

/// Held by the leader while it refreshes.
///
/// The queue is settled exactly once: explicitly through [`RefreshGuard::finish`],
/// or on drop with [`RefreshError::Abandoned`] if the leader's future is dropped
/// mid-refresh. Either way the queue ends up `Idle`.
pub(crate) struct RefreshGuard<'a> {
    queue: &'a Mutex<RefreshQueue>,
    settled: bool,
}

impl<'a> RefreshGuard<'a> {
    pub(crate) fn new(queue: &'a Mutex<RefreshQueue>) -> Self {
        Self {
            queue,
            settled: false,
        }
    }

    pub(crate) fn finish(mut self, outcome: &Outcome) -> usize {
        self.settled = true;
        lock(self.queue).settle(outcome)
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            lock(self.queue).settle(&Err(RefreshError::Abandoned));
        }
    }
}

pub(crate) fn lock(queue: &Mutex<RefreshQueue>) -> std::sync::MutexGuard<'_, RefreshQueue> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}
