//! Shared cancellation signal with an optional deadline.

use crate::error::Error;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Why a token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// `cancel()` was called on the token or one of its ancestors.
    Cancelled,
    /// The token's deadline passed.
    DeadlineExceeded,
}

impl CancelReason {
    pub fn into_error(self) -> Error {
        match self {
            CancelReason::Cancelled => Error::Cancelled,
            CancelReason::DeadlineExceeded => Error::DeadlineExceeded,
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => f.write_str("cancelled"),
            CancelReason::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    reason: Option<CancelReason>,
    children: Vec<Weak<Inner>>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    cond: Condvar,
    deadline: Option<Instant>,
}

impl Inner {
    fn new(deadline: Option<Instant>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            cond: Condvar::new(),
            deadline,
        }
    }

    /// Records `reason` if the token is still live, then wakes waiters and
    /// cascades to children. The guard is released before children are
    /// touched so locks are only ever taken parent-to-child.
    ///
    /// A deadline that has already passed wins over `reason`, even if no one
    /// polled the token in between.
    fn fire(&self, mut state: MutexGuard<'_, State>, reason: CancelReason) {
        if state.reason.is_some() {
            return;
        }
        let reason = match self.deadline {
            Some(deadline) if Instant::now() >= deadline => CancelReason::DeadlineExceeded,
            _ => reason,
        };
        state.reason = Some(reason);
        let children = std::mem::take(&mut state.children);
        drop(state);

        self.cond.notify_all();

        for child in children.iter().filter_map(Weak::upgrade) {
            let guard = child.state.lock();
            child.fire(guard, reason);
        }
    }

    /// Current reason, promoting an expired deadline to `DeadlineExceeded`.
    fn poll(&self) -> Option<CancelReason> {
        let state = self.state.lock();
        if state.reason.is_some() {
            return state.reason;
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.fire(state, CancelReason::DeadlineExceeded);
                Some(CancelReason::DeadlineExceeded)
            }
            _ => None,
        }
    }
}

/// A cloneable handle to a cancellation signal.
///
/// The signal fires either when [`cancel`](Self::cancel) is called or when
/// its deadline passes, whichever comes first. Once fired it stays fired and
/// keeps the first reason it observed. Clones share the same signal.
///
/// Cancellation is cooperative: holders must check the token (or suspend
/// through [`wait_timeout`](Self::wait_timeout) / [`crate::cancel::sleep`])
/// to notice it.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// A token with no deadline. It fires only when cancelled explicitly.
    pub fn new() -> Self {
        Self::from_deadline(None)
    }

    /// A token that fires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::from_deadline(Some(deadline))
    }

    /// A token that fires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::from_deadline(Instant::now().checked_add(timeout))
    }

    fn from_deadline(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner::new(deadline)),
        }
    }

    /// A token that fires when `self` fires, inheriting its reason.
    /// Cancelling the child leaves `self` untouched.
    pub fn child(&self) -> Self {
        self.derive(self.inner.deadline)
    }

    /// Like [`child`](Self::child), with its own deadline. The effective
    /// deadline is the earlier of the two.
    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        self.derive(Some(deadline))
    }

    /// Like [`child_with_deadline`](Self::child_with_deadline), relative to now.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.child_with_deadline(deadline),
            None => self.child(),
        }
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        let child = Self::from_deadline(deadline);

        // Promote an expired parent deadline before deciding to link.
        let _ = self.inner.poll();

        let mut state = self.inner.state.lock();
        let parent_reason = state.reason;
        match parent_reason {
            Some(reason) => {
                drop(state);
                let guard = child.inner.state.lock();
                child.inner.fire(guard, reason);
            }
            None => {
                state.children.retain(|weak| weak.strong_count() > 0);
                state.children.push(Arc::downgrade(&child.inner));
            }
        }

        child
    }

    /// Fires the token with [`CancelReason::Cancelled`]. No effect if it
    /// already fired.
    pub fn cancel(&self) {
        let state = self.inner.state.lock();
        self.inner.fire(state, CancelReason::Cancelled);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.poll().is_some()
    }

    /// Why the token fired, or `None` while it is live.
    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.poll()
    }

    /// The crate error matching [`reason`](Self::reason).
    pub fn error(&self) -> Option<Error> {
        self.reason().map(CancelReason::into_error)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline; zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Blocks until the token fires.
    pub fn wait(&self) -> CancelReason {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(reason) = state.reason {
                return reason;
            }

            match self.inner.deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    self.inner.fire(state, CancelReason::DeadlineExceeded);
                    return CancelReason::DeadlineExceeded;
                }
                Some(deadline) => {
                    self.inner.cond.wait_until(&mut state, deadline);
                }
                None => self.inner.cond.wait(&mut state),
            }
        }
    }

    /// Blocks until the token fires or `timeout` elapses.
    ///
    /// Returns `true` if the token fired first, `false` if the timeout
    /// elapsed first. A token that has already fired returns `true` without
    /// blocking.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let until = Instant::now().checked_add(timeout);

        let mut state = self.inner.state.lock();
        loop {
            if state.reason.is_some() {
                return true;
            }

            let now = Instant::now();
            if matches!(self.inner.deadline, Some(deadline) if now >= deadline) {
                self.inner.fire(state, CancelReason::DeadlineExceeded);
                return true;
            }
            if matches!(until, Some(until) if now >= until) {
                return false;
            }

            let wake_at = match (self.inner.deadline, until) {
                (Some(deadline), Some(until)) => Some(deadline.min(until)),
                (deadline, until) => deadline.or(until),
            };
            match wake_at {
                Some(at) => {
                    self.inner.cond.wait_until(&mut state, at);
                }
                None => self.inner.cond.wait(&mut state),
            }
        }
    }

    /// Returns a guard that cancels this token when dropped.
    pub fn drop_guard(self) -> DropGuard {
        DropGuard {
            token: self,
            armed: true,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("deadline", &self.inner.deadline)
            .field("reason", &self.inner.state.lock().reason)
            .finish()
    }
}

/// Cancels the wrapped token on drop unless disarmed.
#[derive(Debug)]
pub struct DropGuard {
    token: CancelToken,
    armed: bool,
}

impl DropGuard {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Releases the token without cancelling it.
    pub fn disarm(mut self) -> CancelToken {
        self.armed = false;
        self.token.clone()
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("drop guard releasing token");
            self.token.cancel();
        }
    }
}
