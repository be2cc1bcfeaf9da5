//! Explicit pool of reusable sessions.
//!
//! Creating a LibRaw handle allocates several megabytes of working state.
//! Callers that decode many files can keep handles alive in a pool instead
//! of a process-wide singleton. Each checkout is exclusive, and the session
//! is returned when the [`PooledSession`] is dropped.
//!
//! The pool does not recycle on checkin. Every pipeline run recycles its
//! session through [`super::RecycleGuard`], so a pooled session is recycled
//! exactly once per run.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

use super::{LibRaw, RawSession};
use crate::decode::DecodeError;

type Factory<S> = Box<dyn Fn() -> Result<S, DecodeError> + Send + Sync>;

/// Default number of idle sessions kept for reuse.
pub const DEFAULT_MAX_IDLE: usize = 4;

/// A pool handing out exclusive sessions.
pub struct SessionPool<S: RawSession> {
    idle: Mutex<Vec<S>>,
    factory: Factory<S>,
    max_idle: usize,
}

impl<S: RawSession> SessionPool<S> {
    /// Create an empty pool that builds sessions with `factory`.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<S, DecodeError> + Send + Sync + 'static,
    {
        Self {
            idle: Mutex::new(Vec::new()),
            factory: Box::new(factory),
            max_idle: DEFAULT_MAX_IDLE,
        }
    }

    /// Limit how many idle sessions are kept. Extra sessions are dropped
    /// on checkin.
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Take an idle session, or create one if none is available.
    pub fn checkout(&self) -> Result<PooledSession<'_, S>, DecodeError> {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let session = match reused {
            Some(session) => session,
            None => {
                tracing::debug!("session pool empty, creating new session");
                (self.factory)()?
            }
        };

        Ok(PooledSession {
            pool: self,
            session: Some(session),
        })
    }

    /// Number of sessions currently waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn checkin(&self, session: S) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(session);
        }
    }
}

impl SessionPool<LibRaw> {
    /// A pool of LibRaw handles.
    pub fn libraw() -> Self {
        Self::new(LibRaw::new)
    }
}

impl<S: RawSession> fmt::Debug for SessionPool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPool")
            .field("idle", &self.idle_count())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// A session checked out of a [`SessionPool`].
pub struct PooledSession<'p, S: RawSession> {
    pool: &'p SessionPool<S>,
    session: Option<S>,
}

impl<S: RawSession> Deref for PooledSession<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        // Only `None` after drop has started.
        self.session.as_ref().expect("session already checked in")
    }
}

impl<S: RawSession> DerefMut for PooledSession<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session.as_mut().expect("session already checked in")
    }
}

impl<S: RawSession> Drop for PooledSession<'_, S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.checkin(session);
        }
    }
}
