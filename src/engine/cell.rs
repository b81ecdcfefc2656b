//! Once-only, retryable engine initialization.
//!
//! [`EngineCell`] has three states:
//!
//! ```text
//! Idle ──get()──▶ Loading(shared future) ──ok──▶ Ready(handle)
//!   ▲                     │
//!   └────────err──────────┘
//! ```
//!
//! Every caller that arrives while an attempt is `Loading` awaits the same
//! [`Shared`] future, so the loader runs once no matter how many conversions
//! race for the engine. A failed attempt is reported to all of its waiters and
//! the cell drops back to `Idle`; the next `get()` starts a fresh attempt
//! instead of replaying the stale error forever.

use super::EngineHandle;
use crate::error::ConversionError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

type LoadResult = Result<EngineHandle, ConversionError>;
type Loader = dyn Fn() -> BoxFuture<'static, LoadResult> + Send + Sync;

enum State {
    Idle,
    Loading {
        attempt: u64,
        pending: Shared<BoxFuture<'static, LoadResult>>,
    },
    Ready(EngineHandle),
}

/// A lazily initialized, memoized engine handle.
pub struct EngineCell {
    state: Mutex<State>,
    loader: Box<Loader>,
    attempts: AtomicU64,
}

impl EngineCell {
    /// Create a cell that runs `loader` on first use.
    ///
    /// `loader` must be cheap to call: it only builds the future. The work
    /// happens when the returned future is polled. A panic while polling it
    /// counts as a failed attempt.
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LoadResult> + Send + 'static,
    {
        Self {
            state: Mutex::new(State::Idle),
            loader: Box::new(move || {
                AssertUnwindSafe(loader())
                    .catch_unwind()
                    .map(|caught| caught.unwrap_or_else(|panic| Err(loader_panicked(panic))))
                    .boxed()
            }),
            attempts: AtomicU64::new(0),
        }
    }

    /// A cell that already holds `engine`; its loader is never used.
    pub fn ready(engine: EngineHandle) -> Self {
        let cell = Self::new(|| async {
            Err(ConversionError::Internal(
                "pre-loaded engine cell has no loader".into(),
            ))
        });
        *cell.lock() = State::Ready(engine);
        cell
    }

    /// The engine, if it has already been loaded. Never waits.
    pub fn get_now(&self) -> Option<EngineHandle> {
        match &*self.lock() {
            State::Ready(engine) => Some(EngineHandle::clone(engine)),
            _ => None,
        }
    }

    /// Number of initialization attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Get the engine, loading it if nobody has yet.
    pub async fn get(&self) -> LoadResult {
        let (attempt, pending) = {
            let mut state = self.lock();
            match &*state {
                State::Ready(engine) => return Ok(EngineHandle::clone(engine)),
                State::Loading { attempt, pending } => (*attempt, pending.clone()),
                State::Idle => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!("Starting engine initialization (attempt {})", attempt);
                    let pending = (self.loader)().shared();
                    *state = State::Loading {
                        attempt,
                        pending: pending.clone(),
                    };
                    (attempt, pending)
                }
            }
        };

        let result = pending.await;

        // Only the attempt we awaited may move the state on; a later attempt
        // may already be in flight if this one failed and someone retried.
        let mut state = self.lock();
        if matches!(&*state, State::Loading { attempt: current, .. } if *current == attempt) {
            *state = match &result {
                Ok(engine) => State::Ready(EngineHandle::clone(engine)),
                Err(e) => {
                    warn!("Engine initialization attempt {} failed: {}", attempt, e);
                    State::Idle
                }
            };
        }
        result
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn loader_panicked(panic: Box<dyn Any + Send>) -> ConversionError {
    let msg = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into());
    ConversionError::EngineUnavailable(format!("engine loader panicked: {msg}"))
}

impl fmt::Debug for EngineCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.lock() {
            State::Idle => "idle",
            State::Loading { .. } => "loading",
            State::Ready(_) => "ready",
        };
        f.debug_struct("EngineCell")
            .field("state", &state)
            .field("attempts", &self.attempts())
            .finish()
    }
}
