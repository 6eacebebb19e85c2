//! Response windows.
//!
//! A miss waits a bounded time for peers to answer. The wait ends at the deadline, or
//! earlier when the resolve holds an [`AnswerSignal`] and an answer for its key lands
//! in the store.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// How a response window ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    AnswerArrived,
    Elapsed,
}

/// One miss being resolved. Lives only as long as the resolve call that created it.
#[derive(Debug, Clone)]
pub struct ResolutionAttempt {
    pub key: String,
    pub started_at: Instant,
    pub deadline: Instant,
}

impl ResolutionAttempt {
    pub fn new(key: &str, window: Duration) -> Self {
        let started_at = Instant::now();
        Self {
            key: key.to_string(),
            started_at,
            deadline: started_at + window,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Suspends until the deadline, or until `signal` fires if one is given.
    pub async fn wait(&self, signal: Option<&AnswerSignal>) -> WindowOutcome {
        match signal {
            Some(signal) => match tokio::time::timeout_at(self.deadline, signal.answered()).await
            {
                Ok(()) => WindowOutcome::AnswerArrived,
                Err(_) => WindowOutcome::Elapsed,
            },
            None => {
                tokio::time::sleep_until(self.deadline).await;
                WindowOutcome::Elapsed
            }
        }
    }
}

#[derive(Debug, Default)]
struct SignalState {
    notify: Notify,
    answers: AtomicU64,
}

#[derive(Debug)]
struct Waiters {
    state: Arc<SignalState>,
    count: usize,
}

/// Keys with at least one resolve currently waiting on them.
#[derive(Debug, Default)]
pub struct AnswerSignals {
    waiting: DashMap<String, Waiters>,
}

impl AnswerSignals {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Must be called before the query goes out, otherwise a fast answer can be missed.
    pub fn register(self: &Arc<Self>, key: &str) -> AnswerSignal {
        let state = {
            let mut waiters = self
                .waiting
                .entry(key.to_string())
                .or_insert_with(|| Waiters {
                    state: Arc::new(SignalState::default()),
                    count: 0,
                });
            waiters.count += 1;
            waiters.state.clone()
        };

        let seen = state.answers.load(Ordering::Acquire);
        AnswerSignal {
            key: key.to_string(),
            state,
            seen,
            signals: self.clone(),
        }
    }

    /// Wakes every resolve waiting on `key`. Returns `false` if nobody was waiting.
    pub fn notify(&self, key: &str) -> bool {
        match self.waiting.get(key) {
            Some(waiters) => {
                waiters.state.answers.fetch_add(1, Ordering::Release);
                waiters.state.notify.notify_waiters();
                true
            }
            None => false,
        }
    }

    pub fn waiting_keys(&self) -> usize {
        self.waiting.len()
    }

    fn release(&self, key: &str) {
        if let Some(mut waiters) = self.waiting.get_mut(key) {
            waiters.count = waiters.count.saturating_sub(1);
        }
        self.waiting.remove_if(key, |_, waiters| waiters.count == 0);
    }
}

/// Registration of one waiting resolve. Deregisters on drop.
#[derive(Debug)]
pub struct AnswerSignal {
    key: String,
    state: Arc<SignalState>,
    seen: u64,
    signals: Arc<AnswerSignals>,
}

impl AnswerSignal {
    /// Completes once an answer for the key has landed after registration.
    pub async fn answered(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.state.answers.load(Ordering::Acquire) != self.seen {
                return;
            }

            notified.await;
        }
    }
}

impl Drop for AnswerSignal {
    fn drop(&mut self) {
        self.signals.release(&self.key);
    }
}
