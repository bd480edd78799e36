//! Cancellable timers and the debounced search binding
//!
//! [`schedule`] runs a closure after a delay on the tokio runtime and returns
//! a [`TimerHandle`]; dropping or cancelling the handle aborts the timer.
//! [`Debouncer`] keeps at most one pending timer and restarts it on every
//! call, so only the last call of a burst fires.

use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to a scheduled closure
///
/// The timer is aborted when the handle is cancelled or dropped.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Whether the timer fired or was cancelled
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run `f` once `delay` has elapsed
///
/// Must be called from within a tokio runtime.
pub fn schedule<F>(f: F, delay: Duration) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        f();
    });
    TimerHandle { task }
}

/// Restart-on-call timer
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<TimerHandle>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel the pending call, if any, and schedule `f`
    pub fn call<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.pending = Some(schedule(f, self.delay));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// A search value waiting to be committed
///
/// Carries the generation of the keystroke that produced it so a commit
/// racing with a reset can be recognised and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSearch {
    generation: u64,
    /// Trimmed buffer, `None` when blank
    pub value: Option<String>,
}

/// Keystroke buffer decoupled from the committed `search` filter
#[derive(Debug)]
pub struct SearchBinding {
    buffer: String,
    generation: u64,
    debouncer: Debouncer,
}

impl SearchBinding {
    pub fn new(delay: Duration) -> Self {
        Self {
            buffer: String::new(),
            generation: 0,
            debouncer: Debouncer::new(delay),
        }
    }

    /// Text as last typed
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Record a keystroke and restart the timer
    ///
    /// `commit` runs once the delay passes without another keystroke.
    pub fn input<F>(&mut self, text: &str, commit: F)
    where
        F: FnOnce(PendingSearch) + Send + 'static,
    {
        self.buffer = text.to_string();
        self.generation += 1;
        let pending = PendingSearch {
            generation: self.generation,
            value: normalize(text),
        };
        tracing::trace!(generation = pending.generation, "search timer restarted");
        self.debouncer.call(move || commit(pending));
    }

    /// Whether `pending` is still the latest keystroke; consumes it if so
    pub fn accept(&mut self, pending: &PendingSearch) -> bool {
        if pending.generation != self.generation {
            return false;
        }
        self.generation += 1;
        true
    }

    /// Resynchronise the buffer from the committed value and drop any pending commit
    pub fn sync(&mut self, committed: Option<&str>) {
        self.cancel();
        self.buffer = committed.unwrap_or_default().to_string();
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        self.debouncer.cancel();
    }
}

fn normalize(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
