//! Cancellable one-second countdown used to throttle verification-code resends.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant},
};
use tracing::debug;

pub const RESEND_TIMEOUT_SECONDS: u32 = 60;
const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownState {
    pub remaining: u32,
    pub active: bool,
}

impl CountdownState {
    pub fn idle(initial: u32) -> Self {
        Self {
            remaining: initial,
            active: false,
        }
    }

    /// Applies one tick. Returns `false` once there is nothing left to count.
    fn tick(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.active = false;
        }
        self.active
    }
}

pub struct CountdownTimer {
    initial: u32,
    state: Arc<watch::Sender<CountdownState>>,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    pub fn new(initial: u32) -> Self {
        let (state, _) = watch::channel(CountdownState::idle(initial));
        Self {
            initial,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub fn initial(&self) -> u32 {
        self.initial
    }

    pub fn state(&self) -> CountdownState {
        *self.state.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    pub fn subscribe(&self) -> watch::Receiver<CountdownState> {
        self.state.subscribe()
    }

    /// Resets to the initial value and starts ticking. Any previous tick task is
    /// aborted first, so at most one task ever decrements the shared state.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.abort_task();

        let active = self.initial > 0;
        self.state.send_replace(CountdownState {
            remaining: self.initial,
            active,
        });
        if !active {
            return;
        }

        let state = Arc::clone(&self.state);
        let generation = Arc::clone(&self.generation);
        let mine = generation.load(Ordering::SeqCst);
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            loop {
                ticker.tick().await;
                let mut keep_ticking = false;
                state.send_if_modified(|current| {
                    // A restart or cancel on another worker may land between the
                    // tick and this update; a stale task must not touch the state.
                    if generation.load(Ordering::SeqCst) != mine {
                        return false;
                    }
                    keep_ticking = current.tick();
                    true
                });
                if !keep_ticking {
                    debug!("countdown: finished");
                    break;
                }
            }
        }));
        debug!(seconds = self.initial, "countdown: started");
    }

    /// Stops ticking. The remaining value is left as it was.
    pub fn cancel(&mut self) {
        self.abort_task();
        self.state.send_if_modified(|current| {
            let was_active = current.active;
            current.active = false;
            was_active
        });
    }

    fn abort_task(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.abort_task();
    }
}

#[cfg(test)]
#[path = "tests/countdown_tests.rs"]
mod tests;
