//! Debounced text filter.
//!
//! The live text follows every keystroke; the committed text is what queries
//! are built from and only changes when the input settles.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use futures_util::future::BoxFuture;

use crate::clock::Clock;

/// Reset-on-activity timer
#[derive(Debug, Clone)]
pub struct SettleTimer {
    window: Duration,
    deadline: Option<Instant>,
}

impl SettleTimer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Restart the window from `now`
    pub fn reset(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

// =============================================================================

pub struct DebouncedFilter {
    live_text: String,
    committed_text: String,
    timer: SettleTimer,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DebouncedFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedFilter")
            .field("live_text", &self.live_text)
            .field("committed_text", &self.committed_text)
            .field("timer", &self.timer)
            .finish()
    }
}

impl DebouncedFilter {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            live_text: String::new(),
            committed_text: String::new(),
            timer: SettleTimer::new(window),
            clock,
        }
    }

    pub fn live_text(&self) -> &str {
        &self.live_text
    }

    pub fn committed_text(&self) -> &str {
        &self.committed_text
    }

    /// True while typed text is waiting to settle
    pub fn is_pending(&self) -> bool {
        self.timer.is_armed()
    }

    /// Time left before the pending text settles, if any
    pub fn time_to_settle(&self) -> Option<Duration> {
        self.timer
            .deadline()
            .map(|d| d.saturating_duration_since(self.clock.now()))
    }

    /// Resolves when the pending text is due to settle, as measured by the
    /// filter's clock. Never resolves if nothing is pending.
    pub fn settle_due(&self) -> BoxFuture<'static, ()> {
        match self.timer.deadline() {
            Some(d) => self.clock.sleep_until(d),
            None => Box::pin(std::future::pending()),
        }
    }

    /// Record a keystroke
    pub fn set_live_text(&mut self, text: impl Into<String>) {
        self.live_text = text.into();
        self.timer.reset(self.clock.now());
    }

    /// Commit the live text. Returns the committed text.
    pub fn settle(&mut self) -> &str {
        self.timer.cancel();
        self.committed_text.clone_from(&self.live_text);
        &self.committed_text
    }

    /// Empty both texts and settle at once
    pub fn clear(&mut self) {
        self.live_text.clear();
        self.settle();
    }

    /// Settle if the window has elapsed since the last keystroke.
    /// Returns true if it settled.
    pub fn poll(&mut self) -> bool {
        if self.timer.is_due(self.clock.now()) {
            self.settle();
            return true;
        }
        false
    }
}
