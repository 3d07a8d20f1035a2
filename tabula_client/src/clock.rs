//! Time sources for debounce timers

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use futures_util::future::BoxFuture;
use tokio::sync::watch;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Resolve once [Clock::now] has reached `deadline`
    fn sleep_until(&self, deadline: Instant) -> BoxFuture<'static, ()>;
}

/// Wall clock, as seen by tokio. Follows paused time in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep_until(&self, deadline: Instant) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep_until(
            tokio::time::Instant::from_std(deadline),
        ))
    }
}

/// A clock that moves when told to. Clones share the same time.
///
/// A waiter also moves it: once the tokio timer for a wait fires, the clock
/// jumps to that deadline, so a paused runtime can drive it the same way it
/// drives its own timers.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<watch::Sender<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Instant::now());
        Self { now: Arc::new(tx) }
    }

    pub fn advance(&self, by: Duration) {
        self.now.send_modify(|now| *now += by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.borrow()
    }

    fn sleep_until(&self, deadline: Instant) -> BoxFuture<'static, ()> {
        let now = self.now.clone();

        Box::pin(async move {
            let mut rx = now.subscribe();

            loop {
                let current = *rx.borrow_and_update();
                if current >= deadline {
                    return;
                }

                tokio::select! {
                    _ = rx.changed() => {}
                    _ = tokio::time::sleep(deadline - current) => {
                        now.send_modify(|t| {
                            if *t < deadline {
                                *t = deadline;
                            }
                        });
                    }
                }
            }
        })
    }
}
