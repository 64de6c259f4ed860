use std::{future::Future, time::Duration};

use tokio::{
    task::{JoinHandle, JoinSet},
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

/// Owned handle to a fixed-interval refresh task.
///
/// The first tick fires one `period` after spawning. A tick does not wait for
/// the previous one to finish. Cancelling (or dropping the handle) stops the
/// schedule and aborts any tick still in flight.
#[derive(Debug)]
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut in_flight = JoinSet::new();
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        debug!("poll tick");
                        in_flight.spawn(tick());
                    }
                    Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                }
            }
        });
        Self { task: Some(task) }
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Stops the schedule. Returns `false` when it was already stopped.
    pub fn cancel(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
