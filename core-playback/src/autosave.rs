//! Periodic position autosave.

use core_async::task::{self, JoinHandle};
use core_async::time::{interval_at, Duration, Instant, MissedTickBehavior};

/// Cancellable timer owned by a playing session.
///
/// The first tick fires one full period after `start`. The task stops when
/// `tick` returns `false` and is aborted when the timer is dropped.
pub(crate) struct AutosaveTimer {
    handle: JoinHandle<()>,
}

impl AutosaveTimer {
    pub(crate) fn start<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let first_tick = Instant::now() + period;
        let handle = task::spawn(async move {
            let mut interval = interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if !tick() {
                    break;
                }
            }
        });

        Self { handle }
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for AutosaveTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn advance(by: Duration) {
        tokio::time::advance(by).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let _timer = AutosaveTimer::start(Duration::from_secs(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        advance(Duration::from_secs(4)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        advance(Duration::from_secs(1)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        advance(Duration::from_secs(5)).await;
        advance(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_the_task() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let timer = AutosaveTimer::start(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        drop(timer);
        advance(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn returning_false_stops_the_timer() {
        let timer = AutosaveTimer::start(Duration::from_secs(1), || false);
        assert!(timer.is_active());

        advance(Duration::from_secs(1)).await;
        assert!(!timer.is_active());
    }
}
