//! Staggered fan-out
//!
//! A batch of independent operations is launched with an index-proportional
//! delay (`index * interval`) so load on the remote service ramps up instead
//! of arriving as a burst. All operations run concurrently on the calling
//! task; results come back in input order.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;

/// Launches a batch of operations with a fixed per-item delay
#[derive(Clone)]
pub struct Stagger {
    interval: Duration,
    clock: Arc<dyn Clock>,
}

impl Stagger {
    pub fn new(interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { interval, clock }
    }

    /// Launch delay for the item at `index`
    #[must_use]
    pub fn delay_for(&self, index: usize) -> Duration {
        self.interval * u32::try_from(index).unwrap_or(u32::MAX)
    }

    /// Run `op` once per item and wait for every operation to settle
    pub async fn run<I, T, F, Fut>(&self, items: impl IntoIterator<Item = I>, op: F) -> Vec<T>
    where
        F: Fn(usize, I) -> Fut,
        Fut: Future<Output = T>,
    {
        let launches = items.into_iter().enumerate().map(|(index, item)| {
            let delay = self.delay_for(index);
            let clock = Arc::clone(&self.clock);
            let operation = op(index, item);

            async move {
                if !delay.is_zero() {
                    clock.sleep(delay).await;
                }
                operation.await
            }
        });

        join_all(launches).await
    }
}
