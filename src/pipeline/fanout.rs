//! Bounded fan-out/fan-in over tokio tasks.
//!
//! Every item becomes one spawned task. A semaphore caps how many run at once.
//! The batch either yields every result or the first failure; once a task
//! fails the rest are detached and left to finish, and their results are
//! dropped.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::logging::structured::LogContext;

/// Concurrency cap for one fan-out batch.
#[derive(Debug, Clone)]
pub struct FanOut {
    limit: Option<Arc<Semaphore>>,
}

impl FanOut {
    /// `max_concurrent == 0` leaves the batch unbounded.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            limit: (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent))),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.limit.is_some()
    }

    /// Run `task` over every item and collect the results in item order.
    pub async fn run<I, T, E, F, Fut>(
        &self,
        stage: &str,
        items: Vec<I>,
        task: F,
        ctx: &LogContext,
    ) -> Result<Vec<T>, E>
    where
        I: Send + 'static,
        T: Send + 'static,
        E: From<JoinError> + Send + 'static,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let total = items.len();
        log::debug!(
            "{} FANOUT_START stage={} tasks={} bounded={}",
            ctx,
            stage,
            total,
            self.is_bounded()
        );

        let mut join_set = JoinSet::new();
        for (index, item) in items.into_iter().enumerate() {
            let limit = self.limit.clone();
            let fut = task(item);
            join_set.spawn(async move {
                // A closed semaphore only happens at shutdown; run unthrottled then.
                let _permit = match limit {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                (index, fut.await)
            });
        }

        let mut results: Vec<Option<T>> = (0..total).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let failure = match joined {
                Ok((index, Ok(value))) => {
                    results[index] = Some(value);
                    continue;
                }
                Ok((_, Err(err))) => err,
                Err(join_err) => E::from(join_err),
            };
            let pending = join_set.len();
            join_set.detach_all();
            log::error!(
                "{} FANOUT_FAILED stage={} detached={}",
                ctx,
                stage,
                pending
            );
            return Err(failure);
        }

        log::debug!("{} FANOUT_COMPLETE stage={} tasks={}", ctx, stage, total);
        Ok(results.into_iter().flatten().collect())
    }
}
