use super::rate_limiter::RateLimiter;
use crate::{Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    draining: bool,
}

/// FIFO queue of request jobs drained by a single worker.
///
/// The worker waits on the shared [`RateLimiter`] before each job, exits once
/// the queue is empty, and is respawned by the next enqueue.
#[derive(Clone)]
pub struct RequestQueue {
    limiter: Arc<RateLimiter>,
    state: Arc<Mutex<QueueState>>,
}

impl RequestQueue {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter,
            state: Arc::new(Mutex::new(QueueState::default())),
        }
    }

    /// Jobs waiting to run, not counting the one in flight.
    pub fn pending(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_draining(&self) -> bool {
        self.lock().draining
    }

    /// Queue `job` and wait for its result.
    pub async fn enqueue<F, Fut, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let boxed: Job = Box::new(move || {
            async move {
                // receiver gone means the caller stopped waiting
                let _ = tx.send(job().await);
            }
            .boxed()
        });

        let spawn_worker = {
            let mut st = self.lock();
            st.jobs.push_back(boxed);
            !std::mem::replace(&mut st.draining, true)
        };
        if spawn_worker {
            debug!("request queue worker started");
            tokio::spawn(self.clone().drain());
        }

        rx.await
            .map_err(|_| Error::runtime("queued request was dropped before completing"))?
    }

    async fn drain(self) {
        loop {
            let next = {
                let mut st = self.lock();
                match st.jobs.pop_front() {
                    Some(job) => job,
                    None => {
                        st.draining = false;
                        break;
                    }
                }
            };
            // acquire never fails; a failing job still reports through its channel
            let _ = self.limiter.acquire().await;
            next().await;
        }
        debug!("request queue drained");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::rate_limiter::{REMAINING_HEADER, RESET_HEADER};
    use crate::types::{ApiRequest, ApiResponse};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_runs_in_submission_order() {
        let queue = RequestQueue::new(Arc::new(RateLimiter::new()));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5u32 {
            let q = queue.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                q.enqueue(move || async move {
                    order.lock().unwrap().push(i);
                    Ok(i * 10)
                })
                .await
            }));
            // make submission order deterministic
            tokio::task::yield_now().await;
        }

        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap().unwrap());
        }
        assert_eq!(results, vec![0, 10, 20, 30, 40]);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_job_error_reaches_its_caller_only() {
        let queue = RequestQueue::new(Arc::new(RateLimiter::new()));
        let failed: Result<()> = queue
            .enqueue(|| async { Err(Error::validation("bad input")) })
            .await;
        assert!(matches!(failed, Err(Error::Validation { .. })));

        let ok = queue.enqueue(|| async { Ok("next") }).await.unwrap();
        assert_eq!(ok, "next");
    }

    #[tokio::test]
    async fn test_worker_restarts_after_idle() {
        let queue = RequestQueue::new(Arc::new(RateLimiter::new()));
        assert_eq!(queue.enqueue(|| async { Ok(1) }).await.unwrap(), 1);
        for _ in 0..10 {
            if !queue.is_draining() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!queue.is_draining());
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.enqueue(|| async { Ok(2) }).await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_budget_before_each_job() {
        let limiter = Arc::new(RateLimiter::new());
        let exhausted = ApiResponse::new(200, Arc::new(ApiRequest::get("/x")))
            .with_header(REMAINING_HEADER, "0")
            .with_header(RESET_HEADER, "4");
        limiter.update_from_headers(&exhausted).await;

        let queue = RequestQueue::new(limiter);
        let start = Instant::now();
        queue.enqueue(|| async { Ok(()) }).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(4));
    }
}
