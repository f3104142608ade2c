//! Job queue (C4): a bounded, thread-safe FIFO of jobs awaiting dispatch.
//!
//! Built on `tokio::sync::Mutex<VecDeque<Job>>` plus a `tokio::sync::Notify`
//! rather than an `mpsc` channel: `count()` must stay queryable for the
//! `/jobs/metrics` endpoint, and `offer`'s full-check must be atomic with
//! the push, which a channel's `try_send` alone cannot give us.

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::types::Job;

pub struct JobQueue {
    capacity: usize,
    inner: Mutex<VecDeque<Job>>,
    notify: Notify,
    closed: std::sync::atomic::AtomicBool,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Non-blocking. Fails (returns `false`) when the queue is full or
    /// closed.
    pub async fn offer(&self, job: Job) -> bool {
        if self.closed.load(std::sync::atomic::Ordering::SeqCst) {
            return false;
        }
        let mut inner = self.inner.lock().await;
        if inner.len() >= self.capacity {
            return false;
        }
        inner.push_back(job);
        drop(inner);
        self.notify.notify_one();
        true
    }

    /// Blocks until a job is available, the queue closes, or `cancel`
    /// fires. Returns `None` on close/cancel.
    pub async fn take(&self, cancel: &CancellationToken) -> Option<Job> {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(job) = inner.pop_front() {
                    return Some(job);
                }
            }
            if self.closed.load(std::sync::atomic::Ordering::SeqCst) {
                return None;
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = cancel.cancelled() => return None,
            }
        }
    }

    pub async fn count(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Wakes all blocked takers; subsequent `take` calls return `None` once
    /// the buffer drains.
    pub fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new("plan", serde_json::json!({}))
    }

    #[tokio::test]
    async fn offer_and_take_round_trips() {
        let queue = JobQueue::new(4);
        let id = job().id;
        let mut j = job();
        j.id = id;
        assert!(queue.offer(j).await);
        assert_eq!(queue.count().await, 1);

        let cancel = CancellationToken::new();
        let taken = queue.take(&cancel).await.unwrap();
        assert_eq!(taken.id, id);
        assert_eq!(queue.count().await, 0);
    }

    #[tokio::test]
    async fn offer_fails_when_full() {
        let queue = JobQueue::new(1);
        assert!(queue.offer(job()).await);
        assert!(!queue.offer(job()).await);
    }

    #[tokio::test]
    async fn fifo_ordering_is_preserved() {
        let queue = JobQueue::new(10);
        let mut first = job();
        first.job_type = "first".into();
        let mut second = job();
        second.job_type = "second".into();
        queue.offer(first).await;
        queue.offer(second).await;

        let cancel = CancellationToken::new();
        assert_eq!(queue.take(&cancel).await.unwrap().job_type, "first");
        assert_eq!(queue.take(&cancel).await.unwrap().job_type, "second");
    }

    #[tokio::test]
    async fn take_returns_none_when_cancelled_before_any_offer() {
        let queue = JobQueue::new(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(queue.take(&cancel).await.is_none());
    }

    #[tokio::test]
    async fn close_wakes_blocked_takers() {
        let queue = std::sync::Arc::new(JobQueue::new(1));
        let cancel = CancellationToken::new();
        let taker = tokio::spawn({
            let queue = queue.clone();
            let cancel = cancel.clone();
            async move { queue.take(&cancel).await }
        });
        tokio::task::yield_now().await;
        queue.close();
        let result = taker.await.unwrap();
        assert!(result.is_none());
    }
}
