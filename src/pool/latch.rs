//! Wait-group used to block until a dynamic set of jobs has completed

use std::sync::Arc;
use tokio::sync::watch;

/// Counting latch over a growing and shrinking set of pending jobs
///
/// `add` is called once per submitted job, `count_down` once per completed
/// job. `wait` resolves when the pending count reaches zero.
#[derive(Debug, Clone)]
pub struct CompletionLatch {
    pending: Arc<watch::Sender<usize>>,
}

impl CompletionLatch {
    pub fn new(pending: usize) -> Self {
        let (tx, _rx) = watch::channel(pending);
        Self {
            pending: Arc::new(tx),
        }
    }

    pub fn add(&self, n: usize) {
        self.pending.send_modify(|pending| *pending += n);
    }

    pub fn count_down(&self) {
        self.pending
            .send_modify(|pending| *pending = pending.saturating_sub(1));
    }

    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Wait until every pending job has counted down
    pub async fn wait(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }

    /// Guard that counts down exactly once when dropped
    pub(crate) fn guard(&self) -> CountDownGuard {
        CountDownGuard {
            latch: self.clone(),
        }
    }
}

/// Counts its latch down on drop, including when a job is discarded unrun
pub(crate) struct CountDownGuard {
    latch: CompletionLatch,
}

impl Drop for CountDownGuard {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_immediately_when_empty() {
        let latch = CompletionLatch::new(0);
        tokio::time::timeout(Duration::from_secs(1), latch.wait())
            .await
            .expect("empty latch should not block");
    }

    #[tokio::test]
    async fn test_wait_blocks_until_all_counted_down() {
        let latch = CompletionLatch::new(0);
        latch.add(3);
        assert_eq!(latch.pending(), 3);

        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.wait().await })
        };

        latch.count_down();
        latch.count_down();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        latch.count_down();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("latch should release")
            .expect("waiter panicked");
        assert_eq!(latch.pending(), 0);
    }

    #[tokio::test]
    async fn test_guard_counts_down_on_drop() {
        let latch = CompletionLatch::new(2);
        {
            let _a = latch.guard();
            let _b = latch.guard();
        }
        assert_eq!(latch.pending(), 0);
    }
}
