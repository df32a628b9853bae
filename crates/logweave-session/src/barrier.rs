use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Fires once a fixed number of signals has arrived.
///
/// Signals are issued as [`BarrierSignal`] guards that arrive when dropped,
/// so a task holding one signals exactly once however it exits.
#[derive(Debug)]
pub struct CompletionBarrier {
    remaining: AtomicUsize,
    notify: Notify,
}

impl CompletionBarrier {
    /// Create a barrier that opens after `count` signals.
    pub fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(count),
            notify: Notify::new(),
        })
    }

    /// Signals still outstanding.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Issue a signal guard. Issue no more guards than the barrier count.
    pub fn signal(self: &Arc<Self>) -> BarrierSignal {
        BarrierSignal {
            barrier: Arc::clone(self),
        }
    }

    /// Wait until every signal has arrived.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn arrive(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if previous == Ok(1) {
            self.notify.notify_waiters();
        }
    }
}

/// One outstanding arrival at a [`CompletionBarrier`].
#[derive(Debug)]
pub struct BarrierSignal {
    barrier: Arc<CompletionBarrier>,
}

impl Drop for BarrierSignal {
    fn drop(&mut self) {
        self.barrier.arrive();
    }
}
