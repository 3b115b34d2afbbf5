/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Notify;

const STATE_OPEN: u8 = 0;
const STATE_CLOSED: u8 = 1;
const STATE_FORCE_CLOSED: u8 = 2;

/// Close handle of a [`FtpSession`](super::FtpSession).
///
/// It can be shared with other tasks. Closing is idempotent, and any session
/// operation in flight fails with a session-closed error once it is closed.
#[derive(Debug, Default)]
pub struct FtpSessionCloser {
    state: AtomicU8,
    notify: Notify,
}

impl FtpSessionCloser {
    fn close_with(&self, state: u8) -> bool {
        if self
            .state
            .compare_exchange(STATE_OPEN, state, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.notify.notify_waiters();
            true
        } else {
            false
        }
    }

    /// Returns true only for the call that actually closed the session.
    pub fn close(&self) -> bool {
        self.close_with(STATE_CLOSED)
    }

    /// Close on behalf of someone other than the session owner.
    pub fn force_close(&self) -> bool {
        self.close_with(STATE_FORCE_CLOSED)
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) != STATE_OPEN
    }

    pub fn is_force_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_FORCE_CLOSED
    }

    pub async fn wait_closed(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn close_idempotent() {
        let closer = FtpSessionCloser::default();
        assert!(!closer.is_closed());
        assert!(closer.close());
        assert!(!closer.close());
        assert!(!closer.force_close());
        assert!(closer.is_closed());
        assert!(!closer.is_force_closed());
    }

    #[test]
    fn force_close() {
        let closer = FtpSessionCloser::default();
        assert!(closer.force_close());
        assert!(!closer.close());
        assert!(closer.is_force_closed());
    }

    #[tokio::test]
    async fn wake_waiter() {
        let closer = Arc::new(FtpSessionCloser::default());
        let waiter = {
            let closer = closer.clone();
            tokio::spawn(async move { closer.wait_closed().await })
        };
        tokio::task::yield_now().await;
        closer.force_close();
        waiter.await.unwrap();

        // already closed
        closer.wait_closed().await;
    }
}
