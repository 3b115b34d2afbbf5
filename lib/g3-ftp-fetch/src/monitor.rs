/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use log::{debug, info, warn};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::FtpSessionCloser;

/// Progress of one download, shared between the fetcher and its
/// [`StallMonitor`].
///
/// The fetcher is the only writer of the offset. It only grows, except when
/// it is rewound to the real file length after a local write failure.
pub struct FtpFetchProgress {
    offset: AtomicU64,
    waiting: AtomicBool,
    session: ArcSwapOption<FtpSessionCloser>,
    stalls: AtomicUsize,
}

impl FtpFetchProgress {
    pub fn new(offset: u64) -> Self {
        FtpFetchProgress {
            offset: AtomicU64::new(offset),
            waiting: AtomicBool::new(true),
            session: ArcSwapOption::empty(),
            stalls: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }

    pub(crate) fn add_offset(&self, n: u64) {
        self.offset.fetch_add(n, Ordering::AcqRel);
    }

    pub(crate) fn reset_offset(&self, offset: u64) {
        self.offset.store(offset, Ordering::Release);
    }

    #[inline]
    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::Acquire)
    }

    pub fn set_waiting(&self, waiting: bool) {
        self.waiting.store(waiting, Ordering::Release);
    }

    pub fn stall_count(&self) -> usize {
        self.stalls.load(Ordering::Relaxed)
    }

    /// Make `closer` the session to close on stall.
    pub fn attach_session(&self, closer: Arc<FtpSessionCloser>) {
        self.session.store(Some(closer));
    }

    pub fn detach_session(&self) {
        self.session.store(None);
    }

    fn force_close_session(&self) -> bool {
        match self.session.load().as_ref() {
            Some(closer) => closer.force_close(),
            None => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StallCheck {
    /// No transfer in flight.
    Skipped,
    /// Bytes received since the last check.
    Progress(u64),
    Stalled,
}

impl StallCheck {
    /// Judge the current `offset` against the one seen at the last check,
    /// which is moved forward on progress.
    ///
    /// An offset below the last one has been rewound, the check is skipped
    /// and the baseline moved back.
    pub fn evaluate(waiting: bool, offset: u64, last_offset: &mut u64) -> Self {
        if waiting {
            return StallCheck::Skipped;
        }
        if offset < *last_offset {
            *last_offset = offset;
            return StallCheck::Skipped;
        }
        if offset > *last_offset {
            let n = offset - *last_offset;
            *last_offset = offset;
            StallCheck::Progress(n)
        } else {
            StallCheck::Stalled
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StallMonitorState {
    Idle,
    Armed,
    Stopped,
}

struct StallMonitorRuntime {
    progress: Arc<FtpFetchProgress>,
    interval: Duration,
}

impl StallMonitorRuntime {
    fn check(&self, last_offset: &mut u64) {
        let offset = self.progress.offset();
        match StallCheck::evaluate(self.progress.is_waiting(), offset, last_offset) {
            StallCheck::Skipped => {}
            StallCheck::Progress(n) => {
                let speed = n as f64 / 1024.0 / self.interval.as_secs_f64();
                debug!("{offset} - {speed:.1} KB/s");
            }
            StallCheck::Stalled => {
                if self.progress.force_close_session() {
                    self.progress.stalls.fetch_add(1, Ordering::Relaxed);
                    info!(
                        "no data received in the last {:?} at offset {offset}, closing session",
                        self.interval
                    );
                }
            }
        }
    }

    async fn run(self, mut quit: oneshot::Receiver<()>) {
        let mut last_offset = self.progress.offset();
        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        loop {
            tokio::select! {
                biased;

                _ = &mut quit => break,
                _ = interval.tick() => self.check(&mut last_offset),
            }
        }
    }
}

/// Periodic check that a download is still making progress.
///
/// A tick with no new byte while a transfer is in flight force closes the
/// current session. The task is stopped on drop.
pub struct StallMonitor {
    progress: Arc<FtpFetchProgress>,
    interval: Duration,
    state: StallMonitorState,
    quit_sender: Option<oneshot::Sender<()>>,
}

impl StallMonitor {
    pub fn new(progress: Arc<FtpFetchProgress>, interval: Duration) -> Self {
        StallMonitor {
            progress,
            interval,
            state: StallMonitorState::Idle,
            quit_sender: None,
        }
    }

    pub fn spawn(progress: Arc<FtpFetchProgress>, interval: Duration) -> Self {
        let mut monitor = StallMonitor::new(progress, interval);
        monitor.start();
        monitor
    }

    #[inline]
    pub fn state(&self) -> StallMonitorState {
        self.state
    }

    /// Start the periodic task, the first check happens one interval later.
    ///
    /// Does nothing if not idle. A zero interval stops the monitor at once.
    pub fn start(&mut self) {
        if self.state != StallMonitorState::Idle {
            return;
        }
        if self.interval.is_zero() {
            warn!("zero stall monitor interval, stall check disabled");
            self.state = StallMonitorState::Stopped;
            return;
        }
        let (quit_sender, quit_receiver) = oneshot::channel();
        let runtime = StallMonitorRuntime {
            progress: self.progress.clone(),
            interval: self.interval,
        };
        tokio::spawn(runtime.run(quit_receiver));
        self.quit_sender = Some(quit_sender);
        self.state = StallMonitorState::Armed;
    }

    pub fn stop(&mut self) {
        if let Some(sender) = self.quit_sender.take() {
            let _ = sender.send(());
        }
        self.state = StallMonitorState::Stopped;
    }
}

impl Drop for StallMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
