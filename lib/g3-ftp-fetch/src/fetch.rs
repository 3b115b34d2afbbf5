/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, SeekFrom};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use crate::{
    FtpAttemptError, FtpCompletionError, FtpCompletionValidator, FtpFetchConfig, FtpFetchError,
    FtpFetchProgress, FtpFileRetrieveError, FtpFileStatError, FtpSession, FtpSessionCloser,
    FtpSessionConfig, FtpSessionOpenError, StallMonitor,
};

/// The part of a session used by [`FtpFetcher`].
#[async_trait]
pub trait FtpFetchSession: Send {
    async fn query_size(&mut self, path: &str) -> Result<u64, FtpFileStatError>;

    async fn retrieve(
        &mut self,
        path: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        offset: u64,
    ) -> Result<String, FtpFileRetrieveError>;

    fn closer(&self) -> Arc<FtpSessionCloser>;

    async fn quit_and_close(&mut self);
}

#[async_trait]
impl FtpFetchSession for FtpSession {
    async fn query_size(&mut self, path: &str) -> Result<u64, FtpFileStatError> {
        FtpSession::query_size(self, path).await
    }

    async fn retrieve(
        &mut self,
        path: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        offset: u64,
    ) -> Result<String, FtpFileRetrieveError> {
        FtpSession::retrieve(self, path, sink, offset).await
    }

    fn closer(&self) -> Arc<FtpSessionCloser> {
        FtpSession::closer(self)
    }

    async fn quit_and_close(&mut self) {
        FtpSession::quit_and_close(self).await
    }
}

/// Open a logged in session, ready for transfer.
#[async_trait]
pub trait FtpSessionProvider: Send + Sync {
    type Session: FtpFetchSession;

    async fn open_session(&self) -> Result<Self::Session, FtpSessionOpenError>;
}

pub struct FtpTcpSessionProvider {
    config: Arc<FtpSessionConfig>,
}

impl FtpTcpSessionProvider {
    pub fn new(config: Arc<FtpSessionConfig>) -> Self {
        FtpTcpSessionProvider { config }
    }
}

#[async_trait]
impl FtpSessionProvider for FtpTcpSessionProvider {
    type Session = FtpSession;

    async fn open_session(&self) -> Result<FtpSession, FtpSessionOpenError> {
        let config = &self.config;
        let mut session = FtpSession::connect_to(&config.server, config.clone()).await?;
        session
            .authenticate(config.username.as_deref(), config.password.as_deref())
            .await?;
        session.change_working_directory(&config.remote_dir).await?;
        session
            .tune_for_long_transfer()
            .map_err(FtpSessionOpenError::SocketTuneFailed)?;
        info!(
            "connected to ftp server {} ({})",
            config.server,
            session.peer_addr()
        );
        Ok(session)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FtpFetchStatus {
    Connecting,
    Transferring,
    Stalled,
    Backoff,
    Complete,
    Failed,
}

/// Controller side state of one download.
#[derive(Clone, Debug)]
pub struct FtpFetchState {
    pub remote_name: String,
    /// Refreshed on every connection.
    pub remote_size: Option<u64>,
    pub attempts_remaining: usize,
    pub status: FtpFetchStatus,
}

impl FtpFetchState {
    fn new(remote_name: &str, max_attempts: usize) -> Self {
        FtpFetchState {
            remote_name: remote_name.to_string(),
            remote_size: None,
            attempts_remaining: max_attempts,
            status: FtpFetchStatus::Connecting,
        }
    }

    fn set_status(&mut self, status: FtpFetchStatus) {
        if self.status != status {
            debug!("{}: {:?} -> {:?}", self.remote_name, self.status, status);
            self.status = status;
        }
    }
}

#[derive(Clone, Debug)]
pub struct FtpFetchStats {
    pub remote_name: String,
    /// Size of the local file at the end.
    pub size: u64,
    pub remote_size: Option<u64>,
    pub failed_attempts: usize,
    pub retrieves: usize,
    pub stalls: usize,
    pub status: FtpFetchStatus,
}

#[derive(Debug, Error)]
pub enum FtpFetchFailure {
    #[error("completion not confirmed: {0}")]
    CompletionMismatch(#[from] FtpCompletionError),
    #[error("local file size {local} is larger than remote size {remote}")]
    LocalFileTooLarge { local: u64, remote: u64 },
}

#[derive(Debug)]
pub enum FtpFetchOutcome {
    Success(FtpFetchStats),
    Failure(FtpFetchFailure),
}

impl FtpFetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FtpFetchOutcome::Success(_))
    }
}

/// Count every byte accepted by the inner writer into the shared offset.
struct ProgressWriter<'a, W> {
    inner: &'a mut W,
    progress: &'a FtpFetchProgress,
}

impl<W> AsyncWrite for ProgressWriter<'_, W>
where
    W: AsyncWrite + Unpin,
{
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match Pin::new(&mut *self.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                self.progress.add_offset(n as u64);
                Poll::Ready(Ok(n))
            }
            r => r,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.inner).poll_shutdown(cx)
    }
}

/// Flush `file` and move its cursor to the end, returning the length on disk.
///
/// A flush error only means some buffered bytes were lost, which the
/// returned length accounts for.
async fn sync_local_offset(file: &mut File) -> io::Result<u64> {
    if let Err(e) = file.flush().await {
        warn!("failed to flush local file: {e}");
    }
    file.seek(SeekFrom::End(0)).await
}

enum AttemptEnd {
    /// Nothing left to retrieve.
    Complete,
    LocalTooLarge(u64),
    Retrieved(String),
}

/// Download remote files to local ones, resuming across reconnects.
pub struct FtpFetcher<P> {
    config: Arc<FtpFetchConfig>,
    provider: P,
    validator: FtpCompletionValidator,
}

impl FtpFetcher<FtpTcpSessionProvider> {
    pub fn with_tcp(config: Arc<FtpFetchConfig>) -> Self {
        let provider = FtpTcpSessionProvider::new(Arc::new(config.session.clone()));
        FtpFetcher::new(config, provider)
    }
}

impl<P: FtpSessionProvider> FtpFetcher<P> {
    pub fn new(config: Arc<FtpFetchConfig>, provider: P) -> Self {
        let validator = FtpCompletionValidator::new(&config.complete_prefix);
        FtpFetcher {
            config,
            provider,
            validator,
        }
    }

    #[inline]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn run_attempt(
        &self,
        state: &mut FtpFetchState,
        progress: &FtpFetchProgress,
        file: &mut File,
        slot: &mut Option<P::Session>,
    ) -> Result<AttemptEnd, FtpAttemptError> {
        let session = slot.insert(self.provider.open_session().await?);
        progress.attach_session(session.closer());

        let remote_size = session.query_size(&state.remote_name).await?;
        state.remote_size = Some(remote_size);
        let offset = progress.offset();
        if offset == remote_size {
            return Ok(AttemptEnd::Complete);
        } else if offset > remote_size {
            return Ok(AttemptEnd::LocalTooLarge(remote_size));
        }

        progress.set_waiting(false);
        state.set_status(FtpFetchStatus::Transferring);
        let mut writer = ProgressWriter {
            inner: file,
            progress,
        };
        let status = session
            .retrieve(&state.remote_name, &mut writer, offset)
            .await?;

        let new_offset = progress.offset();
        if new_offset == offset {
            return Err(FtpAttemptError::NoProgress {
                remaining: remote_size - offset,
            });
        }
        Ok(AttemptEnd::Retrieved(status))
    }

    /// Download `remote_name` to `local_path`.
    ///
    /// An existing local file is treated as the first part of the remote
    /// one. It is never truncated, nor deleted on failure.
    pub async fn download(
        &self,
        remote_name: &str,
        local_path: &Path,
    ) -> Result<FtpFetchOutcome, FtpFetchError> {
        if self.config.monitor_interval.is_zero() {
            return Err(FtpFetchError::ZeroMonitorInterval);
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(local_path)
            .await?;
        let offset = file.seek(SeekFrom::End(0)).await?;
        if offset > 0 {
            info!("resuming {remote_name} from offset {offset}");
        }

        let progress = Arc::new(FtpFetchProgress::new(offset));
        let mut state = FtpFetchState::new(remote_name, self.config.max_attempts);
        let mut monitor = StallMonitor::spawn(progress.clone(), self.config.monitor_interval);

        let mut session: Option<P::Session> = None;
        let mut last_status: Option<String> = None;
        let mut failed_attempts = 0usize;
        let mut retrieves = 0usize;
        let mut failure: Option<FtpFetchFailure> = None;
        loop {
            state.set_status(FtpFetchStatus::Connecting);
            match self
                .run_attempt(&mut state, &progress, &mut file, &mut session)
                .await
            {
                Ok(AttemptEnd::Complete) => break,
                Ok(AttemptEnd::LocalTooLarge(remote)) => {
                    failure = Some(FtpFetchFailure::LocalFileTooLarge {
                        local: progress.offset(),
                        remote,
                    });
                    break;
                }
                Ok(AttemptEnd::Retrieved(status)) => {
                    retrieves += 1;
                    last_status = Some(status);
                    progress.set_waiting(true);
                    if let Some(size) = state.remote_size {
                        let offset = progress.offset();
                        if offset > size {
                            failure = Some(FtpFetchFailure::LocalFileTooLarge {
                                local: offset,
                                remote: size,
                            });
                            break;
                        } else if offset == size {
                            break;
                        }
                    }
                    info!(
                        "transfer of {remote_name} ended early at offset {}, reconnecting",
                        progress.offset()
                    );
                    if let Some(mut s) = session.take() {
                        s.quit_and_close().await;
                    }
                }
                Err(e) => {
                    if matches!(e, FtpAttemptError::Transfer(_) | FtpAttemptError::NoProgress { .. }) {
                        retrieves += 1;
                    }
                    progress.set_waiting(true);
                    progress.detach_session();
                    match sync_local_offset(&mut file).await {
                        Ok(len) => {
                            if len != progress.offset() {
                                warn!(
                                    "{remote_name}: {} bytes received but local file has {len}",
                                    progress.offset()
                                );
                                progress.reset_offset(len);
                            }
                        }
                        Err(e) => {
                            monitor.stop();
                            state.set_status(FtpFetchStatus::Failed);
                            return Err(FtpFetchError::LocalIo(e));
                        }
                    }

                    let forced = match session.take() {
                        Some(s) => {
                            let closer = s.closer();
                            closer.close();
                            closer.is_force_closed()
                        }
                        None => false,
                    };
                    if forced {
                        state.set_status(FtpFetchStatus::Stalled);
                    }
                    if !forced || self.config.stall_counts_as_attempt {
                        failed_attempts += 1;
                        state.attempts_remaining = state.attempts_remaining.saturating_sub(1);
                    }
                    if state.attempts_remaining == 0 {
                        monitor.stop();
                        state.set_status(FtpFetchStatus::Failed);
                        error!(
                            "download of {remote_name} failed after {failed_attempts} attempts at offset {}: {e}",
                            progress.offset()
                        );
                        return Err(FtpFetchError::ExhaustedRetries {
                            attempts: failed_attempts,
                            last: e,
                        });
                    }

                    state.set_status(FtpFetchStatus::Backoff);
                    warn!(
                        "download of {remote_name} interrupted at offset {}: {e}",
                        progress.offset()
                    );
                    tokio::time::sleep(self.config.retry_wait).await;
                    info!(
                        "reconnecting for {remote_name}, {} attempts left",
                        state.attempts_remaining
                    );
                }
            }
        }

        monitor.stop();
        progress.set_waiting(true);
        if let Some(mut s) = session.take() {
            s.quit_and_close().await;
        }
        progress.detach_session();

        if let Some(failure) = failure {
            state.set_status(FtpFetchStatus::Failed);
            error!("download of {remote_name} failed: {failure}");
            return Ok(FtpFetchOutcome::Failure(failure));
        }
        if let Err(e) = self.validator.validate(remote_name, last_status.as_deref()) {
            state.set_status(FtpFetchStatus::Failed);
            return Ok(FtpFetchOutcome::Failure(e.into()));
        }

        state.set_status(FtpFetchStatus::Complete);
        let stats = FtpFetchStats {
            remote_name: state.remote_name,
            size: progress.offset(),
            remote_size: state.remote_size,
            failed_attempts,
            retrieves,
            stalls: progress.stall_count(),
            status: state.status,
        };
        info!("downloaded {remote_name}, {} bytes", stats.size);
        Ok(FtpFetchOutcome::Success(stats))
    }
}
