/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::{FtpFileRetrieveError, FtpFileStatError, FtpSessionOpenError};

/// Failure of a single connect + retrieve attempt.
///
/// All of these are retryable and charged to the attempt budget.
#[derive(Debug, Error)]
pub enum FtpAttemptError {
    #[error("connection error: {0}")]
    Connection(#[from] FtpSessionOpenError),
    #[error("size query error: {0}")]
    QuerySize(#[from] FtpFileStatError),
    #[error("transfer error: {0}")]
    Transfer(#[from] FtpFileRetrieveError),
    #[error("no data received while {remaining} bytes are still missing")]
    NoProgress { remaining: u64 },
}

#[derive(Debug, Error)]
pub enum FtpCompletionError {
    #[error("no transfer status line received")]
    NoStatus,
    #[error("unexpected transfer status: {0}")]
    Mismatch(String),
}

#[derive(Debug, Error)]
pub enum FtpFetchError {
    #[error("local file io error: {0:?}")]
    LocalIo(#[from] io::Error),
    #[error("stall monitor interval should not be zero")]
    ZeroMonitorInterval,
    #[error("retries exhausted after {attempts} failed attempts, last error: {last}")]
    ExhaustedRetries {
        attempts: usize,
        last: FtpAttemptError,
    },
}
