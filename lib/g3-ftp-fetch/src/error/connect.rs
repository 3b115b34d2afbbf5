/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use crate::error::FtpCommandError;

/// Failure to get a greeted control connection.
#[derive(Debug, Error)]
pub enum FtpConnectError {
    #[error("failed to resolve server address: {0:?}")]
    ResolveFailed(io::Error),
    #[error("failed to connect: {0:?}")]
    ConnectIoError(io::Error),
    #[error("connect timed out")]
    ConnectTimedOut,
    #[error("timed out waiting server greeting")]
    GreetingTimedOut,
    #[error("invalid server greeting: {0}")]
    GreetingFailed(FtpCommandError),
    #[error("service not available")]
    ServiceNotAvailable,
}
