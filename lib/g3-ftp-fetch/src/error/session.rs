/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::{FtpCommandError, FtpConnectError};

pub(crate) enum FtpAuthStatus {
    NotLoggedIn,
    LoggedIn,
    NeedPassword,
    NeedAccount,
}

#[derive(Debug, Error)]
pub enum FtpSessionOpenError {
    #[error("connect error: {0}")]
    ConnectFailed(#[from] FtpConnectError),
    #[error("raw command error: {0}")]
    RawCommandError(FtpCommandError),
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("extra account is needed")]
    AccountIsNeeded,
    #[error("directory {0} unavailable")]
    DirectoryUnavailable(String),
    #[error("socket tune failed: {0:?}")]
    SocketTuneFailed(io::Error),
    #[error("session closed")]
    SessionClosed,
}

impl From<FtpCommandError> for FtpSessionOpenError {
    fn from(e: FtpCommandError) -> Self {
        match e {
            FtpCommandError::ServiceNotAvailable => FtpSessionOpenError::ServiceNotAvailable,
            FtpCommandError::SessionClosed => FtpSessionOpenError::SessionClosed,
            _ => FtpSessionOpenError::RawCommandError(e),
        }
    }
}
