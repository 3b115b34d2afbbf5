/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::{FtpCommandError, FtpRawResponseError};

#[derive(Debug, Error)]
pub enum FtpFileStatError {
    #[error("raw command error: {0}")]
    RawCommandError(FtpCommandError),
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("file unavailable")]
    FileUnavailable,
    #[error("session closed")]
    SessionClosed,
}

impl From<FtpCommandError> for FtpFileStatError {
    fn from(e: FtpCommandError) -> Self {
        match e {
            FtpCommandError::ServiceNotAvailable => FtpFileStatError::ServiceNotAvailable,
            FtpCommandError::SessionClosed => FtpFileStatError::SessionClosed,
            _ => FtpFileStatError::RawCommandError(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum FtpFileRetrieveError {
    #[error("data transfer setup error: {0}")]
    TransferSetupFailed(FtpCommandError),
    #[error("data connection failed: {0:?}")]
    DataConnectFailed(io::Error),
    #[error("timed out to connect data channel")]
    DataConnectTimedOut,
    #[error("command error: {0}")]
    CommandError(FtpCommandError),
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("file unavailable")]
    FileUnavailable,
    #[error("data read failed: {0:?}")]
    DataReadFailed(io::Error),
    #[error("local write failed: {0:?}")]
    LocalWriteFailed(io::Error),
    #[error("data connection not established at server side")]
    DataTransferNotEstablished,
    #[error("data connection lost at server side")]
    DataTransferLost,
    #[error("server failed to read the file")]
    ServerFailed,
    #[error("unexpected end reply code {0}")]
    UnexpectedEndReplyCode(u16),
    #[error("timeout to wait end reply")]
    TimeoutToWaitEndReply,
    #[error("control read error: {0}")]
    ControlReadError(#[from] FtpRawResponseError),
    #[error("session closed")]
    SessionClosed,
}

impl From<FtpCommandError> for FtpFileRetrieveError {
    fn from(e: FtpCommandError) -> Self {
        match e {
            FtpCommandError::ServiceNotAvailable => FtpFileRetrieveError::ServiceNotAvailable,
            FtpCommandError::SessionClosed => FtpFileRetrieveError::SessionClosed,
            _ => FtpFileRetrieveError::CommandError(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum FtpFileListError {
    #[error("transfer error: {0}")]
    TransferFailed(#[from] FtpFileRetrieveError),
    #[error("line {0} too long")]
    LineTooLong(usize),
    #[error("too many lines")]
    TooManyLines,
    #[error("unsupported encoding")]
    UnsupportedEncoding,
}

impl From<FtpCommandError> for FtpFileListError {
    fn from(e: FtpCommandError) -> Self {
        FtpFileListError::TransferFailed(e.into())
    }
}
