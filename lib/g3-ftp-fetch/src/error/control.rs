/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use crate::control::FtpCommand;

/// Failure to read a well formed reply from the control connection.
#[derive(Debug, Error)]
pub enum FtpRawResponseError {
    #[error("control read failed: {0:?}")]
    ReadFailed(io::Error),
    #[error("control connection closed by peer")]
    ConnectionClosed,
    #[error("reply line too long")]
    LineTooLong,
    #[error("malformed reply line")]
    InvalidLineFormat,
    #[error("reply code {0} out of range")]
    InvalidReplyCode(u16),
    #[error("reply line is not valid utf-8")]
    LineIsNotUtf8,
    #[error("too many lines in multi-line reply")]
    TooManyLines,
    #[error("timed out waiting reply to {0}")]
    ReadResponseTimedOut(&'static str),
}

#[derive(Debug, Error)]
pub enum FtpCommandError {
    #[error("failed to send command: {0:?}")]
    SendFailed(io::Error),
    #[error("failed to receive reply: {0}")]
    RecvFailed(#[from] FtpRawResponseError),
    #[error("not logged in")]
    NotLoggedIn,
    #[error("service not available, closing control connection")]
    ServiceNotAvailable,
    #[error("server rejected the syntax of {0}")]
    RejectedCommandSyntax(FtpCommand),
    #[error("server does not implement {0}")]
    CommandNotImplemented(FtpCommand),
    #[error("server does not implement the parameter of {0}")]
    ParameterNotImplemented(FtpCommand),
    #[error("bad sequence of command {0}")]
    BadCommandSequence(FtpCommand),
    #[error("unexpected reply code {1} to {0}")]
    UnexpectedReplyCode(FtpCommand, u16),
    #[error("malformed {1} reply to {0}")]
    InvalidReplySyntax(FtpCommand, u16),
    #[error("session closed")]
    SessionClosed,
}
