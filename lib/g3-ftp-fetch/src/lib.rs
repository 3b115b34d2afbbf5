/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod debug;
pub use debug::{FTP_DEBUG_LOG_LEVEL, FTP_DEBUG_LOG_TARGET};

mod config;
pub use config::{
    FtpControlConfig, FtpFetchConfig, FtpKeepAliveConfig, FtpSessionConfig, FtpTransferConfig,
};

mod error;
pub use error::{
    FtpAttemptError, FtpCommandError, FtpCompletionError, FtpConnectError, FtpFetchError,
    FtpFileListError, FtpFileRetrieveError, FtpFileStatError, FtpRawResponseError,
    FtpSessionOpenError,
};

mod control;
pub use control::FtpCommand;

mod session;
pub use session::{
    FTP_DEFAULT_PORT, FtpServerAddr, FtpServerAddrParseError, FtpSession, FtpSessionCloser,
};

mod monitor;
pub use monitor::{FtpFetchProgress, StallCheck, StallMonitor, StallMonitorState};

mod validate;
pub use validate::{FTP_TRANSFER_COMPLETE_PREFIX, FtpCompletionValidator};

mod fetch;
pub use fetch::{
    FtpFetchFailure, FtpFetchOutcome, FtpFetchSession, FtpFetchState, FtpFetchStats,
    FtpFetchStatus, FtpFetcher, FtpSessionProvider, FtpTcpSessionProvider,
};
