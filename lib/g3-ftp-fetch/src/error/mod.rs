/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod control;
pub use control::{FtpCommandError, FtpRawResponseError};

mod connect;
pub use connect::FtpConnectError;

mod session;
pub(crate) use session::FtpAuthStatus;
pub use session::FtpSessionOpenError;

mod file;
pub use file::{FtpFileListError, FtpFileRetrieveError, FtpFileStatError};

mod fetch;
pub use fetch::{FtpAttemptError, FtpCompletionError, FtpFetchError};
