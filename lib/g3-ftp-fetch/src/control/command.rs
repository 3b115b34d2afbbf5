/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::FtpControlChannel;

/// Commands used by the download client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpCommand {
    /// not a real command, used for the greeting stage
    Greeting,
    User,
    Pass,
    Quit,
    Cwd,
    TypeImage,
    Pasv,
    Epsv,
    Size,
    Nlst,
    Rest,
    Retr,
}

impl FtpCommand {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FtpCommand::Greeting => "-",
            FtpCommand::User => "USER",
            FtpCommand::Pass => "PASS",
            FtpCommand::Quit => "QUIT",
            FtpCommand::Cwd => "CWD",
            FtpCommand::TypeImage => "TYPE I",
            FtpCommand::Pasv => "PASV",
            FtpCommand::Epsv => "EPSV",
            FtpCommand::Size => "SIZE",
            FtpCommand::Nlst => "NLST",
            FtpCommand::Rest => "REST",
            FtpCommand::Retr => "RETR",
        }
    }
}

impl fmt::Display for FtpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Send `cmd`, followed by `arg` if present, as one line.
    pub(super) async fn send_command(
        &mut self,
        cmd: FtpCommand,
        arg: Option<&str>,
    ) -> io::Result<()> {
        let name = cmd.as_str();
        let mut line = Vec::with_capacity(name.len() + arg.map(|s| s.len() + 1).unwrap_or(0) + 2);
        line.extend_from_slice(name.as_bytes());
        if let Some(arg) = arg {
            line.push(b' ');
            line.extend_from_slice(arg.as_bytes());
        }
        line.extend_from_slice(b"\r\n");

        #[cfg(feature = "log-raw-io")]
        if let Ok(s) = std::str::from_utf8(&line) {
            crate::debug::log_raw_line(true, s);
        }

        self.stream.write_all(&line).await?;
        self.stream.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FtpControlConfig;

    #[tokio::test]
    async fn command_lines() {
        let stream = tokio_test::io::Builder::new()
            .write(b"TYPE I\r\n")
            .write(b"RETR dir/model v2.bin\r\n")
            .build();
        let mut ch = FtpControlChannel::new(stream, FtpControlConfig::default());
        ch.send_command(FtpCommand::TypeImage, None).await.unwrap();
        ch.send_command(FtpCommand::Retr, Some("dir/model v2.bin"))
            .await
            .unwrap();
    }
}
