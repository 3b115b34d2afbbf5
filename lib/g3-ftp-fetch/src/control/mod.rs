/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::SocketAddr;
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncWrite, BufStream};

use crate::FtpControlConfig;
use crate::error::{
    FtpAuthStatus, FtpCommandError, FtpFileRetrieveError, FtpFileStatError, FtpSessionOpenError,
};

mod response;
pub(crate) use response::FtpRawResponse;

mod command;
pub use command::FtpCommand;

mod line;
pub(crate) use line::limited_read_until;

/// Reply codes with the same meaning whatever the command is.
fn common_reply_error(cmd: FtpCommand, code: u16) -> FtpCommandError {
    match code {
        421 => FtpCommandError::ServiceNotAvailable,
        500 | 501 => FtpCommandError::RejectedCommandSyntax(cmd),
        502 => FtpCommandError::CommandNotImplemented(cmd),
        503 => FtpCommandError::BadCommandSequence(cmd),
        504 => FtpCommandError::ParameterNotImplemented(cmd),
        530 => FtpCommandError::NotLoggedIn,
        n => FtpCommandError::UnexpectedReplyCode(cmd, n),
    }
}

pub(crate) struct FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite,
{
    config: FtpControlConfig,
    stream: BufStream<T>,
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: T, config: FtpControlConfig) -> Self {
        FtpControlChannel {
            config,
            stream: BufStream::new(stream),
        }
    }

    pub(crate) fn get_ref(&self) -> &T {
        self.stream.get_ref()
    }

    /// Send one command and wait for its reply within the command timeout.
    async fn request(
        &mut self,
        cmd: FtpCommand,
        arg: Option<&str>,
    ) -> Result<FtpRawResponse, FtpCommandError> {
        self.send_command(cmd, arg)
            .await
            .map_err(FtpCommandError::SendFailed)?;
        let reply = self.timed_read_raw_response(cmd.as_str()).await?;
        Ok(reply)
    }

    pub(crate) async fn wait_greetings(&mut self) -> Result<(), FtpCommandError> {
        loop {
            let reply = self.read_raw_response().await?;
            match reply.code() {
                // service ready in nnn minutes
                120 => {}
                220 => return Ok(()),
                n => return Err(common_reply_error(FtpCommand::Greeting, n)),
            }
        }
    }

    pub(crate) async fn send_username(
        &mut self,
        name: Option<&str>,
    ) -> Result<FtpAuthStatus, FtpCommandError> {
        let cmd = FtpCommand::User;
        let reply = self.request(cmd, Some(name.unwrap_or("anonymous"))).await?;
        match reply.code() {
            230 => Ok(FtpAuthStatus::LoggedIn),
            331 => Ok(FtpAuthStatus::NeedPassword),
            332 => Ok(FtpAuthStatus::NeedAccount),
            530 => Ok(FtpAuthStatus::NotLoggedIn),
            n => Err(common_reply_error(cmd, n)),
        }
    }

    pub(crate) async fn send_password(
        &mut self,
        pass: Option<&str>,
    ) -> Result<FtpAuthStatus, FtpCommandError> {
        let cmd = FtpCommand::Pass;
        let reply = self.request(cmd, Some(pass.unwrap_or("xxx"))).await?;
        match reply.code() {
            230 => Ok(FtpAuthStatus::LoggedIn),
            332 => Ok(FtpAuthStatus::NeedAccount),
            530 => Ok(FtpAuthStatus::NotLoggedIn),
            // superfluous at this site
            202 => Err(FtpCommandError::CommandNotImplemented(cmd)),
            n => Err(common_reply_error(cmd, n)),
        }
    }

    pub(crate) async fn send_quit(&mut self) -> Result<(), FtpCommandError> {
        let cmd = FtpCommand::Quit;
        let reply = self.request(cmd, None).await?;
        match reply.code() {
            221 => Ok(()),
            n => Err(common_reply_error(cmd, n)),
        }
    }

    pub(crate) async fn change_dir(&mut self, path: &str) -> Result<(), FtpSessionOpenError> {
        let cmd = FtpCommand::Cwd;
        let reply = self.request(cmd, Some(path)).await?;
        match reply.code() {
            200 | 250 => Ok(()),
            530 => Err(FtpSessionOpenError::NotLoggedIn),
            550 => Err(FtpSessionOpenError::DirectoryUnavailable(path.to_string())),
            n => Err(common_reply_error(cmd, n).into()),
        }
    }

    pub(crate) async fn request_binary_type(&mut self) -> Result<(), FtpCommandError> {
        let cmd = FtpCommand::TypeImage;
        let reply = self.request(cmd, None).await?;
        match reply.code() {
            200 => Ok(()),
            n => Err(common_reply_error(cmd, n)),
        }
    }

    pub(crate) async fn request_size(&mut self, path: &str) -> Result<u64, FtpFileStatError> {
        let cmd = FtpCommand::Size;
        let reply = self.request(cmd, Some(path)).await?;
        match reply.code() {
            213 => reply
                .line_trimmed()
                .and_then(|s| u64::from_str(s).ok())
                .ok_or_else(|| FtpCommandError::InvalidReplySyntax(cmd, 213).into()),
            550 => Err(FtpFileStatError::FileUnavailable),
            n => Err(common_reply_error(cmd, n).into()),
        }
    }

    pub(crate) async fn request_pasv_port(&mut self) -> Result<SocketAddr, FtpCommandError> {
        let cmd = FtpCommand::Pasv;
        let reply = self.request(cmd, None).await?;
        match reply.code() {
            227 => reply
                .parse_pasv_227_reply()
                .ok_or(FtpCommandError::InvalidReplySyntax(cmd, 227)),
            n => Err(common_reply_error(cmd, n)),
        }
    }

    pub(crate) async fn request_epsv_port(&mut self) -> Result<u16, FtpCommandError> {
        let cmd = FtpCommand::Epsv;
        let reply = self.request(cmd, None).await?;
        match reply.code() {
            229 => reply
                .parse_epsv_229_reply()
                .ok_or(FtpCommandError::InvalidReplySyntax(cmd, 229)),
            // network protocol not supported
            522 => Err(FtpCommandError::CommandNotImplemented(cmd)),
            n => Err(common_reply_error(cmd, n)),
        }
    }

    pub(crate) async fn request_restart(&mut self, position: u64) -> Result<(), FtpCommandError> {
        let cmd = FtpCommand::Rest;
        let reply = self.request(cmd, Some(&position.to_string())).await?;
        match reply.code() {
            350 => Ok(()),
            n => Err(common_reply_error(cmd, n)),
        }
    }

    async fn start_transfer(
        &mut self,
        cmd: FtpCommand,
        path: &str,
    ) -> Result<(), FtpFileRetrieveError> {
        let arg = if path.is_empty() { None } else { Some(path) };
        let reply = self.request(cmd, arg).await?;
        match reply.code() {
            125 | 150 => Ok(()),
            425 => Err(FtpFileRetrieveError::DataTransferNotEstablished),
            450 | 550 => Err(FtpFileRetrieveError::FileUnavailable),
            n => Err(common_reply_error(cmd, n).into()),
        }
    }

    pub(crate) async fn start_retrieve(&mut self, path: &str) -> Result<(), FtpFileRetrieveError> {
        self.start_transfer(FtpCommand::Retr, path).await
    }

    pub(crate) async fn start_name_list(
        &mut self,
        path: &str,
    ) -> Result<(), FtpFileRetrieveError> {
        self.start_transfer(FtpCommand::Nlst, path).await
    }

    /// Wait for the end reply of a data transfer, and return its status line.
    pub(crate) async fn wait_transfer_end(&mut self) -> Result<String, FtpFileRetrieveError> {
        let reply = self.read_raw_response().await?;
        match reply.code() {
            226 | 250 => Ok(reply.status_line()),
            425 => Err(FtpFileRetrieveError::DataTransferNotEstablished),
            426 => Err(FtpFileRetrieveError::DataTransferLost),
            451 => Err(FtpFileRetrieveError::ServerFailed),
            n => Err(FtpFileRetrieveError::UnexpectedEndReplyCode(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn channel(stream: tokio_test::io::Mock) -> FtpControlChannel<tokio_test::io::Mock> {
        FtpControlChannel::new(stream, FtpControlConfig::default())
    }

    #[tokio::test]
    async fn greeting_and_login() {
        let stream = tokio_test::io::Builder::new()
            .read(b"120 wait a moment\r\n")
            .read(b"220-Welcome\r\n banner line\r\n220 ready\r\n")
            .write(b"USER reader\r\n")
            .read(b"331 Password required\r\n")
            .write(b"PASS secret\r\n")
            .read(b"230 Logged in\r\n")
            .build();
        let mut ch = channel(stream);
        ch.wait_greetings().await.unwrap();
        assert!(matches!(
            ch.send_username(Some("reader")).await.unwrap(),
            FtpAuthStatus::NeedPassword
        ));
        assert!(matches!(
            ch.send_password(Some("secret")).await.unwrap(),
            FtpAuthStatus::LoggedIn
        ));
    }

    #[tokio::test]
    async fn anonymous_login_rejected() {
        let stream = tokio_test::io::Builder::new()
            .write(b"USER anonymous\r\n")
            .read(b"530 anonymous not allowed\r\n")
            .build();
        let mut ch = channel(stream);
        assert!(matches!(
            ch.send_username(None).await.unwrap(),
            FtpAuthStatus::NotLoggedIn
        ));
    }

    #[tokio::test]
    async fn change_dir_unavailable() {
        let stream = tokio_test::io::Builder::new()
            .write(b"CWD models\r\n")
            .read(b"550 No such directory\r\n")
            .build();
        let mut ch = channel(stream);
        let e = ch.change_dir("models").await.unwrap_err();
        assert!(matches!(e, FtpSessionOpenError::DirectoryUnavailable(p) if p == "models"));
    }

    #[tokio::test]
    async fn binary_size_restart() {
        let stream = tokio_test::io::Builder::new()
            .write(b"TYPE I\r\n")
            .read(b"200 Switching to Binary mode.\r\n")
            .write(b"SIZE model.bin\r\n")
            .read(b"213 1000\r\n")
            .write(b"REST 600\r\n")
            .read(b"350 Restart position accepted (600).\r\n")
            .build();
        let mut ch = channel(stream);
        ch.request_binary_type().await.unwrap();
        assert_eq!(ch.request_size("model.bin").await.unwrap(), 1000);
        ch.request_restart(600).await.unwrap();
    }

    #[tokio::test]
    async fn size_errors() {
        let stream = tokio_test::io::Builder::new()
            .write(b"SIZE missing.bin\r\n")
            .read(b"550 Could not get file size.\r\n")
            .write(b"SIZE broken.bin\r\n")
            .read(b"213 many\r\n")
            .build();
        let mut ch = channel(stream);
        assert!(matches!(
            ch.request_size("missing.bin").await,
            Err(FtpFileStatError::FileUnavailable)
        ));
        assert!(matches!(
            ch.request_size("broken.bin").await,
            Err(FtpFileStatError::RawCommandError(
                FtpCommandError::InvalidReplySyntax(FtpCommand::Size, 213)
            ))
        ));
    }

    #[tokio::test]
    async fn retrieve_start_and_end() {
        let stream = tokio_test::io::Builder::new()
            .write(b"RETR model.bin\r\n")
            .read(b"150 Opening BINARY mode data connection.\r\n")
            .read(b"226 Transfer complete.\r\n")
            .write(b"RETR model.bin\r\n")
            .read(b"150 Opening BINARY mode data connection.\r\n")
            .read(b"426 Connection closed; transfer aborted.\r\n")
            .build();
        let mut ch = channel(stream);
        ch.start_retrieve("model.bin").await.unwrap();
        assert_eq!(
            ch.wait_transfer_end().await.unwrap(),
            "226 Transfer complete."
        );
        ch.start_retrieve("model.bin").await.unwrap();
        assert!(matches!(
            ch.wait_transfer_end().await,
            Err(FtpFileRetrieveError::DataTransferLost)
        ));
    }

    #[tokio::test]
    async fn closed_while_reading() {
        let stream = tokio_test::io::Builder::new()
            .write(b"SIZE model.bin\r\n")
            .build();
        let mut ch = channel(stream);
        assert!(matches!(
            ch.request_size("model.bin").await,
            Err(FtpFileStatError::RawCommandError(
                FtpCommandError::RecvFailed(crate::FtpRawResponseError::ConnectionClosed)
            ))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn reply_timeout() {
        let stream = tokio_test::io::Builder::new()
            .write(b"TYPE I\r\n")
            .wait(Duration::from_secs(60))
            .build();
        let mut ch = channel(stream);
        assert!(matches!(
            ch.request_binary_type().await,
            Err(FtpCommandError::RecvFailed(
                crate::FtpRawResponseError::ReadResponseTimedOut(_)
            ))
        ));
    }
}
