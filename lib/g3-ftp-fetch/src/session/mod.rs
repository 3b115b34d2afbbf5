/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::FtpSessionConfig;
use crate::control::{FtpControlChannel, limited_read_until};
use crate::error::{
    FtpAuthStatus, FtpCommandError, FtpConnectError, FtpFileListError, FtpFileRetrieveError,
    FtpFileStatError, FtpSessionOpenError,
};

mod addr;
pub use addr::{FTP_DEFAULT_PORT, FtpServerAddr, FtpServerAddrParseError};

mod closer;
pub use closer::FtpSessionCloser;

mod socket;

#[cfg(test)]
pub(crate) mod test_server;

/// Fail `fut` as soon as the session is closed.
async fn run_guarded<F, R, E>(closer: &FtpSessionCloser, fut: F) -> Result<R, E>
where
    F: Future<Output = Result<R, E>>,
    E: From<FtpCommandError>,
{
    if closer.is_closed() {
        return Err(FtpCommandError::SessionClosed.into());
    }
    tokio::select! {
        biased;

        _ = closer.wait_closed() => Err(FtpCommandError::SessionClosed.into()),
        r = fut => r,
    }
}

/// A live FTP control connection.
///
/// Data connections are opened in passive mode to the same peer ip as the
/// control connection, one per transfer.
pub struct FtpSession {
    config: Arc<FtpSessionConfig>,
    control: FtpControlChannel<TcpStream>,
    peer_addr: SocketAddr,
    binary_mode: bool,
    epsv_unsupported: bool,
    closer: Arc<FtpSessionCloser>,
}

impl FtpSession {
    pub async fn connect_to(
        server: &FtpServerAddr,
        config: Arc<FtpSessionConfig>,
    ) -> Result<Self, FtpConnectError> {
        let stream = tokio::time::timeout(
            config.connect_timeout,
            socket::connect_server(server, config.bind_ip),
        )
        .await
        .map_err(|_| FtpConnectError::ConnectTimedOut)??;
        let peer_addr = stream.peer_addr().map_err(FtpConnectError::ConnectIoError)?;

        let mut control = FtpControlChannel::new(stream, config.control.clone());
        match tokio::time::timeout(config.greeting_timeout, control.wait_greetings()).await {
            Ok(Ok(_)) => {}
            Ok(Err(FtpCommandError::ServiceNotAvailable)) => {
                return Err(FtpConnectError::ServiceNotAvailable);
            }
            Ok(Err(e)) => return Err(FtpConnectError::GreetingFailed(e)),
            Err(_) => return Err(FtpConnectError::GreetingTimedOut),
        }
        debug!("ftp control connection to {server} ({peer_addr}) established");

        Ok(FtpSession {
            config,
            control,
            peer_addr,
            binary_mode: false,
            epsv_unsupported: false,
            closer: Arc::new(FtpSessionCloser::default()),
        })
    }

    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn closer(&self) -> Arc<FtpSessionCloser> {
        self.closer.clone()
    }

    pub async fn authenticate(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), FtpSessionOpenError> {
        let status = run_guarded(&self.closer, self.control.send_username(username)).await?;
        match status {
            FtpAuthStatus::LoggedIn => Ok(()),
            FtpAuthStatus::NotLoggedIn => Err(FtpSessionOpenError::NotLoggedIn),
            FtpAuthStatus::NeedAccount => Err(FtpSessionOpenError::AccountIsNeeded),
            FtpAuthStatus::NeedPassword => {
                match run_guarded(&self.closer, self.control.send_password(password)).await? {
                    FtpAuthStatus::LoggedIn => Ok(()),
                    FtpAuthStatus::NeedAccount => Err(FtpSessionOpenError::AccountIsNeeded),
                    FtpAuthStatus::NotLoggedIn | FtpAuthStatus::NeedPassword => {
                        Err(FtpSessionOpenError::NotLoggedIn)
                    }
                }
            }
        }
    }

    pub async fn change_working_directory(&mut self, path: &str) -> Result<(), FtpSessionOpenError> {
        if path.is_empty() {
            return Ok(());
        }
        run_guarded(&self.closer, self.control.change_dir(path)).await
    }

    /// Enable tcp keepalive on the control connection.
    pub fn tune_for_long_transfer(&self) -> io::Result<()> {
        socket::set_keepalive(self.control.get_ref(), &self.config.keepalive)
    }

    async fn ensure_binary_mode(&mut self) -> Result<(), FtpCommandError> {
        if !self.binary_mode {
            self.control.request_binary_type().await?;
            self.binary_mode = true;
        }
        Ok(())
    }

    async fn do_query_size(&mut self, path: &str) -> Result<u64, FtpFileStatError> {
        self.ensure_binary_mode().await?;
        self.control.request_size(path).await
    }

    /// Query the size of `path`, switching to binary mode first.
    pub async fn query_size(&mut self, path: &str) -> Result<u64, FtpFileStatError> {
        let closer = self.closer.clone();
        run_guarded(&closer, self.do_query_size(path)).await
    }

    async fn new_data_connection(&mut self) -> Result<TcpStream, FtpFileRetrieveError> {
        let mut port = None;
        if self.config.transfer.always_try_epsv && !self.epsv_unsupported {
            match self.control.request_epsv_port().await {
                Ok(p) => port = Some(p),
                Err(
                    FtpCommandError::CommandNotImplemented(_)
                    | FtpCommandError::RejectedCommandSyntax(_),
                ) => {
                    self.epsv_unsupported = true;
                }
                Err(e) => return Err(FtpFileRetrieveError::TransferSetupFailed(e)),
            }
        }
        let port = match port {
            Some(p) => p,
            None => self
                .control
                .request_pasv_port()
                .await
                .map_err(FtpFileRetrieveError::TransferSetupFailed)?
                .port(),
        };

        let data_addr = SocketAddr::new(self.peer_addr.ip(), port);
        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            socket::connect_addr(data_addr, self.config.bind_ip),
        )
        .await
        .map_err(|_| FtpFileRetrieveError::DataConnectTimedOut)?
        .map_err(FtpFileRetrieveError::DataConnectFailed)?;
        socket::set_keepalive(&stream, &self.config.keepalive)
            .map_err(FtpFileRetrieveError::DataConnectFailed)?;
        Ok(stream)
    }

    async fn wait_transfer_end(&mut self) -> Result<String, FtpFileRetrieveError> {
        match tokio::time::timeout(
            self.config.transfer.end_wait_timeout,
            self.control.wait_transfer_end(),
        )
        .await
        {
            Ok(r) => r,
            Err(_) => Err(FtpFileRetrieveError::TimeoutToWaitEndReply),
        }
    }

    async fn receive_data<R, W>(&self, data: &mut R, sink: &mut W) -> Result<(), FtpFileRetrieveError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut buf = vec![0u8; self.config.transfer.buffer_size];
        loop {
            let nr = data
                .read(&mut buf)
                .await
                .map_err(FtpFileRetrieveError::DataReadFailed)?;
            if nr == 0 {
                break;
            }
            sink.write_all(&buf[..nr])
                .await
                .map_err(FtpFileRetrieveError::LocalWriteFailed)?;
        }
        sink.flush()
            .await
            .map_err(FtpFileRetrieveError::LocalWriteFailed)
    }

    async fn do_retrieve<W>(
        &mut self,
        path: &str,
        sink: &mut W,
        offset: u64,
    ) -> Result<String, FtpFileRetrieveError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.ensure_binary_mode()
            .await
            .map_err(FtpFileRetrieveError::TransferSetupFailed)?;
        let mut data = self.new_data_connection().await?;
        if offset > 0 {
            self.control
                .request_restart(offset)
                .await
                .map_err(FtpFileRetrieveError::TransferSetupFailed)?;
        }
        self.control.start_retrieve(path).await?;

        self.receive_data(&mut data, sink).await?;
        drop(data);

        self.wait_transfer_end().await
    }

    /// Retrieve `path` from `offset` into `sink`.
    ///
    /// No restart marker is sent if `offset` is 0. The final status line of
    /// the transfer is returned, e.g. `226 Transfer complete.`.
    pub async fn retrieve<W>(
        &mut self,
        path: &str,
        sink: &mut W,
        offset: u64,
    ) -> Result<String, FtpFileRetrieveError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let closer = self.closer.clone();
        run_guarded(&closer, self.do_retrieve(path, sink, offset)).await
    }

    async fn do_list_names(&mut self, path: &str) -> Result<Vec<String>, FtpFileListError> {
        self.ensure_binary_mode()
            .await
            .map_err(FtpFileRetrieveError::TransferSetupFailed)?;
        let data = self.new_data_connection().await?;
        self.control.start_name_list(path).await?;

        let max_entries = self.config.transfer.list_max_entries;
        let max_line_len = self.config.transfer.list_max_line_len;
        let mut reader = BufReader::new(data);
        let mut names = Vec::new();
        let mut buf = Vec::with_capacity(max_line_len);
        loop {
            buf.clear();
            let (found, nr) = limited_read_until(&mut reader, b'\n', max_line_len, &mut buf)
                .await
                .map_err(FtpFileRetrieveError::DataReadFailed)?;
            if nr == 0 {
                break;
            }
            if !found && nr >= max_line_len {
                return Err(FtpFileListError::LineTooLong(names.len() + 1));
            }
            let line = std::str::from_utf8(&buf).map_err(|_| FtpFileListError::UnsupportedEncoding)?;
            let name = line.trim_end_matches(['\r', '\n']);
            if name.is_empty() {
                continue;
            }
            if names.len() >= max_entries {
                return Err(FtpFileListError::TooManyLines);
            }
            names.push(name.to_string());
        }
        drop(reader);

        self.wait_transfer_end().await?;
        Ok(names)
    }

    /// List file names of `path` (or the working directory if empty).
    pub async fn list_names(&mut self, path: &str) -> Result<Vec<String>, FtpFileListError> {
        let closer = self.closer.clone();
        run_guarded(&closer, self.do_list_names(path)).await
    }

    pub fn close(&self) {
        self.closer.close();
    }

    pub async fn quit_and_close(&mut self) {
        if !self.closer.is_closed() {
            if let Err(e) = run_guarded(&self.closer, self.control.send_quit()).await {
                debug!("ftp quit to {} failed: {e}", self.peer_addr);
            }
        }
        self.close();
    }
}
