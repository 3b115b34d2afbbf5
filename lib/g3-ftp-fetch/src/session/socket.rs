/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::{IpAddr, SocketAddr};

use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpSocket, TcpStream};

use super::FtpServerAddr;
use crate::config::FtpKeepAliveConfig;
use crate::error::FtpConnectError;

fn new_socket_to(peer: &SocketAddr, bind_ip: Option<IpAddr>) -> io::Result<TcpSocket> {
    let socket = match peer {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    if let Some(ip) = bind_ip {
        socket.bind(SocketAddr::new(ip, 0))?;
    }
    Ok(socket)
}

pub(super) async fn connect_addr(
    peer: SocketAddr,
    bind_ip: Option<IpAddr>,
) -> io::Result<TcpStream> {
    let socket = new_socket_to(&peer, bind_ip)?;
    socket.connect(peer).await
}

/// Try all resolved addresses in order, returning the last error if none works.
pub(super) async fn connect_server(
    server: &FtpServerAddr,
    bind_ip: Option<IpAddr>,
) -> Result<TcpStream, FtpConnectError> {
    let addrs = tokio::net::lookup_host(server.to_string())
        .await
        .map_err(FtpConnectError::ResolveFailed)?;

    let mut err = io::Error::new(io::ErrorKind::AddrNotAvailable, "no addr resolved");
    for addr in addrs {
        if let Some(ip) = bind_ip {
            if ip.is_ipv4() != addr.is_ipv4() {
                continue;
            }
        }
        match connect_addr(addr, bind_ip).await {
            Ok(stream) => return Ok(stream),
            Err(e) => err = e,
        }
    }
    Err(FtpConnectError::ConnectIoError(err))
}

pub(super) fn set_keepalive(stream: &TcpStream, config: &FtpKeepAliveConfig) -> io::Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let mut setting = TcpKeepalive::new().with_time(config.idle_time);
    if let Some(interval) = config.probe_interval {
        setting = setting.with_interval(interval);
    }
    SockRef::from(stream).set_tcp_keepalive(&setting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn keepalive_applied() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = connect_addr(addr, None).await.unwrap();

        let config = FtpKeepAliveConfig::default();
        set_keepalive(&stream, &config).unwrap();

        let sock = SockRef::from(&stream);
        assert!(sock.keepalive().unwrap());
        #[cfg(target_os = "linux")]
        {
            assert_eq!(sock.tcp_keepalive_time().unwrap(), Duration::from_secs(60));
            assert_eq!(sock.tcp_keepalive_interval().unwrap(), Duration::from_secs(75));
        }
    }

    #[tokio::test]
    async fn keepalive_disabled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = connect_addr(addr, None).await.unwrap();

        let config = FtpKeepAliveConfig {
            enabled: false,
            ..Default::default()
        };
        set_keepalive(&stream, &config).unwrap();
        assert!(!SockRef::from(&stream).keepalive().unwrap());
    }
}
