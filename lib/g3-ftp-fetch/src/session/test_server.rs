/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! A scripted loopback ftp server used by tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use super::FtpServerAddr;
use crate::FtpSessionConfig;

pub(crate) const FILE_NAME: &str = "model.bin";
pub(crate) const LIST_NAMES: &[&str] = &["model.bin", "labels.txt"];
const USERNAME: &str = "reader";
const PASSWORD: &str = "secret";
const REMOTE_DIR: &str = "models";

/// What the server does for the n-th RETR command it receives.
#[derive(Clone, Copy, Debug)]
pub(crate) enum RetrAction {
    /// Send everything from the restart offset and reply 226.
    Full,
    /// Send n bytes, close the data connection and reply 426.
    Cut(usize),
    /// Send n bytes and then stay silent on both connections.
    Stall(usize),
    /// Send everything but reply with a non 226 status.
    WrongStatus,
}

#[derive(Default)]
struct ServerRecord {
    commands: Vec<String>,
    retr_offsets: Vec<u64>,
    connections: usize,
}

struct ServerBehavior {
    content: Vec<u8>,
    retr_actions: Vec<RetrAction>,
    epsv: bool,
}

pub(crate) struct TestFtpServer {
    addr: SocketAddr,
    record: Arc<Mutex<ServerRecord>>,
}

impl TestFtpServer {
    pub(crate) async fn start(content: Vec<u8>, retr_actions: Vec<RetrAction>) -> Self {
        Self::spawn(ServerBehavior {
            content,
            retr_actions,
            epsv: true,
        })
        .await
    }

    pub(crate) async fn start_without_epsv(content: Vec<u8>) -> Self {
        Self::spawn(ServerBehavior {
            content,
            retr_actions: Vec::new(),
            epsv: false,
        })
        .await
    }

    async fn spawn(behavior: ServerBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let record = Arc::new(Mutex::new(ServerRecord::default()));
        let behavior = Arc::new(behavior);

        let server_record = record.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                server_record.lock().unwrap().connections += 1;
                let record = server_record.clone();
                let behavior = behavior.clone();
                tokio::spawn(async move {
                    let _ = serve_control(stream, behavior, record).await;
                });
            }
        });

        TestFtpServer { addr, record }
    }

    pub(crate) fn session_config(&self) -> FtpSessionConfig {
        let mut config = FtpSessionConfig::new(FtpServerAddr::new("127.0.0.1", self.addr.port()));
        config.username = Some(USERNAME.to_string());
        config.password = Some(PASSWORD.to_string());
        config.remote_dir = REMOTE_DIR.to_string();
        config
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.record.lock().unwrap().commands.clone()
    }

    pub(crate) fn retr_offsets(&self) -> Vec<u64> {
        self.record.lock().unwrap().retr_offsets.clone()
    }

    pub(crate) fn connections(&self) -> usize {
        self.record.lock().unwrap().connections
    }
}

async fn serve_control(
    stream: TcpStream,
    behavior: Arc<ServerBehavior>,
    record: Arc<Mutex<ServerRecord>>,
) -> std::io::Result<()> {
    let (r, mut w) = stream.into_split();
    let mut reader = BufReader::new(r);
    w.write_all(b"220 test server ready\r\n").await?;

    let mut rest = 0u64;
    let mut pasv: Option<TcpListener> = None;
    let mut stalled: Option<TcpStream> = None;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        record.lock().unwrap().commands.push(line.to_string());
        if stalled.is_some() {
            continue;
        }

        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
        match cmd {
            "USER" if arg == USERNAME => w.write_all(b"331 password required\r\n").await?,
            "USER" => w.write_all(b"530 unknown user\r\n").await?,
            "PASS" if arg == PASSWORD => w.write_all(b"230 logged in\r\n").await?,
            "PASS" => w.write_all(b"530 login incorrect\r\n").await?,
            "CWD" if arg == REMOTE_DIR => w.write_all(b"250 directory changed\r\n").await?,
            "CWD" => w.write_all(b"550 no such directory\r\n").await?,
            "TYPE" => w.write_all(b"200 binary mode\r\n").await?,
            "SIZE" if arg == FILE_NAME => {
                let rsp = format!("213 {}\r\n", behavior.content.len());
                w.write_all(rsp.as_bytes()).await?;
            }
            "SIZE" => w.write_all(b"550 could not get file size\r\n").await?,
            "EPSV" if behavior.epsv => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                let rsp = format!("229 Entering Extended Passive Mode (|||{port}|)\r\n");
                pasv = Some(listener);
                w.write_all(rsp.as_bytes()).await?;
            }
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                let rsp = format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{})\r\n",
                    port >> 8,
                    port & 0xFF
                );
                pasv = Some(listener);
                w.write_all(rsp.as_bytes()).await?;
            }
            "REST" => {
                rest = arg.parse().unwrap_or(0);
                let rsp = format!("350 restart position accepted ({rest})\r\n");
                w.write_all(rsp.as_bytes()).await?;
            }
            "RETR" | "NLST" => {
                let Some(listener) = pasv.take() else {
                    w.write_all(b"425 use PASV first\r\n").await?;
                    continue;
                };
                if cmd == "RETR" && arg != FILE_NAME {
                    w.write_all(b"550 file unavailable\r\n").await?;
                    continue;
                }
                w.write_all(b"150 opening data connection\r\n").await?;
                let (mut data, _) = listener.accept().await?;

                if cmd == "NLST" {
                    for name in LIST_NAMES {
                        data.write_all(format!("{name}\r\n").as_bytes()).await?;
                    }
                    drop(data);
                    w.write_all(b"226 transfer complete\r\n").await?;
                    continue;
                }

                let action = {
                    let mut record = record.lock().unwrap();
                    record.retr_offsets.push(rest);
                    behavior
                        .retr_actions
                        .get(record.retr_offsets.len() - 1)
                        .copied()
                        .unwrap_or(RetrAction::Full)
                };
                let start = (rest as usize).min(behavior.content.len());
                let remaining = &behavior.content[start..];
                rest = 0;
                match action {
                    RetrAction::Full => {
                        data.write_all(remaining).await?;
                        drop(data);
                        w.write_all(b"226 Transfer complete.\r\n").await?;
                    }
                    RetrAction::Cut(n) => {
                        data.write_all(&remaining[..n.min(remaining.len())]).await?;
                        drop(data);
                        w.write_all(b"426 Connection closed; transfer aborted.\r\n")
                            .await?;
                    }
                    RetrAction::Stall(n) => {
                        data.write_all(&remaining[..n.min(remaining.len())]).await?;
                        stalled = Some(data);
                    }
                    RetrAction::WrongStatus => {
                        data.write_all(remaining).await?;
                        drop(data);
                        w.write_all(b"250 Requested file action okay.\r\n").await?;
                    }
                }
            }
            "QUIT" => {
                w.write_all(b"221 goodbye\r\n").await?;
                break;
            }
            _ => w.write_all(b"502 command not implemented\r\n").await?,
        }
    }
    Ok(())
}
