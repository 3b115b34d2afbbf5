/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::time::Duration;

use crate::session::FtpServerAddr;
use crate::validate::FTP_TRANSFER_COMPLETE_PREFIX;

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_ATTEMPTS: usize = 15;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FtpControlConfig {
    pub max_line_len: usize,
    pub max_multi_lines: usize,
    pub command_timeout: Duration,
}

impl Default for FtpControlConfig {
    fn default() -> Self {
        FtpControlConfig {
            max_line_len: 2048,
            max_multi_lines: 128,
            command_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FtpTransferConfig {
    pub list_max_entries: usize,
    pub list_max_line_len: usize,
    pub end_wait_timeout: Duration,
    pub buffer_size: usize,
    pub always_try_epsv: bool,
}

impl Default for FtpTransferConfig {
    fn default() -> Self {
        FtpTransferConfig {
            list_max_entries: 1024,
            list_max_line_len: 2048,
            end_wait_timeout: Duration::from_secs(10),
            buffer_size: 64 * 1024,
            always_try_epsv: true,
        }
    }
}

/// TCP keepalive applied to the control connection before a long transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FtpKeepAliveConfig {
    pub enabled: bool,
    pub idle_time: Duration,
    pub probe_interval: Option<Duration>,
}

impl Default for FtpKeepAliveConfig {
    fn default() -> Self {
        FtpKeepAliveConfig {
            enabled: true,
            idle_time: Duration::from_secs(60),
            probe_interval: Some(Duration::from_secs(75)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FtpSessionConfig {
    pub server: FtpServerAddr,
    pub username: Option<String>,
    pub password: Option<String>,
    pub remote_dir: String,
    pub bind_ip: Option<IpAddr>,
    pub connect_timeout: Duration,
    pub greeting_timeout: Duration,
    pub keepalive: FtpKeepAliveConfig,
    pub control: FtpControlConfig,
    pub transfer: FtpTransferConfig,
}

impl FtpSessionConfig {
    pub fn new(server: FtpServerAddr) -> Self {
        FtpSessionConfig {
            server,
            username: None,
            password: None,
            remote_dir: String::new(),
            bind_ip: None,
            connect_timeout: Duration::from_secs(30),
            greeting_timeout: Duration::from_secs(10),
            keepalive: FtpKeepAliveConfig::default(),
            control: FtpControlConfig::default(),
            transfer: FtpTransferConfig::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FtpFetchConfig {
    pub session: FtpSessionConfig,
    pub monitor_interval: Duration,
    pub max_attempts: usize,
    pub retry_wait: Duration,
    /// Whether a disconnect forced by the stall monitor is charged to the
    /// attempt budget like any other transfer failure.
    pub stall_counts_as_attempt: bool,
    pub complete_prefix: String,
}

impl FtpFetchConfig {
    pub fn new(session: FtpSessionConfig) -> Self {
        FtpFetchConfig {
            session,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_wait: DEFAULT_RETRY_WAIT,
            stall_counts_as_attempt: true,
            complete_prefix: FTP_TRANSFER_COMPLETE_PREFIX.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_defaults() {
        let server = FtpServerAddr::new("ftp.example.net", 21);
        let config = FtpFetchConfig::new(FtpSessionConfig::new(server));
        assert_eq!(config.max_attempts, 15);
        assert_eq!(config.monitor_interval, Duration::from_secs(30));
        assert_eq!(config.retry_wait, Duration::from_secs(30));
        assert!(config.stall_counts_as_attempt);
        assert_eq!(config.complete_prefix, "226 Transfer complete");

        let keepalive = config.session.keepalive;
        assert!(keepalive.enabled);
        assert_eq!(keepalive.idle_time, Duration::from_secs(60));
        assert_eq!(keepalive.probe_interval, Some(Duration::from_secs(75)));
    }
}
