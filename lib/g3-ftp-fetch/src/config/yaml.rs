/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use humanize_rs::ParseError;
use humanize_rs::bytes::Bytes;
use yaml_rust::{Yaml, yaml};

use super::{
    FtpControlConfig, FtpFetchConfig, FtpKeepAliveConfig, FtpSessionConfig, FtpTransferConfig,
};
use crate::session::FtpServerAddr;

impl FtpControlConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpControlConfig::default();
            foreach_kv(map, |k, v| match normalize(k).as_str() {
                "max_line_len" | "max_line_length" => {
                    config.max_line_len = as_humanize_usize(v)
                        .context(format!("invalid humanize usize value for key {k}"))?;
                    Ok(())
                }
                "max_multi_lines" => {
                    config.max_multi_lines =
                        as_usize(v).context(format!("invalid usize value for key {k}"))?;
                    Ok(())
                }
                "command_timeout" => {
                    config.command_timeout = as_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}

impl FtpTransferConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpTransferConfig::default();
            foreach_kv(map, |k, v| match normalize(k).as_str() {
                "list_max_line_len" | "list_max_line_length" => {
                    config.list_max_line_len = as_humanize_usize(v)
                        .context(format!("invalid humanize usize value for key {k}"))?;
                    Ok(())
                }
                "list_max_entries" => {
                    config.list_max_entries =
                        as_usize(v).context(format!("invalid usize value for key {k}"))?;
                    Ok(())
                }
                "end_wait_timeout" => {
                    config.end_wait_timeout = as_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    Ok(())
                }
                "buffer_size" => {
                    let size = as_humanize_usize(v)
                        .context(format!("invalid humanize usize value for key {k}"))?;
                    if size == 0 {
                        return Err(anyhow!("buffer size should not be zero"));
                    }
                    config.buffer_size = size;
                    Ok(())
                }
                "always_try_epsv" => {
                    config.always_try_epsv =
                        as_bool(v).context(format!("invalid bool value for key {k}"))?;
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}

impl FtpKeepAliveConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        match value {
            Yaml::Hash(map) => {
                let mut config = FtpKeepAliveConfig::default();
                foreach_kv(map, |k, v| match normalize(k).as_str() {
                    "enable" | "enabled" => {
                        config.enabled =
                            as_bool(v).context(format!("invalid bool value for key {k}"))?;
                        Ok(())
                    }
                    "idle_time" => {
                        config.idle_time = as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                        Ok(())
                    }
                    "probe_interval" => {
                        config.probe_interval = Some(
                            as_duration(v)
                                .context(format!("invalid humanize duration value for key {k}"))?,
                        );
                        Ok(())
                    }
                    _ => Err(anyhow!("invalid key {k}")),
                })?;
                Ok(config)
            }
            Yaml::Boolean(enabled) => Ok(FtpKeepAliveConfig {
                enabled: *enabled,
                ..Default::default()
            }),
            _ => Err(anyhow!("invalid yaml type")),
        }
    }
}

impl FtpSessionConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        let Yaml::Hash(map) = value else {
            return Err(anyhow!("invalid yaml type"));
        };

        let server = match map.get(&Yaml::String("server".to_string())) {
            Some(Yaml::String(s)) => {
                FtpServerAddr::from_str(s).context("invalid value for key server")?
            }
            Some(_) => return Err(anyhow!("invalid yaml type for key server")),
            None => return Err(anyhow!("no required key server found")),
        };

        let mut config = FtpSessionConfig::new(server);
        foreach_kv(map, |k, v| match normalize(k).as_str() {
            "server" => Ok(()),
            "username" | "user" => {
                config.username = Some(as_string(v).context(format!("invalid value for key {k}"))?);
                Ok(())
            }
            "password" | "passwd" => {
                config.password = Some(as_string(v).context(format!("invalid value for key {k}"))?);
                Ok(())
            }
            "remote_dir" | "remote_directory" => {
                config.remote_dir = as_string(v).context(format!("invalid value for key {k}"))?;
                Ok(())
            }
            "bind_ip" => {
                let s = as_string(v).context(format!("invalid value for key {k}"))?;
                let ip = IpAddr::from_str(&s).map_err(|e| anyhow!("invalid ip address {s}: {e}"))?;
                config.bind_ip = Some(ip);
                Ok(())
            }
            "connect_timeout" => {
                config.connect_timeout = as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "greeting_timeout" => {
                config.greeting_timeout = as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "keepalive" | "tcp_keepalive" => {
                config.keepalive = FtpKeepAliveConfig::parse_yaml(v)
                    .context(format!("invalid tcp keepalive config value for key {k}"))?;
                Ok(())
            }
            "control" => {
                config.control = FtpControlConfig::parse_yaml(v).context(format!(
                    "invalid ftp control connection config value for key {k}"
                ))?;
                Ok(())
            }
            "transfer" => {
                config.transfer = FtpTransferConfig::parse_yaml(v).context(format!(
                    "invalid ftp transfer connection config value for key {k}"
                ))?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        })?;
        Ok(config)
    }
}

impl FtpFetchConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        let Yaml::Hash(map) = value else {
            return Err(anyhow!("invalid yaml type"));
        };

        let session = FtpSessionConfig::parse_yaml(get_required(map, "session")?)
            .context("invalid ftp session config value for key session")?;
        let mut config = FtpFetchConfig::new(session);
        foreach_kv(map, |k, v| match normalize(k).as_str() {
            "session" => Ok(()),
            "monitor_interval" => {
                let interval = as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                if interval.is_zero() {
                    return Err(anyhow!("monitor interval should not be zero"));
                }
                config.monitor_interval = interval;
                Ok(())
            }
            "max_attempts" => {
                let attempts = as_usize(v).context(format!("invalid usize value for key {k}"))?;
                if attempts == 0 {
                    return Err(anyhow!("max attempts should not be zero"));
                }
                config.max_attempts = attempts;
                Ok(())
            }
            "retry_wait" => {
                config.retry_wait = as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "stall_counts_as_attempt" => {
                config.stall_counts_as_attempt =
                    as_bool(v).context(format!("invalid bool value for key {k}"))?;
                Ok(())
            }
            "complete_prefix" => {
                config.complete_prefix =
                    as_string(v).context(format!("invalid value for key {k}"))?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        })?;
        Ok(config)
    }
}

fn normalize(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

fn foreach_kv<F>(table: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    for (k, v) in table.iter() {
        if let Yaml::String(key) = k {
            f(key, v).context(format!("failed to parse value of key {key}"))?;
        } else {
            return Err(anyhow!("key in hash should be string"));
        }
    }
    Ok(())
}

fn get_required<'a>(map: &'a yaml::Hash, k: &str) -> anyhow::Result<&'a Yaml> {
    let key = Yaml::String(k.to_owned());
    match map.get(&key) {
        Some(v) => Ok(v),
        None => Err(anyhow!("no required key {k} found in this map")),
    }
}

fn as_string(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => Ok(s.to_string()),
        Yaml::Integer(i) => Ok(i.to_string()),
        _ => Err(anyhow!("string or integer value expected")),
    }
}

fn as_bool(v: &Yaml) -> anyhow::Result<bool> {
    match v {
        Yaml::Boolean(value) => Ok(*value),
        Yaml::String(s) => match s.to_lowercase().as_str() {
            "on" | "true" | "yes" => Ok(true),
            "off" | "false" | "no" => Ok(false),
            _ => Err(anyhow!("invalid bool string {s}")),
        },
        _ => Err(anyhow!("boolean or string value expected")),
    }
}

fn as_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::Integer(i) => Ok(usize::try_from(*i)?),
        Yaml::String(s) => Ok(usize::from_str(s)?),
        _ => Err(anyhow!("integer or string value expected")),
    }
}

/// Integer, or a size string like `64KB`.
fn as_humanize_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::Integer(i) => Ok(usize::try_from(*i)?),
        Yaml::String(s) => Ok(s.parse::<Bytes>()?.size()),
        _ => Err(anyhow!("integer or size string value expected")),
    }
}

/// Seconds as integer, or a duration string like `30s` / `2m`.
fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::Integer(i) => Ok(Duration::from_secs(u64::try_from(*i)?)),
        Yaml::String(s) => match humanize_rs::duration::parse(s) {
            Ok(d) => Ok(d),
            Err(ParseError::MissingUnit) => Ok(Duration::from_secs(u64::from_str(s)?)),
            Err(e) => Err(anyhow!("invalid duration string {s}: {e}")),
        },
        _ => Err(anyhow!("integer or duration string value expected")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yaml_rust::YamlLoader;

    fn load(s: &str) -> Yaml {
        YamlLoader::load_from_str(s).unwrap().remove(0)
    }

    #[test]
    fn control_config_parse() {
        let yaml = load(
            r#"
                max_line_len: "2KB"
                max_multi_lines: 256
                command_timeout: "45s"
            "#,
        );
        let config = FtpControlConfig::parse_yaml(&yaml).unwrap();
        assert_eq!(config.max_line_len, 2000);
        assert_eq!(config.max_multi_lines, 256);
        assert_eq!(config.command_timeout, Duration::from_secs(45));

        let yaml = load("max-line-length: 1024");
        let config = FtpControlConfig::parse_yaml(&yaml).unwrap();
        assert_eq!(config.max_line_len, 1024);

        let yaml = load("max_lines: 1");
        assert!(FtpControlConfig::parse_yaml(&yaml).is_err());
    }

    #[test]
    fn keepalive_config_parse() {
        let yaml = load(
            r#"
                idle_time: 90
                probe_interval: "2m"
            "#,
        );
        let config = FtpKeepAliveConfig::parse_yaml(&yaml).unwrap();
        assert!(config.enabled);
        assert_eq!(config.idle_time, Duration::from_secs(90));
        assert_eq!(config.probe_interval, Some(Duration::from_secs(120)));

        let config = FtpKeepAliveConfig::parse_yaml(&Yaml::Boolean(false)).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.idle_time, Duration::from_secs(60));
    }

    #[test]
    fn fetch_config_parse() {
        let yaml = load(
            r#"
                session:
                  server: "ftp.example.net:2121"
                  username: reader
                  password: secret
                  remote_dir: models
                  connect_timeout: 5s
                  transfer:
                    always_try_epsv: false
                    buffer_size: 16KB
                monitor_interval: 10s
                max_attempts: 3
                retry_wait: 1m
                stall_counts_as_attempt: off
            "#,
        );
        let config = FtpFetchConfig::parse_yaml(&yaml).unwrap();
        assert_eq!(config.session.server.host(), "ftp.example.net");
        assert_eq!(config.session.server.port(), 2121);
        assert_eq!(config.session.username.as_deref(), Some("reader"));
        assert_eq!(config.session.password.as_deref(), Some("secret"));
        assert_eq!(config.session.remote_dir, "models");
        assert_eq!(config.session.connect_timeout, Duration::from_secs(5));
        assert!(!config.session.transfer.always_try_epsv);
        assert_eq!(config.session.transfer.buffer_size, 16000);
        assert_eq!(config.monitor_interval, Duration::from_secs(10));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_wait, Duration::from_secs(60));
        assert!(!config.stall_counts_as_attempt);
    }

    #[test]
    fn fetch_config_parse_err() {
        let yaml = load("max_attempts: 3");
        assert!(FtpFetchConfig::parse_yaml(&yaml).is_err());

        let yaml = load(
            r#"
                session:
                  server: "ftp.example.net"
                max_attempts: 0
            "#,
        );
        assert!(FtpFetchConfig::parse_yaml(&yaml).is_err());

        let yaml = load(
            r#"
                session:
                  server: "ftp.example.net"
                monitor_interval: 0
            "#,
        );
        assert!(FtpFetchConfig::parse_yaml(&yaml).is_err());

        let yaml = load(
            r#"
                session:
                  remote_dir: models
            "#,
        );
        assert!(FtpFetchConfig::parse_yaml(&yaml).is_err());
    }
}
