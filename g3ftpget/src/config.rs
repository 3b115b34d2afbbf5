/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::ArgMatches;
use yaml_rust::YamlLoader;

use g3_ftp_fetch::{FtpFetchConfig, FtpServerAddr, FtpSessionConfig};

use super::{
    GLOBAL_ARG_CONFIG, GLOBAL_ARG_MAX_ATTEMPTS, GLOBAL_ARG_MONITOR_INTERVAL, GLOBAL_ARG_PASSWORD,
    GLOBAL_ARG_REMOTE_DIR, GLOBAL_ARG_RETRY_WAIT, GLOBAL_ARG_SERVER, GLOBAL_ARG_USERNAME,
};

fn load_yaml_file(path: &Path) -> anyhow::Result<FtpFetchConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read in file {}: {e}", path.display()))?;
    let docs = YamlLoader::load_from_str(&contents)
        .map_err(|e| anyhow!("invalid yaml file {}: {e}", path.display()))?;
    let doc = docs
        .first()
        .ok_or_else(|| anyhow!("empty yaml file {}", path.display()))?;
    FtpFetchConfig::parse_yaml(doc)
        .context(format!("invalid fetch config in file {}", path.display()))
}

pub(crate) fn load_fetch_config(args: &ArgMatches) -> anyhow::Result<FtpFetchConfig> {
    let server = args
        .get_one::<String>(GLOBAL_ARG_SERVER)
        .map(|s| FtpServerAddr::from_str(s).map_err(|e| anyhow!("invalid server address {s}: {e}")))
        .transpose()?;

    let mut config = match args.get_one::<PathBuf>(GLOBAL_ARG_CONFIG) {
        Some(path) => {
            let mut config = load_yaml_file(path)?;
            if let Some(server) = server {
                config.session.server = server;
            }
            config
        }
        None => {
            let server = server.ok_or_else(|| anyhow!("no server address set"))?;
            FtpFetchConfig::new(FtpSessionConfig::new(server))
        }
    };

    if let Some(username) = args.get_one::<String>(GLOBAL_ARG_USERNAME) {
        config.session.username = Some(username.to_string());
    }
    if let Some(password) = args.get_one::<String>(GLOBAL_ARG_PASSWORD) {
        config.session.password = Some(password.to_string());
    }
    if let Some(dir) = args.get_one::<String>(GLOBAL_ARG_REMOTE_DIR) {
        config.session.remote_dir = dir.to_string();
    }
    if let Some(secs) = args.get_one::<u64>(GLOBAL_ARG_MONITOR_INTERVAL) {
        config.monitor_interval = Duration::from_secs(*secs);
    }
    if let Some(n) = args.get_one::<usize>(GLOBAL_ARG_MAX_ATTEMPTS) {
        if *n == 0 {
            return Err(anyhow!("max attempts should not be 0"));
        }
        config.max_attempts = *n;
    }
    if let Some(secs) = args.get_one::<u64>(GLOBAL_ARG_RETRY_WAIT) {
        config.retry_wait = Duration::from_secs(*secs);
    }
    Ok(config)
}
