/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use clap_complete::Shell;

use g3_ftp_fetch::FtpFetcher;

mod batch;
mod config;
mod logger;

const GLOBAL_ARG_COMPLETION: &str = "completion";
const GLOBAL_ARG_SERVER: &str = "server";
const GLOBAL_ARG_USERNAME: &str = "username";
const GLOBAL_ARG_PASSWORD: &str = "password";
const GLOBAL_ARG_REMOTE_DIR: &str = "remote-dir";
const GLOBAL_ARG_LOCAL_DIR: &str = "local-dir";
const GLOBAL_ARG_MONITOR_INTERVAL: &str = "monitor-interval";
const GLOBAL_ARG_MAX_ATTEMPTS: &str = "max-attempts";
const GLOBAL_ARG_RETRY_WAIT: &str = "retry-wait";
const GLOBAL_ARG_CONFIG: &str = "config";
const GLOBAL_ARG_VERBOSE: &str = "verbose";
const GLOBAL_ARG_FILES: &str = "files";

fn build_cli_args() -> Command {
    Command::new("g3ftpget")
        .about("Download files from a FTP server, resuming interrupted transfers")
        .arg(
            Arg::new(GLOBAL_ARG_COMPLETION)
                .num_args(1)
                .value_name("SHELL")
                .long("completion")
                .value_parser(value_parser!(Shell))
                .exclusive(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_SERVER)
                .help("FTP server address, port 21 if not set")
                .num_args(1)
                .value_name("SERVER ADDRESS")
                .required_unless_present_any([GLOBAL_ARG_COMPLETION, GLOBAL_ARG_CONFIG]),
        )
        .arg(
            Arg::new(GLOBAL_ARG_FILES)
                .help("Remote files to download, all files in the remote dir if not set")
                .num_args(0..)
                .value_name("FILE"),
        )
        .arg(
            Arg::new(GLOBAL_ARG_USERNAME)
                .help("FTP username")
                .num_args(1)
                .value_name("USERNAME")
                .short('u')
                .long("username"),
        )
        .arg(
            Arg::new(GLOBAL_ARG_PASSWORD)
                .help("FTP password")
                .num_args(1)
                .value_name("PASSWORD")
                .short('p')
                .long("password"),
        )
        .arg(
            Arg::new(GLOBAL_ARG_REMOTE_DIR)
                .help("Remote directory to change to before downloading")
                .num_args(1)
                .value_name("PATH")
                .long(GLOBAL_ARG_REMOTE_DIR),
        )
        .arg(
            Arg::new(GLOBAL_ARG_LOCAL_DIR)
                .help("Local directory to save files to, created if missing")
                .num_args(1)
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .default_value(".")
                .long(GLOBAL_ARG_LOCAL_DIR),
        )
        .arg(
            Arg::new(GLOBAL_ARG_MONITOR_INTERVAL)
                .help("Seconds without progress before a transfer is considered stalled")
                .num_args(1)
                .value_name("SECONDS")
                .value_parser(value_parser!(u64).range(1..))
                .long(GLOBAL_ARG_MONITOR_INTERVAL),
        )
        .arg(
            Arg::new(GLOBAL_ARG_MAX_ATTEMPTS)
                .help("Failed attempts allowed for each file")
                .num_args(1)
                .value_name("COUNT")
                .value_parser(value_parser!(usize))
                .long(GLOBAL_ARG_MAX_ATTEMPTS),
        )
        .arg(
            Arg::new(GLOBAL_ARG_RETRY_WAIT)
                .help("Seconds to wait before reconnecting")
                .num_args(1)
                .value_name("SECONDS")
                .value_parser(value_parser!(u64))
                .long(GLOBAL_ARG_RETRY_WAIT),
        )
        .arg(
            Arg::new(GLOBAL_ARG_CONFIG)
                .help("YAML config file, overridden by command line options")
                .num_args(1)
                .value_name("CONFIG FILE")
                .value_parser(value_parser!(PathBuf))
                .short('c')
                .long(GLOBAL_ARG_CONFIG),
        )
        .arg(
            Arg::new(GLOBAL_ARG_VERBOSE)
                .help("show verbose message")
                .num_args(0)
                .action(ArgAction::Count)
                .short('v'),
        )
}

fn remote_files(args: &ArgMatches) -> Vec<String> {
    args.get_many::<String>(GLOBAL_ARG_FILES)
        .map(|v| v.cloned().collect())
        .unwrap_or_default()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = build_cli_args().get_matches();

    if let Some(target) = args.get_one::<Shell>(GLOBAL_ARG_COMPLETION) {
        let mut app = build_cli_args();
        let bin_name = app.get_name().to_string();
        clap_complete::generate(*target, &mut app, bin_name, &mut io::stdout());
        return Ok(());
    }

    let verbose_level = args
        .get_one::<u8>(GLOBAL_ARG_VERBOSE)
        .copied()
        .unwrap_or_default();
    let logger = logger::SyncLogger::new(verbose_level);
    logger
        .into_global_logger()
        .map_err(|e| anyhow!("failed to setup logger: {e}"))?;

    let config = config::load_fetch_config(&args)?;
    let fetcher = FtpFetcher::with_tcp(Arc::new(config));

    let local_dir = args
        .get_one::<PathBuf>(GLOBAL_ARG_LOCAL_DIR)
        .ok_or_else(|| anyhow!("no local dir set"))?;
    tokio::fs::create_dir_all(local_dir)
        .await
        .map_err(|e| anyhow!("failed to create local dir {}: {e}", local_dir.display()))?;

    let mut files = remote_files(&args);
    if files.is_empty() {
        files = batch::list_remote_files(&fetcher).await?;
    }
    batch::download_all(&fetcher, &files, local_dir).await
}
