/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::anyhow;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};

use g3_ftp_fetch::{FtpFetchOutcome, FtpFetcher, FtpSessionProvider, FtpTcpSessionProvider};

pub(crate) async fn list_remote_files(
    fetcher: &FtpFetcher<FtpTcpSessionProvider>,
) -> anyhow::Result<Vec<String>> {
    let mut session = fetcher
        .provider()
        .open_session()
        .await
        .map_err(|e| anyhow!("failed to open ftp session: {e}"))?;
    let r = session.list_names("").await;
    session.quit_and_close().await;
    let names = r.map_err(|e| anyhow!("failed to list remote files: {e}"))?;
    info!("{} files found in remote dir", names.len());
    Ok(names)
}

pub(crate) async fn download_all(
    fetcher: &FtpFetcher<FtpTcpSessionProvider>,
    files: &[String],
    local_dir: &Path,
) -> anyhow::Result<()> {
    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );

    let mut failed = Vec::new();
    for name in files {
        let Some(file_name) = Path::new(name).file_name() else {
            warn!("skip invalid remote file name {name}");
            failed.push(name.as_str());
            continue;
        };
        let local_path = local_dir.join(file_name);
        bar.set_message(name.clone());

        match fetcher.download(name, &local_path).await {
            Ok(FtpFetchOutcome::Success(stats)) => {
                bar.println(format!(
                    "{name}: {} bytes, {} retries, {} stalls",
                    stats.size, stats.failed_attempts, stats.stalls
                ));
            }
            Ok(FtpFetchOutcome::Failure(e)) => {
                bar.println(format!("{name}: failed: {e}"));
                failed.push(name.as_str());
            }
            Err(e) => {
                error!("download {name} to {} failed: {e}", local_path.display());
                failed.push(name.as_str());
            }
        }
        bar.inc(1);
    }
    bar.finish_with_message("done");

    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} of {} files failed: {}",
            failed.len(),
            files.len(),
            failed.join(", ")
        ))
    }
}
