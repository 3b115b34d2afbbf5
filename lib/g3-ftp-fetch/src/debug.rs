/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use log::Level;

pub const FTP_DEBUG_LOG_LEVEL: Level = Level::Debug;
pub const FTP_DEBUG_LOG_TARGET: &str = "ftp";

/// Log one control line, `>` for sent and `<` for received.
///
/// Passwords never reach the log.
#[cfg(feature = "log-raw-io")]
pub(crate) fn log_raw_line(sent: bool, line: &str) {
    let line = line.trim_end();
    if sent {
        let line = if line
            .get(..5)
            .is_some_and(|p| p.eq_ignore_ascii_case("PASS "))
        {
            "PASS ****"
        } else {
            line
        };
        log::log!(target: FTP_DEBUG_LOG_TARGET, FTP_DEBUG_LOG_LEVEL, "> {line}");
    } else {
        log::log!(target: FTP_DEBUG_LOG_TARGET, FTP_DEBUG_LOG_LEVEL, "< {line}");
    }
}
