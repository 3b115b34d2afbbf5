/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Read until `delimiter` is found or `max_len` bytes have been appended.
///
/// Returns whether the delimiter was found and how many bytes were read.
/// A zero length means EOF.
pub(crate) async fn limited_read_until<R>(
    reader: &mut R,
    delimiter: u8,
    max_len: usize,
    buf: &mut Vec<u8>,
) -> io::Result<(bool, usize)>
where
    R: AsyncBufRead + Unpin,
{
    let mut total = 0usize;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok((false, total));
        }

        let limit = max_len.saturating_sub(total).min(available.len());
        if let Some(p) = memchr::memchr(delimiter, &available[..limit]) {
            buf.extend_from_slice(&available[..=p]);
            reader.consume(p + 1);
            return Ok((true, total + p + 1));
        }

        buf.extend_from_slice(&available[..limit]);
        reader.consume(limit);
        total += limit;
        if total >= max_len {
            return Ok((false, total));
        }
    }
}
