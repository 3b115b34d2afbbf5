/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncWrite};

use super::FtpControlChannel;
use super::line::limited_read_until;
use crate::error::FtpRawResponseError;

#[derive(Debug)]
pub(crate) enum FtpRawResponse {
    SingleLine(u16, String),
    MultiLine(u16, Vec<String>),
}

fn parse_reply_code(line: &[u8]) -> Result<u16, FtpRawResponseError> {
    if !line[..3].iter().all(u8::is_ascii_digit) {
        return Err(FtpRawResponseError::InvalidLineFormat);
    }
    let code = line[..3]
        .iter()
        .fold(0u16, |acc, c| acc * 10 + (c - b'0') as u16);
    if !(100..600).contains(&code) {
        return Err(FtpRawResponseError::InvalidReplyCode(code));
    }
    Ok(code)
}

impl FtpRawResponse {
    pub(super) fn parse_single_line(line: &[u8]) -> Result<Self, FtpRawResponseError> {
        let code = parse_reply_code(line)?;
        let msg =
            std::str::from_utf8(&line[4..]).map_err(|_| FtpRawResponseError::LineIsNotUtf8)?;
        Ok(FtpRawResponse::SingleLine(code, msg.trim_end().to_string()))
    }

    pub(super) fn get_multi_line_parser(
        line: &[u8],
        max_lines: usize,
    ) -> Result<FtpMultiLineReplyParser, FtpRawResponseError> {
        let code = parse_reply_code(line)?;
        let end_prefix = [line[0], line[1], line[2], b' '];
        let mut lines = Vec::<String>::with_capacity(max_lines);
        let msg =
            std::str::from_utf8(&line[4..]).map_err(|_| FtpRawResponseError::LineIsNotUtf8)?;
        lines.push(msg.trim_end().to_string());
        Ok(FtpMultiLineReplyParser {
            code,
            end_prefix,
            lines,
        })
    }

    pub(crate) fn code(&self) -> u16 {
        match self {
            FtpRawResponse::SingleLine(code, _) => *code,
            FtpRawResponse::MultiLine(code, _) => *code,
        }
    }

    pub(crate) fn line_trimmed(&self) -> Option<&str> {
        match self {
            FtpRawResponse::SingleLine(_, line) => Some(line.as_str().trim()),
            FtpRawResponse::MultiLine(_, _) => None,
        }
    }

    /// The reply as a single status line, `"<code> <text>"`.
    ///
    /// For multi-line replies only the last line is kept, as it is the one
    /// carrying the final text.
    pub(crate) fn status_line(&self) -> String {
        match self {
            FtpRawResponse::SingleLine(code, line) => format!("{code} {line}"),
            FtpRawResponse::MultiLine(code, lines) => match lines.last() {
                Some(line) => format!("{code} {line}"),
                None => code.to_string(),
            },
        }
    }

    pub(crate) fn parse_pasv_227_reply(&self) -> Option<SocketAddr> {
        let line = match self {
            FtpRawResponse::SingleLine(_, line) => line,
            FtpRawResponse::MultiLine(_, _) => return None,
        };

        let p_start = memchr::memchr(b'(', line.as_bytes())?;
        let p_end = memchr::memchr(b')', &line.as_bytes()[p_start..])? + p_start;

        let a: Vec<&str> = line[p_start + 1..p_end].split(',').collect();
        if a.len() != 6 {
            return None;
        }

        let h1 = u8::from_str(a[0].trim()).ok()?;
        let h2 = u8::from_str(a[1].trim()).ok()?;
        let h3 = u8::from_str(a[2].trim()).ok()?;
        let h4 = u8::from_str(a[3].trim()).ok()?;
        let p1 = u8::from_str(a[4].trim()).ok()?;
        let p2 = u8::from_str(a[5].trim()).ok()?;

        let ip = IpAddr::V4(Ipv4Addr::new(h1, h2, h3, h4));
        let port = ((p1 as u16) << 8) + (p2 as u16);
        Some(SocketAddr::new(ip, port))
    }

    pub(crate) fn parse_epsv_229_reply(&self) -> Option<u16> {
        let line = match self {
            FtpRawResponse::SingleLine(_, line) => line,
            FtpRawResponse::MultiLine(_, _) => return None,
        };

        let p_start = memchr::memchr(b'(', line.as_bytes())?;
        let p_end = memchr::memchr(b')', &line.as_bytes()[p_start..])? + p_start;

        if !line[p_start + 1..p_end].starts_with("|||") {
            return None;
        }
        if p_end - 1 <= p_start + 4 {
            return None;
        }
        if line.as_bytes()[p_end - 1] != b'|' {
            return None;
        }
        u16::from_str(&line[p_start + 4..p_end - 1]).ok()
    }
}

pub(super) struct FtpMultiLineReplyParser {
    code: u16,
    end_prefix: [u8; 4],
    lines: Vec<String>,
}

impl FtpMultiLineReplyParser {
    pub(super) fn feed_line(&mut self, line: &[u8]) -> Result<bool, FtpRawResponseError> {
        if line.starts_with(&self.end_prefix) {
            let msg =
                std::str::from_utf8(&line[4..]).map_err(|_| FtpRawResponseError::LineIsNotUtf8)?;
            self.lines.push(msg.trim_end().to_string());
            Ok(true)
        } else {
            let msg = std::str::from_utf8(line).map_err(|_| FtpRawResponseError::LineIsNotUtf8)?;
            // do not trim whitespace at beginning
            self.lines.push(msg.trim_end().to_string());
            Ok(false)
        }
    }

    pub(super) fn finish(self) -> FtpRawResponse {
        FtpRawResponse::MultiLine(self.code, self.lines)
    }
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    async fn read_line(
        &mut self,
        buf: &mut Vec<u8>,
        min_len: usize,
    ) -> Result<(), FtpRawResponseError> {
        buf.clear();

        let (found, len) =
            limited_read_until(&mut self.stream, b'\n', self.config.max_line_len, buf)
                .await
                .map_err(FtpRawResponseError::ReadFailed)?;

        #[cfg(feature = "log-raw-io")]
        if let Ok(s) = std::str::from_utf8(buf) {
            crate::debug::log_raw_line(false, s);
        }

        if len == 0 {
            Err(FtpRawResponseError::ConnectionClosed)
        } else if len < min_len {
            Err(FtpRawResponseError::InvalidLineFormat)
        } else if !found {
            Err(FtpRawResponseError::LineTooLong)
        } else {
            Ok(())
        }
    }

    pub(crate) async fn read_raw_response(
        &mut self,
    ) -> Result<FtpRawResponse, FtpRawResponseError> {
        let mut buf = Vec::<u8>::with_capacity(self.config.max_line_len);
        // at least "<code> \n"
        self.read_line(&mut buf, 5).await?;

        match buf[3] {
            b' ' => FtpRawResponse::parse_single_line(&buf),
            b'-' => {
                let mut ml_parser =
                    FtpRawResponse::get_multi_line_parser(&buf, self.config.max_multi_lines)?;
                for _i in 0..self.config.max_multi_lines {
                    self.read_line(&mut buf, 1).await?;
                    let end = ml_parser.feed_line(&buf)?;
                    if end {
                        return Ok(ml_parser.finish());
                    }
                }
                Err(FtpRawResponseError::TooManyLines)
            }
            _ => Err(FtpRawResponseError::InvalidLineFormat),
        }
    }

    pub(crate) async fn timed_read_raw_response(
        &mut self,
        stage: &'static str,
    ) -> Result<FtpRawResponse, FtpRawResponseError> {
        match tokio::time::timeout(self.config.command_timeout, self.read_raw_response()).await {
            Ok(r) => r,
            Err(_) => Err(FtpRawResponseError::ReadResponseTimedOut(stage)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let rsp = FtpRawResponse::parse_single_line(b"226 Transfer complete.\r\n").unwrap();
        assert_eq!(rsp.code(), 226);
        assert_eq!(rsp.line_trimmed(), Some("Transfer complete."));
        assert_eq!(rsp.status_line(), "226 Transfer complete.");
    }

    #[test]
    fn invalid_code() {
        assert!(matches!(
            FtpRawResponse::parse_single_line(b"abc ok\r\n"),
            Err(FtpRawResponseError::InvalidLineFormat)
        ));
        assert!(matches!(
            FtpRawResponse::parse_single_line(b"700 ok\r\n"),
            Err(FtpRawResponseError::InvalidReplyCode(700))
        ));
    }

    #[test]
    fn multi_line() {
        let mut parser = FtpRawResponse::get_multi_line_parser(b"226-Data follows\r\n", 4).unwrap();
        assert!(!parser.feed_line(b" some detail\r\n").unwrap());
        assert!(parser.feed_line(b"226 Transfer complete.\r\n").unwrap());
        let rsp = parser.finish();
        assert_eq!(rsp.code(), 226);
        assert_eq!(rsp.line_trimmed(), None);
        assert_eq!(rsp.status_line(), "226 Transfer complete.");
    }

    #[test]
    fn pasv_reply() {
        let rsp = FtpRawResponse::SingleLine(
            227,
            "Entering Passive Mode (192,168,1,2,19,137)".to_string(),
        );
        let addr = rsp.parse_pasv_227_reply().unwrap();
        assert_eq!(addr, SocketAddr::from_str("192.168.1.2:5001").unwrap());

        let rsp = FtpRawResponse::SingleLine(227, "Entering Passive Mode (1,2,3)".to_string());
        assert!(rsp.parse_pasv_227_reply().is_none());
    }

    #[test]
    fn epsv_reply() {
        let rsp = FtpRawResponse::SingleLine(
            229,
            "Entering Extended Passive Mode (|||6446|)".to_string(),
        );
        assert_eq!(rsp.parse_epsv_229_reply(), Some(6446));

        let rsp = FtpRawResponse::SingleLine(229, "Entering Extended Passive Mode (||)".to_string());
        assert!(rsp.parse_epsv_229_reply().is_none());

        let rsp = FtpRawResponse::SingleLine(229, "Entering Extended Passive Mode".to_string());
        assert!(rsp.parse_epsv_229_reply().is_none());
    }
}
