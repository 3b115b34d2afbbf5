/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const FTP_DEFAULT_PORT: u16 = 21;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FtpServerAddrParseError {
    #[error("empty host")]
    EmptyHost,
    #[error("unclosed ipv6 bracket")]
    UnclosedBracket,
    #[error("invalid port {0}")]
    InvalidPort(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FtpServerAddr {
    host: String,
    port: u16,
}

impl FtpServerAddr {
    pub fn new(host: &str, port: u16) -> Self {
        FtpServerAddr {
            host: host.to_string(),
            port,
        }
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }
}

fn parse_port(s: &str) -> Result<u16, FtpServerAddrParseError> {
    match u16::from_str(s) {
        Ok(0) | Err(_) => Err(FtpServerAddrParseError::InvalidPort(s.to_string())),
        Ok(port) => Ok(port),
    }
}

impl FromStr for FtpServerAddr {
    type Err = FtpServerAddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("ftp://").unwrap_or(s);
        let s = s.trim_end_matches('/');

        let (host, port) = if let Some(left) = s.strip_prefix('[') {
            let Some((host, right)) = left.split_once(']') else {
                return Err(FtpServerAddrParseError::UnclosedBracket);
            };
            match right.strip_prefix(':') {
                Some(port) => (host, parse_port(port)?),
                None if right.is_empty() => (host, FTP_DEFAULT_PORT),
                None => return Err(FtpServerAddrParseError::InvalidPort(right.to_string())),
            }
        } else if s.matches(':').count() > 1 {
            // bare ipv6 address
            (s, FTP_DEFAULT_PORT)
        } else {
            match s.rsplit_once(':') {
                Some((host, port)) => (host, parse_port(port)?),
                None => (s, FTP_DEFAULT_PORT),
            }
        };

        if host.is_empty() {
            return Err(FtpServerAddrParseError::EmptyHost);
        }
        Ok(FtpServerAddr::new(host, port))
    }
}

impl fmt::Display for FtpServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host() {
        let addr = FtpServerAddr::from_str("ftp.example.net").unwrap();
        assert_eq!(addr.host(), "ftp.example.net");
        assert_eq!(addr.port(), 21);

        let addr = FtpServerAddr::from_str("ftp://ftp.example.net:2121/").unwrap();
        assert_eq!(addr.host(), "ftp.example.net");
        assert_eq!(addr.port(), 2121);
        assert_eq!(addr.to_string(), "ftp.example.net:2121");
    }

    #[test]
    fn parse_ipv6() {
        let addr = FtpServerAddr::from_str("[::1]:2121").unwrap();
        assert_eq!(addr.host(), "::1");
        assert_eq!(addr.port(), 2121);
        assert_eq!(addr.to_string(), "[::1]:2121");

        let addr = FtpServerAddr::from_str("[2001:db8::1]").unwrap();
        assert_eq!(addr.port(), 21);

        let addr = FtpServerAddr::from_str("2001:db8::1").unwrap();
        assert_eq!(addr.host(), "2001:db8::1");
        assert_eq!(addr.port(), 21);
    }

    #[test]
    fn parse_invalid() {
        assert_eq!(
            FtpServerAddr::from_str(""),
            Err(FtpServerAddrParseError::EmptyHost)
        );
        assert_eq!(
            FtpServerAddr::from_str(":21"),
            Err(FtpServerAddrParseError::EmptyHost)
        );
        assert_eq!(
            FtpServerAddr::from_str("[::1"),
            Err(FtpServerAddrParseError::UnclosedBracket)
        );
        assert!(matches!(
            FtpServerAddr::from_str("host:0"),
            Err(FtpServerAddrParseError::InvalidPort(_))
        ));
        assert!(matches!(
            FtpServerAddr::from_str("host:ftp"),
            Err(FtpServerAddrParseError::InvalidPort(_))
        ));
    }
}
