/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use log::error;

use crate::FtpCompletionError;

pub const FTP_TRANSFER_COMPLETE_PREFIX: &str = "226 Transfer complete";

pub struct FtpCompletionValidator {
    prefix: String,
}

impl Default for FtpCompletionValidator {
    fn default() -> Self {
        FtpCompletionValidator::new(FTP_TRANSFER_COMPLETE_PREFIX)
    }
}

impl FtpCompletionValidator {
    pub fn new(prefix: &str) -> Self {
        FtpCompletionValidator {
            prefix: prefix.to_string(),
        }
    }

    /// Check the final status line of the retrieve of `remote_name`.
    ///
    /// `None` means no retrieve happened in this download.
    pub fn validate(&self, remote_name: &str, status: Option<&str>) -> Result<(), FtpCompletionError> {
        match status {
            Some(line) if line.starts_with(&self.prefix) => Ok(()),
            Some(line) => {
                error!("transfer of {remote_name} not confirmed by server: {line}");
                Err(FtpCompletionError::Mismatch(line.to_string()))
            }
            None => {
                error!("transfer of {remote_name} not confirmed by server: no status received");
                Err(FtpCompletionError::NoStatus)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept() {
        let validator = FtpCompletionValidator::default();
        validator
            .validate("model.bin", Some("226 Transfer complete."))
            .unwrap();
        validator
            .validate("model.bin", Some("226 Transfer complete (1000 bytes)"))
            .unwrap();
    }

    #[test]
    fn reject() {
        let validator = FtpCompletionValidator::default();
        assert!(matches!(
            validator.validate("model.bin", Some("250 Requested file action okay.")),
            Err(FtpCompletionError::Mismatch(s)) if s.starts_with("250")
        ));
        assert!(matches!(
            validator.validate("model.bin", Some("226 Closing data connection.")),
            Err(FtpCompletionError::Mismatch(_))
        ));
        assert!(matches!(
            validator.validate("model.bin", None),
            Err(FtpCompletionError::NoStatus)
        ));
    }

    #[test]
    fn custom_prefix() {
        let validator = FtpCompletionValidator::new("226 ");
        validator
            .validate("model.bin", Some("226 Closing data connection."))
            .unwrap();
    }
}
