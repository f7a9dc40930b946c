// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job model configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpoolviewError};

/// Tunables for the job model and the service that drives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Minimum interval between printer-modified refreshes for one printer.
    /// Zero disables throttling entirely.
    pub rate_limit_window_ms: u64,
    /// Maximum number of entries kept in a job's message log.
    pub message_log_limit: usize,
    /// Capacity of the inbound command channel of the job service.
    pub service_channel_capacity: usize,
    /// Capacity of the outbound notification broadcast channel.
    pub notification_capacity: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            rate_limit_window_ms: 500,
            message_log_limit: 100,
            service_channel_capacity: 256,
            notification_capacity: 1024,
        }
    }
}

impl ModelConfig {
    /// Rate limiter window as a `Duration`.
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    /// Read a JSON configuration file.  Absent fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.service_channel_capacity == 0 {
            return Err(SpoolviewError::Config(
                "service_channel_capacity must be at least 1".into(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(SpoolviewError::Config(
                "notification_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rate_limit_window(), Duration::from_millis(500));
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "rate_limit_window_ms": 250 }}"#).expect("write");

        let config = ModelConfig::load(file.path()).expect("load");
        assert_eq!(config.rate_limit_window_ms, 250);
        assert_eq!(config.message_log_limit, 100);
    }

    #[test]
    fn load_rejects_zero_capacity() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "notification_capacity": 0 }}"#).expect("write");

        let err = ModelConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, SpoolviewError::Config(_)));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = ModelConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SpoolviewError::Io(_)));
    }
}
