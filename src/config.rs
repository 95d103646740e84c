// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! `emu-prmd` configuration file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prmd::listener::DEFAULT_WAIT_TIMEOUT;
use crate::prmd::mailbox::{PRMD_MAILBOX_MIN_SIZE, PRMD_MAILBOX_SIZE};

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    System,
    Session,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrmdConfig {
    pub bus: BusKind,
    pub service_name: String,
    pub object_path: String,
    pub interface: String,
    pub mailbox_size: usize,
    pub wait_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_timeout_ms: Option<u64>,
    pub log_level: String,
}

impl Default for PrmdConfig {
    fn default() -> Self {
        Self {
            bus: BusKind::System,
            service_name: "com.intel.PrmDispatch".into(),
            object_path: "/com/intel/PrmDispatch".into(),
            interface: "com.intel.PrmDispatch".into(),
            mailbox_size: PRMD_MAILBOX_SIZE,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT.as_millis() as u64,
            response_timeout_ms: None,
            log_level: "info".into(),
        }
    }
}

impl PrmdConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: PrmdConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox_size < PRMD_MAILBOX_MIN_SIZE {
            return Err(ConfigError::Invalid(format!(
                "mailbox_size must be at least {PRMD_MAILBOX_MIN_SIZE}, got {}",
                self.mailbox_size
            )));
        }
        if self.wait_timeout_ms == 0 {
            return Err(ConfigError::Invalid("wait_timeout_ms must be non-zero".into()));
        }
        if !self.object_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "object_path must be absolute, got {:?}",
                self.object_path
            )));
        }
        Ok(())
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}
