// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for parsing configuration files and tuning how dumps are
//! retrieved

use backoff::ExponentialBackoff;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration for retrieving dumps from a fabric switch
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DumpConfig {
    /// How to wait on a device that is still preparing a dump.
    pub status_poll: PollConfig,
    /// Largest blob a paged dump may declare.
    pub max_blob_bytes: usize,
    /// Issue a best-effort finish when a dump fails after it was started,
    /// releasing the device-side session.
    pub release_on_error: bool,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            status_poll: PollConfig::default(),
            max_blob_bytes: 1 << 20,
            release_on_error: true,
        }
    }
}

impl DumpConfig {
    /// Load a `DumpConfig` from the given TOML file
    ///
    /// Fields missing from the file keep their default values.
    pub fn from_file(path: &Utf8Path) -> Result<DumpConfig, LoadError> {
        let file_contents = std::fs::read_to_string(path)
            .map_err(|err| LoadError::Io { path: path.into(), err })?;
        let config_parsed: DumpConfig = toml::from_str(&file_contents)
            .map_err(|err| LoadError::Parse { path: path.into(), err })?;
        Ok(config_parsed)
    }
}

/// Backoff between status polls of a dump being prepared.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct PollConfig {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    /// Give up once the device has reported it is still preparing this many
    /// times. Polls forever if unset.
    pub max_polls: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 20,
            max_interval_ms: 1_000,
            max_polls: None,
        }
    }
}

impl PollConfig {
    pub(crate) fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub(crate) fn policy(&self) -> ExponentialBackoff {
        let initial_interval = Duration::from_millis(self.initial_interval_ms);
        ExponentialBackoff {
            current_interval: initial_interval,
            initial_interval,
            multiplier: 2.0,
            max_interval: self.max_interval(),
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("error reading \"{path}\": {err}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("error parsing \"{path}\": {err}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        err: toml::de::Error,
    },
}
