// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for parsing configuration files and working with a simulated
//! fabric switch configuration

use camino::Utf8Path;
use camino::Utf8PathBuf;
use gfms_dump::DeviceCapabilities;
use gfms_messages::PagedChunkHeader;
use serde::Deserialize;
use serde::Serialize;
use slog::Level;
use thiserror::Error;

/// Configuration of a simulated fabric switch
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SimConfig {
    /// Capabilities the switch advertises.
    pub capabilities: DeviceCapabilities,
    /// Data dwords returned per chunk, further limited by what each
    /// protocol allows in one response.
    pub chunk_dw: u32,
    /// Status polls answered with "preparing" before a topology dump is
    /// ready.
    #[serde(default)]
    pub preparing_polls: u32,
    #[serde(default)]
    pub faults: FaultConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            capabilities: DeviceCapabilities::GEN4 | DeviceCapabilities::PAX,
            chunk_dw: PagedChunkHeader::MAX_DATA_DW,
            preparing_polls: 2,
            faults: FaultConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load a `SimConfig` from the given TOML file
    pub fn from_file(path: &Utf8Path) -> Result<Self, LoadError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| LoadError::Io { path: path.into(), err })?;
        let config = toml::from_str(&contents)
            .map_err(|err| LoadError::Parse { path: path.into(), err })?;
        Ok(config)
    }
}

/// Misbehavior injected into the simulated switch
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct FaultConfig {
    /// Fail the nth exchange, counting from 1, with `error_code`.
    pub fail_exchange: Option<usize>,
    pub error_code: u32,
    /// Answer every topology status poll with this status code.
    pub topology_status: Option<u8>,
    /// Report paged chunks this many dwords past where they really start.
    pub offset_skew_dw: u32,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct LogConfig {
    pub level: LogLevel,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Critical,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Level {
        match level {
            LogLevel::Trace => Level::Trace,
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
            LogLevel::Warn => Level::Warning,
            LogLevel::Error => Level::Error,
            LogLevel::Critical => Level::Critical,
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
