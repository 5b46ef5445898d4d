// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for dumping the fabric database.

use crate::exchange::DeviceCapabilities;
use crate::exchange::ExchangeError;
use gfms_messages::DecodeError;
use std::fmt;
use thiserror::Error;

/// The exchange a dump was performing when its transport failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpPhase {
    Start,
    Status,
    Get,
    Finish,
    /// The request/response of a single-shot section dump.
    Request,
}

impl fmt::Display for DumpPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DumpPhase::Start => "start",
            DumpPhase::Status => "status",
            DumpPhase::Get => "get",
            DumpPhase::Finish => "finish",
            DumpPhase::Request => "request",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("{phase} exchange failed: {err}")]
    Transport {
        phase: DumpPhase,
        #[source]
        err: ExchangeError,
    },
    #[error("{operation} requires device capabilities {required:?}")]
    UnsupportedOperation {
        operation: &'static str,
        required: DeviceCapabilities,
    },
    #[error("device failed to prepare the dump (status {status})")]
    DeviceFailed { status: u8 },
    #[error("device does not support the requested dump subcommand")]
    UnsupportedSubcommand,
    #[error("dump still preparing after {polls} status polls")]
    StatusPollExhausted { polls: u32 },
    #[error(
        "dump declares {declared} bytes, more than the {capacity} bytes \
         available for it"
    )]
    CapacityExceeded { declared: usize, capacity: usize },
    #[error("corrupt response: {0}")]
    CorruptResponse(#[from] DecodeError),
}

impl DumpError {
    pub(crate) fn transport(
        phase: DumpPhase,
    ) -> impl FnOnce(ExchangeError) -> Self {
        move |err| DumpError::Transport { phase, err }
    }
}
