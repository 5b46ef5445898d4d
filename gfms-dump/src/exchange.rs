// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The management request/response channel a fabric switch is driven over.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

bitflags! {
    /// Hardware properties of the device behind a [`CommandExchange`] that
    /// gate which dumps it can serve.
    #[derive(
        Debug,
        Clone,
        Copy,
        Default,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
    )]
    pub struct DeviceCapabilities: u32 {
        /// PCIe gen4 switch generation.
        const GEN4 = 1 << 0;
        /// PAX fabric switch variant.
        const PAX = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("device rejected command with return code {code:#x}")]
    Device { code: u32 },
    #[error("response of {len} bytes does not fit in {capacity} bytes")]
    ResponseTooLarge { len: usize, capacity: usize },
    #[error("device is not connected")]
    Disconnected,
}

/// A synchronous, connected channel to a single switch.
///
/// Each call carries one request of at most
/// [`gfms_messages::MRPC_MAX_DATA_LEN`] bytes and receives at most
/// `response.len()` bytes back. Implementations neither retry nor
/// reconnect; failures are returned as-is.
pub trait CommandExchange {
    fn capabilities(&self) -> DeviceCapabilities;

    /// Issue `command` with `request` as its payload, writing the device's
    /// reply into `response`. Returns the number of response bytes written.
    fn exchange(
        &mut self,
        command: u32,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, ExchangeError>;
}

impl<E: CommandExchange + ?Sized> CommandExchange for &mut E {
    fn capabilities(&self) -> DeviceCapabilities {
        (**self).capabilities()
    }

    fn exchange(
        &mut self,
        command: u32,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, ExchangeError> {
        (**self).exchange(command, request, response)
    }
}
