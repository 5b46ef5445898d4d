// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fabric topology of a single switch.

use crate::{Cursor, DecodeError, EncodeError, Record, Writer};
use hubpack::SerializedSize;
use serde::{Deserialize, Serialize};

/// Fixed fields opening the topology dump.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct TopologyHead {
    pub sw_idx: u8,
    pub reserved: [u8; 3],
    pub stack_bif: [u32; 7],
    pub route_port: [u8; 16],
    pub port_bitmap: u64,
}

/// Configuration and link state of one fabric port.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    SerializedSize,
    Serialize,
    Deserialize,
)]
pub struct FabPortInfo {
    pub phys_port_id: u8,
    pub port_type: u8,
    pub port_clock_channel: u8,
    pub port_connector_id: u8,
    pub conn_sig_pwrctrl: u32,
    pub conn_sig_dsp_perst: u32,
    pub conn_sig_usp_perst: u32,
    pub conn_sig_presence: u32,
    pub conn_sig_8639: u32,
    pub port_cfg_width: u8,
    pub port_neg_width: u8,
    pub port_cfg_rate: u8,
    pub port_neg_rate: u8,
    pub port_major_ltssm: u8,
    pub port_minor_ltssm: u8,
    pub reserved: [u8; 2],
}

/// Topology of a switch: its stack bifurcation, routing, and the ports
/// listed in the remainder of the dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyInfo {
    pub sw_idx: u8,
    pub stack_bif: [u32; 7],
    pub route_port: [u8; 16],
    pub port_bitmap: u64,
    pub ports: Vec<FabPortInfo>,
}

impl TopologyInfo {
    /// Most ports a switch reports.
    pub const MAX_PORTS: usize = 48;

    /// Size of the destination the device writes a topology dump into; a
    /// dump declaring more than this is refused.
    pub const CAPACITY: usize =
        TopologyHead::MAX_SIZE + Self::MAX_PORTS * FabPortInfo::MAX_SIZE;
}

impl Record for TopologyInfo {
    const NAME: &'static str = "topology info";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let head: TopologyHead = cursor.read()?;
        let ports: Vec<FabPortInfo> = cursor.read_remainder()?;
        if ports.len() > Self::MAX_PORTS {
            return Err(DecodeError::TooManyElements {
                unit: Self::NAME,
                count: ports.len(),
                max: Self::MAX_PORTS,
            });
        }
        Ok(TopologyInfo {
            sw_idx: head.sw_idx,
            stack_bif: head.stack_bif,
            route_port: head.route_port,
            port_bitmap: head.port_bitmap,
            ports,
        })
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        if self.ports.len() > Self::MAX_PORTS {
            return Err(EncodeError::TooManyElements {
                unit: Self::NAME,
                count: self.ports.len(),
            });
        }
        out.put(&TopologyHead {
            sw_idx: self.sw_idx,
            reserved: [0; 3],
            stack_bif: self.stack_bif,
            route_port: self.route_port,
            port_bitmap: self.port_bitmap,
        })?;
        out.put_all(&self.ports)
    }
}
