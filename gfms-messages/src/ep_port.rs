// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Endpoint port sections: what is attached to each physical port.
//!
//! Each port sub-section starts with an [`EpPortHeader`] whose type tag
//! selects the payload. A switch port lists the switch's internal functions
//! followed by any number of attached endpoints, an endpoint port carries a
//! single attached endpoint, and an unpopulated port carries nothing.

use crate::writer::{count, size_dw};
use crate::{
    payload_len, Cursor, DecodeError, EncodeError, Record, SectionHeader,
    SectionInfo, Writer,
};
use hubpack::SerializedSize;
use serde::{Deserialize, Serialize};

/// Sub-header of each endpoint port.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct EpPortHeader {
    pub port_type: u8,
    pub phy_pid: u8,
    /// Size of the port's sub-section, this header included.
    pub size_dw: u16,
}

impl EpPortHeader {
    pub const TYPE_UNPOPULATED: u8 = 0;
    pub const TYPE_ENDPOINT: u8 = 1;
    pub const TYPE_SWITCH: u8 = 2;
}

/// Header of a downstream switch attached to a port.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct SwitchHeader {
    pub function_number: u8,
    pub reserved: [u8; 3],
    pub switch_dsn_low: u32,
    pub switch_dsn_high: u32,
}

/// A function internal to an attached switch.
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
pub struct InternalFunction {
    pub func_id: u16,
    pub pdfid: u16,
    pub device_class: u32,
    pub vid: u16,
    pub did: u16,
    pub bound: u8,
    pub bound_hvd_phy_pid: u8,
    pub bound_hvd_log_pid: u8,
    pub reserved: u8,
}

/// Header of an attached endpoint device.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct AttachedEndpointHeader {
    pub function_number: u8,
    pub reserved: u8,
    /// Size of the endpoint record, this header included.
    pub size_dw: u16,
    pub attached_dsn_low: u32,
    pub attached_dsn_high: u32,
}

/// A PCIe function of an attached endpoint device.
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
pub struct AttachedFunction {
    pub func_id: u16,
    pub pdfid: u16,
    pub sriov_cap_pf: u8,
    pub vf_num: u8,
    pub reserved: u16,
    pub bound: u8,
    pub bound_hvd_phy_pid: u8,
    pub bound_hvd_log_pid: u8,
    pub reserved2: u8,
    pub vid: u16,
    pub did: u16,
    pub sub_sys_vid: u16,
    pub sub_sys_did: u16,
    pub device_class: u32,
    pub bar: [u32; 6],
}

fn split_dsn(dsn: u64) -> (u32, u32) {
    (dsn as u32, (dsn >> 32) as u32)
}

fn join_dsn(low: u32, high: u32) -> u64 {
    u64::from(high) << 32 | u64::from(low)
}

/// An endpoint device attached to a port, directly or below a switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachedEndpoint {
    /// Function count as reported by the device. The function table's
    /// length is derived from the record's size, not from this field.
    pub function_number: u8,
    pub attached_dsn: u64,
    pub functions: Vec<AttachedFunction>,
}

impl Record for AttachedEndpoint {
    const NAME: &'static str = "attached endpoint";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let hdr: AttachedEndpointHeader = cursor.read()?;
        let len = payload_len(
            Self::NAME,
            u32::from(hdr.size_dw),
            AttachedEndpointHeader::MAX_SIZE,
        )?;
        let mut body = cursor.sub(Self::NAME, len)?;
        let functions = body.read_remainder()?;
        body.finish()?;
        Ok(AttachedEndpoint {
            function_number: hdr.function_number,
            attached_dsn: join_dsn(hdr.attached_dsn_low, hdr.attached_dsn_high),
            functions,
        })
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        let len = AttachedEndpointHeader::MAX_SIZE
            + self.functions.len() * AttachedFunction::MAX_SIZE;
        let (attached_dsn_low, attached_dsn_high) =
            split_dsn(self.attached_dsn);
        out.put(&AttachedEndpointHeader {
            function_number: self.function_number,
            reserved: 0,
            size_dw: size_dw(Self::NAME, len)?,
            attached_dsn_low,
            attached_dsn_high,
        })?;
        out.put_all(&self.functions)
    }
}

/// A switch attached to a port, with the endpoints below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchPort {
    pub switch_dsn: u64,
    pub internal_functions: Vec<InternalFunction>,
    pub endpoints: Vec<AttachedEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EpPortKind {
    Switch(SwitchPort),
    Endpoint(AttachedEndpoint),
    Unpopulated,
}

impl EpPortKind {
    pub fn port_type(&self) -> u8 {
        match self {
            EpPortKind::Switch(_) => EpPortHeader::TYPE_SWITCH,
            EpPortKind::Endpoint(_) => EpPortHeader::TYPE_ENDPOINT,
            EpPortKind::Unpopulated => EpPortHeader::TYPE_UNPOPULATED,
        }
    }
}

/// One physical port and whatever is attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpPort {
    pub phy_pid: u8,
    pub kind: EpPortKind,
}

impl Record for EpPort {
    const NAME: &'static str = "endpoint port";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let hdr: EpPortHeader = cursor.read()?;
        let len = payload_len(
            Self::NAME,
            u32::from(hdr.size_dw),
            EpPortHeader::MAX_SIZE,
        )?;
        let mut body = cursor.sub(Self::NAME, len)?;

        let kind = match hdr.port_type {
            EpPortHeader::TYPE_SWITCH => {
                let sw: SwitchHeader = body.read()?;
                let internal_functions =
                    body.read_array(usize::from(sw.function_number))?;
                let mut endpoints = Vec::new();
                while !body.is_empty() {
                    endpoints.push(AttachedEndpoint::decode(&mut body)?);
                }
                EpPortKind::Switch(SwitchPort {
                    switch_dsn: join_dsn(sw.switch_dsn_low, sw.switch_dsn_high),
                    internal_functions,
                    endpoints,
                })
            }
            EpPortHeader::TYPE_ENDPOINT => {
                EpPortKind::Endpoint(AttachedEndpoint::decode(&mut body)?)
            }
            EpPortHeader::TYPE_UNPOPULATED => EpPortKind::Unpopulated,
            other => return Err(DecodeError::UnknownPortType(other)),
        };
        body.finish()?;

        Ok(EpPort { phy_pid: hdr.phy_pid, kind })
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        let mut payload = Writer::new();
        match &self.kind {
            EpPortKind::Switch(sw) => {
                let (switch_dsn_low, switch_dsn_high) =
                    split_dsn(sw.switch_dsn);
                payload.put(&SwitchHeader {
                    function_number: count(
                        Self::NAME,
                        sw.internal_functions.len(),
                    )?,
                    reserved: [0; 3],
                    switch_dsn_low,
                    switch_dsn_high,
                })?;
                payload.put_all(&sw.internal_functions)?;
                for ep in &sw.endpoints {
                    ep.encode(&mut payload)?;
                }
            }
            EpPortKind::Endpoint(ep) => ep.encode(&mut payload)?,
            EpPortKind::Unpopulated => {}
        }

        out.put(&EpPortHeader {
            port_type: self.kind.port_type(),
            phy_pid: self.phy_pid,
            size_dw: size_dw(
                Self::NAME,
                EpPortHeader::MAX_SIZE + payload.len(),
            )?,
        })?;
        out.append(payload);
        Ok(())
    }
}

/// A single endpoint port, as returned by the per-port dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpPortSection {
    pub section: SectionInfo,
    pub port: EpPort,
}

impl Record for EpPortSection {
    const NAME: &'static str = "endpoint port section";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let (section, mut body) = SectionHeader::open(cursor, Self::NAME)?;
        let port = EpPort::decode(&mut body)?;
        body.finish()?;
        Ok(EpPortSection { section, port })
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        let mut payload = Writer::new();
        self.port.encode(&mut payload)?;
        self.section.encode_with(Self::NAME, payload, out)
    }
}

/// Every endpoint port of one PAX switch. The number of ports is not
/// declared anywhere; it is discovered by exhausting the section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpPortAll {
    pub section: SectionInfo,
    pub ports: Vec<EpPort>,
}

impl Record for EpPortAll {
    const NAME: &'static str = "endpoint port list section";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let (section, mut body) = SectionHeader::open(cursor, Self::NAME)?;
        let mut ports = Vec::new();
        while !body.is_empty() {
            ports.push(EpPort::decode(&mut body)?);
        }
        Ok(EpPortAll { section, ports })
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        let mut payload = Writer::new();
        for port in &self.ports {
            port.encode(&mut payload)?;
        }
        self.section.encode_with(Self::NAME, payload, out)
    }
}
