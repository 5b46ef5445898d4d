// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host virtual domain (HVD) sections.

use crate::writer::count;
use crate::{
    Cursor, DecodeError, EncodeError, Record, SectionHeader, SectionInfo,
    Writer,
};
use hubpack::SerializedSize;
use serde::{Deserialize, Serialize};

/// Fixed prefix of each HVD entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct HvdBodyHeader {
    pub hvd_inst_id: u8,
    pub phy_pid: u8,
    pub hfid: u16,
    pub logical_port_count: u16,
    pub reserved: u16,
}

/// Binding state of one logical downstream port of an HVD.
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
pub struct BoundPort {
    pub log_pid: u8,
    pub bound: u8,
    pub bound_pdfid: u16,
}

/// One HVD and the bindings of its logical ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HvdBody {
    pub hvd_inst_id: u8,
    pub phy_pid: u8,
    pub hfid: u16,
    pub bound: Vec<BoundPort>,
}

impl Record for HvdBody {
    const NAME: &'static str = "hvd body";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let hdr: HvdBodyHeader = cursor.read()?;
        let bound = cursor.read_array(usize::from(hdr.logical_port_count))?;
        Ok(HvdBody {
            hvd_inst_id: hdr.hvd_inst_id,
            phy_pid: hdr.phy_pid,
            hfid: hdr.hfid,
            bound,
        })
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        out.put(&HvdBodyHeader {
            hvd_inst_id: self.hvd_inst_id,
            phy_pid: self.phy_pid,
            hfid: self.hfid,
            logical_port_count: count(Self::NAME, self.bound.len())?,
            reserved: 0,
        })?;
        out.put_all(&self.bound)
    }
}

/// Every HVD hosted by one PAX switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HvdAll {
    pub section: SectionInfo,
    pub hvds: Vec<HvdBody>,
}

impl Record for HvdAll {
    const NAME: &'static str = "hvd section";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let (section, mut body) = SectionHeader::open(cursor, Self::NAME)?;
        let mut hvds = Vec::new();
        while !body.is_empty() {
            hvds.push(HvdBody::decode(&mut body)?);
        }
        Ok(HvdAll { section, hvds })
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        let mut payload = Writer::new();
        for hvd in &self.hvds {
            hvd.encode(&mut payload)?;
        }
        self.section.encode_with(Self::NAME, payload, out)
    }
}

/// A single HVD, as returned by the per-HVD dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hvd {
    pub section: SectionInfo,
    pub body: HvdBody,
}

impl Record for Hvd {
    const NAME: &'static str = "single hvd section";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let (section, mut body) = SectionHeader::open(cursor, Self::NAME)?;
        let hvd = Hvd { section, body: HvdBody::decode(&mut body)? };
        body.finish()?;
        Ok(hvd)
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        let mut payload = Writer::new();
        self.body.encode(&mut payload)?;
        self.section.encode_with(Self::NAME, payload, out)
    }
}

/// Fixed fields opening an HVD detail body.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct HvdDetailHead {
    pub hvd_inst_id: u8,
    pub phy_pid: u8,
    pub hfid: u16,
    pub vep_count: u8,
    pub usp_status: u8,
    pub reserved: [u8; 2],
}

/// A virtual endpoint of an HVD.
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
pub struct VepRegion {
    pub vep_type: u8,
    pub vep_pid: u8,
    pub hfid: u16,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct HvdDetailPorts {
    pub log_dsp_count: u16,
    pub usp_bdf: u16,
}

/// A logical downstream port of an HVD.
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
pub struct LogPortRegion {
    pub log_pid: u8,
    pub bound: u8,
    pub pdfid: u16,
    pub bound_hvd_phy_pid: u8,
    pub bound_hvd_log_pid: u8,
    pub reserved: u16,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct P2pEnableBitmap {
    pub low: u32,
    pub high: u32,
}

impl P2pEnableBitmap {
    pub fn from_u64(bitmap: u64) -> Self {
        Self { low: bitmap as u32, high: (bitmap >> 32) as u32 }
    }

    pub fn to_u64(self) -> u64 {
        u64::from(self.high) << 32 | u64::from(self.low)
    }

    /// Number of logical ports with peer-to-peer enabled, which is also the
    /// number of [`LogPortP2p`] entries that follow the bitmap.
    pub fn enabled_count(self) -> u32 {
        let bitmap = self.to_u64();
        let enabled =
            (0..u64::BITS).filter(|bit| bitmap & (1u64 << bit) != 0).count();
        enabled as u32
    }
}

/// Peer-to-peer reachability of one p2p-enabled logical port.
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
pub struct LogPortP2p {
    pub config_bitmap_low: u32,
    pub config_bitmap_high: u32,
    pub active_bitmap_low: u32,
    pub active_bitmap_high: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HvdDetailBody {
    pub hvd_inst_id: u8,
    pub phy_pid: u8,
    pub hfid: u16,
    pub usp_status: u8,
    pub vep_region: Vec<VepRegion>,
    pub usp_bdf: u16,
    pub log_port_region: Vec<LogPortRegion>,
    pub log_port_p2p_enable_bitmap: u64,
    /// One entry per set bit of `log_port_p2p_enable_bitmap`, in bit order.
    pub log_port_p2p_bitmap: Vec<LogPortP2p>,
}

impl HvdDetailBody {
    pub fn log_port_count(&self) -> usize {
        self.log_port_p2p_bitmap.len()
    }
}

/// Detailed state of a single HVD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HvdDetail {
    pub section: SectionInfo,
    pub body: HvdDetailBody,
}

impl Record for HvdDetail {
    const NAME: &'static str = "hvd detail section";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let (section, mut body) = SectionHeader::open(cursor, Self::NAME)?;

        let head: HvdDetailHead = body.read()?;
        let vep_region = body.read_array(usize::from(head.vep_count))?;
        let ports: HvdDetailPorts = body.read()?;
        let log_port_region =
            body.read_array(usize::from(ports.log_dsp_count))?;
        let enable: P2pEnableBitmap = body.read()?;
        let log_port_p2p_bitmap =
            body.read_array(enable.enabled_count() as usize)?;
        body.finish()?;

        Ok(HvdDetail {
            section,
            body: HvdDetailBody {
                hvd_inst_id: head.hvd_inst_id,
                phy_pid: head.phy_pid,
                hfid: head.hfid,
                usp_status: head.usp_status,
                vep_region,
                usp_bdf: ports.usp_bdf,
                log_port_region,
                log_port_p2p_enable_bitmap: enable.to_u64(),
                log_port_p2p_bitmap,
            },
        })
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        let body = &self.body;
        let enable =
            P2pEnableBitmap::from_u64(body.log_port_p2p_enable_bitmap);
        if enable.enabled_count() as usize != body.log_port_p2p_bitmap.len() {
            return Err(EncodeError::BitmapCountMismatch {
                bits: enable.enabled_count(),
                entries: body.log_port_p2p_bitmap.len(),
            });
        }

        let mut payload = Writer::new();
        payload.put(&HvdDetailHead {
            hvd_inst_id: body.hvd_inst_id,
            phy_pid: body.phy_pid,
            hfid: body.hfid,
            vep_count: count(Self::NAME, body.vep_region.len())?,
            usp_status: body.usp_status,
            reserved: [0; 2],
        })?;
        payload.put_all(&body.vep_region)?;
        payload.put(&HvdDetailPorts {
            log_dsp_count: count(Self::NAME, body.log_port_region.len())?,
            usp_bdf: body.usp_bdf,
        })?;
        payload.put_all(&body.log_port_region)?;
        payload.put(&enable)?;
        payload.put_all(&body.log_port_p2p_bitmap)?;
        self.section.encode_with(Self::NAME, payload, out)
    }
}
