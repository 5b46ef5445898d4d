// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The header shared by every GFMS database section, and the fabric-wide
//! summary section.

use crate::writer::size_dw;
use crate::{
    payload_len, Cursor, DecodeError, EncodeError, Record, Writer, DWORD,
};
use hubpack::SerializedSize;
use serde::{Deserialize, Serialize};

/// Header preceding every GFMS database section.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct SectionHeader {
    pub section_class: u8,
    pub pax_idx: u8,
    pub swfw_version: u16,
    /// Size of the whole section, this header included.
    pub resp_size_dw: u32,
    pub reserved: u32,
}

impl SectionHeader {
    pub fn info(&self) -> SectionInfo {
        SectionInfo {
            section_class: self.section_class,
            pax_idx: self.pax_idx,
            swfw_version: self.swfw_version,
        }
    }

    /// Length of the section following this header.
    pub fn payload_len(
        &self,
        unit: &'static str,
    ) -> Result<usize, DecodeError> {
        payload_len(unit, self.resp_size_dw, Self::MAX_SIZE)
    }

    /// Trim a single-shot response down to the section it declares.
    ///
    /// Single-shot responses are returned in a buffer of the maximum
    /// transfer size; only the leading `resp_size_dw` dwords belong to the
    /// section.
    pub fn bound<'a>(
        unit: &'static str,
        response: &'a [u8],
    ) -> Result<&'a [u8], DecodeError> {
        let hdr: SectionHeader = Cursor::new(unit, response).read()?;
        let declared = hdr.resp_size_dw as usize * DWORD;
        response.get(..declared).ok_or(DecodeError::Truncated {
            unit,
            needed: declared,
            remaining: response.len(),
        })
    }

    /// Read a section header and carve out the section's payload.
    pub(crate) fn open<'a>(
        cursor: &mut Cursor<'a>,
        unit: &'static str,
    ) -> Result<(SectionInfo, Cursor<'a>), DecodeError> {
        let hdr: SectionHeader = cursor.read()?;
        let len = hdr.payload_len(unit)?;
        Ok((hdr.info(), cursor.sub(unit, len)?))
    }
}

/// The identifying fields of a [`SectionHeader`]; its size is implied by the
/// record that carries it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SectionInfo {
    pub section_class: u8,
    pub pax_idx: u8,
    pub swfw_version: u16,
}

impl SectionInfo {
    /// Write this section's header followed by its already-encoded payload.
    pub(crate) fn encode_with(
        &self,
        unit: &'static str,
        payload: Writer,
        out: &mut Writer,
    ) -> Result<(), EncodeError> {
        let hdr = SectionHeader {
            section_class: self.section_class,
            pax_idx: self.pax_idx,
            swfw_version: self.swfw_version,
            resp_size_dw: size_dw(
                unit,
                SectionHeader::MAX_SIZE + payload.len(),
            )?,
            reserved: 0,
        };
        out.put(&hdr)?;
        out.append(payload);
        Ok(())
    }
}

/// Maximum number of PAX switches in a fabric.
pub const MAX_PAX: usize = 16;

/// Summary of one PAX switch within [`FabricGeneral`].
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
pub struct PaxInfo {
    pub ep_number: u8,
    pub fab_port_number: u8,
    pub hvd_number: u8,
    pub reserved: u8,
}

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
pub struct FabricGeneralBody {
    pub pax_idx: u8,
    pub reserved: [u8; 3],
    pub pax_info: [PaxInfo; MAX_PAX],
}

/// The fabric-wide summary section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FabricGeneral {
    pub section: SectionInfo,
    pub body: FabricGeneralBody,
}

impl Record for FabricGeneral {
    const NAME: &'static str = "fabric general section";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let (section, mut body) = SectionHeader::open(cursor, Self::NAME)?;
        let fabric = FabricGeneral { section, body: body.read()? };
        body.finish()?;
        Ok(fabric)
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        let mut payload = Writer::new();
        payload.put(&self.body)?;
        self.section.encode_with(Self::NAME, payload, out)
    }
}
