// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-PAX sections: the general section and the full PAX database.

use crate::{
    Cursor, DecodeError, EncodeError, EpPortAll, HvdAll, Record,
    SectionHeader, SectionInfo, Writer,
};
use hubpack::SerializedSize;
use serde::{Deserialize, Serialize};

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
pub struct PaxGeneralBody {
    pub pax_idx: u8,
    pub reserved: [u8; 3],
    pub hvd_count: u8,
    pub phy_port_count: u8,
    pub ep_port_count: u8,
    pub fab_port_count: u8,
    pub phy_port_bitmap_low: u32,
    pub phy_port_bitmap_high: u32,
}

impl PaxGeneralBody {
    pub fn phy_port_bitmap(&self) -> u64 {
        u64::from(self.phy_port_bitmap_high) << 32
            | u64::from(self.phy_port_bitmap_low)
    }
}

/// General information about a single PAX switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaxGeneral {
    pub section: SectionInfo,
    pub body: PaxGeneralBody,
}

impl Record for PaxGeneral {
    const NAME: &'static str = "pax general section";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let (section, mut body) = SectionHeader::open(cursor, Self::NAME)?;
        let pax = PaxGeneral { section, body: body.read()? };
        body.finish()?;
        Ok(pax)
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        let mut payload = Writer::new();
        payload.put(&self.body)?;
        self.section.encode_with(Self::NAME, payload, out)
    }
}

/// The complete database of one PAX switch: its general section, every HVD
/// it hosts, and every endpoint port.
///
/// The three sections follow one another with no enclosing header; the
/// dump's declared length must be exactly their sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaxAll {
    pub pax_general: PaxGeneral,
    pub hvd_all: HvdAll,
    pub ep_port_all: EpPortAll,
}

impl Record for PaxAll {
    const NAME: &'static str = "pax database";

    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        Ok(PaxAll {
            pax_general: PaxGeneral::decode(cursor)?,
            hvd_all: HvdAll::decode(cursor)?,
            ep_port_all: EpPortAll::decode(cursor)?,
        })
    }

    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError> {
        self.pax_general.encode(out)?;
        self.hvd_all.encode(out)?;
        self.ep_port_all.encode(out)
    }
}
