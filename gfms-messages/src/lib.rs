// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire formats for dumping the global fabric management (GFMS) database of
//! a PCIe fabric switch over its management request/response channel.
//!
//! Everything on the wire is little-endian, and every declared length is
//! counted in dwords (4 bytes). Fixed-layout structures are (de)serialized
//! with hubpack, which encodes integers little-endian with no padding, so
//! each struct's `MAX_SIZE` is exactly its size on the wire. The variable
//! shaped database records are decoded with [`Cursor`] and produced with
//! [`Writer`].

mod cursor;
mod ep_port;
mod hvd;
mod pax;
mod section;
mod topology;
mod writer;

pub use cursor::payload_len;
pub use cursor::Cursor;
pub use cursor::DecodeError;
pub use ep_port::*;
pub use hvd::*;
pub use pax::*;
pub use section::*;
pub use topology::*;
pub use writer::EncodeError;
pub use writer::Writer;

pub use hubpack::error::Error as HubpackError;
pub use hubpack::{deserialize, serialize, SerializedSize};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Maximum payload carried by a single request or response.
pub const MRPC_MAX_DATA_LEN: usize = 1024;

/// Size of a dword, the unit of every declared length.
pub const DWORD: usize = 4;

/// Management command identifiers.
pub mod command {
    pub const TOPO_INFO_DUMP: u32 = 0x95;
    pub const GFMS_DB_DUMP: u32 = 0x99;
}

/// Subcommands of [`command::TOPO_INFO_DUMP`].
pub mod topo_subcmd {
    pub const START: u8 = 1;
    pub const STATUS_GET: u8 = 2;
    pub const DATA_GET: u8 = 3;
    pub const FINISH: u8 = 4;
}

/// Subcommands of [`command::GFMS_DB_DUMP`].
pub mod gfms_subcmd {
    pub const FABRIC: u8 = 0;
    pub const PAX_ALL: u8 = 1;
    pub const PAX: u8 = 2;
    pub const HVD: u8 = 3;
    pub const FAB_PORT: u8 = 4;
    pub const EP_PORT: u8 = 5;
    pub const HVD_DETAIL: u8 = 6;
}

/// Phases of a paged GFMS dump, carried in [`PagedDumpControl::phase`].
pub mod paged_phase {
    pub const START: u32 = 1;
    pub const GET: u32 = 2;
    pub const FINISH: u32 = 3;
}

/// A record of the fabric database that can be decoded from (and encoded
/// into) a dump blob.
pub trait Record: Sized {
    /// Name used to identify this unit in decode errors.
    const NAME: &'static str;

    /// Decode one record starting at the cursor's position, advancing past
    /// exactly the bytes it occupies.
    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError>;

    /// Append the wire encoding of this record, computing every size and
    /// count field from the record's contents.
    fn encode(&self, out: &mut Writer) -> Result<(), EncodeError>;

    /// Decode a complete blob, which must contain exactly one record and
    /// nothing else.
    fn from_blob(blob: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(Self::NAME, blob);
        let record = Self::decode(&mut cursor)?;
        cursor.finish()?;
        Ok(record)
    }

    fn to_bytes(&self) -> Result<Bytes, EncodeError> {
        let mut out = Writer::new();
        self.encode(&mut out)?;
        Ok(out.freeze())
    }
}

/// Status reported while the device prepares a topology dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpStatus {
    NotStarted,
    Preparing,
    Ready,
    Failed,
    WrongSubcommand,
}

impl DumpStatus {
    pub const NOT_STARTED: u8 = 1;
    pub const PREPARING: u8 = 2;
    pub const READY: u8 = 3;
    pub const FAILED: u8 = 4;
    pub const WRONG_SUBCOMMAND: u8 = 5;

    pub fn code(self) -> u8 {
        match self {
            DumpStatus::NotStarted => Self::NOT_STARTED,
            DumpStatus::Preparing => Self::PREPARING,
            DumpStatus::Ready => Self::READY,
            DumpStatus::Failed => Self::FAILED,
            DumpStatus::WrongSubcommand => Self::WRONG_SUBCOMMAND,
        }
    }
}

impl TryFrom<u8> for DumpStatus {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            Self::NOT_STARTED => Ok(DumpStatus::NotStarted),
            Self::PREPARING => Ok(DumpStatus::Preparing),
            Self::READY => Ok(DumpStatus::Ready),
            Self::FAILED => Ok(DumpStatus::Failed),
            Self::WRONG_SUBCOMMAND => Ok(DumpStatus::WrongSubcommand),
            other => Err(DecodeError::UnknownStatus(other)),
        }
    }
}

/// Response to the topology `START`, `STATUS_GET` and `DATA_GET`
/// subcommands; data responses follow this header with `data_len_dw`
/// dwords of payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct TopoDumpStatus {
    pub status: u8,
    pub reserved: u8,
    pub data_len_dw: u16,
}

/// Request for one chunk of topology data. Unlike the paged GFMS dumps,
/// `offset` is counted in bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct TopoDumpDataRequest {
    pub subcmd: u8,
    pub reserved: u8,
    pub offset: u16,
}

impl TopoDumpDataRequest {
    /// Most payload bytes a single topology data response carries.
    pub const MAX_DATA_LEN: usize = 1000;
}

/// Request selecting a single-shot GFMS section, optionally indexed by an
/// HVD or physical port.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct GfmsIndexedRequest {
    pub subcmd: u8,
    pub index: u8,
}

/// Start and finish request of a paged GFMS dump.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct PagedDumpControl {
    pub subcmd: u8,
    /// Physical port for endpoint-port dumps; zero otherwise.
    pub selector: u8,
    pub reserved: u16,
    pub phase: u32,
}

/// Request for the chunk of a paged GFMS dump starting at `offset_dw`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct PagedDumpGet {
    pub control: PagedDumpControl,
    pub offset_dw: u32,
}

/// Response to the start phase of a paged GFMS dump.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct PagedDumpStart {
    pub dw_len: u32,
    pub num_of_switch: u32,
}

/// Header of each paged GFMS data response.
///
/// `size_dw` counts this header's own three dwords as well as the data that
/// follows it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializedSize, Serialize, Deserialize,
)]
pub struct PagedChunkHeader {
    pub offset_dw: u32,
    pub size_dw: u32,
    pub reserved: u32,
}

impl PagedChunkHeader {
    /// Largest `size_dw` honored from a single response.
    pub const SIZE_CAP_DW: u32 = 0xf0;
    /// Dwords of `size_dw` taken by the header itself.
    pub const OVERHEAD_DW: u32 = 3;

    /// Most data dwords a single paged response can deliver.
    pub const MAX_DATA_DW: u32 = Self::SIZE_CAP_DW - Self::OVERHEAD_DW;

    /// Number of data dwords this response carries, after applying the
    /// transfer cap.
    pub fn data_dw(&self) -> Result<u32, DecodeError> {
        self.size_dw
            .min(Self::SIZE_CAP_DW)
            .checked_sub(Self::OVERHEAD_DW)
            .ok_or(DecodeError::ChunkTooShort { size_dw: self.size_dw })
    }
}
