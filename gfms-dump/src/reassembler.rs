// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bytes::{Bytes, BytesMut};
use gfms_messages::{DecodeError, DWORD};

/// Accumulates the chunks of a paged dump into one contiguous blob of the
/// length the device declared when the dump started.
#[derive(Debug)]
pub struct Reassembler {
    declared_dw: u32,
    buf: BytesMut,
}

impl Reassembler {
    const UNIT: &'static str = "dump blob";

    pub fn new(declared_dw: u32) -> Self {
        Self {
            declared_dw,
            buf: BytesMut::with_capacity(declared_dw as usize * DWORD),
        }
    }

    pub fn declared_dw(&self) -> u32 {
        self.declared_dw
    }

    /// Offset of the next chunk expected, which is also the number of
    /// dwords accumulated so far.
    pub fn offset_dw(&self) -> u32 {
        (self.buf.len() / DWORD) as u32
    }

    pub fn remaining_dw(&self) -> u32 {
        self.declared_dw - self.offset_dw()
    }

    pub fn is_complete(&self) -> bool {
        self.remaining_dw() == 0
    }

    /// Append a chunk that starts at `offset_dw`.
    ///
    /// Chunks must arrive in order with no gaps, and may not extend past the
    /// declared length.
    pub fn push(
        &mut self,
        offset_dw: u32,
        data: &[u8],
    ) -> Result<(), DecodeError> {
        let expected = self.offset_dw();
        if offset_dw != expected {
            return Err(DecodeError::ChunkOutOfOrder {
                expected,
                got: offset_dw,
            });
        }
        if data.len() % DWORD != 0 {
            return Err(DecodeError::UnevenRemainder {
                unit: Self::UNIT,
                remaining: data.len(),
                element: DWORD,
            });
        }
        let len_dw = u32::try_from(data.len() / DWORD).unwrap_or(u32::MAX);
        if len_dw > self.remaining_dw() {
            return Err(DecodeError::ChunkOverflow {
                offset_dw,
                len_dw,
                declared_dw: self.declared_dw,
            });
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Hand back the blob, which must hold exactly the declared length.
    pub fn finish(self) -> Result<Bytes, DecodeError> {
        let declared = self.declared_dw as usize * DWORD;
        if self.buf.len() != declared {
            return Err(DecodeError::LengthMismatch {
                unit: Self::UNIT,
                declared,
                consumed: self.buf.len(),
            });
        }
        Ok(self.buf.freeze())
    }
}
