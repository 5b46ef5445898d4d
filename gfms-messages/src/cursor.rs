// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounds-checked decoding over a dump blob.

use crate::{HubpackError, DWORD};
use hubpack::SerializedSize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors found while interpreting data returned by the device.
///
/// Every variant indicates a corrupt (or misunderstood) response; none of
/// them are transient.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("{unit}: needed {needed} bytes but only {remaining} remain")]
    Truncated { unit: &'static str, needed: usize, remaining: usize },
    #[error(
        "{unit}: declared {declared} bytes but decoding consumed {consumed}"
    )]
    LengthMismatch { unit: &'static str, declared: usize, consumed: usize },
    #[error(
        "{unit}: declared size of {declared} bytes is smaller than its \
         {header}-byte header"
    )]
    HeaderLargerThanUnit { unit: &'static str, declared: usize, header: usize },
    #[error(
        "{unit}: {remaining} bytes is not a whole number of {element}-byte \
         elements"
    )]
    UnevenRemainder { unit: &'static str, remaining: usize, element: usize },
    #[error("{unit}: {count} elements exceeds the maximum of {max}")]
    TooManyElements { unit: &'static str, count: usize, max: usize },
    #[error("unknown endpoint port type {0:#04x}")]
    UnknownPortType(u8),
    #[error("unknown dump status {0:#04x}")]
    UnknownStatus(u8),
    #[error("chunk size of {size_dw} dwords is smaller than its header")]
    ChunkTooShort { size_dw: u32 },
    #[error("chunk at dword offset {got} does not continue at {expected}")]
    ChunkOutOfOrder { expected: u32, got: u32 },
    #[error(
        "chunk of {len_dw} dwords at offset {offset_dw} overruns the declared \
         {declared_dw} dwords"
    )]
    ChunkOverflow { offset_dw: u32, len_dw: u32, declared_dw: u32 },
    #[error("hubpack decode failed: {0}")]
    Hubpack(HubpackError),
}

/// Compute the payload length of a unit whose header declares its total size
/// (header included) in dwords.
pub fn payload_len(
    unit: &'static str,
    size_dw: u32,
    header: usize,
) -> Result<usize, DecodeError> {
    let declared = size_dw as usize * DWORD;
    declared.checked_sub(header).ok_or(DecodeError::HeaderLargerThanUnit {
        unit,
        declared,
        header,
    })
}

/// A read position within a borrowed byte region.
///
/// All reads fail with [`DecodeError::Truncated`] rather than reading past
/// the end of the region. Nested units are decoded with [`Cursor::sub`],
/// which carves a child cursor bounded by the unit's declared length; the
/// child must then be fully consumed ([`Cursor::finish`]).
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    unit: &'static str,
    data: &'a [u8],
    declared: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(unit: &'static str, data: &'a [u8]) -> Self {
        Self { unit, data, declared: data.len() }
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn consumed(&self) -> usize {
        self.declared - self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let Some((head, rest)) = self.data.split_at_checked(n) else {
            return Err(DecodeError::Truncated {
                unit: self.unit,
                needed: n,
                remaining: self.data.len(),
            });
        };
        self.data = rest;
        Ok(head)
    }

    /// Split off the next `len` bytes as a cursor of their own.
    pub fn sub(
        &mut self,
        unit: &'static str,
        len: usize,
    ) -> Result<Cursor<'a>, DecodeError> {
        let data = self.take(len).map_err(|err| match err {
            DecodeError::Truncated { needed, remaining, .. } => {
                DecodeError::Truncated { unit, needed, remaining }
            }
            other => other,
        })?;
        Ok(Cursor::new(unit, data))
    }

    /// Decode one fixed-layout wire structure.
    pub fn read<T>(&mut self) -> Result<T, DecodeError>
    where
        T: DeserializeOwned + SerializedSize,
    {
        let bytes = self.take(T::MAX_SIZE)?;
        let (value, _rest) =
            hubpack::deserialize::<T>(bytes).map_err(DecodeError::Hubpack)?;
        Ok(value)
    }

    /// Decode `count` consecutive fixed-layout elements.
    ///
    /// The space for all of them is checked before anything is allocated, so
    /// a corrupt count cannot drive an allocation larger than the blob.
    pub fn read_array<T>(&mut self, count: usize) -> Result<Vec<T>, DecodeError>
    where
        T: DeserializeOwned + SerializedSize,
    {
        let needed = count.saturating_mul(T::MAX_SIZE);
        if needed > self.data.len() {
            return Err(DecodeError::Truncated {
                unit: self.unit,
                needed,
                remaining: self.data.len(),
            });
        }
        (0..count).map(|_| self.read()).collect()
    }

    /// Decode elements until the cursor is exhausted; the remaining length
    /// must be a whole number of elements.
    pub fn read_remainder<T>(&mut self) -> Result<Vec<T>, DecodeError>
    where
        T: DeserializeOwned + SerializedSize,
    {
        let remaining = self.data.len();
        if remaining % T::MAX_SIZE != 0 {
            return Err(DecodeError::UnevenRemainder {
                unit: self.unit,
                remaining,
                element: T::MAX_SIZE,
            });
        }
        self.read_array(remaining / T::MAX_SIZE)
    }

    /// Check that everything this cursor covers was consumed.
    pub fn finish(self) -> Result<(), DecodeError> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::LengthMismatch {
                unit: self.unit,
                declared: self.declared,
                consumed: self.consumed(),
            })
        }
    }
}
