// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Encoding of dump blobs, as produced by the device.

use crate::{HubpackError, DWORD};
use bytes::{BufMut, Bytes, BytesMut};
use hubpack::SerializedSize;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    #[error("{unit}: {count} elements do not fit in its count field")]
    TooManyElements { unit: &'static str, count: usize },
    #[error("{unit}: {len} bytes do not fit in its size field")]
    UnitTooLarge { unit: &'static str, len: usize },
    #[error("{unit}: {len} bytes is not a whole number of dwords")]
    Unaligned { unit: &'static str, len: usize },
    #[error(
        "p2p enable bitmap has {bits} bits set but {entries} p2p entries were \
         supplied"
    )]
    BitmapCountMismatch { bits: u32, entries: usize },
    #[error("hubpack encode failed: {0}")]
    Hubpack(HubpackError),
}

/// An append-only buffer of wire data.
#[derive(Debug, Default)]
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append one fixed-layout wire structure.
    pub fn put<T>(&mut self, value: &T) -> Result<(), EncodeError>
    where
        T: Serialize + SerializedSize,
    {
        let start = self.buf.len();
        self.buf.resize(start + T::MAX_SIZE, 0);
        let n = hubpack::serialize(&mut self.buf[start..], value)
            .map_err(EncodeError::Hubpack)?;
        self.buf.truncate(start + n);
        Ok(())
    }

    pub fn put_all<'a, T, I>(&mut self, values: I) -> Result<(), EncodeError>
    where
        T: Serialize + SerializedSize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        for value in values {
            self.put(value)?;
        }
        Ok(())
    }

    pub fn put_slice(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Append the contents of another writer.
    pub fn append(&mut self, other: Writer) {
        self.buf.unsplit(other.buf);
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Convert a unit length in bytes to the dword count stored in its header.
pub(crate) fn size_dw<T>(
    unit: &'static str,
    len: usize,
) -> Result<T, EncodeError>
where
    T: TryFrom<usize>,
{
    if len % DWORD != 0 {
        return Err(EncodeError::Unaligned { unit, len });
    }
    T::try_from(len / DWORD)
        .map_err(|_| EncodeError::UnitTooLarge { unit, len })
}

/// Convert an element count to the width of its count field.
pub(crate) fn count<T>(
    unit: &'static str,
    count: usize,
) -> Result<T, EncodeError>
where
    T: TryFrom<usize>,
{
    T::try_from(count).map_err(|_| EncodeError::TooManyElements { unit, count })
}
