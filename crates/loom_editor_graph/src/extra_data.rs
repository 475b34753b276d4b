// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixed-capacity scratch buffers attached to nodes and pins.
//!
//! Each node type defines its own tiny layout on top of the buffer, for
//! example a color picker stores one packed RGBA vector at offset 0. Values
//! are read and written through offset-based accessors over any
//! [`bytemuck::Pod`] type.

use crate::host::AssetId;
use bytemuck::Pod;
use serde::{Deserialize, Serialize};

/// Capacity of every extra-data buffer in bytes
pub const EXTRA_DATA_CAPACITY: usize = 32;

/// Errors raised by extra-data accessors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtraDataError {
    /// Access would run past the end of the buffer
    #[error("Extra data access out of bounds: offset {offset} + {size} bytes exceeds {capacity}")]
    OutOfBounds {
        /// Requested offset
        offset: usize,
        /// Size of the accessed value
        size: usize,
        /// Buffer capacity
        capacity: usize,
    },
}

/// Small opaque typed payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraData {
    bytes: [u8; EXTRA_DATA_CAPACITY],
}

impl ExtraData {
    /// Create a zeroed buffer
    pub const fn new() -> Self {
        Self {
            bytes: [0; EXTRA_DATA_CAPACITY],
        }
    }

    /// Rebuild a buffer from persisted bytes.
    ///
    /// Shorter inputs are zero-padded.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtraDataError> {
        let mut data = Self::new();
        data.range_mut(0, bytes.len())?.copy_from_slice(bytes);
        Ok(data)
    }

    /// Raw bytes for serialization
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether every byte is zero
    pub fn is_zeroed(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }

    /// Zero the whole buffer
    pub fn clear(&mut self) {
        self.bytes = [0; EXTRA_DATA_CAPACITY];
    }

    /// Write a value at `offset`
    pub fn write<T: Pod>(&mut self, offset: usize, value: T) -> Result<(), ExtraDataError> {
        let src = bytemuck::bytes_of(&value);
        self.range_mut(offset, src.len())?.copy_from_slice(src);
        Ok(())
    }

    /// Read a value stored at `offset`
    pub fn read<T: Pod>(&self, offset: usize) -> Result<T, ExtraDataError> {
        let size = std::mem::size_of::<T>();
        let end = Self::end(offset, size)?;
        Ok(bytemuck::pod_read_unaligned(&self.bytes[offset..end]))
    }

    /// Builder-style [`ExtraData::write`]
    pub fn with<T: Pod>(mut self, offset: usize, value: T) -> Result<Self, ExtraDataError> {
        self.write(offset, value)?;
        Ok(self)
    }

    /// Store an asset id as a packed `u128`
    pub fn write_asset_id(&mut self, offset: usize, id: AssetId) -> Result<(), ExtraDataError> {
        self.write(offset, id.as_u128())
    }

    /// Read an asset id; the nil id reads back as `None`
    pub fn read_asset_id(&self, offset: usize) -> Result<Option<AssetId>, ExtraDataError> {
        let raw: u128 = self.read(offset)?;
        Ok((raw != 0).then(|| AssetId::from_u128(raw)))
    }

    fn end(offset: usize, size: usize) -> Result<usize, ExtraDataError> {
        offset
            .checked_add(size)
            .filter(|end| *end <= EXTRA_DATA_CAPACITY)
            .ok_or(ExtraDataError::OutOfBounds {
                offset,
                size,
                capacity: EXTRA_DATA_CAPACITY,
            })
    }

    fn range_mut(&mut self, offset: usize, size: usize) -> Result<&mut [u8], ExtraDataError> {
        let end = Self::end(offset, size)?;
        Ok(&mut self.bytes[offset..end])
    }
}

impl Default for ExtraData {
    fn default() -> Self {
        Self::new()
    }
}
