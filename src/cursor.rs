//! Positioned reads over an in-memory archive.

use std::mem;

use object::pod::{self, Pod};

use crate::error::{to_usize, FormatError, InternalError, Result};

/// A reader over a byte slice that tracks an absolute position.
///
/// Positions are always absolute offsets into the slice the cursor was
/// created from, including for cursors returned by [`ByteCursor::limited`].
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'data> {
    data: &'data [u8],
    position: u64,
}

impl<'data> ByteCursor<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        ByteCursor { data, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// The offset one past the last readable byte.
    pub fn end(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn remaining(&self) -> u64 {
        self.end().saturating_sub(self.position)
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Moves to an absolute position. Seeking to the end is allowed.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        if position > self.end() {
            return Err(FormatError::UnexpectedEndOfData {
                offset: self.position,
                needed: position.saturating_sub(self.position),
            }
            .into());
        }
        self.position = position;
        Ok(())
    }

    pub fn skip(&mut self, count: u64) -> Result<()> {
        let target = self.checked_target(count)?;
        self.seek(target)
    }

    /// Returns a cursor at the current position that cannot read at or past
    /// `end`.
    pub fn limited(&self, end: u64) -> Result<ByteCursor<'data>> {
        if end > self.end() || end < self.position {
            return Err(FormatError::UnexpectedEndOfData {
                offset: self.position,
                needed: end.saturating_sub(self.position),
            }
            .into());
        }
        Ok(ByteCursor {
            data: &self.data[..to_usize(end)?],
            position: self.position,
        })
    }

    /// Runs `f` and moves the cursor back to where it was, whether `f`
    /// succeeded or not.
    pub fn speculate<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.position;
        let result = f(self);
        self.position = saved;
        result
    }

    pub fn read_bytes(&mut self, count: u64) -> Result<&'data [u8]> {
        let end = self.checked_target(count)?;
        let bytes = self
            .data
            .get(to_usize(self.position)?..to_usize(end)?)
            .ok_or(InternalError::ShortRead {
                offset: self.position,
                expected: to_usize(count)?,
                actual: 0,
            })?;
        self.position = end;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let offset = self.position;
        let bytes = self.read_bytes(N as u64)?;
        bytes.try_into().map_err(|_| {
            InternalError::ShortRead {
                offset,
                expected: N,
                actual: bytes.len(),
            }
            .into()
        })
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let [byte] = self.read_array()?;
        Ok(byte)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    /// Reads a fixed-layout record such as [`object::pe::ImageFileHeader`].
    pub fn read_pod<T: Pod>(&mut self) -> Result<&'data T> {
        let offset = self.position;
        let bytes = self.read_bytes(mem::size_of::<T>() as u64)?;
        pod::from_bytes(bytes)
            .map(|(value, _)| value)
            .map_err(|()| InternalError::UnalignedRead { offset }.into())
    }

    /// Reads a NUL-terminated string. The terminator is consumed but not
    /// returned.
    pub fn read_cstr(&mut self) -> Result<&'data [u8]> {
        let start = to_usize(self.position)?;
        let rest = self.data.get(start..).unwrap_or_default();
        let len = memchr::memchr(0, rest).ok_or(FormatError::MissingNulTerminator {
            offset: self.position,
        })?;
        let bytes = self.read_bytes(len as u64)?;
        self.skip(1)?;
        Ok(bytes)
    }

    /// Reads a NUL-terminated string that must be valid UTF-8.
    pub fn read_name(&mut self) -> Result<String> {
        let offset = self.position;
        let bytes = self.read_cstr()?;
        name_from_bytes(bytes, offset)
    }

    fn checked_target(&self, count: u64) -> Result<u64> {
        match self.position.checked_add(count) {
            Some(end) if end <= self.end() => Ok(end),
            _ => Err(FormatError::UnexpectedEndOfData {
                offset: self.position,
                needed: count,
            }
            .into()),
        }
    }
}

pub(crate) fn name_from_bytes(bytes: &[u8], offset: u64) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| FormatError::InvalidName { offset }.into())
}
