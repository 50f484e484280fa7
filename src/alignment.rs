// Derived from code in LLVM, which is:
// Part of the LLVM Project, under the Apache License v2.0 with LLVM Exceptions.
// See https://llvm.org/LICENSE.txt for license information.
// SPDX-License-Identifier: Apache-2.0 WITH LLVM-exception

use crate::cursor::ByteCursor;
use crate::error::{FormatError, Result};

/// Size of the fixed member header.
pub const HEADER_SIZE: u64 = 60;

/// Members start on even offsets.
pub(crate) const MEMBER_ALIGNMENT: u64 = 2;

/// Returns a multiple of `align` needed to store `size` bytes.
pub(crate) fn align_to(size: u64, align: u64) -> u64 {
    (size + align - 1) & !(align - 1)
}

pub(crate) fn offset_to_alignment(value: u64, alignment: u64) -> u64 {
    align_to(value, alignment) - value
}

/// Where a member lives in the archive.
///
/// Every offset the decoders compare against is derived from here.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberSpan {
    /// Offset of the member header.
    pub start: u64,
    /// Declared payload size, excluding the padding byte.
    pub size: u64,
}

impl MemberSpan {
    pub fn new(start: u64, size: u64) -> Self {
        MemberSpan { start, size }
    }

    /// Offset of the first payload byte.
    pub fn content_start(&self) -> u64 {
        self.start + HEADER_SIZE
    }

    /// Offset one past the last payload byte.
    pub fn content_end(&self) -> u64 {
        self.content_start() + self.size
    }

    /// Number of padding bytes following the payload; either 0 or 1.
    pub fn padding(&self) -> u64 {
        offset_to_alignment(self.size, MEMBER_ALIGNMENT)
    }

    /// Offset of the next member header.
    pub fn next(&self) -> u64 {
        self.content_end() + self.padding()
    }

    /// Returns the payload bytes of the member.
    pub fn content<'data>(&self, archive: &'data [u8]) -> Result<&'data [u8]> {
        let mut cursor = ByteCursor::new(archive);
        cursor.seek(self.content_start())?;
        cursor.read_bytes(self.size)
    }
}

/// Checks that decoding a member ended exactly where the next one begins.
///
/// If the bytes consumed since the payload start are odd, a single padding
/// byte is read first. The padding byte may lie inside the declared size
/// (as some writers emit it) or after it.
pub(crate) fn expect_member_end(cursor: &mut ByteCursor<'_>, span: &MemberSpan) -> Result<()> {
    let consumed = cursor.position().saturating_sub(span.content_start());
    if offset_to_alignment(consumed, MEMBER_ALIGNMENT) != 0 {
        if cursor.is_at_end() {
            return Err(FormatError::MissingPaddingByte {
                offset: cursor.position(),
            }
            .into());
        }
        cursor.read_u8()?;
    }
    if cursor.position() != span.next() {
        return Err(FormatError::OffsetMismatch {
            expected: span.next(),
            actual: cursor.position(),
        }
        .into());
    }
    Ok(())
}
