//! The two `/` linker members at the start of a COFF archive.
//!
//! The first member is the System V symbol table: big-endian, one member
//! offset per symbol. The second is the Microsoft extension: little-endian,
//! one offset per member, plus a symbol to member index table whose names are
//! sorted.

use log::debug;

use crate::alignment::expect_member_end;
use crate::archive::MemberHeader;
use crate::cursor::ByteCursor;
use crate::error::Result;

const OFFSET_SIZE: u64 = 4;
const INDEX_SIZE: u64 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirstLinkerMember {
    header: MemberHeader,
    offsets: Vec<u32>,
    names: Vec<String>,
}

impl FirstLinkerMember {
    /// Decodes the member payload. The cursor must be on the first payload
    /// byte, and is left on the next member header.
    pub fn parse(cursor: &mut ByteCursor<'_>, header: MemberHeader) -> Result<Self> {
        let span = header.span();
        let mut payload = cursor.limited(span.content_end())?;

        let count = payload.read_u32_be()?;
        let mut offsets = Vec::with_capacity(bounded_capacity(&payload, count, OFFSET_SIZE));
        for _ in 0..count {
            offsets.push(payload.read_u32_be()?);
        }
        let names = read_names(&mut payload, count)?;

        cursor.seek(payload.position())?;
        expect_member_end(cursor, &span)?;
        debug!("decoded first linker member with {} symbols", count);
        Ok(FirstLinkerMember {
            header,
            offsets,
            names,
        })
    }

    pub fn header(&self) -> &MemberHeader {
        &self.header
    }

    /// Offsets of the member headers, one per symbol.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Pairs of member offset and symbol name, in stored order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.offsets
            .iter()
            .copied()
            .zip(self.names.iter().map(String::as_str))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecondLinkerMember {
    header: MemberHeader,
    member_offsets: Vec<u32>,
    indices: Vec<u16>,
    names: Vec<String>,
}

impl SecondLinkerMember {
    /// Decodes the member payload. The cursor must be on the first payload
    /// byte, and is left on the next member header.
    pub fn parse(cursor: &mut ByteCursor<'_>, header: MemberHeader) -> Result<Self> {
        let span = header.span();
        let mut payload = cursor.limited(span.content_end())?;

        let member_count = payload.read_u32_le()?;
        let mut member_offsets =
            Vec::with_capacity(bounded_capacity(&payload, member_count, OFFSET_SIZE));
        for _ in 0..member_count {
            member_offsets.push(payload.read_u32_le()?);
        }

        let symbol_count = payload.read_u32_le()?;
        let mut indices = Vec::with_capacity(bounded_capacity(&payload, symbol_count, INDEX_SIZE));
        for _ in 0..symbol_count {
            indices.push(payload.read_u16_le()?);
        }
        // Sorted by the producing toolchain; not checked here.
        let names = read_names(&mut payload, symbol_count)?;

        cursor.seek(payload.position())?;
        expect_member_end(cursor, &span)?;
        debug!(
            "decoded second linker member with {} members and {} symbols",
            member_count, symbol_count
        );
        Ok(SecondLinkerMember {
            header,
            member_offsets,
            indices,
            names,
        })
    }

    pub fn header(&self) -> &MemberHeader {
        &self.header
    }

    /// Offsets of the member headers, one per archive member.
    pub fn member_offsets(&self) -> &[u32] {
        &self.member_offsets
    }

    /// 1-based indices into [`Self::member_offsets`], one per symbol.
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Pairs of symbol name and member index.
    pub fn symbols(&self) -> impl Iterator<Item = (&str, u16)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.indices.iter().copied())
    }

    /// Maps a 1-based member index to the member header offset.
    pub fn member_offset(&self, index: u16) -> Option<u32> {
        let index = usize::from(index.checked_sub(1)?);
        self.member_offsets.get(index).copied()
    }
}

fn read_names(payload: &mut ByteCursor<'_>, count: u32) -> Result<Vec<String>> {
    // Every name takes at least its terminator.
    let mut names = Vec::with_capacity(bounded_capacity(payload, count, 1));
    for _ in 0..count {
        names.push(payload.read_name()?);
    }
    Ok(names)
}

/// Caps a preallocation by what the remaining bytes could hold, so a corrupt
/// count cannot request a huge allocation.
fn bounded_capacity(payload: &ByteCursor<'_>, count: u32, item_size: u64) -> usize {
    let fits = payload.remaining() / item_size;
    usize::try_from(u64::from(count).min(fits)).unwrap_or(0)
}
