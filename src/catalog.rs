//! The `//` member holding names too long for the identifier field.

use log::debug;

use crate::alignment::expect_member_end;
use crate::archive::MemberHeader;
use crate::cursor::ByteCursor;
use crate::error::{FormatError, Result};

/// Decoded long-name catalog.
///
/// Names are recorded with their byte offset relative to the start of the
/// catalog payload, which is the number other members use in their `/<offset>`
/// identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LongNameCatalog {
    header: MemberHeader,
    /// Sorted by offset.
    names: Vec<(u64, String)>,
}

impl LongNameCatalog {
    /// Decodes the catalog payload. The cursor must be on the first payload
    /// byte, and is left on the next member header.
    pub fn parse(cursor: &mut ByteCursor<'_>, header: MemberHeader) -> Result<Self> {
        let span = header.span();
        let mut payload = cursor.limited(span.content_end())?;
        let mut names = Vec::new();

        loop {
            let offset = payload.position() - span.content_start();
            match payload.remaining() {
                0 => break,
                // The padding byte is counted in the member size.
                1 if offset % 2 != 0 => break,
                _ => {}
            }
            let name = payload.read_name()?;
            // GNU tools may pad between names with extra NULs.
            if name.is_empty() {
                continue;
            }
            names.push((offset, name));
        }

        cursor.seek(payload.position())?;
        expect_member_end(cursor, &span)?;
        debug!(
            "decoded long-name catalog with {} names at offset {}",
            names.len(),
            span.start
        );
        Ok(LongNameCatalog { header, names })
    }

    pub fn header(&self) -> &MemberHeader {
        &self.header
    }

    /// Returns the name starting at `offset` in the catalog payload.
    pub fn name_at(&self, offset: u64) -> Result<&str> {
        self.names
            .binary_search_by_key(&offset, |(name_offset, _)| *name_offset)
            .map(|i| self.names[i].1.as_str())
            .map_err(|_| FormatError::UnresolvedOffset { name_offset: offset }.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> + '_ {
        self.names
            .iter()
            .map(|(offset, name)| (*offset, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
