//! Compiled object members.

use crate::alignment::expect_member_end;
use crate::archive::MemberHeader;
use crate::coff::{parse_section_headers, CoffFileHeader, SectionHeader};
use crate::cursor::ByteCursor;
use crate::error::{FormatError, Result};

/// A COFF object file stored in the archive.
///
/// Only the file header and section table are decoded; section data,
/// relocations and symbols are left in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectFileMember {
    header: MemberHeader,
    file_header: CoffFileHeader,
    sections: Vec<SectionHeader>,
}

impl ObjectFileMember {
    /// Decodes the member headers and skips the rest of the payload. The
    /// cursor must be on the first payload byte, and is left on the next
    /// member header.
    pub fn parse(cursor: &mut ByteCursor<'_>, header: MemberHeader) -> Result<Self> {
        let span = header.span();
        let mut payload = cursor.limited(span.content_end())?;

        let file_header = CoffFileHeader::parse(&mut payload)?;
        if file_header.number_of_sections == 0 {
            return Err(FormatError::NoSections { offset: span.start }.into());
        }
        let sections = parse_section_headers(&mut payload, file_header.number_of_sections)?;

        cursor.seek(span.content_end())?;
        expect_member_end(cursor, &span)?;
        Ok(ObjectFileMember {
            header,
            file_header,
            sections,
        })
    }

    pub fn header(&self) -> &MemberHeader {
        &self.header
    }

    pub fn file_header(&self) -> &CoffFileHeader {
        &self.file_header
    }

    pub fn sections(&self) -> &[SectionHeader] {
        &self.sections
    }

    /// Returns the object file bytes.
    pub fn data<'data>(&self, archive: &'data [u8]) -> Result<&'data [u8]> {
        self.header.span().content(archive)
    }
}
