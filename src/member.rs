//! Archive members and how they are told apart.

use log::trace;
use object::pe;

use crate::alignment::{MemberSpan, HEADER_SIZE};
use crate::archive::{peek_identifier, resolve_identifier, MemberHeader};
use crate::catalog::LongNameCatalog;
use crate::coff::{parse_section_headers, CoffFileHeader};
use crate::coff_import_file::{is_long_import, ImportLongMember, ImportShortMember};
use crate::cursor::ByteCursor;
use crate::error::{FormatError, Result};
use crate::linker::{FirstLinkerMember, SecondLinkerMember};
use crate::object_file::ObjectFileMember;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    FirstLinker,
    SecondLinker,
    LongNameCatalog,
    ObjectFile,
    ImportShort,
    ImportLong,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArchiveMember {
    FirstLinker(FirstLinkerMember),
    SecondLinker(SecondLinkerMember),
    LongNameCatalog(LongNameCatalog),
    ObjectFile(ObjectFileMember),
    ImportShort(ImportShortMember),
    ImportLong(ImportLongMember),
}

impl ArchiveMember {
    pub fn kind(&self) -> MemberKind {
        match self {
            ArchiveMember::FirstLinker(_) => MemberKind::FirstLinker,
            ArchiveMember::SecondLinker(_) => MemberKind::SecondLinker,
            ArchiveMember::LongNameCatalog(_) => MemberKind::LongNameCatalog,
            ArchiveMember::ObjectFile(_) => MemberKind::ObjectFile,
            ArchiveMember::ImportShort(_) => MemberKind::ImportShort,
            ArchiveMember::ImportLong(_) => MemberKind::ImportLong,
        }
    }

    pub fn header(&self) -> &MemberHeader {
        match self {
            ArchiveMember::FirstLinker(member) => member.header(),
            ArchiveMember::SecondLinker(member) => member.header(),
            ArchiveMember::LongNameCatalog(member) => member.header(),
            ArchiveMember::ObjectFile(member) => member.header(),
            ArchiveMember::ImportShort(member) => member.header(),
            ArchiveMember::ImportLong(member) => member.header(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.header().identifier
    }

    pub fn span(&self) -> MemberSpan {
        self.header().span()
    }

    pub fn start_offset(&self) -> u64 {
        self.header().start_offset
    }

    pub fn expected_next_offset(&self) -> u64 {
        self.header().expected_next_offset()
    }

    /// Returns the member payload.
    pub fn data<'data>(&self, archive: &'data [u8]) -> Result<&'data [u8]> {
        self.span().content(archive)
    }
}

/// Decides what kind of member starts at the cursor, without moving it.
///
/// A `/` identifier is reported as [`MemberKind::FirstLinker`]; the second
/// linker member shares the identifier and is only told apart by position.
///
/// Other members are distinguished by the two bytes after the header: an
/// import header starts with a zero signature where a COFF header has its
/// machine field. This is a heuristic, not a format tag. COFF members whose
/// sections are all `.idata$N` are long import members. Both checks read
/// only the member's own payload.
pub fn classify(
    cursor: &mut ByteCursor<'_>,
    catalog: Option<&LongNameCatalog>,
) -> Result<MemberKind> {
    let start = cursor.position();
    let raw = peek_identifier(cursor)?.ok_or(FormatError::UnexpectedEndOfData {
        offset: start,
        needed: HEADER_SIZE,
    })?;
    match raw {
        b"/" => return Ok(MemberKind::FirstLinker),
        b"//" => return Ok(MemberKind::LongNameCatalog),
        _ => {}
    }
    resolve_identifier(raw, start, catalog)?;

    let machine = cursor.speculate(|cursor| {
        let header = MemberHeader::parse(cursor, catalog)?;
        cursor.limited(header.span().content_end())?.read_u16_le()
    })?;
    trace!("member at offset {} has machine {:#06x}", start, machine);
    if machine == pe::IMAGE_FILE_MACHINE_UNKNOWN {
        return Ok(MemberKind::ImportShort);
    }

    let kind = cursor.speculate(|cursor| {
        let header = MemberHeader::parse(cursor, catalog)?;
        let mut payload = cursor.limited(header.span().content_end())?;
        let file_header = CoffFileHeader::parse(&mut payload)?;
        let sections = parse_section_headers(&mut payload, file_header.number_of_sections)?;
        Ok(if is_long_import(&sections) {
            MemberKind::ImportLong
        } else {
            MemberKind::ObjectFile
        })
    })?;
    trace!("member at offset {} classified as {:?}", start, kind);
    Ok(kind)
}

/// Decodes a member following the leading linker and catalog members.
pub(crate) fn parse_member(
    cursor: &mut ByteCursor<'_>,
    catalog: Option<&LongNameCatalog>,
) -> Result<ArchiveMember> {
    let kind = classify(cursor, catalog)?;
    let header = MemberHeader::parse(cursor, catalog)?;
    match kind {
        MemberKind::ObjectFile => {
            ObjectFileMember::parse(cursor, header).map(ArchiveMember::ObjectFile)
        }
        MemberKind::ImportShort => {
            ImportShortMember::parse(cursor, header).map(ArchiveMember::ImportShort)
        }
        MemberKind::ImportLong => {
            ImportLongMember::parse(cursor, header).map(ArchiveMember::ImportLong)
        }
        MemberKind::FirstLinker | MemberKind::SecondLinker | MemberKind::LongNameCatalog => {
            Err(FormatError::UnexpectedMember {
                offset: header.start_offset,
                identifier: header.identifier,
            }
            .into())
        }
    }
}
