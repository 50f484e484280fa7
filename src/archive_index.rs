//! Loading a whole archive.

use std::collections::BTreeMap;

use log::debug;
use object::archive::MAGIC;

use crate::alignment::MemberSpan;
use crate::archive::{peek_identifier, MemberHeader, CATALOG_IDENTIFIER};
use crate::catalog::LongNameCatalog;
use crate::cursor::ByteCursor;
use crate::error::{FormatError, Result};
use crate::linker::{FirstLinkerMember, SecondLinkerMember};
use crate::member::{parse_member, ArchiveMember, MemberKind};
use crate::object_file::ObjectFileMember;

/// A fully decoded COFF archive.
///
/// Loading either succeeds for the whole archive or fails with the first
/// error; no partially loaded index is ever returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveIndex {
    len: u64,
    first_linker: FirstLinkerMember,
    second_linker: SecondLinkerMember,
    catalog: Option<LongNameCatalog>,
    /// Members after the linker members and catalog, in archive order.
    members: Vec<ArchiveMember>,
    /// Indices into `members` of object files, by identifier.
    objects: BTreeMap<String, Vec<usize>>,
    /// Indices into `members` of import members, by identifier.
    imports: BTreeMap<String, Vec<usize>>,
}

impl ArchiveIndex {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let magic = cursor
            .read_bytes(MAGIC.len() as u64)
            .map_err(|_| FormatError::BadMagic)?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic.into());
        }

        let header = expect_linker_header(&mut cursor)?;
        let first_linker = FirstLinkerMember::parse(&mut cursor, header)?;
        let header = expect_linker_header(&mut cursor)?;
        let second_linker = SecondLinkerMember::parse(&mut cursor, header)?;

        let catalog = match peek_identifier(&mut cursor)? {
            Some(raw) if raw == CATALOG_IDENTIFIER.as_bytes() => {
                let header = MemberHeader::parse(&mut cursor, None)?;
                Some(LongNameCatalog::parse(&mut cursor, header)?)
            }
            _ => None,
        };

        let mut members = Vec::new();
        let mut objects = BTreeMap::<String, Vec<usize>>::new();
        let mut imports = BTreeMap::<String, Vec<usize>>::new();
        while peek_identifier(&mut cursor)?.is_some() {
            let member = parse_member(&mut cursor, catalog.as_ref())?;
            debug!(
                "decoded {:?} member {:?} at offset {}, next at {}",
                member.kind(),
                member.identifier(),
                member.start_offset(),
                member.expected_next_offset()
            );
            let by_name = match member.kind() {
                MemberKind::ObjectFile => &mut objects,
                _ => &mut imports,
            };
            by_name
                .entry(member.identifier().to_string())
                .or_default()
                .push(members.len());
            members.push(member);
        }

        if cursor.position() != cursor.end() {
            return Err(FormatError::ArchiveLengthMismatch {
                expected: cursor.end(),
                actual: cursor.position(),
            }
            .into());
        }

        Ok(ArchiveIndex {
            len: cursor.end(),
            first_linker,
            second_linker,
            catalog,
            members,
            objects,
            imports,
        })
    }

    /// Length of the archive in bytes.
    pub fn archive_len(&self) -> u64 {
        self.len
    }

    pub fn first_linker(&self) -> &FirstLinkerMember {
        &self.first_linker
    }

    pub fn second_linker(&self) -> &SecondLinkerMember {
        &self.second_linker
    }

    pub fn catalog(&self) -> Option<&LongNameCatalog> {
        self.catalog.as_ref()
    }

    /// Object files and import members, in archive order.
    pub fn members(&self) -> &[ArchiveMember] {
        &self.members
    }

    /// Object files with the given name, in archive order.
    pub fn objects<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a ObjectFileMember> + 'a {
        self.lookup(&self.objects, name)
            .filter_map(|member| match member {
                ArchiveMember::ObjectFile(object) => Some(object),
                _ => None,
            })
    }

    /// Import members with the given name, in archive order.
    pub fn imports<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a ArchiveMember> + 'a {
        self.lookup(&self.imports, name)
    }

    /// Distinct object file names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.objects.keys().map(String::as_str)
    }

    /// Spans of every member, including the linker members and catalog, in
    /// archive order.
    pub fn spans(&self) -> impl Iterator<Item = MemberSpan> + '_ {
        [
            Some(self.first_linker.header().span()),
            Some(self.second_linker.header().span()),
            self.catalog.as_ref().map(|catalog| catalog.header().span()),
        ]
        .into_iter()
        .flatten()
        .chain(self.members.iter().map(ArchiveMember::span))
    }

    /// Number of object file and import members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn lookup<'a>(
        &'a self,
        by_name: &'a BTreeMap<String, Vec<usize>>,
        name: &str,
    ) -> impl Iterator<Item = &'a ArchiveMember> + 'a {
        by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|&index| self.members.get(index))
    }
}

fn expect_linker_header(cursor: &mut ByteCursor<'_>) -> Result<MemberHeader> {
    let header = MemberHeader::parse(cursor, None)?;
    if !header.is_linker_member() {
        return Err(FormatError::UnexpectedMember {
            offset: header.start_offset,
            identifier: header.identifier,
        }
        .into());
    }
    Ok(header)
}
