//! The fixed-format member header shared by every archive member.

use log::trace;
use object::archive::TERMINATOR;

use crate::alignment::{MemberSpan, HEADER_SIZE};
use crate::catalog::LongNameCatalog;
use crate::cursor::{name_from_bytes, ByteCursor};
use crate::error::{FormatError, HeaderField, Result};

/// Identifier of both linker members.
pub const LINKER_MEMBER_IDENTIFIER: &str = "/";

/// Identifier of the long-name catalog.
pub const CATALOG_IDENTIFIER: &str = "//";

const IDENTIFIER_LEN: u64 = 16;
const TIMESTAMP_LEN: u64 = 12;
const OWNER_ID_LEN: u64 = 6;
const GROUP_ID_LEN: u64 = 6;
const FILE_MODE_LEN: u64 = 8;
/// Size field is 10 decimal digits long
const FILE_SIZE_LEN: u64 = 10;

/// A decoded member header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberHeader {
    /// The member name: `/`, `//`, or the resolved file name.
    pub identifier: String,
    /// The identifier field as stored, without padding.
    pub raw_identifier: String,
    pub mod_timestamp: i64,
    pub owner_id: i32,
    pub group_id: i32,
    /// Permission bits, stored in octal.
    pub file_mode: u32,
    /// Payload size, excluding the padding byte.
    pub file_size: u32,
    /// Offset of the header in the archive.
    pub start_offset: u64,
}

impl MemberHeader {
    /// Decodes the header at the cursor and leaves the cursor on the first
    /// payload byte.
    ///
    /// `/<offset>` identifiers are looked up in `catalog`.
    pub fn parse(cursor: &mut ByteCursor<'_>, catalog: Option<&LongNameCatalog>) -> Result<Self> {
        let start_offset = cursor.position();
        if cursor.remaining() < HEADER_SIZE {
            return Err(FormatError::UnexpectedEndOfData {
                offset: start_offset,
                needed: HEADER_SIZE,
            }
            .into());
        }

        let raw = trim_padding(cursor.read_bytes(IDENTIFIER_LEN)?);
        let timestamp = cursor.read_bytes(TIMESTAMP_LEN)?;
        let owner_id = cursor.read_bytes(OWNER_ID_LEN)?;
        let group_id = cursor.read_bytes(GROUP_ID_LEN)?;
        let file_mode = cursor.read_bytes(FILE_MODE_LEN)?;
        let file_size = cursor.read_bytes(FILE_SIZE_LEN)?;
        if cursor.read_array::<2>()? != TERMINATOR {
            return Err(FormatError::InvalidHeaderTerminator {
                offset: start_offset,
            }
            .into());
        }

        Ok(MemberHeader {
            identifier: resolve_identifier(raw, start_offset, catalog)?,
            raw_identifier: name_from_bytes(raw, start_offset)?,
            mod_timestamp: parse_field(timestamp, 10, HeaderField::Timestamp, start_offset)?,
            owner_id: parse_field(owner_id, 10, HeaderField::OwnerId, start_offset)?,
            group_id: parse_field(group_id, 10, HeaderField::GroupId, start_offset)?,
            file_mode: parse_field(file_mode, 8, HeaderField::FileMode, start_offset)?,
            file_size: parse_field(file_size, 10, HeaderField::FileSize, start_offset)?,
            start_offset,
        })
    }

    pub fn span(&self) -> MemberSpan {
        MemberSpan::new(self.start_offset, u64::from(self.file_size))
    }

    pub fn expected_next_offset(&self) -> u64 {
        self.span().next()
    }

    pub fn is_linker_member(&self) -> bool {
        self.raw_identifier == LINKER_MEMBER_IDENTIFIER
    }

    pub fn is_catalog(&self) -> bool {
        self.raw_identifier == CATALOG_IDENTIFIER
    }
}

/// Reads the identifier field of the header at the cursor without moving it.
///
/// Returns `None` when fewer than a full header's worth of bytes remain.
pub fn peek_identifier<'data>(cursor: &mut ByteCursor<'data>) -> Result<Option<&'data [u8]>> {
    if cursor.remaining() < HEADER_SIZE {
        return Ok(None);
    }
    let raw = cursor.speculate(|cursor| cursor.read_bytes(IDENTIFIER_LEN))?;
    trace!(
        "peeked identifier {:?} at offset {}",
        String::from_utf8_lossy(trim_padding(raw)),
        cursor.position()
    );
    Ok(Some(trim_padding(raw)))
}

/// Resolves a trimmed identifier field to the member name.
pub(crate) fn resolve_identifier(
    raw: &[u8],
    offset: u64,
    catalog: Option<&LongNameCatalog>,
) -> Result<String> {
    match raw {
        b"/" => Ok(LINKER_MEMBER_IDENTIFIER.to_string()),
        b"//" => Ok(CATALOG_IDENTIFIER.to_string()),
        [b'/', digits @ ..] if digits.iter().all(u8::is_ascii_digit) => {
            let name_offset =
                parse_number(digits, 10).ok_or_else(|| malformed_identifier(raw, offset))?;
            let catalog = catalog.ok_or(FormatError::MissingCatalog { offset })?;
            catalog.name_at(name_offset).map(str::to_owned)
        }
        [name @ .., b'/'] => name_from_bytes(name, offset),
        _ => Err(malformed_identifier(raw, offset).into()),
    }
}

fn malformed_identifier(raw: &[u8], offset: u64) -> FormatError {
    FormatError::MalformedIdentifier {
        offset,
        raw: String::from_utf8_lossy(raw).into_owned(),
    }
}

fn trim_padding(field: &[u8]) -> &[u8] {
    let end = field
        .iter()
        .rposition(|&c| c != b' ')
        .map_or(0, |last| last + 1);
    &field[..end]
}

/// Parses a space padded ASCII number. A blank field is zero.
fn parse_number(field: &[u8], radix: u32) -> Option<u64> {
    let digits = trim_padding(field);
    let digits = &digits[digits.iter().take_while(|&&c| c == b' ').count()..];
    let mut result: u64 = 0;
    for &c in digits {
        let x = (c as char).to_digit(radix)?;
        result = result
            .checked_mul(u64::from(radix))?
            .checked_add(u64::from(x))?;
    }
    Some(result)
}

fn parse_field<T: TryFrom<u64>>(
    bytes: &[u8],
    radix: u32,
    field: HeaderField,
    offset: u64,
) -> Result<T> {
    parse_number(bytes, radix)
        .and_then(|value| T::try_from(value).ok())
        .ok_or_else(|| FormatError::InvalidNumericField { offset, field }.into())
}
