//! Error types.
//!
//! Failures are split into two families: [`FormatError`] for archives that do
//! not follow the format, and [`InternalError`] for violated invariants of the
//! reader itself. Both are fatal to the parse that produced them.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Header fields that carry an ASCII number.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeaderField {
    Timestamp,
    OwnerId,
    GroupId,
    FileMode,
    FileSize,
}

/// The archive bytes do not describe a well-formed COFF archive.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("archive does not start with the `!<arch>\\n` magic")]
    BadMagic,
    #[error("member header at offset {offset} is not terminated by \"`\\n\"")]
    InvalidHeaderTerminator { offset: u64 },
    #[error("member identifier {raw:?} at offset {offset} does not end with '/'")]
    MalformedIdentifier { offset: u64, raw: String },
    #[error("member header at offset {offset} has an invalid {field:?} field")]
    InvalidNumericField { offset: u64, field: HeaderField },
    #[error("member at offset {offset} refers to the long-name catalog, but there is none")]
    MissingCatalog { offset: u64 },
    #[error("no long name starts at catalog offset {name_offset}")]
    UnresolvedOffset { name_offset: u64 },
    #[error("member ending at offset {offset} is missing its padding byte")]
    MissingPaddingByte { offset: u64 },
    #[error("member decoding stopped at offset {actual}, expected {expected}")]
    OffsetMismatch { expected: u64, actual: u64 },
    #[error("COFF header at offset {offset} has an optional header of {size} bytes")]
    UnsupportedOptionalHeader { offset: u64, size: u16 },
    #[error("object file at offset {offset} has no sections")]
    NoSections { offset: u64 },
    #[error("COFF string table at offset {offset} has invalid length {length}")]
    InvalidStringTableLength { offset: u64, length: u32 },
    #[error("import header at offset {offset} has signature {sig1:#06x}/{sig2:#06x}")]
    InvalidImportSignature { offset: u64, sig1: u16, sig2: u16 },
    #[error("unexpected end of data reading {needed} bytes at offset {offset}")]
    UnexpectedEndOfData { offset: u64, needed: u64 },
    #[error("archive scan ended at offset {actual}, but the archive is {expected} bytes long")]
    ArchiveLengthMismatch { expected: u64, actual: u64 },
    #[error("unexpected {identifier:?} member at offset {offset}")]
    UnexpectedMember { offset: u64, identifier: String },
    #[error("name at offset {offset} is not valid UTF-8")]
    InvalidName { offset: u64 },
    #[error("string at offset {offset} is not NUL-terminated")]
    MissingNulTerminator { offset: u64 },
    #[error("COFF symbol table at {pointer:#x} lies outside the member at offset {offset}")]
    SymbolTableOutOfBounds { offset: u64, pointer: u32 },
    #[error("COFF symbol at offset {offset} has auxiliary records past the end of the symbol table")]
    AuxiliaryRecordsOutOfBounds { offset: u64 },
}

impl FormatError {
    /// Returns true for the errors that describe a malformed member header
    /// or archive magic.
    pub fn is_malformed_header(&self) -> bool {
        matches!(
            self,
            FormatError::BadMagic
                | FormatError::InvalidHeaderTerminator { .. }
                | FormatError::MalformedIdentifier { .. }
                | FormatError::InvalidNumericField { .. }
        )
    }
}

/// An invariant of the reader was violated. These indicate a bug rather than
/// bad input.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("value {value} does not fit the target integer type")]
    ValueOutOfRange { value: u64 },
    #[error("read at offset {offset} returned {actual} bytes, expected {expected}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },
    #[error("record at offset {offset} is not aligned for its type")]
    UnalignedRead { offset: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl Error {
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }

    /// Returns the format error, if this is one.
    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            Error::Format(err) => Some(err),
            Error::Internal(_) => None,
        }
    }
}

pub(crate) fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| InternalError::ValueOutOfRange { value }.into())
}
