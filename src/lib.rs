//! A reader for COFF archives (`.lib` static and import libraries).
//!
//! [`ArchiveIndex::parse`] decodes a complete archive held in memory: the two
//! linker members, the optional long-name catalog, and every object file and
//! import member after them.
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("kernel32.lib")?;
//! let index = ar_archive_reader::ArchiveIndex::parse(&data)?;
//! for member in index.members() {
//!     println!("{} at {}", member.identifier(), member.start_offset());
//! }
//! # Ok(())
//! # }
//! ```

mod alignment;
mod archive;
mod archive_index;
mod catalog;
mod coff;
mod coff_import_file;
mod cursor;
mod error;
mod linker;
mod mangler;
mod member;
mod object_file;

pub use alignment::{MemberSpan, HEADER_SIZE};
pub use archive::{peek_identifier, MemberHeader, CATALOG_IDENTIFIER, LINKER_MEMBER_IDENTIFIER};
pub use archive_index::ArchiveIndex;
pub use catalog::LongNameCatalog;
pub use coff::{
    CoffFileHeader, CoffSymbol, ImportNameType, ImportType, MachineTypes, SectionHeader,
    StringTable,
};
pub use coff_import_file::{ImportLongMember, ImportShortMember};
pub use cursor::ByteCursor;
pub use error::{Error, FormatError, HeaderField, InternalError, Result};
pub use linker::{FirstLinkerMember, SecondLinkerMember};
pub use member::{classify, ArchiveMember, MemberKind};
pub use object_file::ObjectFileMember;
