// Derived from code in LLVM, which is:
// Part of the LLVM Project, under the Apache License v2.0 with LLVM Exceptions.
// See https://llvm.org/LICENSE.txt for license information.
// SPDX-License-Identifier: Apache-2.0 WITH LLVM-exception

//! Import library members.
//!
//! A short import member is a 20 byte import header followed by the symbol
//! and DLL names. A long import member is a complete COFF object whose
//! sections are all `.idata$N`; these carry the import descriptor and thunk
//! terminators for a DLL.

use object::{pe, LittleEndian as LE};

use crate::alignment::expect_member_end;
use crate::archive::MemberHeader;
use crate::coff::{
    is_arm64ec, parse_section_headers, parse_symbol_table, CoffFileHeader, CoffSymbol,
    ImportNameType, ImportType, MachineTypes, SectionHeader, StringTable,
};
use crate::cursor::ByteCursor;
use crate::error::{FormatError, Result};
use crate::mangler::get_arm64ec_demangled_function_name;

pub(crate) const IMPORT_DESCRIPTOR_PREFIX: &[u8] = b"__IMPORT_DESCRIPTOR_";
pub(crate) const NULL_IMPORT_DESCRIPTOR_SYMBOL_NAME: &[u8] = b"__NULL_IMPORT_DESCRIPTOR";
pub(crate) const NULL_THUNK_DATA_PREFIX: &[u8] = b"\x7f";
pub(crate) const NULL_THUNK_DATA_SUFFIX: &[u8] = b"_NULL_THUNK_DATA";

/// Base name of the sections making up a long import member.
pub(crate) const IDATA_SECTION_NAME: &str = ".idata";

const IMPORT_TYPE_MASK: u16 = 0b11;
const NAME_TYPE_SHIFT: u16 = 2;
const NAME_TYPE_MASK: u16 = 0b111;

pub(crate) fn is_import_descriptor(name: &[u8]) -> bool {
    name.starts_with(IMPORT_DESCRIPTOR_PREFIX)
        || name == NULL_IMPORT_DESCRIPTOR_SYMBOL_NAME
        || (name.starts_with(NULL_THUNK_DATA_PREFIX) && name.ends_with(NULL_THUNK_DATA_SUFFIX))
}

/// A short form import member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportShortMember {
    header: MemberHeader,
    pub version: u16,
    pub machine: u16,
    pub time_date_stamp: u32,
    /// Length of the strings following the import header, as declared.
    pub size_of_data: u32,
    pub ordinal_hint: u16,
    /// Import type in bits 0-1, name type in bits 2-4.
    pub type_info: u16,
    pub symbol_name: String,
    pub dll_name: String,
    /// Present when the name type is [`ImportNameType::NameExportas`].
    pub export_name: Option<String>,
}

impl ImportShortMember {
    /// Decodes the member payload. The cursor must be on the first payload
    /// byte, and is left on the next member header.
    ///
    /// `size_of_data` is not used to locate the strings.
    pub fn parse(cursor: &mut ByteCursor<'_>, header: MemberHeader) -> Result<Self> {
        let span = header.span();
        let mut payload = cursor.limited(span.content_end())?;

        let offset = payload.position();
        let raw: &pe::ImportObjectHeader = payload.read_pod()?;
        let sig1 = raw.sig1.get(LE);
        let sig2 = raw.sig2.get(LE);
        if sig1 != pe::IMAGE_FILE_MACHINE_UNKNOWN || sig2 != pe::IMPORT_OBJECT_HDR_SIG2 {
            return Err(FormatError::InvalidImportSignature { offset, sig1, sig2 }.into());
        }
        let version = raw.version.get(LE);
        let machine = raw.machine.get(LE);
        let time_date_stamp = raw.time_date_stamp.get(LE);
        let size_of_data = raw.size_of_data.get(LE);
        let ordinal_hint = raw.ordinal_or_hint.get(LE);
        let type_info = raw.name_type.get(LE);
        let symbol_name = payload.read_name()?;
        let dll_name = payload.read_name()?;
        let export_name = if (type_info >> NAME_TYPE_SHIFT) & NAME_TYPE_MASK
            == ImportNameType::NameExportas as u16
            && !payload.is_at_end()
        {
            Some(payload.read_name()?)
        } else {
            None
        };

        cursor.seek(payload.position())?;
        expect_member_end(cursor, &span)?;
        Ok(ImportShortMember {
            header,
            version,
            machine,
            time_date_stamp,
            size_of_data,
            ordinal_hint,
            type_info,
            symbol_name,
            dll_name,
            export_name,
        })
    }

    pub fn header(&self) -> &MemberHeader {
        &self.header
    }

    pub fn machine_type(&self) -> Option<MachineTypes> {
        MachineTypes::try_from(self.machine).ok()
    }

    /// The import type, or `None` for the reserved value.
    pub fn import_type(&self) -> Option<ImportType> {
        ImportType::try_from(self.type_info & IMPORT_TYPE_MASK).ok()
    }

    /// The name type, or `None` for a reserved value.
    pub fn name_type(&self) -> Option<ImportNameType> {
        ImportNameType::try_from((self.type_info >> NAME_TYPE_SHIFT) & NAME_TYPE_MASK).ok()
    }

    /// The name the DLL exports the symbol under, or `None` if it is
    /// imported by ordinal.
    pub fn import_name(&self) -> Option<String> {
        // Removes a single `?`, `@` or `_` prefix.
        fn strip_prefix(name: &str) -> &str {
            name.strip_prefix(|c: char| matches!(c, '?' | '@' | '_'))
                .unwrap_or(name)
        }

        match self.name_type()? {
            ImportNameType::Ordinal => None,
            ImportNameType::Name => {
                if self.machine_type().is_some_and(is_arm64ec) {
                    if let Some(name) = get_arm64ec_demangled_function_name(&self.symbol_name) {
                        return Some(name);
                    }
                }
                Some(self.symbol_name.clone())
            }
            ImportNameType::NameNoprefix => Some(strip_prefix(&self.symbol_name).to_string()),
            ImportNameType::NameUndecorate => {
                let name = strip_prefix(&self.symbol_name);
                Some(name.split('@').next().unwrap_or(name).to_string())
            }
            ImportNameType::NameExportas => self.export_name.clone(),
        }
    }
}

/// A long form import member: a COFF object holding import descriptor data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportLongMember {
    header: MemberHeader,
    file_header: CoffFileHeader,
    sections: Vec<SectionHeader>,
    symbols: Vec<CoffSymbol>,
    string_table: StringTable,
}

impl ImportLongMember {
    /// Decodes the member payload. The cursor must be on the first payload
    /// byte, and is left on the next member header.
    pub fn parse(cursor: &mut ByteCursor<'_>, header: MemberHeader) -> Result<Self> {
        let span = header.span();
        let mut payload = cursor.limited(span.content_end())?;

        let file_header = CoffFileHeader::parse(&mut payload)?;
        let sections = parse_section_headers(&mut payload, file_header.number_of_sections)?;

        let symbol_table = span.content_start() + u64::from(file_header.pointer_to_symbol_table);
        if symbol_table < payload.position() || symbol_table > span.content_end() {
            return Err(FormatError::SymbolTableOutOfBounds {
                offset: span.start,
                pointer: file_header.pointer_to_symbol_table,
            }
            .into());
        }
        payload.seek(symbol_table)?;
        let (symbols, string_table) =
            parse_symbol_table(&mut payload, file_header.number_of_symbols)?;

        cursor.seek(payload.position())?;
        expect_member_end(cursor, &span)?;
        Ok(ImportLongMember {
            header,
            file_header,
            sections,
            symbols,
            string_table,
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

    pub fn symbols(&self) -> &[CoffSymbol] {
        &self.symbols
    }

    pub fn string_table(&self) -> &StringTable {
        &self.string_table
    }

    /// Names of the import descriptor and thunk terminator symbols.
    pub fn descriptor_symbols(&self) -> impl Iterator<Item = &str> + '_ {
        self.symbols
            .iter()
            .map(|symbol| symbol.name.as_str())
            .filter(|name| is_import_descriptor(name.as_bytes()))
    }
}

/// Returns true if a COFF member's sections mark it as import descriptor data.
pub(crate) fn is_long_import(sections: &[SectionHeader]) -> bool {
    !sections.is_empty()
        && sections
            .iter()
            .all(|section| section.name == IDATA_SECTION_NAME)
}
