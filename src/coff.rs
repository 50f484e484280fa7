// Derived from code in LLVM, which is:
// Part of the LLVM Project, under the Apache License v2.0 with LLVM Exceptions.
// See https://llvm.org/LICENSE.txt for license information.
// SPDX-License-Identifier: Apache-2.0 WITH LLVM-exception

use object::{pe, LittleEndian as LE};

use crate::cursor::{name_from_bytes, ByteCursor};
use crate::error::{to_usize, FormatError, Result};

pub(crate) const SYMBOL_SIZE: u64 = 18;
const STRING_TABLE_LENGTH_SIZE: u32 = 4;

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[repr(u16)]
#[allow(clippy::upper_case_acronyms)]
pub enum MachineTypes {
    AMD64 = 0x8664,
    ARMNT = 0x1C4,
    ARM64 = 0xAA64,
    ARM64EC = 0xA641,
    ARM64X = 0xA64E,
    I386 = 0x14C,
}

impl From<MachineTypes> for u16 {
    fn from(val: MachineTypes) -> Self {
        val as u16
    }
}

impl TryFrom<u16> for MachineTypes {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, u16> {
        Ok(match value {
            0x8664 => MachineTypes::AMD64,
            0x1C4 => MachineTypes::ARMNT,
            0xAA64 => MachineTypes::ARM64,
            0xA641 => MachineTypes::ARM64EC,
            0xA64E => MachineTypes::ARM64X,
            0x14C => MachineTypes::I386,
            _ => return Err(value),
        })
    }
}

pub fn is_arm64ec(machine: MachineTypes) -> bool {
    machine == MachineTypes::ARM64EC || machine == MachineTypes::ARM64X
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[repr(u16)]
pub enum ImportType {
    /// An executable code symbol.
    Code = 0,
    /// A data symbol.
    Data = 1,
    /// A constant value.
    Const = 2,
}

impl TryFrom<u16> for ImportType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, u16> {
        Ok(match value {
            0 => ImportType::Code,
            1 => ImportType::Data,
            2 => ImportType::Const,
            _ => return Err(value),
        })
    }
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[repr(u16)]
pub enum ImportNameType {
    /// Import is by ordinal. This indicates that the value in the Ordinal/Hint
    /// field of the import header is the import's ordinal. If this constant is
    /// not specified, then the Ordinal/Hint field should always be interpreted
    /// as the import's hint.
    Ordinal = 0,
    /// The import name is identical to the public symbol name
    Name = 1,
    /// The import name is the public symbol name, but skipping the leading ?,
    /// @, or optionally _.
    NameNoprefix = 2,
    /// The import name is the public symbol name, but skipping the leading ?,
    /// @, or optionally _, and truncating at the first @.
    NameUndecorate = 3,
    /// The import name is specified as a separate string in the import library
    /// object file.
    NameExportas = 4,
}

impl TryFrom<u16> for ImportNameType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, u16> {
        Ok(match value {
            0 => ImportNameType::Ordinal,
            1 => ImportNameType::Name,
            2 => ImportNameType::NameNoprefix,
            3 => ImportNameType::NameUndecorate,
            4 => ImportNameType::NameExportas,
            _ => return Err(value),
        })
    }
}

/// The COFF file header shared by object files and long import members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoffFileHeader {
    pub machine: u16,
    pub number_of_sections: u16,
    pub time_date_stamp: u32,
    /// Offset of the symbol table from the start of the COFF data.
    pub pointer_to_symbol_table: u32,
    pub number_of_symbols: u32,
    pub size_of_optional_header: u16,
    pub characteristics: u16,
}

impl CoffFileHeader {
    /// Reads the header. Archive members never carry an optional header, so a
    /// nonzero size is rejected.
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let offset = cursor.position();
        let raw: &pe::ImageFileHeader = cursor.read_pod()?;
        let header = CoffFileHeader {
            machine: raw.machine.get(LE),
            number_of_sections: raw.number_of_sections.get(LE),
            time_date_stamp: raw.time_date_stamp.get(LE),
            pointer_to_symbol_table: raw.pointer_to_symbol_table.get(LE),
            number_of_symbols: raw.number_of_symbols.get(LE),
            size_of_optional_header: raw.size_of_optional_header.get(LE),
            characteristics: raw.characteristics.get(LE),
        };
        if header.size_of_optional_header != 0 {
            return Err(FormatError::UnsupportedOptionalHeader {
                offset,
                size: header.size_of_optional_header,
            }
            .into());
        }
        Ok(header)
    }

    pub fn machine_type(&self) -> Option<MachineTypes> {
        MachineTypes::try_from(self.machine).ok()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionHeader {
    /// Name up to the first `$`, e.g. `.idata` for `.idata$2`.
    pub name: String,
    /// Grouping suffix after the `$`, if any.
    pub suffix: Option<String>,
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub pointer_to_relocations: u32,
    pub pointer_to_linenumbers: u32,
    pub number_of_relocations: u16,
    pub number_of_linenumbers: u16,
    pub characteristics: u32,
}

impl SectionHeader {
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let offset = cursor.position();
        let raw: &pe::ImageSectionHeader = cursor.read_pod()?;
        let name = name_from_bytes(until_nul(&raw.name), offset)?;
        let (name, suffix) = match name.split_once('$') {
            Some((name, suffix)) => (name.to_string(), Some(suffix.to_string())),
            None => (name, None),
        };
        Ok(SectionHeader {
            name,
            suffix,
            virtual_size: raw.virtual_size.get(LE),
            virtual_address: raw.virtual_address.get(LE),
            size_of_raw_data: raw.size_of_raw_data.get(LE),
            pointer_to_raw_data: raw.pointer_to_raw_data.get(LE),
            pointer_to_relocations: raw.pointer_to_relocations.get(LE),
            pointer_to_linenumbers: raw.pointer_to_linenumbers.get(LE),
            number_of_relocations: raw.number_of_relocations.get(LE),
            number_of_linenumbers: raw.number_of_linenumbers.get(LE),
            characteristics: raw.characteristics.get(LE),
        })
    }

    /// The name as stored, with the `$` suffix.
    pub fn full_name(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}${}", self.name, suffix),
            None => self.name.clone(),
        }
    }
}

pub(crate) fn parse_section_headers(
    cursor: &mut ByteCursor<'_>,
    count: u16,
) -> Result<Vec<SectionHeader>> {
    (0..count).map(|_| SectionHeader::parse(cursor)).collect()
}

/// A symbol table record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoffSymbol {
    /// The resolved name, from the inline field or the string table.
    pub name: String,
    pub value: u32,
    pub section_number: u16,
    pub symbol_type: u16,
    pub storage_class: u8,
    /// Auxiliary records following the symbol, kept undecoded.
    pub aux: Vec<[u8; SYMBOL_SIZE as usize]>,
}

/// Reads `count` symbol table slots, including auxiliary records, and
/// resolves long names through the string table that follows them.
pub(crate) fn parse_symbol_table(
    cursor: &mut ByteCursor<'_>,
    count: u32,
) -> Result<(Vec<CoffSymbol>, StringTable)> {
    struct RawSymbol {
        offset: u64,
        name: [u8; 8],
        symbol: CoffSymbol,
    }

    let mut raw_symbols = Vec::new();
    let mut slots = 0;
    while slots < count {
        let offset = cursor.position();
        let name = cursor.read_array::<8>()?;
        let value = cursor.read_u32_le()?;
        let section_number = cursor.read_u16_be()?;
        let symbol_type = cursor.read_u16_be()?;
        let storage_class = cursor.read_u8()?;
        let aux_count = cursor.read_u8()?;
        let next_slots = slots
            .checked_add(1 + u32::from(aux_count))
            .filter(|&next| next <= count)
            .ok_or(FormatError::AuxiliaryRecordsOutOfBounds { offset })?;
        let aux = (0..aux_count)
            .map(|_| cursor.read_array::<{ SYMBOL_SIZE as usize }>())
            .collect::<Result<Vec<_>>>()?;
        slots = next_slots;
        raw_symbols.push(RawSymbol {
            offset,
            name,
            symbol: CoffSymbol {
                name: String::new(),
                value,
                section_number,
                symbol_type,
                storage_class,
                aux,
            },
        });
    }

    let strings = StringTable::parse(cursor)?;
    let symbols = raw_symbols
        .into_iter()
        .map(|raw| -> Result<CoffSymbol> {
            let mut symbol = raw.symbol;
            symbol.name = match raw.name {
                [0, 0, 0, 0, a, b, c, d] => {
                    let string_offset = u32::from_le_bytes([a, b, c, d]);
                    strings
                        .get(string_offset)
                        .ok_or(FormatError::UnresolvedOffset {
                            name_offset: u64::from(string_offset),
                        })?
                        .to_string()
                }
                short => name_from_bytes(until_nul(&short), raw.offset)?,
            };
            Ok(symbol)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((symbols, strings))
}

/// The COFF string table. Offsets count from the start of the length field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringTable {
    length: u32,
    /// The bytes following the length field.
    data: Vec<u8>,
    strings: Vec<(u32, String)>,
}

impl StringTable {
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let offset = cursor.position();
        let length = cursor.read_u32_le()?;
        if length <= STRING_TABLE_LENGTH_SIZE {
            return Err(FormatError::InvalidStringTableLength { offset, length }.into());
        }
        let data_start = cursor.position();
        let data = cursor.read_bytes(u64::from(length - STRING_TABLE_LENGTH_SIZE))?;

        let mut strings_cursor = ByteCursor::new(data);
        let mut strings = Vec::new();
        while !strings_cursor.is_at_end() {
            let string_offset = strings_cursor.position();
            let bytes = strings_cursor.read_cstr().map_err(|_| {
                FormatError::MissingNulTerminator {
                    offset: data_start + string_offset,
                }
            })?;
            if bytes.is_empty() {
                continue;
            }
            let string = name_from_bytes(bytes, data_start + string_offset)?;
            // `string_offset` is below `length`, so it fits.
            let table_offset = STRING_TABLE_LENGTH_SIZE + string_offset as u32;
            strings.push((table_offset, string));
        }

        Ok(StringTable {
            length,
            data: data.to_vec(),
            strings,
        })
    }

    /// Length of the table, including the length field itself.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Returns the string starting at `offset`, which may point into the
    /// middle of a stored string.
    pub fn get(&self, offset: u32) -> Option<&str> {
        let start = to_usize(u64::from(offset.checked_sub(STRING_TABLE_LENGTH_SIZE)?)).ok()?;
        let rest = self.data.get(start..)?;
        let len = memchr::memchr(0, rest)?;
        std::str::from_utf8(&rest[..len]).ok()
    }

    /// Strings in stored order, with their table offsets.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.strings.iter().map(|(offset, s)| (*offset, s.as_str()))
    }
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    let len = memchr::memchr(0, bytes).unwrap_or(bytes.len());
    &bytes[..len]
}
