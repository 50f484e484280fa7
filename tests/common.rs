#![allow(dead_code)]

use std::io::Write;

use object::write::{self, Object};
use object::{
    Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};

pub const IMAGE_FILE_MACHINE_I386: u16 = 0x14C;
pub const IMAGE_FILE_MACHINE_AMD64: u16 = 0x8664;
pub const IMAGE_FILE_MACHINE_ARM64EC: u16 = 0xA641;

/// Formats a member header with zeroed metadata.
pub fn member_header(name_field: &str, size: usize) -> Vec<u8> {
    member_header_with(name_field, 0, 0, 0, 0o644, size)
}

pub fn member_header_with(
    name_field: &str,
    mtime: u64,
    uid: u32,
    gid: u32,
    perms: u32,
    size: usize,
) -> Vec<u8> {
    let mut header = Vec::new();
    write!(header, "{:<16}", name_field).unwrap();
    write!(
        header,
        "{:<12}{:<6}{:<6}{:<8o}{:<10}`\n",
        mtime, uid, gid, perms, size
    )
    .unwrap();
    assert_eq!(header.len(), 60);
    header
}

/// Appends members to an archive, padding odd-sized payloads with `\n`.
pub struct ArchiveBuilder {
    data: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        ArchiveBuilder {
            data: b"!<arch>\n".to_vec(),
        }
    }

    /// Starts with empty first and second linker members.
    pub fn with_empty_linkers() -> Self {
        let mut builder = ArchiveBuilder::new();
        builder.member("/", &first_linker_payload(&[]));
        builder.member("/", &second_linker_payload(&[], &[]));
        builder
    }

    /// Adds a member and returns the offset of its header.
    pub fn member(&mut self, name_field: &str, payload: &[u8]) -> u64 {
        let start = self.position();
        self.data
            .extend_from_slice(&member_header(name_field, payload.len()));
        self.data.extend_from_slice(payload);
        if payload.len() % 2 != 0 {
            self.data.push(b'\n');
        }
        start
    }

    /// Adds raw bytes without any framing.
    pub fn raw(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn position(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

pub fn first_linker_payload(entries: &[(u32, &str)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (offset, _) in entries {
        payload.extend_from_slice(&offset.to_be_bytes());
    }
    for (_, name) in entries {
        payload.extend_from_slice(name.as_bytes());
        payload.push(0);
    }
    payload
}

pub fn second_linker_payload(member_offsets: &[u32], symbols: &[(&str, u16)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(member_offsets.len() as u32).to_le_bytes());
    for offset in member_offsets {
        payload.extend_from_slice(&offset.to_le_bytes());
    }
    payload.extend_from_slice(&(symbols.len() as u32).to_le_bytes());
    for (_, index) in symbols {
        payload.extend_from_slice(&index.to_le_bytes());
    }
    for (name, _) in symbols {
        payload.extend_from_slice(name.as_bytes());
        payload.push(0);
    }
    payload
}

/// Builds a NUL-separated catalog and returns it with each name's offset.
pub fn catalog_payload(names: &[&str]) -> (Vec<u8>, Vec<u64>) {
    let mut payload = Vec::new();
    let mut offsets = Vec::new();
    for name in names {
        offsets.push(payload.len() as u64);
        payload.extend_from_slice(name.as_bytes());
        payload.push(0);
    }
    (payload, offsets)
}

pub fn short_import_payload(
    machine: u16,
    size_of_data: Option<u32>,
    type_info: u16,
    strings: &[&str],
) -> Vec<u8> {
    let mut strings_data = Vec::new();
    for string in strings {
        strings_data.extend_from_slice(string.as_bytes());
        strings_data.push(0);
    }
    let size_of_data = size_of_data.unwrap_or(strings_data.len() as u32);

    let mut payload = Vec::new();
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&0xFFFFu16.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes()); // version
    payload.extend_from_slice(&machine.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes()); // timestamp
    payload.extend_from_slice(&size_of_data.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes()); // ordinal/hint
    payload.extend_from_slice(&type_info.to_le_bytes());
    payload.extend_from_slice(&strings_data);
    payload
}

/// Builds a long import member by hand: one `.idata$3` section and one
/// symbol whose name lives in the string table at offset 4.
pub fn long_import_payload(machine: u16, symbol_name: &str, string_table_length: Option<u32>) -> Vec<u8> {
    let mut payload = Vec::new();
    // File header: one section, symbol table right after the section header.
    payload.extend_from_slice(&machine.to_le_bytes());
    payload.extend_from_slice(&1u16.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes());
    payload.extend_from_slice(&60u32.to_le_bytes());
    payload.extend_from_slice(&1u32.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    // Section header.
    payload.extend_from_slice(b".idata$3");
    payload.extend_from_slice(&[0; 32]);
    // Symbol.
    payload.extend_from_slice(&[0, 0, 0, 0]);
    payload.extend_from_slice(&4u32.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes()); // value
    payload.extend_from_slice(&1u16.to_be_bytes()); // section number
    payload.extend_from_slice(&0u16.to_be_bytes()); // type
    payload.push(2); // external
    payload.push(0);
    // String table.
    let length = string_table_length.unwrap_or(4 + symbol_name.len() as u32 + 1);
    payload.extend_from_slice(&length.to_le_bytes());
    if length > 4 {
        payload.extend_from_slice(symbol_name.as_bytes());
        payload.push(0);
    }
    payload
}

pub fn add_file_with_functions_to_object(
    object: &mut Object<'_>,
    file_name: &[u8],
    func_names: &[&[u8]],
) {
    object.add_file_symbol(file_name.to_vec());

    let text = object.section_id(write::StandardSection::Text);
    object.append_section_data(text, &[1; 30], 4);

    for func_name in func_names {
        let offset = object.append_section_data(text, &[1; 30], 4);

        object.add_symbol(write::Symbol {
            name: func_name.to_vec(),
            value: offset,
            size: 32,
            kind: SymbolKind::Text,
            scope: SymbolScope::Linkage,
            weak: false,
            section: write::SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }
}

/// Writes a COFF object file defining the given functions.
pub fn coff_object(architecture: Architecture, func_names: &[&[u8]]) -> Vec<u8> {
    let mut object = Object::new(BinaryFormat::Coff, architecture, Endianness::Little);
    add_file_with_functions_to_object(&mut object, b"file.c", func_names);
    object.write().unwrap()
}

/// Writes the import descriptor object an import library carries for `dll`.
pub fn import_descriptor_object(dll: &str) -> Vec<u8> {
    let mut object = Object::new(BinaryFormat::Coff, Architecture::X86_64, Endianness::Little);
    let idata2 = object.add_section(Vec::new(), b".idata$2".to_vec(), SectionKind::Data);
    object.append_section_data(idata2, &[0; 20], 4);
    let idata6 = object.add_section(Vec::new(), b".idata$6".to_vec(), SectionKind::Data);
    let mut dll_name = dll.as_bytes().to_vec();
    dll_name.push(0);
    object.append_section_data(idata6, &dll_name, 2);

    let stem = dll.rsplit_once('.').map_or(dll, |(stem, _)| stem);
    object.add_symbol(write::Symbol {
        name: format!("__IMPORT_DESCRIPTOR_{stem}").into_bytes(),
        value: 0,
        size: 0,
        kind: SymbolKind::Data,
        scope: SymbolScope::Linkage,
        weak: false,
        section: write::SymbolSection::Section(idata2),
        flags: SymbolFlags::None,
    });
    object.write().unwrap()
}
