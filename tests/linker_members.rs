use ar_archive_reader::{ArchiveIndex, FormatError, HEADER_SIZE};
use pretty_assertions::assert_eq;

mod common;

use common::{first_linker_payload, second_linker_payload, ArchiveBuilder};

#[test]
fn first_linker_member_offsets_and_names() {
    let mut builder = ArchiveBuilder::new();
    let payload = first_linker_payload(&[(60, "a.obj"), (200, "b.obj")]);
    assert_eq!(payload.len(), 24);
    builder.member("/", &payload);
    builder.member("/", &second_linker_payload(&[], &[]));
    let data = builder.finish();

    let index = ArchiveIndex::parse(&data).unwrap();
    let first = index.first_linker();
    assert_eq!(first.offsets(), [60, 200]);
    assert_eq!(first.names(), ["a.obj", "b.obj"]);
    assert_eq!(
        first.entries().collect::<Vec<_>>(),
        [(60, "a.obj"), (200, "b.obj")]
    );
    assert_eq!(first.header().identifier, "/");
    assert_eq!(first.header().file_size, 24);
    assert!(first.header().is_linker_member());
}

#[test]
fn second_linker_member_maps_symbols_to_members() {
    let mut builder = ArchiveBuilder::new();
    builder.member("/", &first_linker_payload(&[]));
    builder.member(
        "/",
        &second_linker_payload(&[100, 300], &[("alpha", 1), ("beta", 2), ("gamma", 1)]),
    );
    let data = builder.finish();

    let index = ArchiveIndex::parse(&data).unwrap();
    let second = index.second_linker();
    assert_eq!(second.member_offsets(), [100, 300]);
    assert_eq!(second.indices(), [1, 2, 1]);
    assert_eq!(second.names(), ["alpha", "beta", "gamma"]);
    assert_eq!(
        second.symbols().collect::<Vec<_>>(),
        [("alpha", 1), ("beta", 2), ("gamma", 1)]
    );
    assert_eq!(second.member_offset(1), Some(100));
    assert_eq!(second.member_offset(2), Some(300));
    assert_eq!(second.member_offset(0), None);
    assert_eq!(second.member_offset(3), None);
}

#[test]
fn unsorted_second_linker_names_are_kept() {
    let mut builder = ArchiveBuilder::new();
    builder.member("/", &first_linker_payload(&[]));
    builder.member(
        "/",
        &second_linker_payload(&[100], &[("zeta", 1), ("alpha", 1)]),
    );
    let data = builder.finish();

    let index = ArchiveIndex::parse(&data).unwrap();
    assert_eq!(index.second_linker().names(), ["zeta", "alpha"]);
}

#[test]
fn odd_sized_linker_member_is_padded() {
    let mut builder = ArchiveBuilder::new();
    // 4 + 4 + 3 = 11 bytes.
    let payload = first_linker_payload(&[(8, "ab")]);
    assert_eq!(payload.len(), 11);
    builder.member("/", &payload);
    let second_start = builder.member("/", &second_linker_payload(&[8], &[("ab", 1)]));
    let data = builder.finish();

    let index = ArchiveIndex::parse(&data).unwrap();
    assert_eq!(
        index.first_linker().header().expected_next_offset(),
        second_start
    );
    assert_eq!(second_start, 8 + HEADER_SIZE + 12);
    assert_eq!(index.second_linker().header().start_offset, second_start);
}

#[test]
fn truncated_offset_table() {
    let mut payload = Vec::new();
    payload.extend_from_slice(&3u32.to_be_bytes());
    payload.extend_from_slice(&60u32.to_be_bytes());

    let mut builder = ArchiveBuilder::new();
    builder.member("/", &payload);
    builder.member("/", &second_linker_payload(&[], &[]));
    let data = builder.finish();

    let err = ArchiveIndex::parse(&data).unwrap_err();
    assert!(err.is_format());
    assert!(matches!(
        err.as_format(),
        Some(FormatError::UnexpectedEndOfData { .. })
    ));
}

#[test]
fn name_table_without_terminator() {
    let mut payload = second_linker_payload(&[100], &[("alpha", 1)]);
    // Drop the NUL after the last name.
    payload.pop();

    let mut builder = ArchiveBuilder::new();
    builder.member("/", &first_linker_payload(&[]));
    builder.member("/", &payload);
    let data = builder.finish();

    let err = ArchiveIndex::parse(&data).unwrap_err();
    assert!(matches!(
        err.as_format(),
        Some(FormatError::MissingNulTerminator { .. })
    ));
}

#[test]
fn archive_without_linker_members() {
    let mut builder = ArchiveBuilder::new();
    let start = builder.member("a.obj/", b"\0\0");
    let data = builder.finish();

    let err = ArchiveIndex::parse(&data).unwrap_err();
    assert_eq!(
        err.as_format(),
        Some(&FormatError::UnexpectedMember {
            offset: start,
            identifier: "a.obj".to_string(),
        })
    );
}
