mod common;

use std::io::{Cursor, SeekFrom};

use common::{ArchiveBuilder, DEFLATE, TestEntry, hello_world};
use streamzip::{
    ByteSource, ErrorKind, FileHeader, Scratch, Visit, ZipError, extract_entry, locate_end_record,
    read_entry_data, read_local_header, walk_central_directory,
};

/// Walk `archive`, collecting each entry's name and header.
fn walk_all(archive: &[u8]) -> Result<Vec<(String, FileHeader)>, ZipError> {
    let mut source = Cursor::new(archive);
    let mut scratch = Scratch::new();
    let end = locate_end_record(&mut source, &mut scratch)?;

    let mut seen = Vec::new();
    walk_central_directory(&mut source, &mut scratch, &end, |_, index, header, name| {
        assert_eq!(index, seen.len());
        seen.push((name.to_owned(), *header));
        Ok::<_, ZipError>(Visit::Continue)
    })?;
    Ok(seen)
}

/// Seek to the entry's local header, validate it, and read its payload.
fn read_entry(archive: &[u8], header: &FileHeader) -> Vec<u8> {
    let mut source = Cursor::new(archive);
    let mut scratch = Scratch::new();
    source.seek(SeekFrom::Start(header.offset as u64)).unwrap();

    let mut name = [0u8; 256];
    let local = read_local_header(&mut source, Some(&mut name[..])).unwrap();
    assert_eq!(local.offset, 0);
    assert_eq!(local.crc32, header.crc32);

    let mut out = vec![0u8; local.uncompressed_size as usize];
    let n = read_entry_data(&mut source, &mut scratch, &local, &mut out).unwrap();
    assert_eq!(n, out.len());
    out
}

#[test]
fn two_entry_archive_walks_in_order_and_round_trips() {
    let archive = hello_world();
    let entries = walk_all(&archive).unwrap();

    let names: Vec<_> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["a.txt", "b.txt"]);

    let (_, a) = &entries[0];
    assert_eq!(a.compression_method, 0);
    assert_eq!(a.uncompressed_size, 5);
    assert_eq!(read_entry(&archive, a), b"hello");

    let (_, b) = &entries[1];
    assert_eq!(b.compression_method, DEFLATE);
    assert!(b.compressed_size < 18);
    let data = read_entry(&archive, b);
    assert_eq!(data, b"world world world");
    assert_eq!(crc32fast::hash(&data), b.crc32);
}

#[test]
fn local_header_returns_name_and_leaves_source_at_data() {
    let archive = hello_world();
    let mut source = Cursor::new(&archive[..]);
    let mut name = [0xAAu8; 16];

    let header = read_local_header(&mut source, Some(&mut name[..])).unwrap();
    assert_eq!(&name[..6], b"a.txt\0");
    assert_eq!(header.file_name_length, 5);
    assert_eq!(source.position(), 30 + 5);
}

#[test]
fn entry_count_matches_visits() {
    let mut builder = ArchiveBuilder::new();
    for i in 0..40 {
        let body = format!("entry {i} ").repeat(i + 1);
        builder = if i % 2 == 0 {
            builder.entry(TestEntry::stored(&format!("dir/{i}.txt"), body.as_bytes()))
        } else {
            builder.entry(TestEntry::deflated(&format!("dir/{i}.txt"), body.as_bytes()))
        };
    }
    let archive = builder.build();

    let mut source = Cursor::new(&archive[..]);
    let mut scratch = Scratch::new();
    let end = locate_end_record(&mut source, &mut scratch).unwrap();
    assert_eq!(end.entries, 40);

    let mut calls = 0;
    let visited = walk_central_directory(&mut source, &mut scratch, &end, |_, _, _, _| {
        calls += 1;
        Ok::<_, ZipError>(Visit::Continue)
    })
    .unwrap();
    assert_eq!(visited, 40);
    assert_eq!(calls, 40);

    for (name, header) in walk_all(&archive).unwrap() {
        let i: usize = name
            .trim_start_matches("dir/")
            .trim_end_matches(".txt")
            .parse()
            .unwrap();
        assert_eq!(read_entry(&archive, &header), format!("entry {i} ").repeat(i + 1).as_bytes());
    }
}

#[test]
fn end_record_lookup_is_idempotent() {
    let archive = ArchiveBuilder::new()
        .entry(TestEntry::stored("x", b"123"))
        .comment(b"archive comment")
        .build();
    let mut source = Cursor::new(&archive[..]);
    let mut scratch = Scratch::new();

    let first = locate_end_record(&mut source, &mut scratch).unwrap();
    let second = locate_end_record(&mut source, &mut scratch).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.comment_length, 15);
}

#[test]
fn rejects_files_too_small_to_be_archives() {
    let mut scratch = Scratch::new();
    for size in [0, 10, 22] {
        let data = vec![0u8; size];
        let err = locate_end_record(&mut Cursor::new(&data[..]), &mut scratch).unwrap_err();
        assert!(matches!(err, ZipError::TooSmall { .. }), "{size}: {err}");
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}

#[test]
fn rejects_missing_end_record() {
    let data = vec![0x11u8; 4096];
    let err = locate_end_record(&mut Cursor::new(&data[..]), &mut Scratch::new()).unwrap_err();
    assert!(matches!(err, ZipError::EndRecordNotFound));
}

#[test]
fn rejects_multi_volume_archives() {
    let entry = || TestEntry::stored("a.txt", b"hello");

    let archive = ArchiveBuilder::new().entry(entry()).disk_number(1).build();
    let err = locate_end_record(&mut Cursor::new(&archive[..]), &mut Scratch::new()).unwrap_err();
    assert!(matches!(err, ZipError::MultiVolume { disk_number: 1, .. }));

    let archive = ArchiveBuilder::new()
        .entry(entry())
        .entry(entry())
        .entries_this_disk(1)
        .build();
    let err = locate_end_record(&mut Cursor::new(&archive[..]), &mut Scratch::new()).unwrap_err();
    assert!(matches!(
        err,
        ZipError::MultiVolume { entries_this_disk: 1, entries: 2, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn comment_containing_a_signature_does_not_confuse_the_scan() {
    let mut fake = Vec::new();
    fake.extend_from_slice(&0x06054B50u32.to_le_bytes());
    fake.extend_from_slice(&[0u8; 18]);
    fake.extend_from_slice(b"--");

    let archive = ArchiveBuilder::new()
        .entry(TestEntry::stored("a.txt", b"hello"))
        .comment(&fake)
        .build();
    let entries = walk_all(&archive).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "a.txt");
}

#[test]
fn long_names_are_rejected_before_their_callback() {
    let long = "n".repeat(64);
    let archive = ArchiveBuilder::new()
        .entry(TestEntry::stored("short", b"1"))
        .entry(TestEntry::stored(&long, b"2"))
        .build();

    let mut source = Cursor::new(&archive[..]);
    let mut scratch = Scratch::with_capacity(64);
    let end = locate_end_record(&mut source, &mut scratch).unwrap();

    let mut names = Vec::new();
    let err = walk_central_directory(&mut source, &mut scratch, &end, |_, _, _, name| {
        names.push(name.to_owned());
        Ok::<_, ZipError>(Visit::Continue)
    })
    .unwrap_err();

    assert_eq!(names, ["short"]);
    match err {
        ZipError::Entry { index, source } => {
            assert_eq!(index, 1);
            assert!(matches!(*source, ZipError::NameTooLong { len: 64, capacity: 64 }));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn early_stop_is_success() {
    let archive = hello_world();
    let mut source = Cursor::new(&archive[..]);
    let mut scratch = Scratch::new();
    let end = locate_end_record(&mut source, &mut scratch).unwrap();

    let mut names = Vec::new();
    let visited = walk_central_directory(&mut source, &mut scratch, &end, |_, _, _, name| {
        names.push(name.to_owned());
        Ok::<_, ZipError>(Visit::Stop)
    })
    .unwrap();
    assert_eq!(visited, 1);
    assert_eq!(names, ["a.txt"]);
}

#[derive(Debug)]
enum WalkError {
    Zip(ZipError),
    Rejected(String),
}

impl From<ZipError> for WalkError {
    fn from(err: ZipError) -> Self {
        WalkError::Zip(err)
    }
}

#[test]
fn callback_errors_abort_the_walk() {
    let archive = hello_world();
    let mut source = Cursor::new(&archive[..]);
    let mut scratch = Scratch::new();
    let end = locate_end_record(&mut source, &mut scratch).unwrap();

    let mut calls = 0;
    let err = walk_central_directory(&mut source, &mut scratch, &end, |_, _, _, name| {
        calls += 1;
        Err(WalkError::Rejected(name.to_owned()))
    })
    .unwrap_err();
    assert_eq!(calls, 1);
    assert!(matches!(err, WalkError::Rejected(name) if name == "a.txt"));

    let mut broken = archive.clone();
    let cd_offset = end.central_directory_offset as usize;
    broken[cd_offset] ^= 0xFF;
    let mut source = Cursor::new(&broken[..]);
    let end = locate_end_record(&mut source, &mut scratch).unwrap();
    let err = walk_central_directory(&mut source, &mut scratch, &end, |_, _, _, _| {
        Ok::<_, WalkError>(Visit::Continue)
    })
    .unwrap_err();
    match err {
        WalkError::Zip(ZipError::Entry { index: 0, source }) => {
            assert!(matches!(*source, ZipError::CentralSignature { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn callbacks_may_extract_while_walking() {
    let archive = ArchiveBuilder::new()
        .entry(TestEntry::stored("one", b"first").with_extra(b"\x99\x99\x02\x00ab"))
        .entry(TestEntry::deflated("two", &b"second ".repeat(100)).with_comment(b"note"))
        .entry(TestEntry::stored("three", b"third"))
        .build();

    let mut source = Cursor::new(&archive[..]);
    let mut names = Scratch::new();
    let mut staging = Scratch::new();
    let end = locate_end_record(&mut source, &mut names).unwrap();

    let mut contents = Vec::new();
    let visited = walk_central_directory(&mut source, &mut names, &end, |source, _, header, name| {
        let mut data = vec![0u8; header.uncompressed_size as usize];
        extract_entry(source, &mut staging, header, &mut data)?;
        contents.push((name.to_owned(), data));
        Ok::<_, ZipError>(Visit::Continue)
    })
    .unwrap();

    assert_eq!(visited, 3);
    assert_eq!(contents[0], ("one".to_owned(), b"first".to_vec()));
    assert_eq!(contents[1], ("two".to_owned(), b"second ".repeat(100)));
    assert_eq!(contents[2], ("three".to_owned(), b"third".to_vec()));
}

#[test]
fn flagged_entries_are_rejected_at_the_local_header() {
    let archive = ArchiveBuilder::new()
        .entry(TestEntry::deflated("secret", b"data").with_flags(0x0001))
        .build();
    let (_, header) = walk_all(&archive).unwrap().remove(0);

    let mut source = Cursor::new(&archive[..]);
    source.seek(SeekFrom::Start(header.offset as u64)).unwrap();
    let err = read_local_header(&mut source, None).unwrap_err();
    assert!(matches!(err, ZipError::UnsupportedFlags(0x0001)));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn unsupported_methods_fail_at_the_data_reader() {
    let archive = ArchiveBuilder::new()
        .entry(TestEntry::new(b"x.bz2", 12, b"BZh9"))
        .build();
    let (_, header) = walk_all(&archive).unwrap().remove(0);

    let mut source = Cursor::new(&archive[..]);
    let mut out = vec![0u8; 4];
    let err = extract_entry(&mut source, &mut Scratch::new(), &header, &mut out).unwrap_err();
    assert!(matches!(err, ZipError::UnsupportedMethod(12)));
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn local_header_disagreeing_with_central_directory_is_rejected() {
    let mut archive = hello_world();
    // CRC-32 of the first local header
    archive[14] ^= 0x01;
    let (_, header) = walk_all(&archive).unwrap().remove(0);

    let mut source = Cursor::new(&archive[..]);
    let mut out = vec![0u8; 5];
    let err = extract_entry(&mut source, &mut Scratch::new(), &header, &mut out).unwrap_err();
    assert!(matches!(err, ZipError::HeaderMismatch { offset: 0 }));
}

#[test]
fn non_utf8_names_are_decoded_lossily() {
    let archive = ArchiveBuilder::new()
        .entry(TestEntry::new(b"caf\xE9.txt", 0, b"x"))
        .build();
    let entries = walk_all(&archive).unwrap();
    assert_eq!(entries[0].0, "caf\u{FFFD}.txt");
}

#[test]
fn byte_source_is_usable_through_a_mutable_reference() {
    let archive = hello_world();
    let mut cursor = Cursor::new(&archive[..]);
    let mut source = &mut cursor;
    let end = locate_end_record(&mut source, &mut Scratch::new()).unwrap();
    assert_eq!(end.entries, 2);
    assert_eq!(ByteSource::size(&mut source).unwrap(), archive.len() as u64);
}

/// Cursor wrapper that counts the seeks issued against it.
struct SeekCounter<'a> {
    inner: Cursor<&'a [u8]>,
    seeks: usize,
}

impl ByteSource for SeekCounter<'_> {
    fn size(&mut self) -> std::io::Result<u64> {
        self.inner.size()
    }

    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.seeks += 1;
        self.inner.seek(pos)
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }

    fn tell(&mut self) -> std::io::Result<u64> {
        self.inner.tell()
    }
}

#[test]
fn walk_only_seeks_back_when_the_callback_moved_the_source() {
    let mut builder = ArchiveBuilder::new();
    for i in 0..25 {
        builder = builder.entry(TestEntry::stored(&format!("f{i}"), b"abc"));
    }
    let archive = builder.build();

    let mut source = SeekCounter {
        inner: Cursor::new(&archive[..]),
        seeks: 0,
    };
    let mut scratch = Scratch::new();
    let end = locate_end_record(&mut source, &mut scratch).unwrap();

    source.seeks = 0;
    let visited = walk_central_directory(&mut source, &mut scratch, &end, |_, _, _, _| {
        Ok::<_, ZipError>(Visit::Continue)
    })
    .unwrap();
    assert_eq!(visited, 25);
    // One seek to the directory start, none between entries.
    assert_eq!(source.seeks, 1);

    source.seeks = 0;
    walk_central_directory(&mut source, &mut scratch, &end, |source, _, header, _| {
        source.seek(SeekFrom::Start(header.offset as u64))?;
        Ok::<_, ZipError>(Visit::Continue)
    })
    .unwrap();
    assert_eq!(source.seeks, 1 + 25 * 2);
}

#[test]
fn undersized_scratch_is_an_error_not_a_panic() {
    let archive = hello_world();
    let mut scratch = Scratch::with_capacity(0);
    assert_eq!(scratch.capacity(), 1);

    let err = locate_end_record(&mut Cursor::new(&archive[..]), &mut scratch).unwrap_err();
    assert!(matches!(err, ZipError::EndRecordNotFound));

    // Inflating through a single staging byte still works.
    let (_, header) = walk_all(&archive).unwrap().remove(1);
    let mut out = vec![0u8; header.uncompressed_size as usize];
    let n = extract_entry(&mut Cursor::new(&archive[..]), &mut scratch, &header, &mut out).unwrap();
    assert_eq!(&out[..n], b"world world world");
}
