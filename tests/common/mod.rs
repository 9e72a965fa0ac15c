//! In-memory ZIP archive builder for tests.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

pub const STORE: u16 = 0;
pub const DEFLATE: u16 = 8;

pub struct TestEntry {
    pub name: Vec<u8>,
    pub method: u16,
    pub data: Vec<u8>,
    pub flags: u16,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
}

impl TestEntry {
    pub fn stored(name: &str, data: &[u8]) -> Self {
        Self::new(name.as_bytes(), STORE, data)
    }

    pub fn deflated(name: &str, data: &[u8]) -> Self {
        Self::new(name.as_bytes(), DEFLATE, data)
    }

    pub fn new(name: &[u8], method: u16, data: &[u8]) -> Self {
        Self {
            name: name.to_vec(),
            method,
            data: data.to_vec(),
            flags: 0,
            extra: Vec::new(),
            comment: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_extra(mut self, extra: &[u8]) -> Self {
        self.extra = extra.to_vec();
        self
    }

    pub fn with_comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    fn payload(&self) -> Vec<u8> {
        match self.method {
            DEFLATE => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&self.data).unwrap();
                encoder.finish().unwrap()
            }
            _ => self.data.clone(),
        }
    }
}

#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<TestEntry>,
    comment: Vec<u8>,
    disk_number: u16,
    entries_this_disk: Option<u16>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: TestEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn disk_number(mut self, disk: u16) -> Self {
        self.disk_number = disk;
        self
    }

    pub fn entries_this_disk(mut self, count: u16) -> Self {
        self.entries_this_disk = Some(count);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let offset = out.len() as u32;
            let payload = entry.payload();
            let crc = crc32fast::hash(&entry.data);

            put_u32(&mut out, 0x04034B50);
            put_u16(&mut out, 20);
            put_u16(&mut out, entry.flags);
            put_u16(&mut out, entry.method);
            put_u16(&mut out, 0x6000); // 12:00:00
            put_u16(&mut out, 0x5821); // 2024-01-01
            put_u32(&mut out, crc);
            put_u32(&mut out, payload.len() as u32);
            put_u32(&mut out, entry.data.len() as u32);
            put_u16(&mut out, entry.name.len() as u16);
            put_u16(&mut out, entry.extra.len() as u16);
            out.extend_from_slice(&entry.name);
            out.extend_from_slice(&entry.extra);
            out.extend_from_slice(&payload);

            put_u32(&mut central, 0x02014B50);
            put_u16(&mut central, 0x031E);
            put_u16(&mut central, 20);
            put_u16(&mut central, entry.flags);
            put_u16(&mut central, entry.method);
            put_u16(&mut central, 0x6000);
            put_u16(&mut central, 0x5821);
            put_u32(&mut central, crc);
            put_u32(&mut central, payload.len() as u32);
            put_u32(&mut central, entry.data.len() as u32);
            put_u16(&mut central, entry.name.len() as u16);
            put_u16(&mut central, entry.extra.len() as u16);
            put_u16(&mut central, entry.comment.len() as u16);
            put_u16(&mut central, 0);
            put_u16(&mut central, 0);
            put_u32(&mut central, 0o100644 << 16);
            put_u32(&mut central, offset);
            central.extend_from_slice(&entry.name);
            central.extend_from_slice(&entry.extra);
            central.extend_from_slice(&entry.comment);
        }

        let cd_offset = out.len() as u32;
        let count = self.entries.len() as u16;
        out.extend_from_slice(&central);

        put_u32(&mut out, 0x06054B50);
        put_u16(&mut out, self.disk_number);
        put_u16(&mut out, 0);
        put_u16(&mut out, self.entries_this_disk.unwrap_or(count));
        put_u16(&mut out, count);
        put_u32(&mut out, central.len() as u32);
        put_u32(&mut out, cd_offset);
        put_u16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);
        out
    }
}

/// The two-entry archive: `a.txt` stored "hello", `b.txt` deflated "world world world".
pub fn hello_world() -> Vec<u8> {
    ArchiveBuilder::new()
        .entry(TestEntry::stored("a.txt", b"hello"))
        .entry(TestEntry::deflated("b.txt", b"world world world"))
        .build()
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}
