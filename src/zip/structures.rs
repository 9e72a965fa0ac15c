use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// End of Central Directory record - 22 bytes plus a trailing comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndRecord {
    pub disk_number: u16,
    pub central_directory_disk: u16,
    pub entries_this_disk: u16,
    pub entries: u16,
    pub central_directory_size: u32,
    pub central_directory_offset: u32,
    pub comment_length: u16,
}

impl EndRecord {
    pub const SIGNATURE: u32 = 0x06054B50;
    pub const SIZE: usize = 22;

    /// Parse the fixed part of the record. `data` must start at the signature.
    pub(crate) fn parse(data: &[u8; Self::SIZE]) -> Self {
        let mut cursor = Cursor::new(&data[4..]);
        Self {
            disk_number: read_u16(&mut cursor),
            central_directory_disk: read_u16(&mut cursor),
            entries_this_disk: read_u16(&mut cursor),
            entries: read_u16(&mut cursor),
            central_directory_size: read_u32(&mut cursor),
            central_directory_offset: read_u32(&mut cursor),
            comment_length: read_u16(&mut cursor),
        }
    }

    /// Whether this record describes a single-volume archive.
    pub fn is_single_volume(&self) -> bool {
        self.disk_number == 0
            && self.central_directory_disk == 0
            && self.entries == self.entries_this_disk
    }
}

/// Central Directory File Header - 46 bytes, followed by name, extra field and comment
#[derive(Debug, Clone, Copy)]
pub struct CentralFileHeader {
    pub signature: u32,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_comment_length: u16,
    pub disk_number_start: u16,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    pub local_header_offset: u32,
}

impl CentralFileHeader {
    pub const SIGNATURE: u32 = 0x02014B50;
    pub const SIZE: usize = 46;

    pub(crate) fn parse(data: &[u8; Self::SIZE]) -> Self {
        let mut cursor = Cursor::new(&data[..]);
        Self {
            signature: read_u32(&mut cursor),
            version_made_by: read_u16(&mut cursor),
            version_needed: read_u16(&mut cursor),
            flags: read_u16(&mut cursor),
            compression_method: read_u16(&mut cursor),
            last_mod_time: read_u16(&mut cursor),
            last_mod_date: read_u16(&mut cursor),
            crc32: read_u32(&mut cursor),
            compressed_size: read_u32(&mut cursor),
            uncompressed_size: read_u32(&mut cursor),
            file_name_length: read_u16(&mut cursor),
            extra_field_length: read_u16(&mut cursor),
            file_comment_length: read_u16(&mut cursor),
            disk_number_start: read_u16(&mut cursor),
            internal_attributes: read_u16(&mut cursor),
            external_attributes: read_u32(&mut cursor),
            local_header_offset: read_u32(&mut cursor),
        }
    }
}

/// Local File Header - 30 bytes, followed by name and extra field
#[derive(Debug, Clone, Copy)]
pub struct LocalFileHeader {
    pub signature: u32,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x04034B50;
    pub const SIZE: usize = 30;

    pub(crate) fn parse(data: &[u8; Self::SIZE]) -> Self {
        let mut cursor = Cursor::new(&data[..]);
        Self {
            signature: read_u32(&mut cursor),
            version_needed: read_u16(&mut cursor),
            flags: read_u16(&mut cursor),
            compression_method: read_u16(&mut cursor),
            last_mod_time: read_u16(&mut cursor),
            last_mod_date: read_u16(&mut cursor),
            crc32: read_u32(&mut cursor),
            compressed_size: read_u32(&mut cursor),
            uncompressed_size: read_u32(&mut cursor),
            file_name_length: read_u16(&mut cursor),
            extra_field_length: read_u16(&mut cursor),
        }
    }
}

/// Entry metadata shared by central and local headers.
///
/// `offset` is the local header position from the start of the archive when
/// the header came from the central directory, and zero when it came from a
/// local header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub offset: u32,
}

impl FileHeader {
    pub fn method(&self) -> CompressionMethod {
        CompressionMethod::from_u16(self.compression_method)
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

impl From<&CentralFileHeader> for FileHeader {
    fn from(h: &CentralFileHeader) -> Self {
        Self {
            compression_method: h.compression_method,
            last_mod_time: h.last_mod_time,
            last_mod_date: h.last_mod_date,
            crc32: h.crc32,
            compressed_size: h.compressed_size,
            uncompressed_size: h.uncompressed_size,
            file_name_length: h.file_name_length,
            extra_field_length: h.extra_field_length,
            offset: h.local_header_offset,
        }
    }
}

impl From<&LocalFileHeader> for FileHeader {
    fn from(h: &LocalFileHeader) -> Self {
        Self {
            compression_method: h.compression_method,
            last_mod_time: h.last_mod_time,
            last_mod_date: h.last_mod_date,
            crc32: h.crc32,
            compressed_size: h.compressed_size,
            uncompressed_size: h.uncompressed_size,
            file_name_length: h.file_name_length,
            extra_field_length: h.extra_field_length,
            offset: 0,
        }
    }
}

/// Owned entry information for callers that keep an index
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub header: FileHeader,
    pub is_directory: bool,
}

impl ZipFileEntry {
    pub fn new(file_name: &str, header: &FileHeader) -> Self {
        Self {
            file_name: file_name.to_owned(),
            header: *header,
            // Directory entries end with '/'
            is_directory: file_name.ends_with('/'),
        }
    }
}

// Fixed-size arrays make these reads infallible.
fn read_u16(cursor: &mut Cursor<&[u8]>) -> u16 {
    cursor.read_u16::<LittleEndian>().unwrap_or_default()
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> u32 {
    cursor.read_u32::<LittleEndian>().unwrap_or_default()
}
