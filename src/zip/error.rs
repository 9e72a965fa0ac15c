//! Error types for archive reading.

use thiserror::Error;

/// Broad classification of a [`ZipError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The byte source failed to seek or read.
    Io,
    /// The archive does not follow the expected on-disk layout.
    Format,
    /// The archive is valid but uses a feature this reader does not handle.
    Unsupported,
    /// The compressed payload could not be inflated.
    Decompression,
}

/// The error type for every archive operation in this crate.
#[derive(Debug, Error)]
pub enum ZipError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source ran dry while compressed input was still expected.
    #[error("unexpected end of stream with {remaining} compressed bytes left")]
    UnexpectedEof { remaining: u64 },

    #[error("file too small to be a zip archive ({size} bytes)")]
    TooSmall { size: u64 },

    #[error("end of central directory signature not found")]
    EndRecordNotFound,

    /// Split or spanned archives are rejected outright.
    #[error(
        "multi-volume archives are not supported (disk {disk_number}, central directory disk \
         {central_directory_disk}, {entries_this_disk} of {entries} entries on this disk)"
    )]
    MultiVolume {
        disk_number: u16,
        central_directory_disk: u16,
        entries_this_disk: u16,
        entries: u16,
    },

    #[error("invalid central directory header signature {found:#010x}")]
    CentralSignature { found: u32 },

    #[error("invalid local file header signature {found:#010x}")]
    LocalSignature { found: u32 },

    #[error("file name of {len} bytes does not fit in a {capacity} byte buffer")]
    NameTooLong { len: usize, capacity: usize },

    /// Encryption, data descriptors and other flagged variants.
    #[error("unsupported general purpose flags {0:#06x}")]
    UnsupportedFlags(u16),

    #[error("stored entry has compressed size {compressed} but uncompressed size {uncompressed}")]
    StoredSizeMismatch { compressed: u32, uncompressed: u32 },

    /// The local header at `offset` disagrees with its central directory entry.
    #[error("local header at offset {offset} does not match the central directory")]
    HeaderMismatch { offset: u32 },

    #[error("unsupported compression method {0}")]
    UnsupportedMethod(u16),

    #[error("output buffer of {capacity} bytes cannot hold {needed} bytes")]
    OutputTooSmall { needed: usize, capacity: usize },

    #[error("entry inflated to {actual} bytes, header declares {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("CRC-32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("corrupt deflate stream: {0}")]
    Corrupt(String),

    #[error("deflate stream requests a preset dictionary")]
    NeedDictionary,

    /// The inflate engine made no progress with input and output available.
    #[error("inflate engine stalled")]
    InflateStalled,

    /// A failure while walking the central directory, tagged with the entry index.
    #[error("central directory entry {index}: {source}")]
    Entry {
        index: usize,
        #[source]
        source: Box<ZipError>,
    },
}

impl ZipError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ZipError::Io(_) | ZipError::UnexpectedEof { .. } => ErrorKind::Io,
            ZipError::TooSmall { .. }
            | ZipError::EndRecordNotFound
            | ZipError::MultiVolume { .. }
            | ZipError::CentralSignature { .. }
            | ZipError::LocalSignature { .. }
            | ZipError::NameTooLong { .. }
            | ZipError::UnsupportedFlags(_)
            | ZipError::StoredSizeMismatch { .. }
            | ZipError::HeaderMismatch { .. }
            | ZipError::OutputTooSmall { .. }
            | ZipError::SizeMismatch { .. }
            | ZipError::CrcMismatch { .. } => ErrorKind::Format,
            ZipError::UnsupportedMethod(_) => ErrorKind::Unsupported,
            ZipError::Corrupt(_) | ZipError::NeedDictionary | ZipError::InflateStalled => {
                ErrorKind::Decompression
            }
            ZipError::Entry { source, .. } => source.kind(),
        }
    }

    pub(crate) fn at_entry(self, index: usize) -> Self {
        ZipError::Entry {
            index,
            source: Box::new(self),
        }
    }
}

/// A convenience `Result` alias using [`ZipError`].
pub type ZipResult<T> = std::result::Result<T, ZipError>;
