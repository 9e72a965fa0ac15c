//! # streamzip
//!
//! A low-memory streaming ZIP reader.
//!
//! The reader locates the end of central directory record, walks the central
//! directory one entry at a time through a callback, validates local headers
//! and inflates payloads into caller-owned memory. All working state lives in
//! one bounded scratch buffer (64 KiB by default), so peak memory does not grow
//! with the archive or its file names.
//!
//! ## Features
//!
//! - Read ZIP files from the local filesystem, from memory, or from HTTP/HTTPS
//!   URLs using Range requests
//! - Callback-driven central directory walk with early stop
//! - Support for STORED (uncompressed) and DEFLATE compression methods
//! - CRC-32 verification of every extracted entry
//! - Rejection of multi-volume archives, encrypted entries and data descriptors
//!
//! ## Example
//!
//! ```no_run
//! use std::io::Cursor;
//! use streamzip::{Scratch, Visit, extract_entry, locate_end_record, walk_central_directory};
//!
//! fn main() -> Result<(), streamzip::ZipError> {
//!     let mut source = Cursor::new(std::fs::read("archive.zip")?);
//!     let mut scratch = Scratch::new();
//!     let mut staging = Scratch::new();
//!
//!     let end = locate_end_record(&mut source, &mut scratch)?;
//!     walk_central_directory(&mut source, &mut scratch, &end, |source, _, header, name| {
//!         let mut data = vec![0u8; header.uncompressed_size as usize];
//!         extract_entry(source, &mut staging, header, &mut data)?;
//!         println!("{name}: {} bytes", data.len());
//!         Ok::<_, streamzip::ZipError>(Visit::Continue)
//!     })?;
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use io::{ByteSource, HttpRangeReader, LocalFileReader};
pub use zip::{
    EndRecord, ErrorKind, FileHeader, Scratch, Visit, ZipError, ZipExtractor, ZipFileEntry,
    ZipResult, extract_entry, locate_end_record, read_entry_data, read_local_header,
    walk_central_directory,
};
