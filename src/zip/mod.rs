//! ZIP archive parsing and extraction.
//!
//! This module reads single-volume ZIP archives with a single bounded scratch
//! buffer, never loading the archive or a compressed entry as a whole.
//!
//! ## Architecture
//!
//! - [`structures`]: on-disk records (end record, central and local headers) and
//!   the unified [`FileHeader`] built from either
//! - [`parser`]: end record discovery, central directory walking and local
//!   header validation
//! - [`data`]: stored and deflated payload reading
//! - [`extractor`]: [`ZipExtractor`], a reader instance owning a source and its
//!   scratch buffer, plus convenience extraction
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory record at the end
//!
//! The end record is found first by scanning the file's tail backwards, the
//! central directory is then walked entry by entry, and payloads are read by
//! seeking to each entry's local header.
//!
//! ## Limitations
//!
//! - No encryption, data descriptors or other flagged entries
//! - No multi-disk archive support
//! - No ZIP64
//! - STORED and DEFLATE only

mod data;
mod error;
mod extractor;
mod parser;
mod scratch;
mod structures;

pub use data::read_entry_data;
pub use error::{ErrorKind, ZipError, ZipResult};
pub use extractor::{ZipExtractor, extract_entry};
pub use parser::{Visit, locate_end_record, read_local_header, walk_central_directory};
pub use scratch::{SCRATCH_SIZE, Scratch};
pub use structures::*;
