//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ByteSource`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory record at the file's end
//! 2. Walk the Central Directory one entry at a time, handing each to a callback
//! 3. For extraction, read each file's Local File Header, then its data
//!
//! Nothing here allocates per entry: names and the archive tail are staged in
//! the caller's [`Scratch`].

use std::io::SeekFrom;
use tracing::{debug, error, warn};

use crate::io::ByteSource;

use super::error::{ZipError, ZipResult};
use super::scratch::Scratch;
use super::structures::*;

/// What a directory walk callback wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    /// End the walk successfully without visiting the remaining entries.
    Stop,
}

/// Log `err` under `context` and hand it back.
fn report(context: &str, err: impl Into<ZipError>) -> ZipError {
    let err = err.into();
    error!(error = %err, "{context}");
    err
}

/// Find and validate the End of Central Directory record.
///
/// The last `min(size, scratch.capacity())` bytes of the source are read into
/// `scratch` and scanned backwards for the record signature. A candidate whose
/// comment length ends exactly at end of file is preferred; when no candidate
/// satisfies that, the rightmost signature match is used.
///
/// The source position afterwards is unspecified.
///
/// # Errors
///
/// - [`ZipError::TooSmall`] if the source is not larger than the record itself
/// - [`ZipError::EndRecordNotFound`] if the window holds no signature
/// - [`ZipError::MultiVolume`] for split or spanned archives
pub fn locate_end_record<S>(source: &mut S, scratch: &mut Scratch) -> ZipResult<EndRecord>
where
    S: ByteSource + ?Sized,
{
    let size = source
        .size()
        .map_err(|e| report("couldn't determine archive size", e))?;

    if size <= EndRecord::SIZE as u64 {
        return Err(report("too small file to be a zip", ZipError::TooSmall { size }));
    }

    let window_len = size.min(scratch.capacity() as u64) as usize;
    let window = &mut scratch.as_mut_slice()[..window_len];

    source
        .seek(SeekFrom::Start(size - window_len as u64))
        .map_err(|e| report("cannot seek to end of zip file", e))?;
    source
        .read_exact(window)
        .map_err(|e| report("couldn't read end of zip file", e))?;

    let Some(pos) = find_end_record(window) else {
        return Err(report(
            "end record signature not found in zip",
            ZipError::EndRecordNotFound,
        ));
    };

    let mut raw = [0u8; EndRecord::SIZE];
    raw.copy_from_slice(&window[pos..pos + EndRecord::SIZE]);
    let record = EndRecord::parse(&raw);

    if !record.is_single_volume() {
        return Err(report(
            "multifile zips not supported",
            ZipError::MultiVolume {
                disk_number: record.disk_number,
                central_directory_disk: record.central_directory_disk,
                entries_this_disk: record.entries_this_disk,
                entries: record.entries,
            },
        ));
    }

    debug!(
        entries = record.entries,
        cd_offset = record.central_directory_offset,
        cd_size = record.central_directory_size,
        "found end of central directory"
    );
    Ok(record)
}

/// Position of the end record inside `window`, which ends at end of file.
fn find_end_record(window: &[u8]) -> Option<usize> {
    let last = window.len().checked_sub(EndRecord::SIZE)?;
    let signature = EndRecord::SIGNATURE.to_le_bytes();
    let mut loose = None;

    for i in (0..=last).rev() {
        if window[i..i + 4] != signature {
            continue;
        }

        let comment_len = u16::from_le_bytes([window[i + 20], window[i + 21]]) as usize;
        if i + EndRecord::SIZE + comment_len == window.len() {
            return Some(i);
        }
        loose.get_or_insert(i);
    }

    if let Some(i) = loose {
        warn!(
            offset_from_end = window.len() - i,
            "end record comment length does not reach end of file, using last signature match"
        );
    }
    loose
}

/// Walk the central directory, calling `callback` once per entry in on-disk order.
///
/// The callback receives the source, the zero-based entry index, the entry's
/// header (with `offset` pointing at its local header) and its name. It may
/// move the source freely; the walk restores its own position afterwards,
/// and does not seek at all if the callback left it in place.
/// Returning [`Visit::Stop`] ends the walk successfully, returning an error
/// aborts it with that error.
///
/// Returns the number of entries handed to the callback.
///
/// # Errors
///
/// Read failures, bad signatures and names that do not fit in `scratch` abort
/// the walk with [`ZipError::Entry`] naming the failing index. Entries already
/// delivered are not retracted.
pub fn walk_central_directory<S, F, E>(
    source: &mut S,
    scratch: &mut Scratch,
    end: &EndRecord,
    mut callback: F,
) -> Result<usize, E>
where
    S: ByteSource + ?Sized,
    F: FnMut(&mut S, usize, &FileHeader, &str) -> Result<Visit, E>,
    E: From<ZipError>,
{
    source
        .seek(SeekFrom::Start(end.central_directory_offset as u64))
        .map_err(|e| report("cannot seek to central directory", e))?;

    for index in 0..end.entries as usize {
        let header = read_central_entry(source, scratch, index)?;
        let resume = source
            .tell()
            .map_err(|e| report("cannot query position in zip file", e).at_entry(index))?;

        // Names are decoded lossily; valid UTF-8 borrows straight from scratch.
        let raw_name = &scratch.as_slice()[..header.file_name_length as usize];
        let name = String::from_utf8_lossy(raw_name);
        if callback(&mut *source, index, &header, &*name)? == Visit::Stop {
            debug!(index, "central directory walk stopped by callback");
            return Ok(index + 1);
        }

        let moved = source
            .tell()
            .map_err(|e| report("cannot query position in zip file", e).at_entry(index))?
            != resume;
        if moved {
            source
                .seek(SeekFrom::Start(resume))
                .map_err(|e| report("cannot seek in zip file", e).at_entry(index))?;
        }
    }

    Ok(end.entries as usize)
}

/// Read one central directory entry, leaving its name at the front of `scratch`
/// and the source just past its comment.
fn read_central_entry<S>(
    source: &mut S,
    scratch: &mut Scratch,
    index: usize,
) -> ZipResult<FileHeader>
where
    S: ByteSource + ?Sized,
{
    let mut raw = [0u8; CentralFileHeader::SIZE];
    source.read_exact(&mut raw).map_err(|e| {
        error!(index, error = %e, "couldn't read file header");
        ZipError::from(e).at_entry(index)
    })?;

    let central = CentralFileHeader::parse(&raw);
    if central.signature != CentralFileHeader::SIGNATURE {
        error!(index, found = central.signature, "invalid file header signature");
        return Err(ZipError::CentralSignature { found: central.signature }.at_entry(index));
    }

    let len = central.file_name_length as usize;
    if len + 1 > scratch.capacity() {
        error!(index, len, "too long file name");
        return Err(ZipError::NameTooLong {
            len,
            capacity: scratch.capacity(),
        }
        .at_entry(index));
    }

    source
        .read_exact(&mut scratch.as_mut_slice()[..len])
        .map_err(|e| {
            error!(index, error = %e, "couldn't read filename");
            ZipError::from(e).at_entry(index)
        })?;

    let trailing = central.extra_field_length as u64 + central.file_comment_length as u64;
    source.skip(trailing).map_err(|e| {
        error!(index, error = %e, "couldn't skip extra field or file comment");
        ZipError::from(e).at_entry(index)
    })?;

    Ok(FileHeader::from(&central))
}

/// Read and validate a Local File Header at the current source position.
///
/// With a nonempty `name` buffer the entry name is copied into it followed by
/// a zero byte; otherwise the name is skipped. On success the source is left
/// at the first byte of the entry's data and the returned header has
/// `offset == 0`.
///
/// This function never logs: callers may probe offsets speculatively and
/// treat an error as "no entry here".
///
/// # Errors
///
/// - [`ZipError::LocalSignature`] if no local header starts here
/// - [`ZipError::NameTooLong`] if the name plus terminator does not fit in `name`
/// - [`ZipError::UnsupportedFlags`] if any general purpose flag bit is set
/// - [`ZipError::StoredSizeMismatch`] for a stored entry whose sizes differ
pub fn read_local_header<S>(source: &mut S, name: Option<&mut [u8]>) -> ZipResult<FileHeader>
where
    S: ByteSource + ?Sized,
{
    let mut raw = [0u8; LocalFileHeader::SIZE];
    source.read_exact(&mut raw)?;

    let local = LocalFileHeader::parse(&raw);
    if local.signature != LocalFileHeader::SIGNATURE {
        return Err(ZipError::LocalSignature { found: local.signature });
    }

    let len = local.file_name_length as usize;
    match name {
        Some(buf) if !buf.is_empty() => {
            if len >= buf.len() {
                return Err(ZipError::NameTooLong {
                    len,
                    capacity: buf.len(),
                });
            }
            source.read_exact(&mut buf[..len])?;
            buf[len] = 0;
        }
        _ => source.skip(len as u64)?,
    }

    source.skip(local.extra_field_length as u64)?;

    if local.flags != 0 {
        return Err(ZipError::UnsupportedFlags(local.flags));
    }

    if local.compression_method == CompressionMethod::Stored.as_u16()
        && local.compressed_size != local.uncompressed_size
    {
        return Err(ZipError::StoredSizeMismatch {
            compressed: local.compressed_size,
            uncompressed: local.uncompressed_size,
        });
    }

    Ok(FileHeader::from(&local))
}
