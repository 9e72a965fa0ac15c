//! Entry payload reading.
//!
//! Stored entries are read straight into the output buffer. Deflated entries
//! are inflated with a raw [`flate2::Decompress`] session, staging compressed
//! input through the scratch buffer a chunk at a time, so the compressed
//! payload is never held in memory as a whole.

use flate2::{Decompress, FlushDecompress, Status};
use tracing::{debug, error};

use crate::io::ByteSource;

use super::error::{ZipError, ZipResult};
use super::scratch::Scratch;
use super::structures::{CompressionMethod, FileHeader};

/// Read an entry's payload into `out`.
///
/// The source must be positioned at the first payload byte, which is where a
/// successful [`read_local_header`](super::read_local_header) leaves it.
/// `out` must hold at least `header.uncompressed_size` bytes. The produced
/// length and CRC-32 are checked against the header.
///
/// Returns the number of bytes written to `out`.
pub fn read_entry_data<S>(
    source: &mut S,
    scratch: &mut Scratch,
    header: &FileHeader,
    out: &mut [u8],
) -> ZipResult<usize>
where
    S: ByteSource + ?Sized,
{
    let expected = header.uncompressed_size as usize;
    if out.len() < expected {
        let err = ZipError::OutputTooSmall {
            needed: expected,
            capacity: out.len(),
        };
        error!(error = %err, "output buffer too small");
        return Err(err);
    }
    let out = &mut out[..expected];

    match header.method() {
        CompressionMethod::Stored => {
            source.read_exact(out).map_err(|e| {
                error!(error = %e, "couldn't read stored data");
                ZipError::from(e)
            })?;
        }
        CompressionMethod::Deflate => {
            let written = inflate(source, scratch, header.compressed_size as u64, out)?;
            if written != expected {
                let err = ZipError::SizeMismatch {
                    expected: expected as u64,
                    actual: written as u64,
                };
                error!(error = %err, "inflated size differs from header");
                return Err(err);
            }
        }
        CompressionMethod::Unknown(method) => {
            error!(method, "unsupported compression method");
            return Err(ZipError::UnsupportedMethod(method));
        }
    }

    let actual = crc32fast::hash(out);
    if actual != header.crc32 {
        error!(expected = header.crc32, actual, "CRC-32 mismatch");
        return Err(ZipError::CrcMismatch {
            expected: header.crc32,
            actual,
        });
    }

    Ok(expected)
}

/// Inflate up to `compressed_size` bytes of raw deflate data into `out`.
///
/// Stops at end of stream, when the compressed input is used up, or when
/// `out` is full. Returns the number of bytes produced.
fn inflate<S>(
    source: &mut S,
    scratch: &mut Scratch,
    compressed_size: u64,
    out: &mut [u8],
) -> ZipResult<usize>
where
    S: ByteSource + ?Sized,
{
    let staging = scratch.as_mut_slice();
    let mut inflater = Decompress::new(false);

    // Bytes of the entry still in the source.
    let mut unread = compressed_size;
    // Staged input not yet consumed by the engine is staging[start..end].
    let (mut start, mut end) = (0usize, 0usize);
    let mut written = 0usize;

    while written < out.len() && (unread > 0 || start < end) {
        if start == end {
            let want = (staging.len() as u64).min(unread) as usize;
            let got = source.read(&mut staging[..want]).map_err(|e| {
                error!(error = %e, "couldn't read compressed data");
                ZipError::from(e)
            })?;
            if got == 0 {
                error!(remaining = unread, "unexpected end of compressed data");
                return Err(ZipError::UnexpectedEof { remaining: unread });
            }
            unread -= got as u64;
            start = 0;
            end = got;
        }

        let in_before = inflater.total_in();
        let out_before = inflater.total_out();
        let status = inflater
            .decompress(&staging[start..end], &mut out[written..], FlushDecompress::None)
            .map_err(|e| {
                error!(error = %e, "inflate failed");
                match e.needs_dictionary() {
                    Some(_) => ZipError::NeedDictionary,
                    None => ZipError::Corrupt(e.to_string()),
                }
            })?;

        let consumed = (inflater.total_in() - in_before) as usize;
        let produced = (inflater.total_out() - out_before) as usize;
        start += consumed;
        written += produced;

        match status {
            Status::StreamEnd => {
                debug!(written, "deflate stream ended");
                break;
            }
            Status::Ok | Status::BufError if consumed == 0 && produced == 0 => {
                error!(written, "inflate made no progress");
                return Err(ZipError::InflateStalled);
            }
            Status::Ok | Status::BufError => {}
        }
    }

    Ok(written)
}
