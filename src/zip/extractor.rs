use std::fs;
use std::io::{SeekFrom, Write};
use std::path::Path;
use tracing::{debug, error};

use crate::io::ByteSource;

use super::data::read_entry_data;
use super::error::{ZipError, ZipResult};
use super::parser::{Visit, locate_end_record, read_local_header, walk_central_directory};
use super::scratch::Scratch;
use super::structures::{EndRecord, FileHeader, ZipFileEntry};

/// ZIP archive reader owning a byte source and its scratch buffer
pub struct ZipExtractor<S: ByteSource> {
    source: S,
    scratch: Scratch,
}

impl<S: ByteSource> ZipExtractor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            scratch: Scratch::new(),
        }
    }

    /// Use a scratch buffer of `capacity` bytes instead of the default.
    ///
    /// The capacity bounds file name length and the tail window searched for
    /// the end record.
    pub fn with_scratch_capacity(source: S, capacity: usize) -> Self {
        Self {
            source,
            scratch: Scratch::with_capacity(capacity),
        }
    }

    /// Locate and validate the end of central directory record
    pub fn end_record(&mut self) -> ZipResult<EndRecord> {
        locate_end_record(&mut self.source, &mut self.scratch)
    }

    /// Walk the central directory, one callback per entry.
    ///
    /// See [`walk_central_directory`] for the callback contract.
    pub fn for_each_entry<F, E>(&mut self, callback: F) -> Result<usize, E>
    where
        F: FnMut(&mut S, usize, &FileHeader, &str) -> Result<Visit, E>,
        E: From<ZipError>,
    {
        let end = self.end_record()?;
        walk_central_directory(&mut self.source, &mut self.scratch, &end, callback)
    }

    /// List all files in the archive
    pub fn list_files(&mut self) -> ZipResult<Vec<ZipFileEntry>> {
        let mut entries = Vec::new();
        self.for_each_entry(|_, _, header, name| {
            entries.push(ZipFileEntry::new(name, header));
            Ok::<_, ZipError>(Visit::Continue)
        })?;
        Ok(entries)
    }

    /// Find the first entry named `name`, stopping the walk there
    pub fn find(&mut self, name: &str) -> ZipResult<Option<ZipFileEntry>> {
        let mut found = None;
        self.for_each_entry(|_, _, header, entry_name| {
            if entry_name == name {
                found = Some(ZipFileEntry::new(entry_name, header));
                return Ok::<_, ZipError>(Visit::Stop);
            }
            Ok(Visit::Continue)
        })?;
        Ok(found)
    }

    /// Read an entry's payload into `out`, given its central directory header.
    ///
    /// Returns the number of bytes written.
    pub fn extract_into(&mut self, header: &FileHeader, out: &mut [u8]) -> ZipResult<usize> {
        extract_entry(&mut self.source, &mut self.scratch, header, out)
    }

    /// Extract file data to memory
    pub fn extract_to_memory(&mut self, header: &FileHeader) -> ZipResult<Vec<u8>> {
        let mut buf = vec![0u8; header.uncompressed_size as usize];
        self.extract_into(header, &mut buf)?;
        Ok(buf)
    }

    /// Extract file data to a writer
    pub fn extract_to_writer<W: Write>(
        &mut self,
        header: &FileHeader,
        writer: &mut W,
    ) -> ZipResult<()> {
        let data = self.extract_to_memory(header)?;
        writer.write_all(&data)?;
        Ok(())
    }

    /// Extract file to disk
    pub fn extract_to_file(&mut self, header: &FileHeader, output_path: &Path) -> ZipResult<()> {
        // Create parent directories if needed
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = self.extract_to_memory(header)?;
        fs::write(output_path, &data)?;

        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

/// Read the entry described by a central directory `header` into `out`.
///
/// Seeks to the local header, validates it, checks that it agrees with the
/// central directory on method, sizes and CRC, then reads the payload.
pub fn extract_entry<S>(
    source: &mut S,
    scratch: &mut Scratch,
    header: &FileHeader,
    out: &mut [u8],
) -> ZipResult<usize>
where
    S: ByteSource + ?Sized,
{
    source.seek(SeekFrom::Start(header.offset as u64)).map_err(|e| {
        error!(offset = header.offset, error = %e, "cannot seek to local header");
        ZipError::from(e)
    })?;

    let local = read_local_header(source, None).map_err(|e| {
        error!(offset = header.offset, error = %e, "invalid local file header");
        e
    })?;

    if local.compression_method != header.compression_method
        || local.compressed_size != header.compressed_size
        || local.uncompressed_size != header.uncompressed_size
        || local.crc32 != header.crc32
    {
        error!(offset = header.offset, "local header disagrees with central directory");
        return Err(ZipError::HeaderMismatch {
            offset: header.offset,
        });
    }

    debug!(
        offset = header.offset,
        method = header.compression_method,
        size = header.uncompressed_size,
        "reading entry data"
    );
    read_entry_data(source, scratch, header, out)
}
