mod http;
mod local;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;

use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// Trait for a seekable, readable data source with a known total size.
///
/// Sources are single-owner: every method takes `&mut self`, so one logical
/// operation at a time is enforced by the borrow checker.
pub trait ByteSource {
    /// Get the total size of the data source.
    fn size(&mut self) -> io::Result<u64>;

    /// Move the read position, returning the new absolute position.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Read up to `buf.len()` bytes at the current position.
    ///
    /// Returns `Ok(0)` only at end of data or for an empty `buf`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Current absolute read position.
    fn tell(&mut self) -> io::Result<u64>;

    /// Fill `buf` completely or fail with [`io::ErrorKind::UnexpectedEof`].
    fn read_exact(&mut self, mut buf: &mut [u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read(buf) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
                Ok(n) => buf = &mut buf[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Skip `count` bytes forward without reading them.
    fn skip(&mut self, count: u64) -> io::Result<()> {
        if count > 0 {
            let offset = i64::try_from(count)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "skip too large"))?;
            self.seek(SeekFrom::Current(offset))?;
        }
        Ok(())
    }
}

impl<T: AsRef<[u8]>> ByteSource for Cursor<T> {
    fn size(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().as_ref().len() as u64)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Seek::seek(self, pos)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.position())
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn size(&mut self) -> io::Result<u64> {
        (**self).size()
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        (**self).seek(pos)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn tell(&mut self) -> io::Result<u64> {
        (**self).tell()
    }
}
