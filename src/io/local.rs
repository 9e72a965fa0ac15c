use super::ByteSource;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Local file reader with buffered, seekable access
pub struct LocalFileReader {
    file: BufReader<File>,
    size: u64,
    pos: u64,
}

impl LocalFileReader {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: BufReader::new(file),
            size,
            pos: 0,
        })
    }
}

impl ByteSource for LocalFileReader {
    fn size(&mut self) -> io::Result<u64> {
        Ok(self.size)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        }
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek before start of file"))?;

        // Relative seeks let BufReader keep its buffer when the target is inside it.
        match i64::try_from(target as i128 - self.pos as i128) {
            Ok(delta) => self.file.seek_relative(delta)?,
            Err(_) => {
                self.file.seek(SeekFrom::Start(target))?;
            }
        }
        self.pos = target;
        Ok(target)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }
}
