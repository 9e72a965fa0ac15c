use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::io::{self, SeekFrom};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::ByteSource;
use anyhow::{Result, anyhow, bail};

/// Minimum number of bytes fetched per Range request.
///
/// Header reads are tens of bytes each; fetching a window keeps a central
/// directory walk from turning into one request per field.
const READ_AHEAD: u64 = 64 * 1024;

/// HTTP Range reader for remote ZIP files
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    pos: u64,
    window: Vec<u8>,
    window_start: u64,
    transferred_bytes: u64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader
    ///
    /// This will send a HEAD request to verify Range support and get file size
    pub fn new(url: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let resp = client.head(&url).send()?;

        if !resp.status().is_success() {
            bail!("HTTP request failed with status: {}", resp.status());
        }

        let accept_ranges = resp
            .headers()
            .get("accept-ranges")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");

        if !accept_ranges.contains("bytes") {
            bail!("Remote server does not support Range requests");
        }

        let size = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow!("Remote server did not return Content-Length"))?;

        debug!(%url, size, "opened remote archive");

        Ok(Self {
            client,
            url,
            size,
            pos: 0,
            window: Vec::new(),
            window_start: 0,
            transferred_bytes: 0,
            max_retry: 10,
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    /// Replace the cached window with `len` bytes starting at `start`.
    fn fetch(&mut self, start: u64, len: u64) -> io::Result<()> {
        let end = (start + len).min(self.size) - 1;
        let expected_size = (end - start + 1) as usize;

        let mut data = Vec::with_capacity(expected_size);
        let mut retry_count = 0;

        while data.len() < expected_size {
            let current_start = start + data.len() as u64;
            let range = format!("bytes={}-{}", current_start, end);

            match self.client.get(&self.url).header("Range", &range).send() {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        return Err(io::Error::other(format!(
                            "HTTP request failed with status: {}",
                            resp.status()
                        )));
                    }

                    let bytes = resp.bytes().map_err(io::Error::other)?;
                    if bytes.is_empty() {
                        return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
                    }
                    let chunk_len = bytes.len().min(expected_size - data.len());
                    data.extend_from_slice(&bytes[..chunk_len]);
                    self.transferred_bytes += chunk_len as u64;
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(io::Error::new(io::ErrorKind::TimedOut, "max retries exceeded"));
                    }
                    warn!(retry_count, max_retry = self.max_retry, error = %e, "connection error, retrying");
                    thread::sleep(Duration::from_millis(500 * retry_count as u64));
                }
                Err(e) => return Err(io::Error::other(e)),
            }
        }

        self.window = data;
        self.window_start = start;
        Ok(())
    }
}

impl ByteSource for HttpRangeReader {
    fn size(&mut self) -> io::Result<u64> {
        Ok(self.size)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        self.pos = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
        })?;
        Ok(self.pos)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.pos >= self.size {
            return Ok(0);
        }

        let window_end = self.window_start + self.window.len() as u64;
        if self.pos < self.window_start || self.pos >= window_end {
            self.fetch(self.pos, READ_AHEAD.max(buf.len() as u64))?;
        }

        let offset = (self.pos - self.window_start) as usize;
        let n = buf.len().min(self.window.len() - offset);
        buf[..n].copy_from_slice(&self.window[offset..offset + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }
}
