/// Default scratch capacity. Bounds file name length and the tail window
/// searched for the end of central directory record.
pub const SCRATCH_SIZE: usize = 64 * 1024;

/// The bounded working buffer shared by every reading phase.
///
/// It holds file names during a directory walk, the archive tail while the
/// end record is located, and staged compressed input while an entry is
/// inflated. Operations borrow it mutably, so only one can use a given
/// instance at a time.
pub struct Scratch {
    buf: Box<[u8]>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::with_capacity(SCRATCH_SIZE)
    }

    /// A scratch buffer of `capacity` bytes, at least one.
    ///
    /// A scratch too small for an operation makes that operation fail with an
    /// error: the end record is not found in the tail window, or a file name
    /// is rejected as too long.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity.max(1)].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}
