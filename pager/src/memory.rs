use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Physical address out of bounds: {0:#x}")]
    OutOfBounds(usize),
    #[error("Frame out of range: {0}")]
    InvalidFrame(usize),
}

/// Simulated physical memory: `frames` page-sized frames laid out back to back.
pub struct PhysicalMemory {
    data: Vec<u8>,
    page_size: usize,
}

impl PhysicalMemory {
    /// # Panics
    ///
    /// Panics if `frames` or `page_size` is zero.
    pub fn new(frames: usize, page_size: usize) -> Self {
        assert!(
            frames > 0 && page_size > 0,
            "physical memory needs at least one non-empty frame"
        );
        Self {
            data: vec![0; frames * page_size],
            page_size,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn frame_count(&self) -> usize {
        self.data.len() / self.page_size
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Physical address of `offset` within `frame`, wrapped to the memory size.
    #[inline]
    pub fn address(&self, frame: usize, offset: usize) -> usize {
        (frame * self.page_size + offset) % self.data.len()
    }

    pub fn load_8(&self, addr: usize) -> Result<u8, MemoryError> {
        self.data
            .get(addr)
            .copied()
            .ok_or(MemoryError::OutOfBounds(addr))
    }

    pub fn store_8(&mut self, addr: usize, value: u8) -> Result<(), MemoryError> {
        let slot = self
            .data
            .get_mut(addr)
            .ok_or(MemoryError::OutOfBounds(addr))?;
        *slot = value;
        Ok(())
    }

    /// Add one to the byte at `addr`, wrapping at 255, and return the new value.
    pub fn increment_8(&mut self, addr: usize) -> Result<u8, MemoryError> {
        let value = self.load_8(addr)?.wrapping_add(1);
        self.store_8(addr, value)?;
        Ok(value)
    }

    fn frame_range(&self, frame: usize) -> Result<std::ops::Range<usize>, MemoryError> {
        let start = frame
            .checked_mul(self.page_size)
            .ok_or(MemoryError::InvalidFrame(frame))?;
        let end = start + self.page_size;
        if end > self.data.len() {
            return Err(MemoryError::InvalidFrame(frame));
        }
        Ok(start..end)
    }

    /// Contents of one frame.
    pub fn frame(&self, frame: usize) -> Result<&[u8], MemoryError> {
        let range = self.frame_range(frame)?;
        Ok(&self.data[range])
    }

    pub fn frame_mut(&mut self, frame: usize) -> Result<&mut [u8], MemoryError> {
        let range = self.frame_range(frame)?;
        Ok(&mut self.data[range])
    }
}
