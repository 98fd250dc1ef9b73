//! Backing store: the persistent image of the whole virtual address space.
//!
//! Page `n` lives at byte offset `n * page_size`. Every transfer moves
//! exactly one page; a failed seek or a short read/write surfaces as a
//! [`StoreError`] and the simulation stops, since a truncated or corrupted
//! image can no longer be trusted.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::PagerConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot open backing store {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("backing store is {actual} bytes, expected at least {expected}")]
    TooShort { expected: u64, actual: u64 },
    #[error("cannot seek to page {page} (offset {offset:#x}): {source}")]
    Seek {
        page: usize,
        offset: u64,
        #[source]
        source: io::Error,
    },
    #[error("cannot read page {page}: {source}")]
    Read {
        page: usize,
        #[source]
        source: io::Error,
    },
    #[error("cannot write page {page}: {source}")]
    Write {
        page: usize,
        #[source]
        source: io::Error,
    },
    #[error("buffer holds {len} bytes, a page is {page_size}")]
    BufferSize { len: usize, page_size: usize },
    #[error("cannot flush backing store: {0}")]
    Flush(#[source] io::Error),
}

/// Page-granular access to a seekable byte image.
pub struct BackingStore<S> {
    inner: S,
    page_size: usize,
    page_reads: u64,
    page_writes: u64,
}

impl BackingStore<File> {
    /// Open an image file for reading and writing.
    ///
    /// Files shorter than `virtual_pages * page_size` are rejected up front;
    /// a longer file is accepted and its tail is never touched.
    pub fn open(path: impl AsRef<Path>, config: &PagerConfig) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let open_err = |source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(open_err)?;
        let actual = file.metadata().map_err(open_err)?.len();
        let expected = config.store_size();
        if actual < expected {
            return Err(StoreError::TooShort { expected, actual });
        }
        if actual > expected {
            log::warn!(
                "[Store] {} is {} bytes, only the first {} are used",
                path.display(),
                actual,
                expected
            );
        }
        log::debug!("[Store] opened {} ({} bytes)", path.display(), actual);
        Ok(Self::new(file, config.page_size))
    }
}

impl<S: Read + Write + Seek> BackingStore<S> {
    pub fn new(inner: S, page_size: usize) -> Self {
        Self {
            inner,
            page_size,
            page_reads: 0,
            page_writes: 0,
        }
    }

    fn seek_page(&mut self, page: usize) -> Result<(), StoreError> {
        let offset = (page * self.page_size) as u64;
        self.inner
            .seek(SeekFrom::Start(offset))
            .map(|_| ())
            .map_err(|source| StoreError::Seek {
                page,
                offset,
                source,
            })
    }

    fn check_buffer(&self, len: usize) -> Result<(), StoreError> {
        if len != self.page_size {
            return Err(StoreError::BufferSize {
                len,
                page_size: self.page_size,
            });
        }
        Ok(())
    }

    /// Fill `buf` with the contents of `page`.
    pub fn read_page(&mut self, page: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        self.check_buffer(buf.len())?;
        self.seek_page(page)?;
        self.inner
            .read_exact(buf)
            .map_err(|source| StoreError::Read { page, source })?;
        self.page_reads += 1;
        Ok(())
    }

    /// Persist `buf` as the new contents of `page`.
    pub fn write_page(&mut self, page: usize, buf: &[u8]) -> Result<(), StoreError> {
        self.check_buffer(buf.len())?;
        self.seek_page(page)?;
        self.inner
            .write_all(buf)
            .map_err(|source| StoreError::Write { page, source })?;
        self.page_writes += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.inner.flush().map_err(StoreError::Flush)
    }

    /// Pages loaded so far.
    pub fn page_reads(&self) -> u64 {
        self.page_reads
    }

    /// Pages written back so far.
    pub fn page_writes(&self) -> u64 {
        self.page_writes
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}
