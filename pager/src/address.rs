//! Decoding of raw trace entries into logical addresses.

use std::fmt;

use crate::config::{PagerConfig, WRITE_BIT};

/// Bit layout of a raw trace entry.
///
/// The low `offset_bits + page_bits` bits form the logical address, the
/// write flag lives at bit 16 and everything above it is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressLayout {
    offset_bits: u32,
    page_bits: u32,
}

impl AddressLayout {
    pub fn new(config: &PagerConfig) -> Self {
        Self {
            offset_bits: config.offset_bits(),
            page_bits: config.page_bits(),
        }
    }

    #[inline]
    fn offset_mask(&self) -> u32 {
        (1 << self.offset_bits) - 1
    }

    #[inline]
    fn page_mask(&self) -> u32 {
        (1 << self.page_bits) - 1
    }

    /// Split a raw entry. Total: never fails, never validates.
    pub fn decode(&self, entry: u32) -> LogicalAddress {
        let logical = entry & 0xFFFF;
        LogicalAddress {
            logical,
            page: ((logical >> self.offset_bits) & self.page_mask()) as usize,
            offset: (logical & self.offset_mask()) as usize,
            write: (entry >> WRITE_BIT) & 0x1 == 1,
        }
    }
}

impl Default for AddressLayout {
    fn default() -> Self {
        Self::new(&PagerConfig::default())
    }
}

/// A decoded trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalAddress {
    /// Low 16 bits of the raw entry
    pub logical: u32,
    /// Virtual page number
    pub page: usize,
    /// Byte offset within the page
    pub offset: usize,
    /// Whether the access modifies the byte
    pub write: bool,
}

impl LogicalAddress {
    /// Decode with the default 8-bit page / 8-bit offset layout.
    pub fn decode(entry: u32) -> Self {
        AddressLayout::default().decode(entry)
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#06x} (page={}, offset={}, {})",
            self.logical,
            self.page,
            self.offset,
            if self.write { "W" } else { "R" }
        )
    }
}
