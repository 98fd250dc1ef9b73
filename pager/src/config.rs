//! Simulation geometry.
//!
//! The defaults reproduce the classic layout: 256-byte pages, 256 virtual
//! pages (a 16-bit logical address space), a 16-entry TLB and 128 physical
//! frames, so physical memory is half the virtual space and replacement is
//! unavoidable on long traces.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default page size in bytes.
pub const PAGE_SIZE: usize = 256;
/// Default number of virtual pages.
pub const VIRTUAL_PAGES: usize = 256;
/// Default TLB capacity.
pub const TLB_ENTRIES: usize = 16;
/// Default number of physical frames.
pub const FRAMES: usize = 128;

/// Bit that carries the write flag in a raw trace entry.
pub const WRITE_BIT: u32 = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("page size {0} is not a power of two")]
    PageSize(usize),
    #[error("virtual page count {0} is not a power of two")]
    VirtualPages(usize),
    #[error("logical address needs {0} bits, only 16 are available below the write flag")]
    AddressWidth(u32),
    #[error("frame count {frames} must be between 1 and the virtual page count {virtual_pages}")]
    Frames { frames: usize, virtual_pages: usize },
    #[error("TLB must hold at least one entry")]
    TlbEntries,
}

/// Geometry of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagerConfig {
    /// Bytes per page (and per frame)
    pub page_size: usize,
    /// Pages in the virtual address space
    pub virtual_pages: usize,
    /// Translation cache capacity
    pub tlb_entries: usize,
    /// Physical frames available
    pub frames: usize,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            virtual_pages: VIRTUAL_PAGES,
            tlb_entries: TLB_ENTRIES,
            frames: FRAMES,
        }
    }
}

impl PagerConfig {
    /// Check that the geometry can be simulated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.page_size.is_power_of_two() {
            return Err(ConfigError::PageSize(self.page_size));
        }
        if !self.virtual_pages.is_power_of_two() {
            return Err(ConfigError::VirtualPages(self.virtual_pages));
        }
        let width = self.offset_bits() + self.page_bits();
        if width > WRITE_BIT {
            return Err(ConfigError::AddressWidth(width));
        }
        if self.frames == 0 || self.frames > self.virtual_pages {
            return Err(ConfigError::Frames {
                frames: self.frames,
                virtual_pages: self.virtual_pages,
            });
        }
        if self.tlb_entries == 0 {
            return Err(ConfigError::TlbEntries);
        }
        Ok(())
    }

    pub fn offset_bits(&self) -> u32 {
        self.page_size.trailing_zeros()
    }

    pub fn page_bits(&self) -> u32 {
        self.virtual_pages.trailing_zeros()
    }

    /// Size of physical memory in bytes.
    pub fn memory_size(&self) -> usize {
        self.frames * self.page_size
    }

    /// Size the backing store must have in bytes.
    pub fn store_size(&self) -> u64 {
        (self.virtual_pages * self.page_size) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PagerConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.offset_bits(), 8);
        assert_eq!(config.page_bits(), 8);
        assert_eq!(config.memory_size(), 128 * 256);
        assert_eq!(config.store_size(), 65536);
    }

    #[test]
    fn test_rejects_odd_page_size() {
        let config = PagerConfig {
            page_size: 200,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::PageSize(200)));
    }

    #[test]
    fn test_rejects_too_wide_address() {
        let config = PagerConfig {
            page_size: 512,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::AddressWidth(17)));
    }

    #[test]
    fn test_frame_bounds() {
        let none = PagerConfig {
            frames: 0,
            ..Default::default()
        };
        assert!(matches!(none.validate(), Err(ConfigError::Frames { .. })));

        let too_many = PagerConfig {
            frames: 257,
            ..Default::default()
        };
        assert!(matches!(too_many.validate(), Err(ConfigError::Frames { .. })));

        let full = PagerConfig {
            frames: 256,
            ..Default::default()
        };
        assert_eq!(full.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_empty_tlb() {
        let config = PagerConfig {
            tlb_entries: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TlbEntries));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: PagerConfig = serde_json::from_str(r#"{"frames": 64}"#).unwrap();
        assert_eq!(config.frames, 64);
        assert_eq!(config.page_size, PAGE_SIZE);
        assert_eq!(config.tlb_entries, TLB_ENTRIES);
    }
}
