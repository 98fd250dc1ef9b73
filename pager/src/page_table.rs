//! Single-level page table with global FIFO frame replacement.
//!
//! Frames are handed out in order `0, 1, .., F-1, 0, 1, ..` by a cursor
//! that only moves on a page fault. Until every frame has been used once
//! the cursor points at a free frame; after that it always points at the
//! frame loaded longest ago, which is the next victim.

use std::io::{Read, Seek, Write};

use crate::memory::PhysicalMemory;
use crate::store::BackingStore;
use crate::tlb::{Tlb, TlbEntry};
use crate::PagerError;

/// Page table entry. `frame == None` means the page is not resident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pte {
    pub frame: Option<usize>,
    pub dirty: bool,
}

impl Pte {
    /// A freshly loaded, clean entry.
    pub fn resident(frame: usize) -> Self {
        Self {
            frame: Some(frame),
            dirty: false,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.frame.is_some()
    }
}

/// How a call to [`PageTable::resolve`] was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The page was already resident
    Resident,
    /// The page was loaded into a free frame
    Loaded { frame: usize },
    /// The page replaced `victim`, which was written back if `written_back`
    Replaced {
        frame: usize,
        victim: usize,
        written_back: bool,
    },
    /// Every frame was in use but none of the entries claimed the victim
    /// frame; its contents were overwritten without write-back
    Reclaimed { frame: usize },
}

pub struct PageTable {
    entries: Vec<Pte>,
    frames: usize,
    next_frame: usize,
    faults: u64,
    evictions: u64,
    write_backs: u64,
    orphaned: u64,
}

impl PageTable {
    /// # Panics
    ///
    /// Panics if `frames` is zero.
    pub fn new(virtual_pages: usize, frames: usize) -> Self {
        assert!(frames > 0, "page table needs at least one frame");
        Self {
            entries: vec![Pte::default(); virtual_pages],
            frames,
            next_frame: 0,
            faults: 0,
            evictions: 0,
            write_backs: 0,
            orphaned: 0,
        }
    }

    /// Make `page` resident and cache its translation.
    ///
    /// Only called after a TLB miss. On a fault with all frames in use, the
    /// page occupying the frame under the cursor is evicted first: its cache
    /// entry is dropped, and if it (or that cache entry) was dirty the frame
    /// goes back to the backing store. The new translation is then inserted
    /// into the TLB, and a dirty entry pushed out by that insert has its
    /// dirty bit folded into the page table.
    ///
    /// Returns the inserted cache entry, which is now the newest one.
    pub fn resolve<S: Read + Write + Seek>(
        &mut self,
        page: usize,
        tlb: &mut Tlb,
        memory: &mut PhysicalMemory,
        store: &mut BackingStore<S>,
    ) -> Result<(TlbEntry, Resolution), PagerError> {
        let pte = self
            .entries
            .get(page)
            .copied()
            .ok_or(PagerError::PageOutOfRange(page))?;

        let resolution = if pte.is_valid() {
            Resolution::Resident
        } else {
            self.fault(page, tlb, memory, store)?
        };

        let pte = self.entries[page];
        if let Some(evicted) = tlb.insert(page, pte) {
            self.absorb(evicted);
        }

        Ok((TlbEntry { page, pte }, resolution))
    }

    fn fault<S: Read + Write + Seek>(
        &mut self,
        page: usize,
        tlb: &mut Tlb,
        memory: &mut PhysicalMemory,
        store: &mut BackingStore<S>,
    ) -> Result<Resolution, PagerError> {
        let frame = self.next_frame;

        let resolution = if self.faults >= self.frames as u64 {
            match self.occupant(frame) {
                Some(victim) => {
                    let written_back = self.evict(victim, frame, tlb, memory, store)?;
                    Resolution::Replaced {
                        frame,
                        victim,
                        written_back,
                    }
                }
                None => {
                    log::warn!(
                        "[PageTable] no resident page owns frame {}, overwriting it without write-back",
                        frame
                    );
                    self.orphaned += 1;
                    Resolution::Reclaimed { frame }
                }
            }
        } else {
            Resolution::Loaded { frame }
        };

        store.read_page(page, memory.frame_mut(frame)?)?;
        self.entries[page] = Pte::resident(frame);
        self.faults += 1;
        self.next_frame = (self.next_frame + 1) % self.frames;

        log::debug!(
            "[PageTable] fault #{}: page {:#04x} -> frame {}",
            self.faults,
            page,
            frame
        );
        Ok(resolution)
    }

    /// Page currently mapped to `frame`.
    fn occupant(&self, frame: usize) -> Option<usize> {
        self.entries
            .iter()
            .position(|pte| pte.frame == Some(frame))
    }

    /// Unmap `victim` from `frame`, writing the frame back if it was modified.
    fn evict<S: Read + Write + Seek>(
        &mut self,
        victim: usize,
        frame: usize,
        tlb: &mut Tlb,
        memory: &mut PhysicalMemory,
        store: &mut BackingStore<S>,
    ) -> Result<bool, PagerError> {
        // A write that hit the cache may not have reached the page table yet
        let cached_dirty = tlb
            .remove_by_page(victim)
            .is_some_and(|entry| entry.pte.dirty);
        let dirty = self.entries[victim].dirty || cached_dirty;

        if dirty {
            store.write_page(victim, memory.frame(frame)?)?;
            self.write_backs += 1;
            log::debug!(
                "[PageTable] wrote back page {:#04x} from frame {}",
                victim,
                frame
            );
        }

        self.entries[victim] = Pte::default();
        self.evictions += 1;
        Ok(dirty)
    }

    /// Fold a cache entry that aged out back into the page table.
    fn absorb(&mut self, evicted: TlbEntry) {
        if !(evicted.pte.is_valid() && evicted.pte.dirty) {
            return;
        }
        // Only pages still resident can be dirty
        if let Some(pte) = self.entries.get_mut(evicted.page) {
            if pte.is_valid() {
                pte.dirty = true;
            }
        }
    }

    pub fn entry(&self, page: usize) -> Option<&Pte> {
        self.entries.get(page)
    }

    /// Pages that are resident and modified according to the page table.
    pub fn dirty_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, pte)| pte.is_valid() && pte.dirty)
            .map(|(page, _)| page)
    }

    pub fn resident_pages(&self) -> usize {
        self.entries.iter().filter(|pte| pte.is_valid()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn next_frame(&self) -> usize {
        self.next_frame
    }

    /// Page faults so far; also the number of frame loads.
    pub fn faults(&self) -> u64 {
        self.faults
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn write_backs(&self) -> u64 {
        self.write_backs
    }

    /// Faults that found the victim frame unowned.
    pub fn orphaned_frames(&self) -> u64 {
        self.orphaned
    }
}
