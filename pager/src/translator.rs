//! Per-access translation pipeline.
//!
//! ```text
//!   raw entry ──decode──▶ page, offset, write
//!                          │
//!                          ▼
//!                   ┌─────────────┐  hit
//!                   │     TLB     │──────────────┐
//!                   └──────┬──────┘              │
//!                          │ miss                │
//!                          ▼                     │
//!                   ┌─────────────┐  fault   ┌───┴──────────┐
//!                   │ Page table  │─────────▶│ Backing store│
//!                   └──────┬──────┘ (evict,  └──────────────┘
//!                          │        write back, load)
//!                          ▼
//!              frame * page_size + offset ──▶ physical memory
//! ```

use std::fs::File;
use std::io::{BufRead, Read, Seek, Write};
use std::path::Path;

use crate::address::{AddressLayout, LogicalAddress};
use crate::config::PagerConfig;
use crate::memory::PhysicalMemory;
use crate::page_table::{PageTable, Resolution};
use crate::report::{AccessRecord, Summary};
use crate::store::BackingStore;
use crate::tlb::Tlb;
use crate::trace::TraceReader;
use crate::PagerError;

/// Owns every piece of simulated state for one run.
pub struct Translator<S> {
    config: PagerConfig,
    layout: AddressLayout,
    tlb: Tlb,
    page_table: PageTable,
    memory: PhysicalMemory,
    store: BackingStore<S>,
    entries: u64,
}

impl Translator<File> {
    /// Open the backing store at `path` and build a translator over it.
    pub fn open(config: PagerConfig, path: impl AsRef<Path>) -> Result<Self, PagerError> {
        config.validate()?;
        let store = BackingStore::open(path, &config)?;
        Ok(Self::with_store(config, store))
    }
}

impl<S: Read + Write + Seek> Translator<S> {
    /// Build a translator over any seekable image.
    pub fn new(config: PagerConfig, image: S) -> Result<Self, PagerError> {
        config.validate()?;
        Ok(Self::with_store(
            config,
            BackingStore::new(image, config.page_size),
        ))
    }

    /// `config` must already be validated.
    fn with_store(config: PagerConfig, store: BackingStore<S>) -> Self {
        Self {
            layout: AddressLayout::new(&config),
            tlb: Tlb::new(config.tlb_entries),
            page_table: PageTable::new(config.virtual_pages, config.frames),
            memory: PhysicalMemory::new(config.frames, config.page_size),
            store,
            config,
            entries: 0,
        }
    }

    /// Translate and perform one raw trace entry.
    pub fn access(&mut self, entry: u32) -> Result<AccessRecord, PagerError> {
        let addr = self.layout.decode(entry);
        self.access_decoded(addr)
    }

    pub fn access_decoded(&mut self, addr: LogicalAddress) -> Result<AccessRecord, PagerError> {
        self.entries += 1;

        let (pte, tlb_hit, page_fault) = match self.tlb.lookup(addr.page) {
            Some(pte) => (pte, true, false),
            None => {
                let (entry, resolution) = self.page_table.resolve(
                    addr.page,
                    &mut self.tlb,
                    &mut self.memory,
                    &mut self.store,
                )?;
                (entry.pte, false, resolution != Resolution::Resident)
            }
        };

        let frame = pte.frame.ok_or(PagerError::NotResident(addr.page))?;
        let physical = self.memory.address(frame, addr.offset);

        let mut dirty = pte.dirty;
        if addr.write {
            self.memory.increment_8(physical)?;
            self.tlb.mark_dirty(addr.page);
            dirty = true;
        }
        let value = self.memory.load_8(physical)? as i8;

        log::trace!(
            "[Translator] {} -> {:#06x} value={} dirty={}",
            addr,
            physical,
            value,
            dirty
        );

        Ok(AccessRecord {
            logical: addr.logical,
            physical,
            value,
            dirty,
            tlb_hit,
            page_fault,
        })
    }

    /// Replay a whole trace, handing every record to `sink` in order.
    pub fn run<R, F>(&mut self, trace: TraceReader<R>, mut sink: F) -> Result<Summary, PagerError>
    where
        R: BufRead,
        F: FnMut(&AccessRecord) -> std::io::Result<()>,
    {
        log::info!(
            "[Translator] replaying trace: {} frames, {}-entry TLB, {}-byte pages",
            self.config.frames,
            self.config.tlb_entries,
            self.config.page_size
        );
        for entry in trace {
            let record = self.access(entry?)?;
            sink(&record).map_err(PagerError::Output)?;
        }
        self.store.flush()?;

        let summary = self.summary();
        log::info!(
            "[Translator] done: {} entries, {} faults, {} TLB hits, {} write-backs",
            summary.entries,
            summary.page_faults,
            summary.tlb_hits,
            summary.write_backs
        );
        Ok(summary)
    }

    /// Resident pages holding modifications, including writes still only
    /// recorded in the TLB.
    pub fn dirty_pages(&self) -> usize {
        (0..self.page_table.len())
            .filter(|&page| {
                self.page_table.entry(page).is_some_and(|pte| {
                    pte.is_valid() && (pte.dirty || self.tlb.is_dirty(page))
                })
            })
            .count()
    }

    pub fn summary(&self) -> Summary {
        Summary::new(
            self.entries,
            self.page_table.faults(),
            self.tlb.hits(),
            self.dirty_pages(),
            self.page_table.evictions(),
            self.page_table.write_backs(),
        )
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    pub fn tlb(&self) -> &Tlb {
        &self.tlb
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    pub fn store(&self) -> &BackingStore<S> {
        &self.store
    }

    /// Tear down the simulation and hand back the image.
    pub fn into_store(self) -> BackingStore<S> {
        self.store
    }
}
