//! Translation cache with strict FIFO eviction.
//!
//! A fixed array of slots used as a ring buffer: `first` is the oldest
//! occupied slot and `len` the occupancy, so the newest entry sits at
//! `(first + len - 1) % capacity`. Hits never reorder entries; arrival order
//! alone decides what gets evicted.
//!
//! Entries hold *copies* of page table entries. A write that hits the cache
//! only dirties the copy; the page table learns about it when the copy ages
//! out (see `PageTable::resolve`).

use serde::Serialize;

use crate::page_table::Pte;

/// One cached translation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TlbEntry {
    pub page: usize,
    pub pte: Pte,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TlbStats {
    /// Lookups that found a valid entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries dropped because the cache was full
    pub evictions: u64,
    /// Entries removed because their page left memory
    pub invalidations: u64,
}

impl TlbStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct Tlb {
    slots: Vec<TlbEntry>,
    /// Index of the oldest occupied slot
    first: usize,
    /// Number of occupied slots
    len: usize,
    stats: TlbStats,
}

impl Tlb {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "TLB capacity must be non-zero");
        Self {
            slots: vec![TlbEntry::default(); capacity],
            first: 0,
            len: 0,
            stats: TlbStats::default(),
        }
    }

    #[inline]
    fn slot(&self, i: usize) -> usize {
        (self.first + i) % self.slots.len()
    }

    /// Slot index holding a valid entry for `page`, scanning oldest to newest.
    fn find(&self, page: usize) -> Option<usize> {
        (0..self.len).map(|i| self.slot(i)).find(|&idx| {
            let entry = &self.slots[idx];
            entry.pte.is_valid() && entry.page == page
        })
    }

    /// Look up a translation, counting the hit or miss.
    pub fn lookup(&mut self, page: usize) -> Option<Pte> {
        match self.find(page) {
            Some(idx) => {
                self.stats.hits += 1;
                log::trace!("[Tlb] hit page {:#04x} in slot {}", page, idx);
                Some(self.slots[idx].pte)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Like `lookup`, but leaves the statistics alone.
    pub fn peek(&self, page: usize) -> Option<Pte> {
        self.find(page).map(|idx| self.slots[idx].pte)
    }

    /// Append a translation, overwriting the oldest one when full.
    ///
    /// Returns the entry that was pushed out, if the cache was full.
    pub fn insert(&mut self, page: usize, pte: Pte) -> Option<TlbEntry> {
        let idx = self.slot(self.len);
        let previous = std::mem::replace(&mut self.slots[idx], TlbEntry { page, pte });
        log::trace!("[Tlb] insert page {:#04x} into slot {}", page, idx);

        if self.len < self.slots.len() {
            self.len += 1;
            None
        } else {
            self.first = (self.first + 1) % self.slots.len();
            self.stats.evictions += 1;
            Some(previous)
        }
    }

    /// Drop the entry for `page`, keeping the remaining entries in arrival order.
    ///
    /// Everything newer than the removed entry shifts back one slot and the
    /// vacated newest slot is cleared.
    pub fn remove_by_page(&mut self, page: usize) -> Option<TlbEntry> {
        let pos = (0..self.len).find(|&i| {
            let entry = &self.slots[self.slot(i)];
            entry.pte.is_valid() && entry.page == page
        })?;
        let removed = self.slots[self.slot(pos)];

        for i in pos..self.len - 1 {
            let (dst, src) = (self.slot(i), self.slot(i + 1));
            self.slots[dst] = self.slots[src];
        }
        let last = self.slot(self.len - 1);
        self.slots[last] = TlbEntry::default();
        self.len -= 1;
        self.stats.invalidations += 1;

        log::trace!("[Tlb] removed page {:#04x}", page);
        Some(removed)
    }

    /// The most recently inserted entry.
    pub fn newest(&self) -> Option<&TlbEntry> {
        if self.len == 0 {
            return None;
        }
        Some(&self.slots[self.slot(self.len - 1)])
    }

    /// The entry next in line for eviction.
    pub fn oldest(&self) -> Option<&TlbEntry> {
        if self.len == 0 {
            return None;
        }
        Some(&self.slots[self.first])
    }

    /// Mark the cached copy of `page` as modified.
    ///
    /// Returns `false` when the page is not cached.
    pub fn mark_dirty(&mut self, page: usize) -> bool {
        match self.find(page) {
            Some(idx) => {
                self.slots[idx].pte.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Whether the cached copy of `page` carries an unpropagated write.
    pub fn is_dirty(&self, page: usize) -> bool {
        self.peek(page).is_some_and(|pte| pte.dirty)
    }

    /// Occupied entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TlbEntry> + '_ {
        (0..self.len).map(move |i| &self.slots[self.slot(i)])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn hits(&self) -> u64 {
        self.stats.hits
    }

    pub fn stats(&self) -> &TlbStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resident(frame: usize) -> Pte {
        Pte::resident(frame)
    }

    fn pages(tlb: &Tlb) -> Vec<usize> {
        tlb.iter().map(|e| e.page).collect()
    }

    #[test]
    #[should_panic(expected = "TLB capacity must be non-zero")]
    fn test_zero_capacity_rejected() {
        Tlb::new(0);
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let mut tlb = Tlb::new(4);
        assert_eq!(tlb.lookup(1), None);

        tlb.insert(1, resident(7));
        assert_eq!(tlb.lookup(1), Some(resident(7)));
        assert_eq!(tlb.lookup(2), None);

        assert_eq!(tlb.hits(), 1);
        assert_eq!(tlb.stats().misses, 2);
    }

    #[test]
    fn test_fill_then_evict_oldest() {
        let mut tlb = Tlb::new(3);
        assert_eq!(tlb.insert(10, resident(0)), None);
        assert_eq!(tlb.insert(11, resident(1)), None);
        assert_eq!(tlb.insert(12, resident(2)), None);
        assert_eq!(tlb.len(), 3);

        let evicted = tlb.insert(13, resident(3)).unwrap();
        assert_eq!(evicted.page, 10);
        assert_eq!(tlb.len(), 3);
        assert_eq!(pages(&tlb), vec![11, 12, 13]);

        let evicted = tlb.insert(14, resident(4)).unwrap();
        assert_eq!(evicted.page, 11);
        assert_eq!(tlb.stats().evictions, 2);
    }

    #[test]
    fn test_hit_does_not_promote() {
        let mut tlb = Tlb::new(2);
        tlb.insert(1, resident(0));
        tlb.insert(2, resident(1));

        // Page 1 is hit, but it still arrived first
        assert!(tlb.lookup(1).is_some());
        let evicted = tlb.insert(3, resident(2)).unwrap();
        assert_eq!(evicted.page, 1);
    }

    #[test]
    fn test_occupancy_never_exceeds_capacity() {
        let mut tlb = Tlb::new(16);
        for page in 0..100 {
            tlb.insert(page, resident(page % 8));
            assert!(tlb.len() <= tlb.capacity());
        }
        assert_eq!(tlb.len(), 16);
        assert_eq!(pages(&tlb), (84..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut tlb = Tlb::new(4);
        for page in [1, 2, 3, 4] {
            tlb.insert(page, resident(page));
        }

        let removed = tlb.remove_by_page(2).unwrap();
        assert_eq!(removed.page, 2);
        assert_eq!(tlb.len(), 3);
        assert_eq!(pages(&tlb), vec![1, 3, 4]);
        assert_eq!(tlb.lookup(2), None);

        // The freed slot is reused before anything is evicted
        assert_eq!(tlb.insert(5, resident(5)), None);
        assert_eq!(pages(&tlb), vec![1, 3, 4, 5]);
        assert_eq!(tlb.insert(6, resident(6)).unwrap().page, 1);
    }

    #[test]
    fn test_remove_across_wrap() {
        let mut tlb = Tlb::new(3);
        for page in [1, 2, 3, 4, 5] {
            tlb.insert(page, resident(page));
        }
        // Ring now holds 3, 4, 5 with the oldest slot away from index 0
        assert_eq!(pages(&tlb), vec![3, 4, 5]);

        tlb.remove_by_page(4);
        assert_eq!(pages(&tlb), vec![3, 5]);
        assert_eq!(tlb.newest().unwrap().page, 5);
        assert_eq!(tlb.oldest().unwrap().page, 3);

        tlb.remove_by_page(5);
        tlb.remove_by_page(3);
        assert!(tlb.is_empty());
        assert!(tlb.newest().is_none());
    }

    #[test]
    fn test_remove_missing_page() {
        let mut tlb = Tlb::new(2);
        tlb.insert(1, resident(0));
        assert_eq!(tlb.remove_by_page(9), None);
        assert_eq!(tlb.len(), 1);
        assert_eq!(tlb.stats().invalidations, 0);
    }

    #[test]
    fn test_newest_entry() {
        let mut tlb = Tlb::new(2);
        assert!(tlb.newest().is_none());
        tlb.insert(1, resident(0));
        tlb.insert(2, resident(1));
        tlb.insert(3, resident(2));
        let newest = tlb.newest().unwrap();
        assert_eq!(newest.page, 3);
        assert_eq!(newest.pte, resident(2));
    }

    #[test]
    fn test_dirty_stays_in_cache_copy() {
        let mut tlb = Tlb::new(2);
        tlb.insert(1, resident(0));

        assert!(!tlb.is_dirty(1));
        assert!(tlb.mark_dirty(1));
        assert!(tlb.is_dirty(1));
        assert!(!tlb.mark_dirty(2));

        tlb.insert(2, resident(1));
        let evicted = tlb.insert(3, resident(2)).unwrap();
        assert_eq!(evicted.page, 1);
        assert!(evicted.pte.dirty);
    }

    #[test]
    fn test_invalid_entries_never_match() {
        let mut tlb = Tlb::new(2);
        tlb.insert(0, Pte::default());
        assert_eq!(tlb.lookup(0), None);
        assert_eq!(tlb.remove_by_page(0), None);
    }

    #[test]
    fn test_hit_ratio() {
        let mut tlb = Tlb::new(2);
        tlb.insert(1, resident(0));
        tlb.lookup(1);
        tlb.lookup(1);
        tlb.lookup(1);
        tlb.lookup(2);
        assert!((tlb.stats().hit_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
