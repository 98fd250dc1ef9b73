//! Per-access records and the end-of-run summary.

use std::fmt;

use serde::Serialize;

/// Outcome of translating one trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    pub logical: u32,
    pub physical: usize,
    /// Byte at the physical address after the access, read as signed
    pub value: i8,
    /// Dirty flag of the translation used for the access
    pub dirty: bool,
    pub tlb_hit: bool,
    pub page_fault: bool,
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:04X} 0x{:04X} {} {}",
            self.logical,
            self.physical,
            self.value,
            u8::from(self.dirty)
        )
    }
}

/// Counters collected over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub entries: u64,
    pub page_faults: u64,
    pub tlb_hits: u64,
    pub dirty_pages: usize,
    pub evictions: u64,
    pub write_backs: u64,
    pub page_fault_rate: f64,
    pub tlb_hit_rate: f64,
}

impl Summary {
    pub fn new(
        entries: u64,
        page_faults: u64,
        tlb_hits: u64,
        dirty_pages: usize,
        evictions: u64,
        write_backs: u64,
    ) -> Self {
        Self {
            entries,
            page_faults,
            tlb_hits,
            dirty_pages,
            evictions,
            write_backs,
            page_fault_rate: ratio(page_faults, entries),
            tlb_hit_rate: ratio(tlb_hits, entries),
        }
    }

    pub fn tlb_misses(&self) -> u64 {
        self.entries - self.tlb_hits
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn ratio(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Page-fault rate: {:.6}", self.page_fault_rate)?;
        writeln!(f, "TLB hit rate: {:.6}", self.tlb_hit_rate)?;
        write!(f, "Number of dirty pages: {}", self.dirty_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_format() {
        let record = AccessRecord {
            logical: 0x0100,
            physical: 0x0000,
            value: 1,
            dirty: true,
            tlb_hit: true,
            page_fault: false,
        };
        assert_eq!(record.to_string(), "0x0100 0x0000 1 1");
    }

    #[test]
    fn test_record_negative_value() {
        let record = AccessRecord {
            logical: 0xFFFF,
            physical: 0x7FFF,
            value: -128,
            dirty: false,
            tlb_hit: false,
            page_fault: true,
        };
        assert_eq!(record.to_string(), "0xFFFF 0x7FFF -128 0");
    }

    #[test]
    fn test_summary_rates() {
        let summary = Summary::new(3, 2, 1, 1, 0, 0);
        assert!((summary.page_fault_rate - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!((summary.tlb_hit_rate - 1.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(summary.tlb_misses(), 2);
        assert_eq!(
            summary.to_string(),
            "Page-fault rate: 0.666667\nTLB hit rate: 0.333333\nNumber of dirty pages: 1"
        );
    }

    #[test]
    fn test_empty_run_rates_are_zero() {
        let summary = Summary::new(0, 0, 0, 0, 0, 0);
        assert_eq!(summary.page_fault_rate, 0.0);
        assert_eq!(summary.tlb_hit_rate, 0.0);
    }

    #[test]
    fn test_summary_json() {
        let json = Summary::new(4, 1, 3, 0, 0, 0).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["entries"], 4);
        assert_eq!(value["tlbHits"], 3);
        assert_eq!(value["pageFaultRate"], 0.25);
    }
}
