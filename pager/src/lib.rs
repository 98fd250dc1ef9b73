//! Demand-paged virtual memory simulator.
//!
//! Replays a trace of logical memory accesses through a FIFO translation
//! cache, a single-level page table with FIFO frame replacement, and a
//! write-back backing store.

pub mod address;
pub mod config;
pub mod error;
pub mod memory;
pub mod page_table;
pub mod report;
pub mod store;
pub mod tlb;
pub mod trace;
pub mod translator;

pub use address::{AddressLayout, LogicalAddress};
pub use config::{ConfigError, PagerConfig};
pub use error::PagerError;
pub use memory::{MemoryError, PhysicalMemory};
pub use page_table::{PageTable, Pte, Resolution};
pub use report::{AccessRecord, Summary};
pub use store::{BackingStore, StoreError};
pub use tlb::{Tlb, TlbEntry, TlbStats};
pub use trace::{TraceError, TraceReader};
pub use translator::Translator;
