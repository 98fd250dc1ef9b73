use thiserror::Error;

use crate::config::ConfigError;
use crate::memory::MemoryError;
use crate::store::StoreError;
use crate::trace::TraceError;

/// Anything that can stop a simulation run.
#[derive(Debug, Error)]
pub enum PagerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Trace(#[from] TraceError),
    #[error("virtual page {0} is outside the page table")]
    PageOutOfRange(usize),
    #[error("page {0} resolved without a frame")]
    NotResident(usize),
    #[error("cannot write report: {0}")]
    Output(#[source] std::io::Error),
}
