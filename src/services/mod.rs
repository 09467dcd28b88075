//! Services module for Git-Quill
//!
//! Everything downstream of the prompt:
//! - `GenerationOrchestrator` - concurrent backend fan-out and merging
//! - `ResponseParser` - structured options from free-form text
//! - `Sorter` - canonical option order
//! - `MessageSlot` - the pending commit message write

pub mod orchestrator;
pub mod parser;
pub mod slot;
pub mod sorter;

pub use orchestrator::{
    BranchRecord, BranchStatus, GenerationOrchestrator, GenerationResult, InvocationStatus,
};
pub use parser::{ParseMode, ParseReport, ResponseParser};
pub use slot::{GitMessageFile, MessageSlot};
pub use sorter::{RankedOption, Sorter};
