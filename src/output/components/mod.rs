//! Rich renderables for harness output.

mod summary;
mod verdict_table;

pub use summary::{SummaryPanel, TimingTable};
pub use verdict_table::VerdictTable;
