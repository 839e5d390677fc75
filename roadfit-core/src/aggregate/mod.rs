//! Decomposition of routed paths into per-area distance and time

mod pairs;
mod traversal;

pub use pairs::{MissingPair, MissingReason, PairSummary, PairSummaryTable, summarize_area_pairs};
pub use traversal::{AreaShare, AreaTraversal, aggregate};
