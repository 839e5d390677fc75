//! Core of the traffic-density estimator.
//!
//! Builds a routable street graph from segment records, routes observed
//! origin/destination area pairs, decomposes each path into per-area distance
//! and fits one bounded coefficient (seconds per meter) per area.

pub mod aggregate;
pub mod error;
pub mod fit;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;

pub use error::Error;

/// External identifier of a street-graph node (crossing)
pub type NodeId = u64;
/// External identifier of a street segment
pub type SegmentId = u64;
/// Identifier of an area polygon
pub type AreaId = u32;
/// Meters
pub type Length = f64;
/// Seconds
pub type Seconds = f64;

pub use aggregate::{AreaTraversal, PairSummary, PairSummaryTable, aggregate, summarize_area_pairs};
pub use fit::{CoefficientReport, DesignMatrix, FitConfig, fit_coefficients, fit_slices};
pub use loading::{BuildReport, NetworkConfig, StreetSegment, build_street_graph};
pub use model::{NodeAreaLookup, ObservedTrip, StreetGraph, StreetType, TimeSlice, WeightMode};
pub use routing::{Path, PathCache, SearchBudget, shortest_path, shortest_paths_from};
