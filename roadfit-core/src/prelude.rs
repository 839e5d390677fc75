// Re-export key components
pub use crate::aggregate::{
    AreaTraversal, MissingPair, MissingReason, PairSummary, PairSummaryTable, aggregate,
    summarize_area_pairs,
};
pub use crate::fit::{
    AreaCoefficient, AreaDiagnostics, CoefficientReport, DesignMatrix, Estimate, FitConfig,
    SliceFit, build_design_matrix, fit_coefficients, fit_slice, fit_slices,
};
pub use crate::loading::{BuildReport, NetworkConfig, StreetSegment, build_street_graph};
pub use crate::model::{
    NodeAreaLookup, ObservedTrip, StreetEdge, StreetGraph, StreetNode, StreetType, TimeSlice,
    TripTag, WeightMode,
};
pub use crate::routing::{
    BatchResult, Path, PathCache, RoutingConfig, SearchBudget, route_pairs, shortest_path,
    shortest_path_cached, shortest_paths_from,
};

// Core identifier and unit types
pub use crate::AreaId;
pub use crate::Error;
pub use crate::Length; // meters
pub use crate::NodeId;
pub use crate::Seconds;
pub use crate::SegmentId;
