//! Data model for area-level travel-time fitting
//!
//! Contains the street graph, the node to area lookup and observed trips.

pub mod areas;
pub mod streets;
pub mod trips;

pub use areas::NodeAreaLookup;
pub use streets::{StreetEdge, StreetGraph, StreetNode, StreetType, WeightMode};
pub use trips::{ObservedTrip, TimeSlice, TripTag};
