//! This module is responsible for turning street-segment records into an
//! immutable routable graph.

mod builder;
mod config;
mod segments;

pub use builder::{BuildReport, build_street_graph};
pub use config::NetworkConfig;
pub use segments::{MalformedSegment, SegmentDefect, StreetSegment};
