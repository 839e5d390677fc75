//! Street network components - nodes, edges and weight modes

use geo::Point;
use serde::{Deserialize, Serialize};

use super::speed::StreetType;
use crate::{Length, NodeId, Seconds, SegmentId};

/// Street graph node (crossing)
#[derive(Debug, Clone, PartialEq)]
pub struct StreetNode {
    /// External identifier of the crossing
    pub id: NodeId,
    /// Projected coordinates in meters
    pub geometry: Point<f64>,
}

/// Street graph edge, one direction of a street segment
#[derive(Debug, Clone, PartialEq)]
pub struct StreetEdge {
    /// Segment this edge was derived from
    pub segment: SegmentId,
    pub length: Length,
    /// Free-flow traversal time at the nominal speed of `street_type`
    pub travel_time: Seconds,
    pub street_type: StreetType,
}

impl StreetEdge {
    pub fn weight(&self, mode: WeightMode) -> f64 {
        match mode {
            WeightMode::Distance => self.length,
            WeightMode::Time => self.travel_time,
        }
    }
}

/// Quantity minimised by the router
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMode {
    Distance,
    #[default]
    Time,
}
