use std::fmt;

use geo::{Euclidean, Length as _, LineString, Point};
use serde::{Deserialize, Serialize};

use crate::{Length, NodeId, SegmentId, StreetType};

/// Street segment record as delivered by the ingestion collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct StreetSegment {
    pub id: SegmentId,
    pub from: NodeId,
    pub to: NodeId,
    /// Projected geometry in meters, ordered from `from` to `to`
    pub geometry: LineString<f64>,
    /// Measured length; the geometry length is used when absent
    pub length: Option<Length>,
    pub street_type: StreetType,
    /// Two-way segments produce a symmetric pair of edges
    pub bidirectional: bool,
}

/// Why a segment was left out of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentDefect {
    MissingCoordinates,
    NonFiniteCoordinates,
    InvalidLength,
    DegenerateLoop,
}

impl fmt::Display for SegmentDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SegmentDefect::MissingCoordinates => "fewer than two coordinates",
            SegmentDefect::NonFiniteCoordinates => "non-finite coordinates",
            SegmentDefect::InvalidLength => "non-finite or negative length",
            SegmentDefect::DegenerateLoop => "zero-length self loop",
        };
        f.write_str(reason)
    }
}

/// A segment rejected during graph construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalformedSegment {
    pub segment: SegmentId,
    pub defect: SegmentDefect,
}

impl StreetSegment {
    /// Two-point segment between `from` and `to`
    pub fn straight(
        id: SegmentId,
        (from, from_xy): (NodeId, (f64, f64)),
        (to, to_xy): (NodeId, (f64, f64)),
        street_type: StreetType,
        bidirectional: bool,
    ) -> Self {
        Self {
            id,
            from,
            to,
            geometry: LineString::from(vec![from_xy, to_xy]),
            length: None,
            street_type,
            bidirectional,
        }
    }

    pub fn with_length(mut self, length: Length) -> Self {
        self.length = Some(length);
        self
    }

    /// Endpoints of the geometry
    pub(crate) fn endpoints(&self) -> Option<(Point<f64>, Point<f64>)> {
        let first = self.geometry.0.first()?;
        let last = self.geometry.0.last()?;
        Some(((*first).into(), (*last).into()))
    }

    /// Validated length of the segment
    pub(crate) fn checked_length(&self) -> Result<Length, SegmentDefect> {
        if self.geometry.0.len() < 2 {
            return Err(SegmentDefect::MissingCoordinates);
        }
        if self
            .geometry
            .coords()
            .any(|coord| !coord.x.is_finite() || !coord.y.is_finite())
        {
            return Err(SegmentDefect::NonFiniteCoordinates);
        }

        let length = self
            .length
            .unwrap_or_else(|| Euclidean.length(&self.geometry));
        if !length.is_finite() || length < 0.0 {
            return Err(SegmentDefect::InvalidLength);
        }
        if self.from == self.to && length == 0.0 {
            return Err(SegmentDefect::DegenerateLoop);
        }
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(coords: Vec<(f64, f64)>) -> StreetSegment {
        StreetSegment {
            id: 1,
            from: 10,
            to: 11,
            geometry: LineString::from(coords),
            length: None,
            street_type: StreetType::Local,
            bidirectional: true,
        }
    }

    #[test]
    fn length_from_geometry() {
        let seg = segment(vec![(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);
        assert!((seg.checked_length().unwrap() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_length_wins() {
        let seg = segment(vec![(0.0, 0.0), (3.0, 4.0)]).with_length(7.5);
        assert_eq!(seg.checked_length(), Ok(7.5));
    }

    #[test]
    fn defects() {
        assert_eq!(
            segment(vec![(0.0, 0.0)]).checked_length(),
            Err(SegmentDefect::MissingCoordinates)
        );
        assert_eq!(
            segment(vec![(0.0, 0.0), (f64::NAN, 1.0)]).checked_length(),
            Err(SegmentDefect::NonFiniteCoordinates)
        );
        assert_eq!(
            segment(vec![(0.0, 0.0), (1.0, 1.0)])
                .with_length(f64::INFINITY)
                .checked_length(),
            Err(SegmentDefect::InvalidLength)
        );
        let mut looped = segment(vec![(1.0, 1.0), (1.0, 1.0)]);
        looped.to = looped.from;
        assert_eq!(looped.checked_length(), Err(SegmentDefect::DegenerateLoop));
    }
}
