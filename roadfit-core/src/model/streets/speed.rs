//! Nominal speeds per street category.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Length, Seconds};

/// Closed set of street categories known to the speed model.
///
/// Parsing never fails: codes that are not recognised become [`StreetType::Unknown`],
/// which carries a conservative default speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreetType {
    Motorway,
    Federal,
    Main,
    Secondary,
    Local,
    Service,
    /// Footways, stairs, cycleways; never part of the vehicular graph
    NonVehicular,
    Unknown,
}

impl StreetType {
    pub const DEFAULT_SPEED_KMH: f64 = 30.0;

    /// Nominal speed in km/h, `None` for categories closed to vehicles
    pub fn speed_kmh(self) -> Option<f64> {
        match self {
            StreetType::Motorway => Some(100.0),
            StreetType::Federal => Some(70.0),
            StreetType::Main => Some(50.0),
            StreetType::Secondary => Some(40.0),
            StreetType::Local => Some(30.0),
            StreetType::Service => Some(15.0),
            StreetType::NonVehicular => None,
            StreetType::Unknown => Some(Self::DEFAULT_SPEED_KMH),
        }
    }

    pub fn is_vehicular(self) -> bool {
        self.speed_kmh().is_some()
    }

    /// Free-flow traversal time of `length` meters, `None` for non-vehicular categories
    pub fn travel_time(self, length: Length) -> Option<Seconds> {
        self.speed_kmh().map(|kmh| length / (kmh / 3.6))
    }

    fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "motorway" | "motorway_link" | "a" | "s" => StreetType::Motorway,
            "b" | "federal" | "federal-street" | "trunk" | "trunk_link" => StreetType::Federal,
            "l" | "main" | "main-street" | "primary" | "primary_link" => StreetType::Main,
            "secondary" | "secondary_link" | "tertiary" | "tertiary_link" => {
                StreetType::Secondary
            }
            "g" | "local" | "local-street" | "residential" | "unclassified" | "living_street" => {
                StreetType::Local
            }
            "service" => StreetType::Service,
            "footway" | "path" | "steps" | "pedestrian" | "cycleway" | "sidewalk" | "stairs"
            | "track" | "bridleway" => StreetType::NonVehicular,
            _ => StreetType::Unknown,
        }
    }
}

impl FromStr for StreetType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_code(s))
    }
}

impl From<&str> for StreetType {
    fn from(code: &str) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for StreetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreetType::Motorway => "motorway",
            StreetType::Federal => "federal",
            StreetType::Main => "main",
            StreetType::Secondary => "secondary",
            StreetType::Local => "local",
            StreetType::Service => "service",
            StreetType::NonVehicular => "non_vehicular",
            StreetType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vienna_categories() {
        assert_eq!(StreetType::from("G"), StreetType::Local);
        assert_eq!(StreetType::from("L"), StreetType::Main);
        assert_eq!(StreetType::from("B"), StreetType::Federal);
        assert_eq!(StreetType::Local.speed_kmh(), Some(30.0));
        assert_eq!(StreetType::Main.speed_kmh(), Some(50.0));
        assert_eq!(StreetType::Federal.speed_kmh(), Some(70.0));
    }

    #[test]
    fn speeds_are_ordered_by_category() {
        let ordered = [
            StreetType::Motorway,
            StreetType::Main,
            StreetType::Secondary,
            StreetType::Local,
            StreetType::Service,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].speed_kmh() > pair[1].speed_kmh(), "{pair:?}");
        }
    }

    #[test]
    fn unknown_codes_get_default_speed() {
        let street_type: StreetType = "zz-not-a-road".parse().unwrap();
        assert_eq!(street_type, StreetType::Unknown);
        assert_eq!(street_type.speed_kmh(), Some(StreetType::DEFAULT_SPEED_KMH));
    }

    #[test]
    fn footways_are_not_vehicular() {
        assert!(!StreetType::from("steps").is_vehicular());
        assert_eq!(StreetType::from("footway").travel_time(100.0), None);
    }

    #[test]
    fn travel_time_from_speed() {
        // 30 km/h over 300 m
        let time = StreetType::Local.travel_time(300.0).unwrap();
        assert!((time - 36.0).abs() < 1e-9);
    }
}
