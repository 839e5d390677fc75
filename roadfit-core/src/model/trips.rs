//! Observed travel-time samples and time-slice filters

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::{AreaId, Seconds};

/// When an observed trip started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripTag {
    pub weekday: Weekday,
    /// Start hour, 0..24
    pub hour: u8,
}

/// Observed travel time between two areas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedTrip {
    pub origin: AreaId,
    pub destination: AreaId,
    pub duration: Seconds,
    #[serde(default)]
    pub tag: Option<TripTag>,
}

impl ObservedTrip {
    pub fn new(origin: AreaId, destination: AreaId, duration: Seconds) -> Self {
        Self {
            origin,
            destination,
            duration,
            tag: None,
        }
    }

    pub fn with_tag(mut self, weekday: Weekday, hour: u8) -> Self {
        self.tag = Some(TripTag { weekday, hour });
        self
    }
}

/// Weekday and time-of-day filter selecting the trips of one scenario.
///
/// `hours = [start, end]` keeps trips starting in `start <= hour < end`; when
/// `start > end` the window wraps around midnight. A trip without tag only
/// matches a slice that has neither filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlice {
    pub name: String,
    #[serde(default)]
    pub weekdays: Option<Vec<Weekday>>,
    #[serde(default)]
    pub hours: Option<[u8; 2]>,
}

impl Default for TimeSlice {
    fn default() -> Self {
        Self::all()
    }
}

impl TimeSlice {
    pub fn all() -> Self {
        Self {
            name: "all".to_string(),
            weekdays: None,
            hours: None,
        }
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weekdays: None,
            hours: None,
        }
    }

    pub fn on_days(mut self, weekdays: &[Weekday]) -> Self {
        self.weekdays = Some(weekdays.to_vec());
        self
    }

    pub fn between_hours(mut self, start: u8, end: u8) -> Self {
        self.hours = Some([start, end]);
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.weekdays.is_none() && self.hours.is_none()
    }

    pub fn matches(&self, trip: &ObservedTrip) -> bool {
        if self.is_unfiltered() {
            return true;
        }
        let Some(tag) = trip.tag else {
            return false;
        };

        let day_ok = self
            .weekdays
            .as_ref()
            .is_none_or(|days| days.contains(&tag.weekday));
        let hour_ok = self.hours.is_none_or(|[start, end]| {
            if start <= end {
                (start..end).contains(&tag.hour)
            } else {
                tag.hour >= start || tag.hour < end
            }
        });

        day_ok && hour_ok
    }
}
