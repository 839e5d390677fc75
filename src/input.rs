//! CSV readers for segments, node areas and observed trips.
//!
//! Unreadable rows are skipped and counted; only a missing or unreadable file
//! or header fails the whole read.

use std::fs::File;
use std::io;
use std::path::Path;

use chrono::Weekday;
use geo::LineString;
use roadfit_core::loading::StreetSegment;
use roadfit_core::model::{NodeAreaLookup, ObservedTrip, StreetType};
use roadfit_core::{AreaId, Length, NodeId, Seconds, SegmentId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use wkt::TryFromWkt;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
struct SegmentRecord {
    id: SegmentId,
    from: NodeId,
    to: NodeId,
    #[serde(default)]
    street_type: String,
    #[serde(default)]
    length: Option<Length>,
    #[serde(default)]
    oneway: Option<String>,
    /// WKT `LINESTRING` in a projected metric CRS
    geometry: String,
}

#[derive(Debug, Deserialize)]
struct NodeAreaRecord {
    node: NodeId,
    area: Option<AreaId>,
}

#[derive(Debug, Deserialize)]
struct TripRecord {
    origin: AreaId,
    destination: AreaId,
    duration: Seconds,
    #[serde(default)]
    weekday: Option<String>,
    #[serde(default)]
    hour: Option<u8>,
}

fn read_records<T, R>(reader: R, kind: &str) -> Result<Vec<T>, csv::Error>
where
    T: DeserializeOwned,
    R: io::Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    reader.headers()?;

    let mut rejected = 0usize;
    let records: Vec<T> = reader
        .deserialize()
        .filter_map(|row| match row {
            Ok(record) => Some(record),
            Err(err) => {
                rejected += 1;
                debug!("Skipping {kind} row: {err}");
                None
            }
        })
        .collect();
    if rejected > 0 {
        warn!("Skipped {rejected} unreadable {kind} rows");
    }
    Ok(records)
}

fn is_oneway(flag: Option<&str>) -> bool {
    matches!(
        flag.map(str::to_ascii_lowercase).as_deref(),
        Some("yes" | "true" | "1" | "y")
    )
}

impl From<SegmentRecord> for StreetSegment {
    fn from(record: SegmentRecord) -> Self {
        // An unparsable geometry is left empty so graph building reports the segment
        let geometry = LineString::<f64>::try_from_wkt_str(&record.geometry).unwrap_or_else(|err| {
            debug!("Segment {} has unreadable geometry: {err}", record.id);
            LineString::new(Vec::new())
        });
        StreetSegment {
            id: record.id,
            from: record.from,
            to: record.to,
            geometry,
            length: record.length,
            street_type: StreetType::from(record.street_type.as_str()),
            bidirectional: !is_oneway(record.oneway.as_deref()),
        }
    }
}

pub fn read_segments<R: io::Read>(reader: R) -> Result<Vec<StreetSegment>, csv::Error> {
    let records: Vec<SegmentRecord> = read_records(reader, "segment")?;
    Ok(records.into_iter().map(StreetSegment::from).collect())
}

/// Rows with an empty area leave the node unassigned
pub fn read_node_areas<R: io::Read>(reader: R) -> Result<NodeAreaLookup, csv::Error> {
    let records: Vec<NodeAreaRecord> = read_records(reader, "node area")?;
    Ok(records
        .into_iter()
        .filter_map(|r| r.area.map(|area| (r.node, area)))
        .collect())
}

fn trip_from_record(record: TripRecord) -> Result<ObservedTrip, String> {
    let trip = ObservedTrip::new(record.origin, record.destination, record.duration);
    match (record.weekday.as_deref(), record.hour) {
        (None | Some(""), None) => Ok(trip),
        (Some(day), Some(hour)) if hour < 24 => {
            let weekday = day
                .parse::<Weekday>()
                .map_err(|_| format!("unknown weekday '{day}'"))?;
            Ok(trip.with_tag(weekday, hour))
        }
        (day, hour) => Err(format!(
            "incomplete or invalid time tag (weekday {day:?}, hour {hour:?})"
        )),
    }
}

/// Trips with a partial or invalid time tag are skipped
pub fn read_trips<R: io::Read>(reader: R) -> Result<Vec<ObservedTrip>, csv::Error> {
    let records: Vec<TripRecord> = read_records(reader, "trip")?;
    let total = records.len();
    let trips: Vec<ObservedTrip> = records
        .into_iter()
        .filter_map(|record| {
            let (origin, destination) = (record.origin, record.destination);
            trip_from_record(record)
                .map_err(|err| debug!("Skipping trip {origin} -> {destination}: {err}"))
                .ok()
        })
        .collect();
    if trips.len() < total {
        warn!("Skipped {} trips with invalid time tags", total - trips.len());
    }
    Ok(trips)
}

fn open(path: &Path) -> Result<File, AppError> {
    File::open(path).map_err(AppError::io(path))
}

pub fn load_segments(path: &Path) -> Result<Vec<StreetSegment>, AppError> {
    let segments = read_segments(open(path)?).map_err(AppError::csv(path))?;
    info!("Read {} street segments from {}", segments.len(), path.display());
    Ok(segments)
}

pub fn load_node_areas(path: &Path) -> Result<NodeAreaLookup, AppError> {
    let lookup = read_node_areas(open(path)?).map_err(AppError::csv(path))?;
    info!("Read areas of {} nodes from {}", lookup.len(), path.display());
    Ok(lookup)
}

pub fn load_trips(path: &Path) -> Result<Vec<ObservedTrip>, AppError> {
    let trips = read_trips(open(path)?).map_err(AppError::csv(path))?;
    info!("Read {} observed trips from {}", trips.len(), path.display());
    Ok(trips)
}
