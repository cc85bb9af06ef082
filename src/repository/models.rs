use std::sync::Arc;

use crate::{
    gtfs::{GtfsRoute, GtfsStop},
    shared::geo::Coordinate,
};

/// GTFS `location_type` classification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LocationType {
    /// A stop or a platform (`0` or empty).
    #[default]
    Stop,
    /// A station grouping platforms (`1`).
    Station,
    /// A station entrance or exit (`2`).
    Entrance,
    /// A generic node inside a station (`3`).
    Node,
    /// A boarding area on a platform (`4`).
    Boarding,
}

impl From<Option<u8>> for LocationType {
    fn from(value: Option<u8>) -> Self {
        match value {
            Some(1) => Self::Station,
            Some(2) => Self::Entrance,
            Some(3) => Self::Node,
            Some(4) => Self::Boarding,
            _ => Self::Stop,
        }
    }
}

/// A row of `stops.txt`. For this crate most of these are platforms.
#[derive(Debug, Default, Clone)]
pub struct Stop {
    pub index: u32,
    pub id: Arc<str>,
    pub name: Option<Arc<str>>,
    /// Platform identifier shown to riders (e.g. "2" or "4B").
    pub platform_code: Option<Arc<str>>,
    pub coordinate: Option<Coordinate>,
    pub location_type: LocationType,
    /// Index of the parent station, resolved after every stop is loaded.
    pub parent_idx: Option<u32>,
}

impl From<GtfsStop> for Stop {
    fn from(value: GtfsStop) -> Self {
        let coordinate = match (value.stop_lat, value.stop_lon) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        };
        Self {
            index: u32::MAX,
            id: value.stop_id.into(),
            name: value.stop_name.map(|val| val.into()),
            platform_code: value.platform_code.map(|val| val.into()),
            coordinate,
            location_type: value.location_type.into(),
            parent_idx: None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Route {
    pub index: u32,
    pub id: Arc<str>,
    pub short_name: Option<Arc<str>>,
    pub long_name: Option<Arc<str>>,
}

impl From<GtfsRoute> for Route {
    fn from(value: GtfsRoute) -> Self {
        Self {
            index: u32::MAX,
            id: value.route_id.into(),
            short_name: value.route_short_name.map(|val| val.into()),
            long_name: value.route_long_name.map(|val| val.into()),
        }
    }
}

impl Route {
    /// Long name, then short name, then the bare id.
    pub fn display_name(&self) -> Arc<str> {
        self.long_name
            .as_ref()
            .or(self.short_name.as_ref())
            .unwrap_or(&self.id)
            .clone()
    }
}

#[derive(Debug, Default, Clone)]
pub struct Trip {
    pub index: u32,
    pub id: Arc<str>,
    /// Pointer to the parent [`Route`].
    pub route_idx: u32,
    pub service_id: Arc<str>,
}

/// One call of a trip at a stop, with the clocks kept as published.
///
/// Clocks are parsed later so that malformed values can be counted where they
/// are actually used.
#[derive(Debug, Default, Clone)]
pub struct StopTime {
    pub index: u32,
    pub trip_idx: u32,
    /// Raw platform id; it may not exist in `stops.txt`.
    pub stop_id: Arc<str>,
    pub sequence: u32,
    pub arrival_time: Option<Arc<str>>,
    pub departure_time: Option<Arc<str>>,
}

/// A contiguous range within the global `stop_times` array.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub start_idx: u32,
    pub count: u32,
}

impl Slice {
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.start_idx as usize;
        start..start + self.count as usize
    }
}
