use std::{collections::HashMap, sync::Arc};

mod models;
mod source;
pub use models::*;

use crate::diagnostics::Diagnostics;

/// Indexed, read-only view of the parts of a GTFS feed the compactor needs.
///
/// Every entity carries its own `index` so lookups by id resolve to plain
/// array accesses after the first hash lookup.
#[derive(Debug, Clone, Default)]
pub struct Repository {
    pub stops: Box<[Stop]>,
    pub routes: Box<[Route]>,
    pub trips: Box<[Trip]>,
    pub stop_times: Box<[StopTime]>,
    /// Problems found while loading the feed.
    pub diagnostics: Diagnostics,

    stop_lookup: HashMap<Arc<str>, u32>,
    route_lookup: HashMap<Arc<str>, u32>,
    trip_lookup: HashMap<Arc<str>, u32>,
    station_to_stops: Box<[Box<[u32]>]>,
    trip_to_stop_times_slice: Box<[Slice]>,
}

impl Repository {
    pub fn new() -> Self {
        Default::default()
    }

    /// Get a stop with the given id.
    /// If no stop is found with the given id None is returned.
    pub fn stop_by_id(&self, id: &str) -> Option<&Stop> {
        let index = self.stop_lookup.get(id)?;
        Some(&self.stops[*index as usize])
    }

    pub fn route_by_id(&self, id: &str) -> Option<&Route> {
        let index = self.route_lookup.get(id)?;
        Some(&self.routes[*index as usize])
    }

    pub fn route_by_trip(&self, trip: &Trip) -> &Route {
        &self.routes[trip.route_idx as usize]
    }

    pub fn trip_by_id(&self, id: &str) -> Option<&Trip> {
        let index = self.trip_lookup.get(id)?;
        Some(&self.trips[*index as usize])
    }

    /// Stops whose `parent_station` is the stop at `station_idx`.
    pub fn stops_by_station_idx(&self, station_idx: u32) -> &[u32] {
        self.station_to_stops
            .get(station_idx as usize)
            .map(|stops| stops.as_ref())
            .unwrap_or_default()
    }

    /// Returns the stop times of a trip ordered by `stop_sequence`.
    pub fn stop_times_by_trip_idx(&self, trip_idx: u32) -> &[StopTime] {
        match self.trip_to_stop_times_slice.get(trip_idx as usize) {
            Some(slice) => &self.stop_times[slice.range()],
            None => &[],
        }
    }
}
