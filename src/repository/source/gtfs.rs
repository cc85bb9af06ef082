use crate::{
    diagnostics::Diagnostics,
    gtfs::{self, GtfsReader},
    repository::{Repository, Route, Slice, Stop, StopTime, Trip},
};
use rayon::prelude::*;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Instant,
};
use tracing::{debug, warn};

impl Repository {
    /// Streams the feed into the repository.
    ///
    /// Missing tables and malformed rows are recorded in
    /// [`Repository::diagnostics`]; only I/O or archive failures are returned.
    pub fn load_gtfs(mut self, gtfs: GtfsReader) -> Result<Self, gtfs::Error> {
        self.load_stops(&gtfs)?;
        self.load_routes(&gtfs)?;
        self.load_trips(&gtfs)?;
        self.load_stop_times(&gtfs)?;
        Ok(self)
    }

    fn load_stops(&mut self, gtfs: &GtfsReader) -> Result<(), gtfs::Error> {
        debug!("Loading stops...");
        let now = Instant::now();
        let mut stop_lookup: HashMap<Arc<str>, u32> = HashMap::new();
        let mut stops: Vec<(Stop, Option<String>)> = Vec::new();
        let result = gtfs.stream_stops(|(_, mut stop)| {
            let parent_station = stop.parent_station.take();
            let mut value: Stop = stop.into();
            value.index = stops.len() as u32;
            stop_lookup.insert(value.id.clone(), value.index);
            stops.push((value, parent_station));
        });
        tally(result, "stops", &mut self.diagnostics)?;

        let mut station_to_stops: Vec<Vec<u32>> = vec![Vec::new(); stops.len()];
        stops
            .iter_mut()
            .filter_map(|(stop, parent_station)| {
                let parent_idx = stop_lookup.get(parent_station.as_deref()?)?;
                Some((*parent_idx, stop))
            })
            .for_each(|(parent_idx, stop)| {
                station_to_stops[parent_idx as usize].push(stop.index);
                stop.parent_idx = Some(parent_idx);
            });

        self.stops = stops.into_iter().map(|(stop, _)| stop).collect();
        self.stop_lookup = stop_lookup;
        self.station_to_stops = station_to_stops
            .into_iter()
            .map(|stops| stops.into())
            .collect();
        debug!("Loading stops took {:?}", now.elapsed());
        Ok(())
    }

    fn load_routes(&mut self, gtfs: &GtfsReader) -> Result<(), gtfs::Error> {
        debug!("Loading routes...");
        let now = Instant::now();
        let mut route_lookup: HashMap<Arc<str>, u32> = HashMap::new();
        let mut routes: Vec<Route> = Vec::new();
        let result = gtfs.stream_routes(|(_, route)| {
            let mut value: Route = route.into();
            value.index = routes.len() as u32;
            route_lookup.insert(value.id.clone(), value.index);
            routes.push(value);
        });
        tally(result, "routes", &mut self.diagnostics)?;
        self.routes = routes.into();
        self.route_lookup = route_lookup;
        debug!("Loading routes took {:?}", now.elapsed());
        Ok(())
    }

    fn load_trips(&mut self, gtfs: &GtfsReader) -> Result<(), gtfs::Error> {
        debug!("Loading trips...");
        let now = Instant::now();
        let mut trip_lookup: HashMap<Arc<str>, u32> = HashMap::new();
        let mut service_ids: HashSet<Arc<str>> = HashSet::new();
        let mut trips: Vec<Trip> = Vec::new();
        let mut unknown_routes = 0;
        let result = gtfs.stream_trips(|(_, trip)| {
            let Some(route_idx) = self.route_lookup.get(trip.route_id.as_str()) else {
                unknown_routes += 1;
                return;
            };
            let service_id = intern(&mut service_ids, trip.service_id);
            let value = Trip {
                index: trips.len() as u32,
                id: trip.trip_id.into(),
                route_idx: *route_idx,
                service_id,
            };
            trip_lookup.insert(value.id.clone(), value.index);
            trips.push(value);
        });
        tally(result, "trips", &mut self.diagnostics)?;
        self.diagnostics.unknown_routes += unknown_routes;
        self.trips = trips.into();
        self.trip_lookup = trip_lookup;
        debug!("Loading trips took {:?}", now.elapsed());
        Ok(())
    }

    fn load_stop_times(&mut self, gtfs: &GtfsReader) -> Result<(), gtfs::Error> {
        debug!("Loading stop times...");
        let now = Instant::now();
        // Feeds are usually grouped by trip but nothing guarantees it,
        // so bucket by trip first and lay the buckets out afterwards.
        let mut buckets: Vec<Vec<StopTime>> = vec![Vec::new(); self.trips.len()];
        let mut unknown_stops: HashSet<Arc<str>> = HashSet::new();
        let mut unknown_trips = 0;
        let result = gtfs.stream_stop_times(|(_, stop_time)| {
            let Some(trip_idx) = self.trip_lookup.get(stop_time.trip_id.as_str()) else {
                unknown_trips += 1;
                return;
            };
            let stop_id = match self.stop_lookup.get(stop_time.stop_id.as_str()) {
                Some(stop_idx) => self.stops[*stop_idx as usize].id.clone(),
                None => intern(&mut unknown_stops, stop_time.stop_id),
            };
            buckets[*trip_idx as usize].push(StopTime {
                index: u32::MAX,
                trip_idx: *trip_idx,
                stop_id,
                sequence: stop_time.stop_sequence,
                arrival_time: stop_time.arrival_time.map(|val| val.into()),
                departure_time: stop_time.departure_time.map(|val| val.into()),
            });
        });
        tally(result, "stop_times", &mut self.diagnostics)?;
        self.diagnostics.unknown_trips += unknown_trips;

        buckets
            .par_iter_mut()
            .for_each(|bucket| bucket.sort_by_key(|st| st.sequence));

        let mut start_idx = 0;
        let mut slices: Vec<Slice> = Vec::with_capacity(buckets.len());
        let mut stop_times: Vec<StopTime> = Vec::new();
        buckets.into_iter().for_each(|mut bucket| {
            let slice = Slice {
                start_idx,
                count: bucket.len() as u32,
            };
            bucket.iter_mut().enumerate().for_each(|(j, st)| {
                st.index = slice.start_idx + j as u32;
            });
            start_idx += slice.count;
            slices.push(slice);
            stop_times.append(&mut bucket);
        });

        self.stop_times = stop_times.into();
        self.trip_to_stop_times_slice = slices.into();
        debug!("Loading stop times took {:?}", now.elapsed());
        Ok(())
    }
}

/// Folds the outcome of one table stream into the diagnostics. A missing table
/// is tolerated, anything else is passed on.
fn tally(
    result: Result<usize, gtfs::Error>,
    table: &str,
    diagnostics: &mut Diagnostics,
) -> Result<(), gtfs::Error> {
    match result {
        Ok(skipped) => {
            diagnostics.malformed_rows += skipped;
            Ok(())
        }
        Err(gtfs::Error::FileNotFound(name)) => {
            warn!("Feed has no {table} table ({name}), continuing without it");
            diagnostics.missing_tables += 1;
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn intern(pool: &mut HashSet<Arc<str>>, value: String) -> Arc<str> {
    if let Some(existing) = pool.get(value.as_str()) {
        return existing.clone();
    }
    let value: Arc<str> = value.into();
    pool.insert(value.clone());
    value
}

#[cfg(test)]
mod tests {
    use crate::{
        gtfs::{GtfsData, GtfsReader, GtfsRoute, GtfsStop, GtfsStopTime, GtfsTrip},
        repository::Repository,
    };

    fn stop_time(trip: &str, stop: &str, sequence: u32) -> GtfsStopTime {
        GtfsStopTime {
            trip_id: trip.into(),
            arrival_time: Some("06:00:00".into()),
            departure_time: Some("06:00:00".into()),
            stop_id: stop.into(),
            stop_sequence: sequence,
        }
    }

    #[test]
    fn stop_times_are_grouped_and_sorted_per_trip() {
        let data = GtfsData {
            stops: vec![
                GtfsStop {
                    stop_id: "S".into(),
                    location_type: Some(1),
                    ..Default::default()
                },
                GtfsStop {
                    stop_id: "P1".into(),
                    parent_station: Some("S".into()),
                    ..Default::default()
                },
            ],
            routes: vec![GtfsRoute {
                route_id: "R".into(),
                ..Default::default()
            }],
            trips: vec![
                GtfsTrip {
                    route_id: "R".into(),
                    service_id: "WK".into(),
                    trip_id: "A".into(),
                    ..Default::default()
                },
                GtfsTrip {
                    route_id: "R".into(),
                    service_id: "WK".into(),
                    trip_id: "B".into(),
                    ..Default::default()
                },
                GtfsTrip {
                    route_id: "NOPE".into(),
                    service_id: "WK".into(),
                    trip_id: "C".into(),
                    ..Default::default()
                },
            ],
            stop_times: vec![
                stop_time("A", "P1", 3),
                stop_time("B", "X", 1),
                stop_time("A", "P2", 1),
                stop_time("Z", "P1", 1),
                stop_time("A", "P3", 2),
            ],
        };
        let repository = Repository::new()
            .load_gtfs(GtfsReader::new().from_data(data))
            .unwrap();

        assert_eq!(repository.trips.len(), 2);
        assert_eq!(repository.diagnostics.unknown_routes, 1);
        assert_eq!(repository.diagnostics.unknown_trips, 1);

        let a = repository.trip_by_id("A").unwrap();
        let ids: Vec<_> = repository
            .stop_times_by_trip_idx(a.index)
            .iter()
            .map(|st| st.stop_id.to_string())
            .collect();
        assert_eq!(ids, vec!["P2", "P3", "P1"]);

        let b = repository.trip_by_id("B").unwrap();
        assert_eq!(repository.stop_times_by_trip_idx(b.index).len(), 1);

        let station = repository.stop_by_id("S").unwrap();
        assert_eq!(repository.stops_by_station_idx(station.index), &[1]);
        assert_eq!(repository.stop_by_id("P1").unwrap().parent_idx, Some(0));
    }
}
