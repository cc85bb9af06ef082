use std::{collections::HashSet, sync::Arc};
use thiserror::Error;

use crate::{
    diagnostics::Diagnostics, repository::StopTime, shared::time::Time, station::StationResolver,
};

/// Why a trip produced no usable station sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Trip resolves to fewer than two stations")]
    TooShort,
    #[error("Trip returns to station {0} after leaving it")]
    Revisit(Arc<str>),
}

/// A trip calling at one station, after platform-level stops were collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationVisit {
    pub station_idx: u32,
    /// The first platform used at this station.
    pub platform_idx: u32,
    pub arrival: Time,
    pub departure: Time,
    /// Zero-based position within the sequence.
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripStationSequence {
    pub trip_idx: u32,
    pub visits: Box<[StationVisit]>,
}

impl TripStationSequence {
    /// Builds the station-level sequence of one trip.
    ///
    /// `stop_times` must be sorted by `stop_sequence`. Stop times on platforms
    /// the resolver does not know are skipped and counted. Consecutive calls at
    /// the same station collapse into one visit that keeps the first arrival and
    /// the last departure.
    pub fn build(
        trip_idx: u32,
        stop_times: &[StopTime],
        stations: &StationResolver,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, SequenceError> {
        let mut visits: Vec<StationVisit> = Vec::with_capacity(stop_times.len());
        let mut seen: HashSet<u32> = HashSet::with_capacity(stop_times.len());
        for stop_time in stop_times {
            let Some(platform) = stations.platform_by_id(&stop_time.stop_id) else {
                diagnostics.unresolved_platforms += 1;
                continue;
            };
            let arrival = clock(
                stop_time.arrival_time.as_deref(),
                stop_time.departure_time.as_deref(),
                diagnostics,
            );
            let departure = clock(
                stop_time.departure_time.as_deref(),
                stop_time.arrival_time.as_deref(),
                diagnostics,
            );

            if let Some(last) = visits.last_mut()
                && last.station_idx == platform.station_idx
            {
                last.departure = departure;
                continue;
            }
            if !seen.insert(platform.station_idx) {
                return Err(SequenceError::Revisit(
                    stations.station(platform.station_idx).slug.clone(),
                ));
            }
            visits.push(StationVisit {
                station_idx: platform.station_idx,
                platform_idx: platform.index,
                arrival,
                departure,
                position: visits.len() as u32,
            });
        }

        if visits.len() < 2 {
            return Err(SequenceError::TooShort);
        }
        Ok(Self {
            trip_idx,
            visits: visits.into(),
        })
    }
}

/// Parses `primary`, falling back to `secondary` when it is absent.
/// Anything unparseable becomes midnight and is counted.
fn clock(primary: Option<&str>, secondary: Option<&str>, diagnostics: &mut Diagnostics) -> Time {
    let raw = primary.filter(|val| !val.is_empty()).or(secondary);
    match raw.and_then(Time::from_hms) {
        Some(time) => time,
        None => {
            diagnostics.malformed_times += 1;
            Time::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repository::Repository,
        station::{RosterEntry, StationRoster},
    };

    fn resolver() -> StationResolver {
        let entry = |name: &str, platforms: &[&str]| RosterEntry {
            station_name: name.into(),
            platform_ids: platforms.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        };
        let roster = StationRoster::new(vec![
            entry("Alpha", &["A1", "A2"]),
            entry("Bravo", &["B1"]),
            entry("Charlie", &["C1"]),
        ]);
        StationResolver::new(&roster, &Repository::new()).unwrap()
    }

    fn stop_time(stop: &str, sequence: u32, arrival: &str, departure: &str) -> StopTime {
        StopTime {
            stop_id: stop.into(),
            sequence,
            arrival_time: Some(arrival.into()),
            departure_time: Some(departure.into()),
            ..Default::default()
        }
    }

    #[test]
    fn consecutive_platforms_collapse_into_one_visit() {
        let stations = resolver();
        let mut diagnostics = Diagnostics::default();
        let stop_times = [
            stop_time("A1", 1, "06:40:00", "06:40:30"),
            stop_time("A2", 2, "06:41:00", "06:41:30"),
            stop_time("B1", 3, "06:43:00", "06:43:30"),
            stop_time("C1", 4, "06:44:00", "06:44:00"),
        ];
        let sequence = TripStationSequence::build(7, &stop_times, &stations, &mut diagnostics).unwrap();
        assert_eq!(sequence.visits.len(), 3);
        let first = &sequence.visits[0];
        assert_eq!(stations.platform(first.platform_idx).id.as_ref(), "A1");
        assert_eq!(first.arrival.to_hms_string(), "06:40:00");
        assert_eq!(first.departure.to_hms_string(), "06:41:30");
        assert_eq!(sequence.visits[2].position, 2);
        assert!(diagnostics.is_clean());
    }

    #[test]
    fn unknown_platforms_are_skipped_and_counted() {
        let stations = resolver();
        let mut diagnostics = Diagnostics::default();
        let stop_times = [
            stop_time("A1", 1, "06:40:00", "06:40:00"),
            stop_time("ZZ", 2, "06:41:00", "06:41:00"),
            stop_time("B1", 3, "06:43:00", "06:43:00"),
        ];
        let sequence = TripStationSequence::build(0, &stop_times, &stations, &mut diagnostics).unwrap();
        assert_eq!(sequence.visits.len(), 2);
        assert_eq!(diagnostics.unresolved_platforms, 1);
    }

    #[test]
    fn revisiting_a_station_drops_the_trip() {
        let stations = resolver();
        let mut diagnostics = Diagnostics::default();
        let stop_times = [
            stop_time("A1", 1, "06:40:00", "06:40:00"),
            stop_time("B1", 2, "06:41:00", "06:41:00"),
            stop_time("A2", 3, "06:43:00", "06:43:00"),
        ];
        assert_eq!(
            TripStationSequence::build(0, &stop_times, &stations, &mut diagnostics),
            Err(SequenceError::Revisit("ALPHA".into()))
        );
    }

    #[test]
    fn single_station_trip_is_too_short() {
        let stations = resolver();
        let mut diagnostics = Diagnostics::default();
        let stop_times = [
            stop_time("A1", 1, "06:40:00", "06:40:00"),
            stop_time("A2", 2, "06:41:00", "06:41:00"),
        ];
        assert_eq!(
            TripStationSequence::build(0, &stop_times, &stations, &mut diagnostics),
            Err(SequenceError::TooShort)
        );
    }

    #[test]
    fn missing_and_malformed_clocks_fall_back() {
        let stations = resolver();
        let mut diagnostics = Diagnostics::default();
        let mut first = stop_time("A1", 1, "", "06:40:00");
        first.arrival_time = None;
        let stop_times = [first, stop_time("B1", 2, "6h43", "06:43:00")];
        let sequence = TripStationSequence::build(0, &stop_times, &stations, &mut diagnostics).unwrap();
        assert_eq!(sequence.visits[0].arrival.to_hms_string(), "06:40:00");
        assert_eq!(sequence.visits[1].arrival, Time::default());
        assert_eq!(diagnostics.malformed_times, 1);
    }
}
