#![allow(dead_code)]

use chrono::NaiveDate;
use stationboard::{
    gtfs::{GtfsData, GtfsReader, GtfsRoute, GtfsStop, GtfsStopTime, GtfsTrip},
    prelude::*,
    schedule::{self, Compaction, encode::FORMAT_VERSION},
    station::RosterEntry,
};

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

/// In-memory feed builder. Trips get sequential `stop_sequence` values.
#[derive(Default)]
pub struct Feed {
    pub data: GtfsData,
}

impl Feed {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn stop(mut self, id: &str, name: &str, platform_code: Option<&str>) -> Self {
        self.data.stops.push(GtfsStop {
            stop_id: id.into(),
            stop_name: Some(name.into()),
            platform_code: platform_code.map(|code| code.into()),
            ..Default::default()
        });
        self
    }

    pub fn route(mut self, id: &str, long_name: &str) -> Self {
        self.data.routes.push(GtfsRoute {
            route_id: id.into(),
            route_long_name: Some(long_name.into()),
            ..Default::default()
        });
        self
    }

    /// `calls` are `(stop_id, clock)` pairs; arrival and departure are equal.
    pub fn trip(self, trip_id: &str, route_id: &str, service_id: &str, calls: &[(&str, &str)]) -> Self {
        let calls: Vec<(&str, &str, &str)> = calls
            .iter()
            .map(|(stop, clock)| (*stop, *clock, *clock))
            .collect();
        self.trip_with_times(trip_id, route_id, service_id, &calls)
    }

    /// `calls` are `(stop_id, arrival, departure)`.
    pub fn trip_with_times(
        mut self,
        trip_id: &str,
        route_id: &str,
        service_id: &str,
        calls: &[(&str, &str, &str)],
    ) -> Self {
        self.data.trips.push(GtfsTrip {
            route_id: route_id.into(),
            service_id: service_id.into(),
            trip_id: trip_id.into(),
            ..Default::default()
        });
        for (sequence, (stop, arrival, departure)) in calls.iter().enumerate() {
            self.data.stop_times.push(GtfsStopTime {
                trip_id: trip_id.into(),
                arrival_time: Some(arrival.to_string()),
                departure_time: Some(departure.to_string()),
                stop_id: stop.to_string(),
                stop_sequence: sequence as u32 + 1,
            });
        }
        self
    }

    pub fn repository(&self) -> Repository {
        Repository::new()
            .load_gtfs(GtfsReader::new().from_data(self.data.clone()))
            .unwrap()
    }
}

pub fn roster(entries: &[(&str, &[&str])]) -> StationRoster {
    StationRoster::new(
        entries
            .iter()
            .map(|(name, platforms)| RosterEntry {
                station_name: name.to_string(),
                platform_ids: platforms.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            })
            .collect(),
    )
}

/// Three stations on a line: Bowen Hills (two platforms), New Farm, Riverside.
pub fn line() -> Feed {
    Feed::new()
        .stop("BH1", "Bowen Hills platform 2", Some("2"))
        .stop("BH2", "Bowen Hills platform 1", Some("1"))
        .stop("NF1", "New Farm", Some("1"))
        .stop("RS1", "Riverside", Some("1"))
        .stop("RS2", "Riverside", Some("2"))
        .route("F11", "Express")
        .route("F1", "All stops")
}

pub fn line_roster() -> StationRoster {
    roster(&[
        ("Bowen Hills", &["BH1", "BH2"]),
        ("New Farm", &["NF1"]),
        ("Riverside", &["RS1", "RS2"]),
    ])
}

/// Every service id active on every day of a March 2024 week.
pub fn every_day(services: &[&str]) -> ServiceDays {
    let mut days = ServiceDays::new();
    for day in 4..11 {
        for service in services {
            days.insert(date(day), *service);
        }
    }
    days
}

pub fn compact(feed: &Feed, roster: &StationRoster, services: &ServiceDays) -> Compaction {
    let repository = feed.repository();
    let stations = StationResolver::new(roster, &repository).unwrap();
    Compactor::new(&repository, &stations)
        .with_config(schedule::Config {
            start_date: date(4),
            day_count: 7,
            format_version: FORMAT_VERSION.into(),
        })
        .compact(services)
        .unwrap()
}
