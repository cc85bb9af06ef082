use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::{
    repository::Repository,
    schedule::{
        pattern::{Pattern, PatternTable},
        platform::platform_override,
        sequence::TripStationSequence,
    },
    station::StationResolver,
};

pub const FORMAT_VERSION: &str = "7.1";

/// Minute fields count from midnight of the service day, so trips running
/// past midnight carry values of 1440 and above (`24:30:00` is 1470).
pub const TIME_BASE: &str = "serviceDayMinutes";

/// Referential problems found in a set of artifacts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("No station sequence was kept for trip {0}")]
    MissingSequence(u32),
    #[error("Files for {slug} claim origin {found}")]
    OriginMismatch { slug: String, found: String },
    #[error("Pattern {found} of {origin} sits at position {expected}")]
    SparsePatterns {
        origin: String,
        expected: u32,
        found: u32,
    },
    #[error("{origin} to {destination} has {found} days, expected {expected}")]
    DayCount {
        origin: String,
        destination: String,
        expected: u32,
        found: usize,
    },
    #[error("Trip {trip} from {origin} references missing pattern {pattern}")]
    UnknownPattern {
        origin: String,
        trip: String,
        pattern: u32,
    },
    #[error("Trip {trip} from {origin} is listed under {listed} but its pattern ends at {pattern}")]
    DestinationMismatch {
        origin: String,
        trip: String,
        listed: String,
        pattern: String,
    },
    #[error("Trip {trip} from {origin} has {found} intermediate times for {expected} stops")]
    StopCountMismatch {
        origin: String,
        trip: String,
        expected: usize,
        found: usize,
    },
}

/// One trip from an origin to one destination on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactTrip {
    /// Trip id.
    pub t: String,
    /// Departure from the origin, minutes since midnight.
    pub d: u32,
    /// Arrival at the destination, minutes since midnight.
    pub a: u32,
    /// Index into the origin's pattern file.
    pub p: u32,
    /// Arrival minutes at each intermediate stop.
    pub s: Vec<u32>,
    /// Origin platform, only when it differs from the pattern default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    /// Destination platform, only when it differs from the pattern default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ap: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSummary {
    pub id: String,
    pub name: String,
    pub platform_ids: Vec<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleMeta {
    pub format_version: String,
    pub start_date: NaiveDate,
    pub day_count: u32,
    /// How the minute fields are counted, always [`TIME_BASE`].
    pub time_base: String,
    pub origin_slug: String,
    pub field_legend: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSchedule {
    pub destination: StationSummary,
    /// `schedules[i]` holds the trips of `startDate + i`.
    pub schedules: Vec<Vec<CompactTrip>>,
}

/// Every departure from one origin, grouped by destination and day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleFile {
    pub meta: ScheduleMeta,
    pub station: StationSummary,
    pub routes: BTreeMap<String, RouteSchedule>,
}

/// `[station slug, station name, platform id, platform code, platform name]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternStopEntry(
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub i: u32,
    /// Route id.
    pub r: String,
    /// Route display name.
    pub n: String,
    /// Destination slug.
    pub d: String,
    /// Intermediate stops.
    pub s: Vec<PatternStopEntry>,
    /// Trip occurrences in the window.
    pub c: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMeta {
    pub format_version: String,
    pub origin_slug: String,
    pub field_legend: BTreeMap<String, String>,
    pub stop_field_legend: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFile {
    pub meta: PatternMeta,
    pub patterns: Vec<PatternEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationArtifacts {
    pub slug: String,
    pub schedule: ScheduleFile,
    pub patterns: PatternFile,
}

/// Output of one compaction run, ready to be published.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub start_date: NaiveDate,
    pub day_count: u32,
    pub format_version: String,
    /// One entry per origin with at least one outbound trip.
    pub stations: Vec<StationArtifacts>,
}

impl Artifacts {
    pub fn station(&self, slug: &str) -> Option<&StationArtifacts> {
        self.stations.iter().find(|station| station.slug == slug)
    }

    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.stations.iter().map(|station| station.slug.as_str())
    }

    /// Checks that every file pair is self-consistent and that every trip
    /// references a pattern of its own origin.
    pub fn verify(&self) -> Result<(), self::Error> {
        self.stations
            .par_iter()
            .try_for_each(|station| station.verify(self.day_count))
    }
}

impl StationArtifacts {
    fn verify(&self, day_count: u32) -> Result<(), self::Error> {
        for found in [&self.schedule.meta.origin_slug, &self.patterns.meta.origin_slug] {
            if *found != self.slug {
                return Err(Error::OriginMismatch {
                    slug: self.slug.clone(),
                    found: found.clone(),
                });
            }
        }
        for (expected, pattern) in self.patterns.patterns.iter().enumerate() {
            if pattern.i != expected as u32 {
                return Err(Error::SparsePatterns {
                    origin: self.slug.clone(),
                    expected: expected as u32,
                    found: pattern.i,
                });
            }
        }
        for (destination, route) in self.schedule.routes.iter() {
            if route.schedules.len() != day_count as usize {
                return Err(Error::DayCount {
                    origin: self.slug.clone(),
                    destination: destination.clone(),
                    expected: day_count,
                    found: route.schedules.len(),
                });
            }
            for trip in route.schedules.iter().flatten() {
                let Some(pattern) = self.patterns.patterns.get(trip.p as usize) else {
                    return Err(Error::UnknownPattern {
                        origin: self.slug.clone(),
                        trip: trip.t.clone(),
                        pattern: trip.p,
                    });
                };
                if pattern.d != *destination {
                    return Err(Error::DestinationMismatch {
                        origin: self.slug.clone(),
                        trip: trip.t.clone(),
                        listed: destination.clone(),
                        pattern: pattern.d.clone(),
                    });
                }
                if pattern.s.len() != trip.s.len() {
                    return Err(Error::StopCountMismatch {
                        origin: self.slug.clone(),
                        trip: trip.t.clone(),
                        expected: pattern.s.len(),
                        found: trip.s.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

pub fn schedule_field_legend() -> BTreeMap<String, String> {
    [
        ("t", "tripId"),
        ("d", "departureMinutes"),
        ("a", "arrivalMinutes"),
        ("p", "patternIndex"),
        ("s", "intermediateMinutes"),
        ("op", "originPlatformOverride"),
        ("ap", "destinationPlatformOverride"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

pub fn pattern_field_legend() -> BTreeMap<String, String> {
    [
        ("i", "id"),
        ("r", "routeId"),
        ("n", "routeName"),
        ("d", "destination"),
        ("s", "stops"),
        ("c", "tripCount"),
        ("op", "originPlatformDefault"),
        ("dp", "destPlatformDefault"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

pub fn stop_field_legend() -> Vec<String> {
    ["station", "name", "platformId", "platform", "platformName"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Turns finished pattern tables into per-origin files.
///
/// The tables must have their defaults resolved. Nothing here mutates shared
/// state, so origins are assembled in parallel.
pub(crate) struct Encoder<'a> {
    pub repository: &'a Repository,
    pub stations: &'a StationResolver,
    pub sequences: &'a HashMap<u32, TripStationSequence>,
    pub start_date: NaiveDate,
    pub day_count: u32,
    pub format_version: &'a str,
}

impl Encoder<'_> {
    pub fn encode(&self, tables: &[PatternTable]) -> Result<Artifacts, self::Error> {
        let stations = tables
            .par_iter()
            .filter(|table| !table.is_empty())
            .map(|table| self.encode_origin(table))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Artifacts {
            start_date: self.start_date,
            day_count: self.day_count,
            format_version: self.format_version.to_string(),
            stations,
        })
    }

    fn encode_origin(&self, table: &PatternTable) -> Result<StationArtifacts, self::Error> {
        let slug = self.stations.slug(table.origin_idx).to_string();
        let mut routes: BTreeMap<String, RouteSchedule> = BTreeMap::new();

        for occurrence in table.occurrences() {
            let pattern = &table.patterns()[occurrence.pattern as usize];
            let sequence = self
                .sequences
                .get(&occurrence.trip_idx)
                .ok_or(Error::MissingSequence(occurrence.trip_idx))?;
            let origin = &sequence.visits[occurrence.from as usize];
            let destination = &sequence.visits[occurrence.to as usize];
            let between = &sequence.visits[occurrence.from as usize + 1..occurrence.to as usize];

            let trip = CompactTrip {
                t: self.repository.trips[occurrence.trip_idx as usize].id.to_string(),
                d: origin.departure.as_minutes(),
                a: destination.arrival.as_minutes(),
                p: pattern.index,
                s: between.iter().map(|visit| visit.arrival.as_minutes()).collect(),
                op: platform_override(
                    &self.stations.platform(origin.platform_idx).code,
                    pattern.origin_default(),
                )
                .map(|code| code.to_string()),
                ap: platform_override(
                    &self.stations.platform(destination.platform_idx).code,
                    pattern.destination_default(),
                )
                .map(|code| code.to_string()),
            };

            routes
                .entry(self.stations.slug(pattern.destination_idx).to_string())
                .or_insert_with(|| RouteSchedule {
                    destination: self.summary(pattern.destination_idx),
                    schedules: vec![Vec::new(); self.day_count as usize],
                })
                .schedules[occurrence.day as usize]
                .push(trip);
        }

        routes
            .values_mut()
            .flat_map(|route| route.schedules.iter_mut())
            .for_each(|day| day.sort_by(|a, b| a.d.cmp(&b.d).then_with(|| a.t.cmp(&b.t))));

        let schedule = ScheduleFile {
            meta: ScheduleMeta {
                format_version: self.format_version.to_string(),
                start_date: self.start_date,
                day_count: self.day_count,
                time_base: TIME_BASE.into(),
                origin_slug: slug.clone(),
                field_legend: schedule_field_legend(),
            },
            station: self.summary(table.origin_idx),
            routes,
        };
        let patterns = PatternFile {
            meta: PatternMeta {
                format_version: self.format_version.to_string(),
                origin_slug: slug.clone(),
                field_legend: pattern_field_legend(),
                stop_field_legend: stop_field_legend(),
            },
            patterns: table
                .patterns()
                .iter()
                .map(|pattern| self.pattern_entry(pattern))
                .collect(),
        };
        Ok(StationArtifacts {
            slug,
            schedule,
            patterns,
        })
    }

    fn pattern_entry(&self, pattern: &Pattern) -> PatternEntry {
        let stops = pattern
            .stops
            .iter()
            .map(|stop| {
                let station = self.stations.station(stop.station_idx);
                let platform = self.stations.platform(stop.platform_idx);
                PatternStopEntry(
                    station.slug.to_string(),
                    station.name.to_string(),
                    platform.id.to_string(),
                    platform.code.to_string(),
                    platform.name.to_string(),
                )
            })
            .collect();
        PatternEntry {
            i: pattern.index,
            r: pattern.route_id.to_string(),
            n: pattern.route_name.to_string(),
            d: self.stations.slug(pattern.destination_idx).to_string(),
            s: stops,
            c: pattern.trip_count,
            op: pattern.origin_default().map(|code| code.to_string()),
            dp: pattern.destination_default().map(|code| code.to_string()),
        }
    }

    fn summary(&self, station_idx: u32) -> StationSummary {
        let station = self.stations.station(station_idx);
        StationSummary {
            id: station.slug.to_string(),
            name: station.name.to_string(),
            platform_ids: self
                .stations
                .platform_ids(station_idx)
                .map(String::from)
                .collect(),
            lat: station.coordinate.map(|coordinate| coordinate.latitude),
            lng: station.coordinate.map(|coordinate| coordinate.longitude),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(t: &str, p: u32) -> CompactTrip {
        CompactTrip {
            t: t.into(),
            d: 401,
            a: 404,
            p,
            s: vec![403],
            op: None,
            ap: None,
        }
    }

    fn summary(slug: &str) -> StationSummary {
        StationSummary {
            id: slug.into(),
            name: slug.into(),
            platform_ids: vec![],
            lat: None,
            lng: None,
        }
    }

    fn artifacts(trips: Vec<CompactTrip>, day_count: u32) -> Artifacts {
        let start_date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut schedules = vec![Vec::new(); day_count as usize];
        schedules[0] = trips;
        let schedule = ScheduleFile {
            meta: ScheduleMeta {
                format_version: FORMAT_VERSION.into(),
                start_date,
                day_count,
                time_base: TIME_BASE.into(),
                origin_slug: "ORIGIN".into(),
                field_legend: schedule_field_legend(),
            },
            station: summary("ORIGIN"),
            routes: BTreeMap::from([(
                "DEST".to_string(),
                RouteSchedule {
                    destination: summary("DEST"),
                    schedules,
                },
            )]),
        };
        let stop = PatternStopEntry(
            "MID".into(),
            "Mid".into(),
            "M1".into(),
            "1".into(),
            "Mid platform 1".into(),
        );
        let patterns = PatternFile {
            meta: PatternMeta {
                format_version: FORMAT_VERSION.into(),
                origin_slug: "ORIGIN".into(),
                field_legend: pattern_field_legend(),
                stop_field_legend: stop_field_legend(),
            },
            patterns: vec![PatternEntry {
                i: 0,
                r: "F11".into(),
                n: "Express".into(),
                d: "DEST".into(),
                s: vec![stop],
                c: 1,
                op: Some("2".into()),
                dp: Some("1".into()),
            }],
        };
        Artifacts {
            start_date,
            day_count,
            format_version: FORMAT_VERSION.into(),
            stations: vec![StationArtifacts {
                slug: "ORIGIN".into(),
                schedule,
                patterns,
            }],
        }
    }

    #[test]
    fn compact_trip_skips_absent_overrides() {
        let json = serde_json::to_string(&trip("T1", 0)).unwrap();
        assert_eq!(json, r#"{"t":"T1","d":401,"a":404,"p":0,"s":[403]}"#);

        let mut with_override = trip("T1", 0);
        with_override.ap = Some("3".into());
        let json = serde_json::to_string(&with_override).unwrap();
        assert_eq!(json, r#"{"t":"T1","d":401,"a":404,"p":0,"s":[403],"ap":"3"}"#);
    }

    #[test]
    fn pattern_stops_serialize_as_arrays() {
        let artifacts = artifacts(vec![trip("T1", 0)], 7);
        let json = serde_json::to_value(&artifacts.stations[0].patterns).unwrap();
        assert_eq!(
            json["patterns"][0]["s"][0],
            serde_json::json!(["MID", "Mid", "M1", "1", "Mid platform 1"])
        );
        assert_eq!(json["meta"]["originSlug"], "ORIGIN");
        assert_eq!(json["meta"]["stopFieldLegend"][2], "platformId");
    }

    #[test]
    fn schedule_meta_uses_iso_dates() {
        let artifacts = artifacts(vec![], 7);
        let json = serde_json::to_value(&artifacts.stations[0].schedule).unwrap();
        assert_eq!(json["meta"]["startDate"], "2024-03-04");
        assert_eq!(json["meta"]["dayCount"], 7);
        assert_eq!(json["station"]["lat"], serde_json::Value::Null);
    }

    #[test]
    fn verify_accepts_closed_artifacts() {
        assert_eq!(artifacts(vec![trip("T1", 0)], 7).verify(), Ok(()));
    }

    #[test]
    fn verify_rejects_dangling_pattern() {
        let err = artifacts(vec![trip("T1", 4)], 7).verify().unwrap_err();
        assert!(matches!(err, Error::UnknownPattern { pattern: 4, .. }));
    }

    #[test]
    fn verify_rejects_wrong_day_count() {
        let mut artifacts = artifacts(vec![trip("T1", 0)], 7);
        artifacts.day_count = 8;
        assert!(matches!(
            artifacts.verify(),
            Err(Error::DayCount { expected: 8, found: 7, .. })
        ));
    }

    #[test]
    fn verify_rejects_sparse_indices() {
        let mut artifacts = artifacts(vec![], 7);
        artifacts.stations[0].patterns.patterns[0].i = 1;
        assert!(matches!(
            artifacts.verify(),
            Err(Error::SparsePatterns { expected: 0, found: 1, .. })
        ));
    }
}
